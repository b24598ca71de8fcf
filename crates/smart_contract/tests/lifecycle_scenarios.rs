//! End-to-end lifecycle scenarios: contract deployment and teardown,
//! user-defined assets, NFTs and notary deposits.

mod common;

use common::{signature_address, test_key, Chain};
use neo_core::{get_contract_hash, to_script_hash, Transaction, UInt160};
use neo_persistence::{StorageItem, StorageKey};
use neo_smart_contract::native::{
    ContractManagement, GasToken, NeoToken, Notary, PolicyContract, TokenManagement,
};
use neo_smart_contract::{Error, NefFile, StackItem};
use num_bigint::BigInt;

const MANIFEST: &[u8] = br#"{"name": "Example", "abi": {"methods": [], "events": []}}"#;

fn sample_nef() -> NefFile {
    NefFile::new("test-compiler-1.0", vec![0x10, 0x40]).unwrap()
}

fn cm_hash(chain: &Chain) -> UInt160 {
    chain
        .registry
        .by_name("ContractManagement")
        .unwrap()
        .meta()
        .hash
}

#[test]
fn deploy_persists_contract_state() {
    let mut chain = Chain::new(1, 1);
    let alice = signature_address(&test_key(7));
    let cm = cm_hash(&chain);
    let nef = sample_nef();
    let expected = get_contract_hash(&alice, nef.checksum, "Example");

    chain
        .advance_with(
            Transaction {
                signers: vec![alice],
                ..Transaction::default()
            },
            |registry, engine| {
                registry.call(
                    engine,
                    &cm,
                    "deploy",
                    &[
                        StackItem::from(nef.to_bytes()?),
                        StackItem::from(MANIFEST.to_vec()),
                    ],
                )?;
                // Small contracts still pay the minimum deployment fee.
                assert!(engine.fee_consumed() >= 10_0000_0000);
                Ok(())
            },
        )
        .unwrap();

    let state = ContractManagement::get_contract(
        chain.snapshot(),
        &expected,
    )
    .unwrap()
    .unwrap();
    assert_eq!(state.id, 1);
    assert_eq!(state.update_counter, 0);
    assert_eq!(state.manifest.name, "Example");

    // The same (sender, checksum, name) cannot land twice.
    let again = chain.advance_with(
        Transaction {
            signers: vec![alice],
            ..Transaction::default()
        },
        |registry, engine| {
            registry.call(
                engine,
                &cm,
                "deploy",
                &[
                    StackItem::from(sample_nef().to_bytes()?),
                    StackItem::from(MANIFEST.to_vec()),
                ],
            )?;
            Ok(())
        },
    );
    assert!(matches!(again, Err(Error::InvalidOperation(_))));
}

#[test]
fn updates_bump_the_counter_but_cannot_rename() {
    let mut chain = Chain::new(1, 1);
    let alice = signature_address(&test_key(7));
    let cm = cm_hash(&chain);
    let nef = sample_nef();
    let hash = get_contract_hash(&alice, nef.checksum, "Example");

    chain
        .advance_with(
            Transaction {
                signers: vec![alice],
                ..Transaction::default()
            },
            |registry, engine| {
                registry.call(
                    engine,
                    &cm,
                    "deploy",
                    &[
                        StackItem::from(nef.to_bytes()?),
                        StackItem::from(MANIFEST.to_vec()),
                    ],
                )?;

                // Updates come from the contract itself.
                engine.set_calling_script_hash(Some(hash));
                let replacement = NefFile::new("test-compiler-1.1", vec![0x10, 0x10, 0x40])?;
                registry.call(
                    engine,
                    &cm,
                    "update",
                    &[
                        StackItem::from(replacement.to_bytes()?),
                        StackItem::Null,
                        StackItem::Null,
                    ],
                )?;

                let renamed = registry.call(
                    engine,
                    &cm,
                    "update",
                    &[
                        StackItem::Null,
                        StackItem::from(
                            br#"{"name": "Renamed", "abi": {"methods": [], "events": []}}"#
                                .to_vec(),
                        ),
                        StackItem::Null,
                    ],
                );
                assert!(matches!(renamed, Err(Error::InvalidArgument(_))));
                Ok(())
            },
        )
        .unwrap();

    let state = ContractManagement::get_contract(
        chain.snapshot(),
        &hash,
    )
    .unwrap()
    .unwrap();
    assert_eq!(state.update_counter, 1);
    assert_eq!(state.nef.compiler, "test-compiler-1.1");
}

#[test]
fn destroy_sweeps_storage_and_retires_the_hash() {
    let mut chain = Chain::new(1, 1);
    let alice = signature_address(&test_key(7));
    let cm = cm_hash(&chain);
    let nef = sample_nef();
    let hash = get_contract_hash(&alice, nef.checksum, "Example");
    let owned_key = StorageKey::new(1, vec![0x01, 0x07]);

    chain
        .advance_with(
            Transaction {
                signers: vec![alice],
                ..Transaction::default()
            },
            |registry, engine| {
                registry.call(
                    engine,
                    &cm,
                    "deploy",
                    &[
                        StackItem::from(nef.to_bytes()?),
                        StackItem::from(MANIFEST.to_vec()),
                    ],
                )?;
                engine
                    .snapshot_mut()
                    .put(owned_key.clone(), StorageItem::new(vec![1]));

                engine.set_calling_script_hash(Some(hash));
                registry.call(engine, &cm, "destroy", &[])?;
                Ok(())
            },
        )
        .unwrap();

    assert!(ContractManagement::get_contract(
        chain.snapshot(),
        &hash
    )
    .unwrap()
    .is_none());
    assert!(chain.snapshot().try_get(&owned_key).is_none());
    assert!(PolicyContract::is_blocked(chain.snapshot(), &hash));

    // The retired hash cannot be redeployed.
    let redeploy = chain.advance_with(
        Transaction {
            signers: vec![alice],
            ..Transaction::default()
        },
        |registry, engine| {
            registry.call(
                engine,
                &cm,
                "deploy",
                &[
                    StackItem::from(sample_nef().to_bytes()?),
                    StackItem::from(MANIFEST.to_vec()),
                ],
            )?;
            Ok(())
        },
    );
    assert!(matches!(redeploy, Err(Error::InvalidOperation(_))));
}

#[test]
fn fungible_assets_live_under_token_management() {
    let mut chain = Chain::new(1, 1);
    let owner = UInt160::from([0x42u8; 20]);
    let alice = signature_address(&test_key(7));
    let bob = signature_address(&test_key(8));
    let tm = TokenManagement::hash();

    let mut seed = owner.to_array().to_vec();
    seed.extend_from_slice(b"Token");
    let expected_asset = to_script_hash(&seed);

    let mut asset = UInt160::ZERO;
    chain
        .advance_with(Transaction::default(), |registry, engine| {
            engine.set_calling_script_hash(Some(owner));
            asset = registry
                .call(
                    engine,
                    &tm,
                    "create",
                    &[
                        StackItem::from("Token"),
                        StackItem::from("TKN"),
                        StackItem::from(8u32),
                        StackItem::from(1_000_000i64),
                    ],
                )?
                .as_uint160()?;

            let duplicate = registry.call(
                engine,
                &tm,
                "create",
                &[
                    StackItem::from("Token"),
                    StackItem::from("TKN"),
                    StackItem::from(8u32),
                    StackItem::from(1_000_000i64),
                ],
            );
            assert!(matches!(duplicate, Err(Error::InvalidOperation(_))));

            let bad_symbol = registry.call(
                engine,
                &tm,
                "create",
                &[
                    StackItem::from("Other"),
                    StackItem::from("X"),
                    StackItem::from(0u32),
                    StackItem::from(-1i64),
                ],
            );
            assert!(matches!(bad_symbol, Err(Error::InvalidArgument(_))));

            registry.call(
                engine,
                &tm,
                "mint",
                &[
                    StackItem::from(&asset),
                    StackItem::from(&alice),
                    StackItem::from(600i64),
                ],
            )?;
            let over_cap = registry.call(
                engine,
                &tm,
                "mint",
                &[
                    StackItem::from(&asset),
                    StackItem::from(&alice),
                    StackItem::from(1_000_000i64),
                ],
            );
            assert!(matches!(over_cap, Err(Error::InvalidOperation(_))));
            Ok(())
        })
        .unwrap();
    assert_eq!(asset, expected_asset);

    let token = TokenManagement::get_token(chain.snapshot(), &asset)
        .unwrap()
        .unwrap();
    assert_eq!(token.name, "Token");
    assert_eq!(token.symbol, "TKN");
    assert_eq!(token.decimals, 8);
    assert_eq!(token.total_supply, BigInt::from(600));

    // Holders move their balance with their own witness.
    let moved = chain
        .call(
            &[alice],
            &tm,
            "transfer",
            &[
                StackItem::from(&asset),
                StackItem::from(&alice),
                StackItem::from(&bob),
                StackItem::from(600i64),
                StackItem::Null,
            ],
        )
        .unwrap();
    assert_eq!(moved, StackItem::from(true));
    assert_eq!(
        TokenManagement::balance_of(chain.snapshot(), &asset, &alice).unwrap(),
        BigInt::from(0)
    );
    assert_eq!(
        TokenManagement::balance_of(chain.snapshot(), &asset, &bob).unwrap(),
        BigInt::from(600)
    );

    // The owner's witness authorizes burning from any holder.
    chain
        .advance_with(Transaction::default(), |registry, engine| {
            engine.add_witness(owner);
            registry.call(
                engine,
                &tm,
                "burn",
                &[
                    StackItem::from(&asset),
                    StackItem::from(&bob),
                    StackItem::from(100i64),
                ],
            )?;
            Ok(())
        })
        .unwrap();
    assert_eq!(
        TokenManagement::get_token(chain.snapshot(), &asset)
            .unwrap()
            .unwrap()
            .total_supply,
        BigInt::from(500)
    );
    assert_eq!(
        TokenManagement::balance_of(chain.snapshot(), &asset, &bob).unwrap(),
        BigInt::from(500)
    );
}

#[test]
fn nfts_carry_properties_and_move_between_owners() {
    let mut chain = Chain::new(1, 1);
    let owner = UInt160::from([0x42u8; 20]);
    let alice = signature_address(&test_key(7));
    let bob = signature_address(&test_key(8));
    let tm = TokenManagement::hash();

    let mut asset = UInt160::ZERO;
    let mut unique_id = UInt160::ZERO;
    chain
        .advance_with(Transaction::default(), |registry, engine| {
            engine.set_calling_script_hash(Some(owner));
            asset = registry
                .call(
                    engine,
                    &tm,
                    "createNFT",
                    &[
                        StackItem::from("Art"),
                        StackItem::from("ART"),
                        StackItem::from(-1i64),
                    ],
                )?
                .as_uint160()?;

            unique_id = registry
                .call(
                    engine,
                    &tm,
                    "mintNFT",
                    &[
                        StackItem::from(&asset),
                        StackItem::from(&alice),
                        StackItem::Map(vec![(
                            StackItem::from(b"title".to_vec()),
                            StackItem::from(b"sunrise".to_vec()),
                        )]),
                    ],
                )?
                .as_uint160()?;

            // Property limits hold.
            let too_many: Vec<(StackItem, StackItem)> = (0u8..9)
                .map(|i| {
                    (
                        StackItem::from(vec![i]),
                        StackItem::from(b"v".to_vec()),
                    )
                })
                .collect();
            let over = registry.call(
                engine,
                &tm,
                "mintNFT",
                &[
                    StackItem::from(&asset),
                    StackItem::from(&alice),
                    StackItem::Map(too_many),
                ],
            );
            assert!(matches!(over, Err(Error::InvalidArgument(_))));
            Ok(())
        })
        .unwrap();

    let state = TokenManagement::nft_state(chain.snapshot(), &unique_id)
        .unwrap()
        .unwrap();
    assert_eq!(state.asset_id, asset);
    assert_eq!(state.owner, alice);
    assert_eq!(
        state.properties,
        vec![(b"title".to_vec(), b"sunrise".to_vec())]
    );
    assert_eq!(
        TokenManagement::get_token(chain.snapshot(), &asset)
            .unwrap()
            .unwrap()
            .total_supply,
        BigInt::from(1)
    );

    let current_owner = chain
        .call(&[], &tm, "ownerOf", &[StackItem::from(&unique_id)])
        .unwrap();
    assert_eq!(current_owner, StackItem::from(&alice));

    let moved = chain
        .call(
            &[alice],
            &tm,
            "transferNFT",
            &[
                StackItem::from(&unique_id),
                StackItem::from(&bob),
                StackItem::Null,
            ],
        )
        .unwrap();
    assert_eq!(moved, StackItem::from(true));
    assert_eq!(
        TokenManagement::nft_state(chain.snapshot(), &unique_id)
            .unwrap()
            .unwrap()
            .owner,
        bob
    );

    chain
        .advance_with(Transaction::default(), |registry, engine| {
            engine.add_witness(owner);
            registry.call(engine, &tm, "burnNFT", &[StackItem::from(&unique_id)])?;
            Ok(())
        })
        .unwrap();
    assert!(TokenManagement::nft_state(chain.snapshot(), &unique_id)
        .unwrap()
        .is_none());
    assert_eq!(
        TokenManagement::get_token(chain.snapshot(), &asset)
            .unwrap()
            .unwrap()
            .total_supply,
        BigInt::from(0)
    );
}

#[test]
fn transfers_to_contracts_without_a_payment_hook_fault() {
    let mut chain = Chain::new(1, 1);
    let bft = chain.bft_address();

    // NEO declares no onNEP17Payment, so the payment cannot settle.
    let result = chain.call(
        &[bft],
        &GasToken::hash(),
        "transfer",
        &[
            StackItem::from(&bft),
            StackItem::from(&NeoToken::hash()),
            StackItem::from(1_0000_0000i64),
            StackItem::Null,
        ],
    );
    assert!(matches!(result, Err(Error::MethodNotFound { .. })));
}

#[test]
fn notary_deposits_lock_gas_until_expiry() {
    let mut chain = Chain::new(1, 1);
    let bft = chain.bft_address();
    let alice = signature_address(&test_key(7));
    let bob = signature_address(&test_key(8));
    let gas = GasToken::hash();
    let notary = Notary::hash();

    // Block 1: fund alice.
    chain
        .call(
            &[bft],
            &gas,
            "transfer",
            &[
                StackItem::from(&bft),
                StackItem::from(&alice),
                StackItem::from(10_0000_0000i64),
                StackItem::Null,
            ],
        )
        .unwrap();

    // Block 2: a GAS transfer to the notary opens the deposit.
    let paid = chain
        .call(
            &[alice],
            &gas,
            "transfer",
            &[
                StackItem::from(&alice),
                StackItem::from(&notary),
                StackItem::from(5_0000_0000i64),
                StackItem::Array(vec![StackItem::Null, StackItem::from(8u32)]),
            ],
        )
        .unwrap();
    assert_eq!(paid, StackItem::from(true));

    let deposit = Notary::deposit_of(chain.snapshot(), &alice).unwrap().unwrap();
    assert_eq!(deposit.amount, BigInt::from(5_0000_0000i64));
    assert_eq!(deposit.till, 8);
    assert_eq!(
        GasToken::balance_of(chain.snapshot(), &notary).unwrap(),
        BigInt::from(5_0000_0000i64)
    );

    // Block 3: the owner may push the lock out.
    let locked = chain
        .call(
            &[alice],
            &notary,
            "lockDepositUntil",
            &[StackItem::from(&alice), StackItem::from(10u32)],
        )
        .unwrap();
    assert_eq!(locked, StackItem::from(true));

    // Block 4: third parties may top up at the standing lock height.
    chain
        .call(
            &[bft],
            &gas,
            "transfer",
            &[
                StackItem::from(&bft),
                StackItem::from(&notary),
                StackItem::from(1_0000_0000i64),
                StackItem::Array(vec![StackItem::from(&alice), StackItem::from(10u32)]),
            ],
        )
        .unwrap();
    let deposit = Notary::deposit_of(chain.snapshot(), &alice).unwrap().unwrap();
    assert_eq!(deposit.amount, BigInt::from(6_0000_0000i64));
    assert_eq!(deposit.till, 10);

    // Block 5: but they may not move the lock.
    let hijack = chain.call(
        &[bft],
        &gas,
        "transfer",
        &[
            StackItem::from(&bft),
            StackItem::from(&notary),
            StackItem::from(1_0000_0000i64),
            StackItem::Array(vec![StackItem::from(&alice), StackItem::from(12u32)]),
        ],
    );
    assert!(matches!(hijack, Err(Error::InvalidOperation(_))));

    // Deposits only arrive through GAS.
    let direct = chain.call(
        &[alice],
        &notary,
        "onNEP17Payment",
        &[
            StackItem::from(&alice),
            StackItem::from(100i64),
            StackItem::Array(vec![StackItem::Null, StackItem::Null]),
        ],
    );
    assert!(matches!(direct, Err(Error::InvalidOperation(_))));

    // Block 7: withdrawing before the lock expires is refused.
    let early = chain
        .call(
            &[alice],
            &notary,
            "withdraw",
            &[StackItem::from(&alice), StackItem::from(&bob)],
        )
        .unwrap();
    assert_eq!(early, StackItem::from(false));

    // Block 10: the lock has expired; the deposit pays out to bob.
    chain.advance_blocks(2);
    let withdrawn = chain
        .call(
            &[alice],
            &notary,
            "withdraw",
            &[StackItem::from(&alice), StackItem::from(&bob)],
        )
        .unwrap();
    assert_eq!(withdrawn, StackItem::from(true));
    assert!(Notary::deposit_of(chain.snapshot(), &alice)
        .unwrap()
        .is_none());
    assert_eq!(
        GasToken::balance_of(chain.snapshot(), &bob).unwrap(),
        BigInt::from(6_0000_0000i64)
    );
    // The refused top-up still moved its GAS before the deposit callback
    // faulted, so one stray GAS remains on the contract.
    assert_eq!(
        GasToken::balance_of(chain.snapshot(), &notary).unwrap(),
        BigInt::from(1_0000_0000i64)
    );
}
