//! The TokenManagement contract: protocol-level multi-asset ledger.
//!
//! Contracts create fungible assets or NFT collections here instead of
//! keeping their own balance storage. The creating contract owns the
//! asset and is the only party allowed to mint and burn it.

use crate::application_engine::ApplicationEngine;
use crate::error::{Error, Result};
use crate::interop::interoperable::struct_fields;
use crate::interop::{Interoperable, StackItem};
use crate::native::governance_types::AccountState;
use crate::native::native_contract::{
    emit_event, EventDescriptor, MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::storage::SnapshotExt;
use crate::CallFlags;
use neo_core::{to_script_hash, UInt160};
use neo_persistence::{DataCache, KeyBuilder, StorageItem, StorageKey};
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use std::sync::OnceLock;

pub const ID: i32 = -12;

const PREFIX_NFT_STATE: u8 = 8;
const PREFIX_TOKEN_STATE: u8 = 10;
const PREFIX_ACCOUNT_STATE: u8 = 12;
const PREFIX_NFT_UNIQUE_ID_SEED: u8 = 15;
const PREFIX_NFT_OWNER_INDEX: u8 = 21;
const PREFIX_NFT_ASSET_INDEX: u8 = 23;

const MAX_NAME_LENGTH: usize = 32;
const MAX_SYMBOL_LENGTH: usize = 6;
const MIN_SYMBOL_LENGTH: usize = 2;
const MAX_DECIMALS: u32 = 18;
const MAX_PROPERTIES: usize = 8;
const MAX_PROPERTY_KEY_LENGTH: usize = 16;
const MAX_PROPERTY_VALUE_LENGTH: usize = 128;

/// Largest amount a single mint may create: 2^128.
fn max_mint_amount() -> BigInt {
    BigInt::one() << 128
}

/// Kind discriminator of a managed asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Fungible,
    NonFungible,
}

impl TokenKind {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(TokenKind::Fungible),
            1 => Ok(TokenKind::NonFungible),
            other => Err(Error::Encoding(format!("unknown token kind {other}"))),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TokenKind::Fungible => 0,
            TokenKind::NonFungible => 1,
        }
    }
}

/// The stored definition of a managed asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDefinition {
    pub kind: TokenKind,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// `-1` means unbounded.
    pub max_supply: BigInt,
    pub total_supply: BigInt,
    pub owner: UInt160,
}

impl Interoperable for TokenDefinition {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 7)?;
        Ok(Self {
            kind: TokenKind::from_u8(fields[0].as_u32()? as u8)?,
            name: fields[1].as_string()?,
            symbol: fields[2].as_string()?,
            decimals: fields[3].as_u32()? as u8,
            max_supply: fields[4].as_int()?,
            total_supply: fields[5].as_int()?,
            owner: fields[6].as_uint160()?,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Struct(vec![
            StackItem::from(self.kind.as_u8() as u32),
            StackItem::from(self.name.as_str()),
            StackItem::from(self.symbol.as_str()),
            StackItem::from(self.decimals as u32),
            StackItem::from(&self.max_supply),
            StackItem::from(&self.total_supply),
            StackItem::from(&self.owner),
        ])
    }
}

/// One minted NFT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftState {
    pub unique_id: UInt160,
    pub asset_id: UInt160,
    pub owner: UInt160,
    pub properties: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Interoperable for NftState {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 4)?;
        let StackItem::Map(entries) = &fields[3] else {
            return Err(Error::Encoding("NFT properties must be a map".into()));
        };
        let mut properties = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            properties.push((key.as_bytes()?, value.as_bytes()?));
        }
        Ok(Self {
            unique_id: fields[0].as_uint160()?,
            asset_id: fields[1].as_uint160()?,
            owner: fields[2].as_uint160()?,
            properties,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Struct(vec![
            StackItem::from(&self.unique_id),
            StackItem::from(&self.asset_id),
            StackItem::from(&self.owner),
            StackItem::Map(
                self.properties
                    .iter()
                    .map(|(key, value)| {
                        (
                            StackItem::ByteString(key.clone()),
                            StackItem::ByteString(value.clone()),
                        )
                    })
                    .collect(),
            ),
        ])
    }
}

fn meta() -> &'static NativeContractMeta {
    static META: OnceLock<NativeContractMeta> = OnceLock::new();
    META.get_or_init(|| {
        let methods = vec![
            MethodDescriptor::new(
                "create",
                &[
                    ("name", ParamType::String),
                    ("symbol", ParamType::String),
                    ("decimals", ParamType::Integer),
                    ("maxSupply", ParamType::Integer),
                ],
                ParamType::Hash160,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            )
            .with_storage_fee(200),
            MethodDescriptor::new(
                "createNFT",
                &[
                    ("name", ParamType::String),
                    ("symbol", ParamType::String),
                    ("maxSupply", ParamType::Integer),
                ],
                ParamType::Hash160,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            )
            .with_storage_fee(200),
            MethodDescriptor::new(
                "mint",
                &[
                    ("assetId", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                ],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "burn",
                &[
                    ("assetId", ParamType::Hash160),
                    ("from", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                ],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "transfer",
                &[
                    ("assetId", ParamType::Hash160),
                    ("from", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                    ("data", ParamType::Any),
                ],
                ParamType::Boolean,
                1 << 17,
                CallFlags::ALL,
            ),
            MethodDescriptor::new(
                "balanceOf",
                &[
                    ("assetId", ParamType::Hash160),
                    ("owner", ParamType::Hash160),
                ],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getTokenInfo",
                &[("assetId", ParamType::Hash160)],
                ParamType::Array,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "mintNFT",
                &[
                    ("assetId", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("properties", ParamType::Map),
                ],
                ParamType::Hash160,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            )
            .with_storage_fee(500),
            MethodDescriptor::new(
                "burnNFT",
                &[("uniqueId", ParamType::Hash160)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "transferNFT",
                &[
                    ("uniqueId", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("data", ParamType::Any),
                ],
                ParamType::Boolean,
                1 << 17,
                CallFlags::ALL,
            ),
            MethodDescriptor::new(
                "ownerOf",
                &[("uniqueId", ParamType::Hash160)],
                ParamType::Hash160,
                1 << 15,
                CallFlags::READ_STATES,
            ),
        ];
        let events = vec![
            EventDescriptor::new(
                "Created",
                &[
                    ("assetId", ParamType::Hash160),
                    ("owner", ParamType::Hash160),
                    ("name", ParamType::String),
                    ("symbol", ParamType::String),
                ],
            ),
            EventDescriptor::new(
                "Transfer",
                &[
                    ("assetId", ParamType::Hash160),
                    ("from", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                ],
            ),
            EventDescriptor::new(
                "NFTTransfer",
                &[
                    ("assetId", ParamType::Hash160),
                    ("uniqueId", ParamType::Hash160),
                    ("from", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                ],
            ),
        ];
        NativeContractMeta::new("TokenManagement", ID, methods, events)
    })
}

pub struct TokenManagement;

impl Default for TokenManagement {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenManagement {
    pub fn new() -> Self {
        Self
    }

    pub fn hash() -> UInt160 {
        meta().hash
    }

    pub fn get_token(snapshot: &DataCache, asset_id: &UInt160) -> Result<Option<TokenDefinition>> {
        snapshot.get_interoperable(&token_key(asset_id))
    }

    pub fn balance_of(
        snapshot: &DataCache,
        asset_id: &UInt160,
        owner: &UInt160,
    ) -> Result<BigInt> {
        Ok(snapshot
            .get_interoperable::<AccountState>(&balance_key(asset_id, owner))?
            .map(|state| state.balance)
            .unwrap_or_default())
    }

    pub fn nft_state(snapshot: &DataCache, unique_id: &UInt160) -> Result<Option<NftState>> {
        snapshot.get_interoperable(&nft_key(unique_id))
    }

    // --- asset creation ---

    fn create(
        &self,
        engine: &mut ApplicationEngine,
        kind: TokenKind,
        name: &str,
        symbol: &str,
        decimals: u32,
        max_supply: &BigInt,
    ) -> Result<StackItem> {
        if name.is_empty() || name.len() > MAX_NAME_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "asset name must be 1..={MAX_NAME_LENGTH} bytes"
            )));
        }
        if symbol.len() < MIN_SYMBOL_LENGTH || symbol.len() > MAX_SYMBOL_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "asset symbol must be {MIN_SYMBOL_LENGTH}..={MAX_SYMBOL_LENGTH} bytes"
            )));
        }
        if decimals > MAX_DECIMALS {
            return Err(Error::InvalidArgument(format!(
                "decimals must be at most {MAX_DECIMALS}"
            )));
        }
        if max_supply < &BigInt::from(-1) || max_supply.is_zero() {
            return Err(Error::InvalidArgument(
                "maxSupply must be positive or -1 for unbounded".into(),
            ));
        }
        let owner = engine.calling_script_hash().ok_or_else(|| {
            Error::InvalidOperation("assets must be created by a contract".into())
        })?;
        // Asset ids are deterministic per (owner, name).
        let mut seed = Vec::with_capacity(UInt160::LEN + name.len());
        seed.extend_from_slice(owner.as_bytes());
        seed.extend_from_slice(name.as_bytes());
        let asset_id = to_script_hash(&seed);
        if engine.snapshot().contains(&token_key(&asset_id)) {
            return Err(Error::InvalidOperation(format!(
                "asset {asset_id} already exists"
            )));
        }
        let token = TokenDefinition {
            kind,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: decimals as u8,
            max_supply: max_supply.clone(),
            total_supply: BigInt::zero(),
            owner,
        };
        engine
            .snapshot_mut()
            .set_interoperable(token_key(&asset_id), &token)?;
        emit_event(
            engine,
            meta(),
            "Created",
            vec![
                StackItem::from(&asset_id),
                StackItem::from(&owner),
                StackItem::from(name),
                StackItem::from(symbol),
            ],
        )?;
        Ok(StackItem::from(&asset_id))
    }

    // --- fungible operations ---

    /// Loads the token and checks that the caller is its owner.
    fn owned_token(
        engine: &ApplicationEngine,
        asset_id: &UInt160,
        kind: TokenKind,
    ) -> Result<TokenDefinition> {
        let token = Self::get_token(engine.snapshot(), asset_id)?
            .ok_or_else(|| Error::InvalidArgument(format!("unknown asset {asset_id}")))?;
        if token.kind != kind {
            return Err(Error::InvalidOperation(format!(
                "asset {asset_id} is the wrong kind for this operation"
            )));
        }
        if engine.calling_script_hash() != Some(token.owner)
            && !engine.check_witness(&token.owner)
        {
            return Err(Error::InvalidOperation(
                "only the asset owner may do this".into(),
            ));
        }
        Ok(token)
    }

    /// Grows the supply, enforcing the cap.
    fn add_total_supply(
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        mut token: TokenDefinition,
        amount: &BigInt,
    ) -> Result<()> {
        token.total_supply += amount;
        if token.total_supply.is_negative() {
            return Err(Error::InvariantViolation(format!(
                "asset {asset_id} supply went negative"
            )));
        }
        if token.max_supply >= BigInt::zero() && token.total_supply > token.max_supply {
            return Err(Error::InvalidOperation(format!(
                "asset {asset_id} supply cap {} exceeded",
                token.max_supply
            )));
        }
        engine
            .snapshot_mut()
            .set_interoperable(token_key(asset_id), &token)
    }

    /// Applies `delta` to a balance record, deleting it at zero.
    fn add_balance(
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        owner: &UInt160,
        delta: &BigInt,
    ) -> Result<()> {
        let key = balance_key(asset_id, owner);
        let mut state = engine
            .snapshot()
            .get_interoperable::<AccountState>(&key)?
            .unwrap_or_default();
        state.balance += delta;
        if state.balance.is_negative() {
            return Err(Error::InvalidOperation(format!(
                "insufficient balance of {asset_id} on {owner}"
            )));
        }
        if state.balance.is_zero() {
            engine.snapshot_mut().delete(&key);
        } else {
            engine.snapshot_mut().set_interoperable(key, &state)?;
        }
        Ok(())
    }

    fn mint(
        &self,
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        to: &UInt160,
        amount: &BigInt,
    ) -> Result<()> {
        if !amount.is_positive() || amount > &max_mint_amount() {
            return Err(Error::InvalidArgument(format!(
                "mint amount {amount} out of range"
            )));
        }
        let token = Self::owned_token(engine, asset_id, TokenKind::Fungible)?;
        Self::add_total_supply(engine, asset_id, token, amount)?;
        Self::add_balance(engine, asset_id, to, amount)?;
        self.post_transfer(engine, asset_id, None, Some(to), amount)
    }

    fn burn(
        &self,
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        from: &UInt160,
        amount: &BigInt,
    ) -> Result<()> {
        if !amount.is_positive() {
            return Err(Error::InvalidArgument(format!(
                "burn amount {amount} out of range"
            )));
        }
        let token = Self::owned_token(engine, asset_id, TokenKind::Fungible)?;
        Self::add_balance(engine, asset_id, from, &-amount.clone())?;
        Self::add_total_supply(engine, asset_id, token, &-amount.clone())?;
        self.post_transfer(engine, asset_id, Some(from), None, amount)
    }

    fn transfer(
        &self,
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        from: &UInt160,
        to: &UInt160,
        amount: &BigInt,
        data: StackItem,
    ) -> Result<bool> {
        if amount.is_negative() {
            return Err(Error::InvalidArgument(
                "transfer amount must not be negative".into(),
            ));
        }
        let token = Self::get_token(engine.snapshot(), asset_id)?
            .ok_or_else(|| Error::InvalidArgument(format!("unknown asset {asset_id}")))?;
        if token.kind != TokenKind::Fungible {
            return Err(Error::InvalidOperation(
                "transfer applies to fungible assets only".into(),
            ));
        }
        if engine.calling_script_hash() != Some(*from) && !engine.check_witness(from) {
            return Ok(false);
        }
        if amount.is_positive() && from != to {
            let balance = Self::balance_of(engine.snapshot(), asset_id, from)?;
            if balance < *amount {
                return Ok(false);
            }
            Self::add_balance(engine, asset_id, from, &-amount.clone())?;
            Self::add_balance(engine, asset_id, to, amount)?;
        }
        self.post_transfer(engine, asset_id, Some(from), Some(to), amount)?;
        // The owning contract observes transfers of its asset.
        engine.call_from_native(
            meta().hash,
            token.owner,
            "onTokenTransfer",
            vec![
                StackItem::from(asset_id),
                StackItem::from(from),
                StackItem::from(to),
                StackItem::from(amount),
                data,
            ],
        );
        Ok(true)
    }

    fn post_transfer(
        &self,
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        from: Option<&UInt160>,
        to: Option<&UInt160>,
        amount: &BigInt,
    ) -> Result<()> {
        emit_event(
            engine,
            meta(),
            "Transfer",
            vec![
                StackItem::from(asset_id),
                from.map(StackItem::from).unwrap_or(StackItem::Null),
                to.map(StackItem::from).unwrap_or(StackItem::Null),
                StackItem::from(amount),
            ],
        )
    }

    // --- NFT operations ---

    fn mint_nft(
        &self,
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        to: &UInt160,
        properties: &StackItem,
    ) -> Result<StackItem> {
        let StackItem::Map(entries) = properties else {
            return Err(Error::InvalidArgument("properties must be a map".into()));
        };
        if entries.len() > MAX_PROPERTIES {
            return Err(Error::InvalidArgument(format!(
                "at most {MAX_PROPERTIES} properties are allowed"
            )));
        }
        let mut decoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key = key.as_bytes()?;
            let value = value.as_bytes()?;
            if key.is_empty() || key.len() > MAX_PROPERTY_KEY_LENGTH {
                return Err(Error::InvalidArgument(format!(
                    "property keys must be 1..={MAX_PROPERTY_KEY_LENGTH} bytes"
                )));
            }
            if value.is_empty() || value.len() > MAX_PROPERTY_VALUE_LENGTH {
                return Err(Error::InvalidArgument(format!(
                    "property values must be 1..={MAX_PROPERTY_VALUE_LENGTH} bytes"
                )));
            }
            decoded.push((key, value));
        }
        let token = Self::owned_token(engine, asset_id, TokenKind::NonFungible)?;
        let block_hash = engine
            .persisting_block()
            .map(|block| block.hash())
            .ok_or_else(|| Error::InvalidOperation("NFT minting requires a block".into()))?;
        let seed = Self::next_unique_id_seed(engine.snapshot_mut())?;
        let mut id_input = Vec::with_capacity(40);
        id_input.extend_from_slice(block_hash.as_bytes());
        id_input.extend_from_slice(&seed.to_le_bytes());
        let unique_id = to_script_hash(&id_input);

        let state = NftState {
            unique_id,
            asset_id: *asset_id,
            owner: *to,
            properties: decoded,
        };
        Self::add_total_supply(engine, asset_id, token, &BigInt::one())?;
        Self::add_balance(engine, asset_id, to, &BigInt::one())?;
        let snapshot = engine.snapshot_mut();
        snapshot.set_interoperable(nft_key(&unique_id), &state)?;
        snapshot.put(owner_index_key(to, &unique_id), StorageItem::default());
        snapshot.put(asset_index_key(asset_id, &unique_id), StorageItem::default());
        self.post_nft_transfer(engine, asset_id, &unique_id, None, Some(to))?;
        Ok(StackItem::from(&unique_id))
    }

    fn burn_nft(&self, engine: &mut ApplicationEngine, unique_id: &UInt160) -> Result<()> {
        let state = Self::nft_state(engine.snapshot(), unique_id)?
            .ok_or_else(|| Error::InvalidArgument(format!("unknown NFT {unique_id}")))?;
        let token = Self::owned_token(engine, &state.asset_id, TokenKind::NonFungible)?;
        Self::add_balance(engine, &state.asset_id, &state.owner, &-BigInt::one())?;
        Self::add_total_supply(engine, &state.asset_id, token, &-BigInt::one())?;
        let snapshot = engine.snapshot_mut();
        snapshot.delete(&nft_key(unique_id));
        snapshot.delete(&owner_index_key(&state.owner, unique_id));
        snapshot.delete(&asset_index_key(&state.asset_id, unique_id));
        self.post_nft_transfer(engine, &state.asset_id, unique_id, Some(&state.owner), None)
    }

    fn transfer_nft(
        &self,
        engine: &mut ApplicationEngine,
        unique_id: &UInt160,
        to: &UInt160,
        data: StackItem,
    ) -> Result<bool> {
        let mut state = Self::nft_state(engine.snapshot(), unique_id)?
            .ok_or_else(|| Error::InvalidArgument(format!("unknown NFT {unique_id}")))?;
        let from = state.owner;
        if engine.calling_script_hash() != Some(from) && !engine.check_witness(&from) {
            return Ok(false);
        }
        let token = Self::get_token(engine.snapshot(), &state.asset_id)?.ok_or_else(|| {
            Error::InvariantViolation(format!("NFT {unique_id} references a missing asset"))
        })?;
        if from != *to {
            Self::add_balance(engine, &state.asset_id, &from, &-BigInt::one())?;
            Self::add_balance(engine, &state.asset_id, to, &BigInt::one())?;
            state.owner = *to;
            let snapshot = engine.snapshot_mut();
            snapshot.set_interoperable(nft_key(unique_id), &state)?;
            snapshot.delete(&owner_index_key(&from, unique_id));
            snapshot.put(owner_index_key(to, unique_id), StorageItem::default());
        }
        self.post_nft_transfer(engine, &state.asset_id, unique_id, Some(&from), Some(to))?;
        engine.call_from_native(
            meta().hash,
            token.owner,
            "onNFTTransfer",
            vec![
                StackItem::from(&state.asset_id),
                StackItem::from(unique_id),
                StackItem::from(&from),
                StackItem::from(to),
                data,
            ],
        );
        Ok(true)
    }

    fn post_nft_transfer(
        &self,
        engine: &mut ApplicationEngine,
        asset_id: &UInt160,
        unique_id: &UInt160,
        from: Option<&UInt160>,
        to: Option<&UInt160>,
    ) -> Result<()> {
        emit_event(
            engine,
            meta(),
            "NFTTransfer",
            vec![
                StackItem::from(asset_id),
                StackItem::from(unique_id),
                from.map(StackItem::from).unwrap_or(StackItem::Null),
                to.map(StackItem::from).unwrap_or(StackItem::Null),
            ],
        )
    }

    fn next_unique_id_seed(snapshot: &mut DataCache) -> Result<u64> {
        let key = KeyBuilder::new(ID, PREFIX_NFT_UNIQUE_ID_SEED).to_key();
        let item = snapshot
            .get_and_change(&key, Some(StorageItem::from_i64(0)))
            .ok_or_else(|| Error::InvariantViolation("unique id seed unavailable".into()))?;
        let seed = u64::try_from(item.to_bigint())
            .map_err(|_| Error::InvariantViolation("unique id seed overflowed".into()))?;
        item.add_assign(&BigInt::one());
        Ok(seed)
    }
}

impl NativeContract for TokenManagement {
    fn meta(&self) -> &NativeContractMeta {
        meta()
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem> {
        match method {
            "create" => self.create(
                engine,
                TokenKind::Fungible,
                &args[0].as_string()?,
                &args[1].as_string()?,
                args[2].as_u32()?,
                &args[3].as_int()?,
            ),
            "createNFT" => self.create(
                engine,
                TokenKind::NonFungible,
                &args[0].as_string()?,
                &args[1].as_string()?,
                0,
                &args[2].as_int()?,
            ),
            "mint" => {
                self.mint(
                    engine,
                    &args[0].as_uint160()?,
                    &args[1].as_uint160()?,
                    &args[2].as_int()?,
                )?;
                Ok(StackItem::Null)
            }
            "burn" => {
                self.burn(
                    engine,
                    &args[0].as_uint160()?,
                    &args[1].as_uint160()?,
                    &args[2].as_int()?,
                )?;
                Ok(StackItem::Null)
            }
            "transfer" => Ok(StackItem::from(self.transfer(
                engine,
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
                &args[2].as_uint160()?,
                &args[3].as_int()?,
                args[4].clone(),
            )?)),
            "balanceOf" => Ok(StackItem::from(&Self::balance_of(
                engine.snapshot(),
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
            )?)),
            "getTokenInfo" => Ok(
                match Self::get_token(engine.snapshot(), &args[0].as_uint160()?)? {
                    Some(token) => token.to_stack_item(),
                    None => StackItem::Null,
                },
            ),
            "mintNFT" => self.mint_nft(
                engine,
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
                &args[2],
            ),
            "burnNFT" => {
                self.burn_nft(engine, &args[0].as_uint160()?)?;
                Ok(StackItem::Null)
            }
            "transferNFT" => Ok(StackItem::from(self.transfer_nft(
                engine,
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
                args[2].clone(),
            )?)),
            "ownerOf" => Ok(
                match Self::nft_state(engine.snapshot(), &args[0].as_uint160()?)? {
                    Some(state) => StackItem::from(&state.owner),
                    None => StackItem::Null,
                },
            ),
            _ => Err(Error::MethodNotFound {
                contract: meta().name.to_string(),
                method: method.to_string(),
                argc: args.len(),
            }),
        }
    }
}

fn token_key(asset_id: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_TOKEN_STATE).add_uint160(asset_id).to_key()
}

fn balance_key(asset_id: &UInt160, owner: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_ACCOUNT_STATE)
        .add_uint160(asset_id)
        .add_uint160(owner)
        .to_key()
}

fn nft_key(unique_id: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_NFT_STATE).add_uint160(unique_id).to_key()
}

fn owner_index_key(owner: &UInt160, unique_id: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_NFT_OWNER_INDEX)
        .add_uint160(owner)
        .add_uint160(unique_id)
        .to_key()
}

fn asset_index_key(asset_id: &UInt160, unique_id: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_NFT_ASSET_INDEX)
        .add_uint160(asset_id)
        .add_uint160(unique_id)
        .to_key()
}
