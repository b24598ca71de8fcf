//! The NEO token: the governance asset.
//!
//! NEO is indivisible and fixed-supply. Holding it accrues GAS at the
//! configured per-block emission rate; voting it onto a committee
//! candidate additionally accrues a share of the voter reward. Accrual
//! is lazy: rewards are settled whenever a balance or vote changes, so
//! block persistence stays O(committee), not O(accounts).

use crate::application_engine::{ApplicationEngine, GasDistribution};
use crate::error::{Error, Result};
use crate::interop::{Interoperable, StackItem};
use crate::native::fungible_token;
use crate::native::gas_token::{self, GasToken};
use crate::native::governance_types::{CachedCommittee, CandidateState, NeoAccountState};
use crate::native::ledger_contract::LedgerContract;
use crate::native::native_contract::{
    emit_event, EventDescriptor, MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::native::policy_contract::PolicyContract;
use crate::storage::SnapshotExt;
use crate::CallFlags;
use neo_config::{Hardfork, ProtocolSettings};
use neo_core::{
    create_multisig_redeem_script, create_signature_redeem_script, get_bft_address,
    to_script_hash, ECPoint, UInt160,
};
use neo_persistence::{DataCache, KeyBuilder, SeekDirection, StorageItem, StorageKey};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::sync::OnceLock;

pub const ID: i32 = -5;
pub const SYMBOL: &str = "NEO";
pub const DECIMALS: u8 = 0;
/// Fixed total supply, minted once at genesis.
pub const TOTAL_AMOUNT: i64 = 100_000_000;

const PREFIX_VOTERS_COUNT: u8 = 1;
const PREFIX_REGISTER_PRICE: u8 = 13;
const PREFIX_COMMITTEE: u8 = 14;
const PREFIX_VOTER_REWARD_PER_COMMITTEE: u8 = 23;
const PREFIX_GAS_PER_BLOCK: u8 = 29;
const PREFIX_CANDIDATE: u8 = 33;

const NEO_HOLDER_REWARD_RATIO: i64 = 10;
const COMMITTEE_REWARD_RATIO: i64 = 10;
const VOTER_REWARD_RATIO: i64 = 80;

/// Fixed-point scale of the per-vote reward accumulators.
const ACCUMULATOR_SCALE: i64 = 100_000_000;

const DEFAULT_GAS_PER_BLOCK: i64 = 5 * gas_token::FACTOR;
const MAX_GAS_PER_BLOCK: i64 = 10 * gas_token::FACTOR;
const DEFAULT_REGISTER_PRICE: i64 = 1000 * gas_token::FACTOR;

fn meta() -> &'static NativeContractMeta {
    static META: OnceLock<NativeContractMeta> = OnceLock::new();
    META.get_or_init(|| {
        let methods = vec![
            MethodDescriptor::new("symbol", &[], ParamType::String, 0, CallFlags::empty()),
            MethodDescriptor::new("decimals", &[], ParamType::Integer, 0, CallFlags::empty()),
            MethodDescriptor::new(
                "totalSupply",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "balanceOf",
                &[("account", ParamType::Hash160)],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "transfer",
                &[
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
                "unclaimedGas",
                &[("account", ParamType::Hash160), ("end", ParamType::Integer)],
                ParamType::Integer,
                1 << 17,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "registerCandidate",
                &[("pubkey", ParamType::PublicKey)],
                ParamType::Boolean,
                0,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "unregisterCandidate",
                &[("pubkey", ParamType::PublicKey)],
                ParamType::Boolean,
                1 << 16,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "vote",
                &[("account", ParamType::Hash160), ("voteTo", ParamType::Any)],
                ParamType::Boolean,
                1 << 16,
                CallFlags::ALL,
            ),
            MethodDescriptor::new(
                "getCandidates",
                &[],
                ParamType::Array,
                1 << 22,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getCommittee",
                &[],
                ParamType::Array,
                1 << 16,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getNextBlockValidators",
                &[],
                ParamType::Array,
                1 << 16,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getGasPerBlock",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setGasPerBlock",
                &[("gasPerBlock", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "getRegisterPrice",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setRegisterPrice",
                &[("registerPrice", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "getAccountState",
                &[("account", ParamType::Hash160)],
                ParamType::Array,
                1 << 15,
                CallFlags::READ_STATES,
            ),
        ];
        let events = vec![
            EventDescriptor::new(
                "Transfer",
                &[
                    ("from", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                ],
            ),
            EventDescriptor::new(
                "Vote",
                &[
                    ("account", ParamType::Hash160),
                    ("from", ParamType::PublicKey),
                    ("to", ParamType::PublicKey),
                    ("amount", ParamType::Integer),
                ],
            ),
            EventDescriptor::new(
                "CandidateStateChanged",
                &[
                    ("pubkey", ParamType::PublicKey),
                    ("registered", ParamType::Boolean),
                    ("votes", ParamType::Integer),
                ],
            ),
            EventDescriptor::new(
                "CommitteeChanged",
                &[("old", ParamType::Array), ("new", ParamType::Array)],
            ),
        ];
        NativeContractMeta::new("NeoToken", ID, methods, events).with_standards(&["NEP-17"])
    })
}

pub struct NeoToken;

impl Default for NeoToken {
    fn default() -> Self {
        Self::new()
    }
}

impl NeoToken {
    pub fn new() -> Self {
        Self
    }

    pub fn hash() -> UInt160 {
        meta().hash
    }

    pub fn total_supply(snapshot: &DataCache) -> BigInt {
        fungible_token::total_supply(snapshot, ID)
    }

    pub fn balance_of(snapshot: &DataCache, account: &UInt160) -> Result<BigInt> {
        fungible_token::balance_of::<NeoAccountState>(snapshot, ID, account)
    }

    pub fn account_state(
        snapshot: &DataCache,
        account: &UInt160,
    ) -> Result<Option<NeoAccountState>> {
        snapshot.get_interoperable(&fungible_token::account_key(ID, account))
    }

    // --- emission rate history ---

    /// Effective emission rate at block `index`: the most recent history
    /// record at or below it.
    pub fn gas_per_block(snapshot: &DataCache, index: u32) -> Result<BigInt> {
        Ok(Self::gas_records_desc(snapshot, index)
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvariantViolation("emission rate history is empty".into()))?
            .1)
    }

    /// Rate-history records with effective height at most `end`, newest
    /// first.
    fn gas_records_desc(snapshot: &DataCache, end: u32) -> Vec<(u32, BigInt)> {
        let start = KeyBuilder::new(ID, PREFIX_GAS_PER_BLOCK)
            .add_u32_be(end)
            .to_prefix();
        let bound = StorageKey::prefix(ID, PREFIX_GAS_PER_BLOCK);
        snapshot
            .find_range(&start, &bound, SeekDirection::Backward)
            .into_iter()
            .filter_map(|(key, item)| {
                let suffix = &key.suffix[1..];
                let mut be = [0u8; 4];
                if suffix.len() != 4 {
                    return None;
                }
                be.copy_from_slice(suffix);
                Some((u32::from_be_bytes(be), item.to_bigint()))
            })
            .collect()
    }

    fn set_gas_per_block(&self, engine: &mut ApplicationEngine, value: i64) -> Result<()> {
        if !(0..=MAX_GAS_PER_BLOCK).contains(&value) {
            return Err(Error::InvalidArgument(format!(
                "gasPerBlock {value} out of [0, {MAX_GAS_PER_BLOCK}]"
            )));
        }
        self.check_committee(engine)?;
        // Effective from the next block; the current one pays the old
        // rate.
        let index = engine.persisting_index() + 1;
        engine.snapshot_mut().put(
            KeyBuilder::new(ID, PREFIX_GAS_PER_BLOCK)
                .add_u32_be(index)
                .to_key(),
            StorageItem::from_i64(value),
        );
        Ok(())
    }

    pub fn register_price(snapshot: &DataCache) -> i64 {
        snapshot
            .try_get(&KeyBuilder::new(ID, PREFIX_REGISTER_PRICE).to_key())
            .map(|item| item.to_bigint())
            .and_then(|value| i64::try_from(value).ok())
            .unwrap_or(DEFAULT_REGISTER_PRICE)
    }

    fn set_register_price(&self, engine: &mut ApplicationEngine, value: i64) -> Result<()> {
        if value <= 0 {
            return Err(Error::InvalidArgument(
                "registerPrice must be positive".into(),
            ));
        }
        self.check_committee(engine)?;
        engine.snapshot_mut().put(
            KeyBuilder::new(ID, PREFIX_REGISTER_PRICE).to_key(),
            StorageItem::from_i64(value),
        );
        Ok(())
    }

    // --- reward settlement ---

    /// GAS accrued by `account` up to height `end`, which must be one
    /// past the stored chain tip.
    pub fn unclaimed_gas(
        snapshot: &DataCache,
        settings: &ProtocolSettings,
        account: &UInt160,
        end: u32,
    ) -> Result<BigInt> {
        let expected = LedgerContract::current_index(snapshot)
            .map(|index| index + 1)
            .unwrap_or(0);
        if end != expected {
            return Err(Error::InvalidArgument(format!(
                "unclaimed gas must be queried at height {expected}, got {end}"
            )));
        }
        match Self::account_state(snapshot, account)? {
            Some(state) => Self::calculate_bonus(snapshot, settings, &state, end),
            None => Ok(BigInt::zero()),
        }
    }

    fn calculate_bonus(
        snapshot: &DataCache,
        settings: &ProtocolSettings,
        state: &NeoAccountState,
        end: u32,
    ) -> Result<BigInt> {
        if state.balance.is_zero() {
            return Ok(BigInt::zero());
        }
        if state.balance.is_negative() {
            return Err(Error::InvariantViolation(format!(
                "negative NEO balance {}",
                state.balance
            )));
        }
        if state.balance_height >= end {
            return Ok(BigInt::zero());
        }
        let mut reward = Self::holder_reward(
            snapshot,
            settings,
            &state.balance,
            state.balance_height,
            end,
        )?;
        if let Some(vote_to) = &state.vote_to {
            let latest = Self::voter_reward_accumulator(snapshot, vote_to);
            reward += (latest - &state.last_gas_per_vote) * &state.balance / ACCUMULATOR_SCALE;
        }
        Ok(reward)
    }

    /// Emission reward for holding `balance` over blocks
    /// `[start, end)`, weighting each rate segment by the wall-clock
    /// time the chain spent in it.
    fn holder_reward(
        snapshot: &DataCache,
        settings: &ProtocolSettings,
        balance: &BigInt,
        start: u32,
        end: u32,
    ) -> Result<BigInt> {
        // Units: GAS fractions x milliseconds.
        let mut sum = BigInt::zero();
        let mut cur_end = end;
        for (record_index, rate) in Self::gas_records_desc(snapshot, end - 1) {
            let seg_lo = record_index.max(start);
            if cur_end > seg_lo {
                let elapsed = Self::elapsed_ms(snapshot, settings, seg_lo, cur_end)?;
                sum += rate * elapsed;
            }
            if record_index <= start {
                break;
            }
            cur_end = record_index;
        }
        let ms_per_block = BigInt::from(settings.milliseconds_per_block);
        Ok(balance * sum * NEO_HOLDER_REWARD_RATIO / 100 / TOTAL_AMOUNT / ms_per_block)
    }

    /// Wall-clock milliseconds the chain spent producing blocks
    /// `[lo, hi)`. The genesis block is credited one nominal interval.
    fn elapsed_ms(
        snapshot: &DataCache,
        settings: &ProtocolSettings,
        lo: u32,
        hi: u32,
    ) -> Result<BigInt> {
        let end_ts = Self::timestamp(snapshot, hi - 1)?;
        if lo == 0 {
            let genesis_ts = Self::timestamp(snapshot, 0)?;
            Ok(BigInt::from(end_ts) - BigInt::from(genesis_ts)
                + BigInt::from(settings.milliseconds_per_block))
        } else {
            let start_ts = Self::timestamp(snapshot, lo - 1)?;
            Ok(BigInt::from(end_ts) - BigInt::from(start_ts))
        }
    }

    fn timestamp(snapshot: &DataCache, index: u32) -> Result<u64> {
        LedgerContract::timestamp_of(snapshot, index)?.ok_or(Error::MissingHeader(index))
    }

    fn voter_reward_accumulator(snapshot: &DataCache, candidate: &ECPoint) -> BigInt {
        snapshot
            .try_get(&voter_reward_key(candidate))
            .map(|item| item.to_bigint())
            .unwrap_or_default()
    }

    /// Settles `account` up to the persisting block: computes the
    /// pending reward, advances the checkpoint, and queues the payout.
    fn distribute_gas(
        engine: &mut ApplicationEngine,
        account: &UInt160,
        state: &mut NeoAccountState,
    ) -> Result<()> {
        let Some(block) = engine.persisting_block() else {
            return Ok(());
        };
        let end = block.index();
        let settings = engine.settings_arc();
        let amount = Self::calculate_bonus(engine.snapshot(), &settings, state, end)?;
        state.balance_height = end;
        if let Some(vote_to) = state.vote_to {
            state.last_gas_per_vote =
                Self::voter_reward_accumulator(engine.snapshot(), &vote_to);
        }
        if amount.is_positive() {
            engine.push_distribution(GasDistribution {
                account: *account,
                amount,
            });
        }
        Ok(())
    }

    /// Balance-change hook: settle first, then move the vote weight.
    fn on_balance_changing(
        engine: &mut ApplicationEngine,
        account: &UInt160,
        state: &mut NeoAccountState,
        delta: &BigInt,
    ) -> Result<()> {
        Self::distribute_gas(engine, account, state)?;
        if delta.is_zero() {
            return Ok(());
        }
        let Some(vote_to) = state.vote_to else {
            return Ok(());
        };
        adjust_voters_count(engine.snapshot_mut(), delta);
        let key = candidate_key(&vote_to);
        let mut candidate = engine
            .snapshot()
            .get_interoperable::<CandidateState>(&key)?
            .ok_or_else(|| Error::InvariantViolation("vote target has no candidate record".into()))?;
        candidate.votes += delta;
        check_candidate(engine.snapshot_mut(), &vote_to, candidate)?;
        Ok(())
    }

    /// Pays out every settlement queued during the current operation.
    fn flush_distributions(engine: &mut ApplicationEngine) -> Result<()> {
        for distribution in engine.take_distributions() {
            GasToken::mint(engine, &distribution.account, &distribution.amount, true)?;
        }
        Ok(())
    }

    pub fn transfer(
        engine: &mut ApplicationEngine,
        from: &UInt160,
        to: &UInt160,
        amount: &BigInt,
        data: StackItem,
    ) -> Result<bool> {
        let moved = fungible_token::transfer::<NeoAccountState>(
            engine,
            meta(),
            from,
            to,
            amount,
            data,
            Some(Self::on_balance_changing),
        )?;
        Self::flush_distributions(engine)?;
        Ok(moved)
    }

    // --- candidates and voting ---

    fn register_candidate(
        &self,
        engine: &mut ApplicationEngine,
        pubkey: &ECPoint,
    ) -> Result<bool> {
        let account = to_script_hash(&create_signature_redeem_script(pubkey));
        if !engine.check_witness(&account) {
            return Ok(false);
        }
        engine.add_fee(Self::register_price(engine.snapshot()))?;
        let key = candidate_key(pubkey);
        let mut candidate = engine
            .snapshot()
            .get_interoperable::<CandidateState>(&key)?
            .unwrap_or_default();
        candidate.registered = true;
        let votes = candidate.votes.clone();
        engine.snapshot_mut().set_interoperable(key, &candidate)?;
        emit_event(
            engine,
            meta(),
            "CandidateStateChanged",
            vec![
                StackItem::from(pubkey),
                StackItem::from(true),
                StackItem::from(&votes),
            ],
        )?;
        Ok(true)
    }

    fn unregister_candidate(
        &self,
        engine: &mut ApplicationEngine,
        pubkey: &ECPoint,
    ) -> Result<bool> {
        let account = to_script_hash(&create_signature_redeem_script(pubkey));
        if !engine.check_witness(&account) {
            return Ok(false);
        }
        let key = candidate_key(pubkey);
        let Some(mut candidate) = engine
            .snapshot()
            .get_interoperable::<CandidateState>(&key)?
        else {
            return Ok(true);
        };
        candidate.registered = false;
        let votes = candidate.votes.clone();
        check_candidate(engine.snapshot_mut(), pubkey, candidate)?;
        emit_event(
            engine,
            meta(),
            "CandidateStateChanged",
            vec![
                StackItem::from(pubkey),
                StackItem::from(false),
                StackItem::from(&votes),
            ],
        )?;
        Ok(true)
    }

    fn vote(
        &self,
        engine: &mut ApplicationEngine,
        account: &UInt160,
        vote_to: Option<ECPoint>,
    ) -> Result<bool> {
        if !engine.check_witness(account) {
            return Ok(false);
        }
        let account_key = fungible_token::account_key(ID, account);
        let Some(mut state) = engine
            .snapshot()
            .get_interoperable::<NeoAccountState>(&account_key)?
        else {
            return Ok(false);
        };
        // The new target must be a registered candidate.
        if let Some(target) = &vote_to {
            match engine
                .snapshot()
                .get_interoperable::<CandidateState>(&candidate_key(target))?
            {
                Some(candidate) if candidate.registered => {}
                _ => return Ok(false),
            }
        }
        // Turnout tracks the NEO held by voting accounts.
        if state.vote_to.is_none() != vote_to.is_none() {
            let delta = if state.vote_to.is_none() {
                state.balance.clone()
            } else {
                -state.balance.clone()
            };
            adjust_voters_count(engine.snapshot_mut(), &delta);
        }
        // Settle against the old target before the weight moves.
        Self::distribute_gas(engine, account, &mut state)?;
        if let Some(old) = state.vote_to {
            let key = candidate_key(&old);
            let mut candidate = engine
                .snapshot()
                .get_interoperable::<CandidateState>(&key)?
                .ok_or_else(|| {
                    Error::InvariantViolation("vote target has no candidate record".into())
                })?;
            candidate.votes -= &state.balance;
            check_candidate(engine.snapshot_mut(), &old, candidate)?;
        }
        if let Some(target) = &vote_to {
            if state.vote_to.as_ref() != Some(target) {
                // Accrual under the new target starts from its current
                // accumulator.
                state.last_gas_per_vote =
                    Self::voter_reward_accumulator(engine.snapshot(), target);
            }
        }
        let previous = state.vote_to;
        state.vote_to = vote_to;
        if let Some(target) = &vote_to {
            // Re-read the record: when the old and new target are the
            // same candidate, the subtraction above already changed it.
            let key = candidate_key(target);
            let mut candidate = engine
                .snapshot()
                .get_interoperable::<CandidateState>(&key)?
                .ok_or_else(|| {
                    Error::InvariantViolation("vote target has no candidate record".into())
                })?;
            candidate.votes += &state.balance;
            engine.snapshot_mut().set_interoperable(key, &candidate)?;
        } else {
            state.last_gas_per_vote = BigInt::zero();
        }
        let balance = state.balance.clone();
        engine.snapshot_mut().set_interoperable(account_key, &state)?;
        emit_event(
            engine,
            meta(),
            "Vote",
            vec![
                StackItem::from(account),
                StackItem::from(previous),
                StackItem::from(vote_to),
                StackItem::from(&balance),
            ],
        )?;
        Self::flush_distributions(engine)?;
        Ok(true)
    }

    /// Registered candidates with their votes, blocked ones filtered
    /// out, ordered by public key.
    pub fn get_candidates(snapshot: &DataCache) -> Result<Vec<(ECPoint, BigInt)>> {
        let prefix = StorageKey::prefix(ID, PREFIX_CANDIDATE);
        let mut out = Vec::new();
        for (key, item) in snapshot.find(&prefix, SeekDirection::Forward) {
            let pubkey = ECPoint::from_bytes(&key.suffix[1..])?;
            let candidate = CandidateState::from_stack_item(&StackItem::deserialize(
                item.as_bytes(),
            )?)?;
            if !candidate.registered {
                continue;
            }
            let account = to_script_hash(&create_signature_redeem_script(&pubkey));
            if PolicyContract::is_blocked(snapshot, &account) {
                continue;
            }
            out.push((pubkey, candidate.votes));
        }
        Ok(out)
    }

    // --- committee ---

    fn cached_committee(snapshot: &DataCache) -> Result<CachedCommittee> {
        snapshot
            .get_interoperable(&KeyBuilder::new(ID, PREFIX_COMMITTEE).to_key())?
            .ok_or_else(|| Error::InvariantViolation("committee record is missing".into()))
    }

    /// The committee members, ordered by public key.
    pub fn get_committee(snapshot: &DataCache) -> Result<Vec<ECPoint>> {
        let mut members: Vec<ECPoint> =
            Self::cached_committee(snapshot)?.members().copied().collect();
        members.sort();
        Ok(members)
    }

    /// The multisig address the committee signs with.
    pub fn committee_address(snapshot: &DataCache) -> Result<UInt160> {
        let members = Self::get_committee(snapshot)?;
        let m = members.len() - (members.len() - 1) / 2;
        Ok(to_script_hash(&create_multisig_redeem_script(m, &members)?))
    }

    /// The validators of the next block: the first `count` elected
    /// members, ordered by public key.
    pub fn next_block_validators(snapshot: &DataCache, count: usize) -> Result<Vec<ECPoint>> {
        let committee = Self::cached_committee(snapshot)?;
        let mut validators: Vec<ECPoint> = committee.members().take(count).copied().collect();
        validators.sort();
        Ok(validators)
    }

    fn should_refresh_committee(index: u32, committee_size: usize) -> bool {
        index % committee_size as u32 == 0
    }

    /// Elects the committee from the current candidates, in election
    /// order (votes descending, then public key ascending). Falls back
    /// to the standby committee below 20% turnout or with too few
    /// candidates.
    pub fn compute_committee_members(
        snapshot: &DataCache,
        settings: &ProtocolSettings,
    ) -> Result<Vec<(ECPoint, BigInt)>> {
        let voters_count = snapshot
            .try_get(&KeyBuilder::new(ID, PREFIX_VOTERS_COUNT).to_key())
            .map(|item| item.to_bigint())
            .unwrap_or_default();
        let candidates = Self::get_candidates(snapshot)?;
        let enough_turnout = voters_count * 5 >= BigInt::from(TOTAL_AMOUNT);
        let seats = settings.committee_members_count();
        if !enough_turnout || candidates.len() < seats {
            return Ok(settings
                .standby_committee
                .iter()
                .map(|member| {
                    let votes = candidates
                        .iter()
                        .find(|(pubkey, _)| pubkey == member)
                        .map(|(_, votes)| votes.clone())
                        .unwrap_or_default();
                    (*member, votes)
                })
                .collect());
        }
        let mut elected = candidates;
        elected.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        elected.truncate(seats);
        Ok(elected)
    }

    fn check_committee(&self, engine: &ApplicationEngine) -> Result<()> {
        let committee = Self::committee_address(engine.snapshot())?;
        if !engine.check_witness(&committee) {
            return Err(Error::InvalidOperation(
                "committee witness is required".into(),
            ));
        }
        Ok(())
    }
}

impl NativeContract for NeoToken {
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
            "symbol" => Ok(StackItem::from(SYMBOL)),
            "decimals" => Ok(StackItem::from(DECIMALS as u32)),
            "totalSupply" => Ok(StackItem::from(&fungible_token::total_supply(
                engine.snapshot(),
                ID,
            ))),
            "balanceOf" => Ok(StackItem::from(&Self::balance_of(
                engine.snapshot(),
                &args[0].as_uint160()?,
            )?)),
            "transfer" => Ok(StackItem::from(Self::transfer(
                engine,
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
                &args[2].as_int()?,
                args[3].clone(),
            )?)),
            "unclaimedGas" => {
                let settings = engine.settings_arc();
                Ok(StackItem::from(&Self::unclaimed_gas(
                    engine.snapshot(),
                    &settings,
                    &args[0].as_uint160()?,
                    args[1].as_u32()?,
                )?))
            }
            "registerCandidate" => Ok(StackItem::from(
                self.register_candidate(engine, &args[0].as_ecpoint()?)?,
            )),
            "unregisterCandidate" => Ok(StackItem::from(
                self.unregister_candidate(engine, &args[0].as_ecpoint()?)?,
            )),
            "vote" => {
                let vote_to = match &args[1] {
                    StackItem::Null => None,
                    other => Some(other.as_ecpoint()?),
                };
                Ok(StackItem::from(self.vote(
                    engine,
                    &args[0].as_uint160()?,
                    vote_to,
                )?))
            }
            "getCandidates" => Ok(StackItem::Array(
                Self::get_candidates(engine.snapshot())?
                    .into_iter()
                    .map(|(pubkey, votes)| {
                        StackItem::Struct(vec![
                            StackItem::from(&pubkey),
                            StackItem::from(&votes),
                        ])
                    })
                    .collect(),
            )),
            "getCommittee" => Ok(StackItem::Array(
                Self::get_committee(engine.snapshot())?
                    .iter()
                    .map(StackItem::from)
                    .collect(),
            )),
            "getNextBlockValidators" => Ok(StackItem::Array(
                Self::next_block_validators(
                    engine.snapshot(),
                    engine.settings().validators_count,
                )?
                .iter()
                .map(StackItem::from)
                .collect(),
            )),
            "getGasPerBlock" => {
                let index = engine.persisting_index();
                Ok(StackItem::from(&Self::gas_per_block(
                    engine.snapshot(),
                    index,
                )?))
            }
            "setGasPerBlock" => {
                self.set_gas_per_block(engine, args[0].as_i64()?)?;
                Ok(StackItem::Null)
            }
            "getRegisterPrice" => Ok(StackItem::from(Self::register_price(engine.snapshot()))),
            "setRegisterPrice" => {
                self.set_register_price(engine, args[0].as_i64()?)?;
                Ok(StackItem::Null)
            }
            "getAccountState" => Ok(
                match Self::account_state(engine.snapshot(), &args[0].as_uint160()?)? {
                    Some(state) => state.to_stack_item(),
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

    fn initialize(
        &self,
        engine: &mut ApplicationEngine,
        hardfork: Option<Hardfork>,
    ) -> Result<()> {
        if hardfork == meta().active_in {
            let settings = engine.settings_arc();
            let committee = CachedCommittee(
                settings
                    .standby_committee
                    .iter()
                    .map(|member| (*member, BigInt::zero()))
                    .collect(),
            );
            let snapshot = engine.snapshot_mut();
            snapshot.set_interoperable(
                KeyBuilder::new(ID, PREFIX_COMMITTEE).to_key(),
                &committee,
            )?;
            snapshot.put(
                KeyBuilder::new(ID, PREFIX_VOTERS_COUNT).to_key(),
                StorageItem::new(Vec::new()),
            );
            snapshot.put(
                KeyBuilder::new(ID, PREFIX_GAS_PER_BLOCK)
                    .add_u32_be(0)
                    .to_key(),
                StorageItem::from_i64(DEFAULT_GAS_PER_BLOCK),
            );
            snapshot.put(
                KeyBuilder::new(ID, PREFIX_REGISTER_PRICE).to_key(),
                StorageItem::from_i64(DEFAULT_REGISTER_PRICE),
            );
            let account = get_bft_address(&settings.standby_validators())?;
            fungible_token::mint::<NeoAccountState>(
                engine,
                meta(),
                &account,
                &BigInt::from(TOTAL_AMOUNT),
                false,
                Some(Self::on_balance_changing),
            )?;
            Self::flush_distributions(engine)?;
        }
        Ok(())
    }

    /// Recounts the committee at each committee-sized boundary and
    /// announces membership changes.
    fn on_persist(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let block = engine
            .persisting_block()
            .ok_or_else(|| Error::InvariantViolation("no persisting block".into()))?;
        let index = block.index();
        let settings = engine.settings_arc();
        if !Self::should_refresh_committee(index, settings.committee_members_count()) {
            return Ok(());
        }
        let old = Self::cached_committee(engine.snapshot())?;
        let elected = Self::compute_committee_members(engine.snapshot(), &settings)?;
        let committee = CachedCommittee(elected);
        engine.snapshot_mut().set_interoperable(
            KeyBuilder::new(ID, PREFIX_COMMITTEE).to_key(),
            &committee,
        )?;
        // Announced only when the ordered member set actually changed.
        let old_members: Vec<ECPoint> = old.members().copied().collect();
        let new_members: Vec<ECPoint> = committee.members().copied().collect();
        if old_members != new_members {
            emit_event(
                engine,
                meta(),
                "CommitteeChanged",
                vec![
                    StackItem::Array(old_members.iter().map(StackItem::from).collect()),
                    StackItem::Array(new_members.iter().map(StackItem::from).collect()),
                ],
            )?;
        }
        Ok(())
    }

    /// Pays the round-robin committee reward each block, and bumps the
    /// voter reward accumulators at recount boundaries.
    fn post_persist(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let block = engine
            .persisting_block()
            .ok_or_else(|| Error::InvariantViolation("no persisting block".into()))?;
        let index = block.index();
        let settings = engine.settings_arc();
        let m = settings.committee_members_count();
        let n = settings.validators_count;
        let gas_per_block = Self::gas_per_block(engine.snapshot(), index)?;
        let committee = Self::cached_committee(engine.snapshot())?;

        let member = &committee.0[(index as usize) % m].0;
        let account = to_script_hash(&create_signature_redeem_script(member));
        let committee_reward: BigInt = &gas_per_block * COMMITTEE_REWARD_RATIO / 100;
        if committee_reward.is_positive() {
            GasToken::mint(engine, &account, &committee_reward, false)?;
        }

        if Self::should_refresh_committee(index, m) {
            let reward_per_member = &gas_per_block * VOTER_REWARD_RATIO * ACCUMULATOR_SCALE
                * BigInt::from(m as u64)
                / BigInt::from((m + n) as u64)
                / 100;
            for (position, (member, votes)) in committee.0.iter().enumerate() {
                if !votes.is_positive() {
                    continue;
                }
                // Validator seats carry double weight.
                let factor = if position < n { 2 } else { 1 };
                let per_vote = &reward_per_member * factor / votes;
                if let Some(item) = engine.snapshot_mut().get_and_change(
                    &voter_reward_key(member),
                    Some(StorageItem::from_i64(0)),
                ) {
                    item.add_assign(&per_vote);
                }
            }
        }
        Ok(())
    }
}

fn candidate_key(pubkey: &ECPoint) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_CANDIDATE).add_ecpoint(pubkey).to_key()
}

fn voter_reward_key(pubkey: &ECPoint) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_VOTER_REWARD_PER_COMMITTEE)
        .add_ecpoint(pubkey)
        .to_key()
}

fn adjust_voters_count(snapshot: &mut DataCache, delta: &BigInt) {
    if let Some(item) = snapshot.get_and_change(
        &KeyBuilder::new(ID, PREFIX_VOTERS_COUNT).to_key(),
        Some(StorageItem::new(Vec::new())),
    ) {
        item.add_assign(delta);
    }
}

/// Writes the candidate back, or sweeps it (and its reward accumulator)
/// once it is unregistered and unvoted.
fn check_candidate(
    snapshot: &mut DataCache,
    pubkey: &ECPoint,
    candidate: CandidateState,
) -> Result<()> {
    if !candidate.registered && candidate.votes.is_zero() {
        snapshot.delete(&candidate_key(pubkey));
        snapshot.delete(&voter_reward_key(pubkey));
        Ok(())
    } else {
        snapshot.set_interoperable(candidate_key(pubkey), &candidate)
    }
}
