//! Storage records of the fungible tokens and the governance layer.

use crate::error::Result;
use crate::interop::interoperable::struct_fields;
use crate::interop::{Interoperable, StackItem};
use crate::native::fungible_token::TokenState;
use neo_core::ECPoint;
use num_bigint::BigInt;

/// Balance record of a plain fungible account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountState {
    pub balance: BigInt,
}

impl Interoperable for AccountState {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 1)?;
        Ok(Self {
            balance: fields[0].as_int()?,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Struct(vec![StackItem::from(&self.balance)])
    }
}

impl TokenState for AccountState {
    fn balance(&self) -> &BigInt {
        &self.balance
    }

    fn balance_mut(&mut self) -> &mut BigInt {
        &mut self.balance
    }
}

/// Balance record of a NEO account, carrying the voting state needed for
/// lazy reward settlement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeoAccountState {
    pub balance: BigInt,
    /// Height the balance was last settled at.
    pub balance_height: u32,
    pub vote_to: Option<ECPoint>,
    /// Snapshot of the candidate's reward accumulator taken when the
    /// vote was cast or last settled.
    pub last_gas_per_vote: BigInt,
}

impl Interoperable for NeoAccountState {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 4)?;
        let vote_to = match &fields[2] {
            StackItem::Null => None,
            other => Some(other.as_ecpoint()?),
        };
        Ok(Self {
            balance: fields[0].as_int()?,
            balance_height: fields[1].as_u32()?,
            vote_to,
            last_gas_per_vote: fields[3].as_int()?,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Struct(vec![
            StackItem::from(&self.balance),
            StackItem::from(self.balance_height),
            StackItem::from(self.vote_to),
            StackItem::from(&self.last_gas_per_vote),
        ])
    }
}

impl TokenState for NeoAccountState {
    fn balance(&self) -> &BigInt {
        &self.balance
    }

    fn balance_mut(&mut self) -> &mut BigInt {
        &mut self.balance
    }
}

/// The register/vote record of a committee candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateState {
    pub registered: bool,
    pub votes: BigInt,
}

impl Interoperable for CandidateState {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 2)?;
        Ok(Self {
            registered: fields[0].as_bool()?,
            votes: fields[1].as_int()?,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Struct(vec![
            StackItem::from(self.registered),
            StackItem::from(&self.votes),
        ])
    }
}

/// The elected committee with the vote counts it was elected on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CachedCommittee(pub Vec<(ECPoint, BigInt)>);

impl CachedCommittee {
    pub fn members(&self) -> impl Iterator<Item = &ECPoint> {
        self.0.iter().map(|(key, _)| key)
    }
}

impl Interoperable for CachedCommittee {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let entries = item.as_array()?;
        let mut members = Vec::with_capacity(entries.len());
        for entry in entries {
            let fields = struct_fields(entry, 2)?;
            members.push((fields[0].as_ecpoint()?, fields[1].as_int()?));
        }
        Ok(Self(members))
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Array(
            self.0
                .iter()
                .map(|(key, votes)| {
                    StackItem::Struct(vec![StackItem::from(key), StackItem::from(votes)])
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use p256::SecretKey;

    fn test_key(seed: u8) -> ECPoint {
        let mut scalar = [0u8; 32];
        scalar[31] = seed;
        let secret = SecretKey::from_slice(&scalar).unwrap();
        let encoded = secret.public_key().to_encoded_point(true);
        ECPoint::from_bytes(encoded.as_bytes()).unwrap()
    }

    #[test]
    fn neo_account_round_trips_with_and_without_vote() {
        let voted = NeoAccountState {
            balance: BigInt::from(1234),
            balance_height: 77,
            vote_to: Some(test_key(1)),
            last_gas_per_vote: BigInt::from(99_000_000),
        };
        let item = voted.to_stack_item();
        assert_eq!(NeoAccountState::from_stack_item(&item).unwrap(), voted);

        let unvoted = NeoAccountState {
            balance: BigInt::from(5),
            ..Default::default()
        };
        let item = unvoted.to_stack_item();
        assert_eq!(NeoAccountState::from_stack_item(&item).unwrap(), unvoted);
    }

    #[test]
    fn cached_committee_preserves_order() {
        let committee = CachedCommittee(vec![
            (test_key(3), BigInt::from(300)),
            (test_key(1), BigInt::from(100)),
        ]);
        let item = committee.to_stack_item();
        let decoded = CachedCommittee::from_stack_item(&item).unwrap();
        assert_eq!(decoded, committee);
        assert_eq!(decoded.0[0].1, BigInt::from(300));
    }

    #[test]
    fn candidate_state_round_trips() {
        let candidate = CandidateState {
            registered: true,
            votes: BigInt::from(42),
        };
        let item = candidate.to_stack_item();
        assert_eq!(CandidateState::from_stack_item(&item).unwrap(), candidate);
    }
}
