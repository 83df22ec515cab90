//! Borsh decoders for the program's accounts.
//!
//! Each record is allocated at a fixed `SPACE`; variable-length fields
//! (descriptions, owner and approval lists) are zero-padded up to their
//! maximum, so decoding reads a prefix and ignores the tail.

use borsh::{BorshDeserialize, BorshSerialize};
use chain_sol::Pubkey;
use serde::Serialize;

use crate::error::EncodeError;
use crate::recurring::PaymentInterval;
use crate::staking::{pending_rewards, LockPeriod};

/// Longest description the program reserves space for.
pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Owner and approval slots per multisig.
pub const MAX_SIGNERS: usize = 10;

const KEY: usize = 32;
const U64: usize = 8;
const BOOL: usize = 1;
const ENUM_TAG: usize = 1;
const BUMP: usize = 1;
const VEC_LEN: usize = 4;

/// A fixed-size account owned by the program.
pub trait ProgramAccount: BorshDeserialize {
    const NAME: &'static str;
    /// Allocated size, also the `dataSize` filter for `getProgramAccounts`.
    const SPACE: usize;
    /// Offset of the key used to list accounts per owner.
    const OWNER_OFFSET: usize = 0;

    fn decode(data: &[u8]) -> Result<Self, EncodeError> {
        if data.len() < Self::SPACE {
            return Err(EncodeError::AccountData(format!(
                "{} account is {} bytes, expected {}",
                Self::NAME,
                data.len(),
                Self::SPACE
            )));
        }
        let mut buf = data;
        Self::deserialize(&mut buf)
            .map_err(|e| EncodeError::AccountData(format!("{}: {e}", Self::NAME)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct Escrow {
    #[serde(with = "crate::b58")]
    pub creator: Pubkey,
    #[serde(with = "crate::b58")]
    pub recipient: Pubkey,
    pub amount: u64,
    pub created_at: i64,
    pub expiry_time: i64,
    pub is_funded: bool,
    pub is_claimed: bool,
    pub description: String,
    pub bump: u8,
}

impl ProgramAccount for Escrow {
    const NAME: &'static str = "escrow";
    const SPACE: usize =
        KEY + KEY + U64 + U64 + U64 + BOOL + BOOL + VEC_LEN + MAX_DESCRIPTION_LEN + BUMP;
}

impl Escrow {
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expiry_time
    }

    /// Funded, unclaimed and not yet expired.
    pub fn is_claimable(&self, now: i64) -> bool {
        self.is_funded && !self.is_claimed && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct Multisig {
    #[serde(with = "crate::b58")]
    pub creator: Pubkey,
    #[serde(with = "crate::b58::vec")]
    pub owners: Vec<Pubkey>,
    pub threshold: u8,
    pub transaction_count: u64,
    pub created_at: i64,
    pub bump: u8,
}

impl ProgramAccount for Multisig {
    const NAME: &'static str = "multisig";
    const SPACE: usize = KEY + VEC_LEN + KEY * MAX_SIGNERS + 1 + U64 + U64 + BUMP;
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct MultisigTransaction {
    #[serde(with = "crate::b58")]
    pub multisig: Pubkey,
    #[serde(with = "crate::b58")]
    pub recipient: Pubkey,
    pub amount: u64,
    pub transaction_index: u64,
    #[serde(with = "crate::b58::vec")]
    pub approvals: Vec<Pubkey>,
    pub executed: bool,
    #[serde(with = "crate::b58")]
    pub proposer: Pubkey,
    pub created_at: i64,
    pub description: String,
    pub bump: u8,
}

impl ProgramAccount for MultisigTransaction {
    const NAME: &'static str = "multisig transaction";
    const SPACE: usize = KEY
        + KEY
        + U64
        + U64
        + VEC_LEN
        + KEY * MAX_SIGNERS
        + BOOL
        + KEY
        + U64
        + VEC_LEN
        + MAX_DESCRIPTION_LEN
        + BUMP;
}

impl MultisigTransaction {
    pub fn has_approved(&self, owner: &Pubkey) -> bool {
        self.approvals.contains(owner)
    }

    pub fn is_executable(&self, threshold: u8) -> bool {
        !self.executed && self.approvals.len() >= threshold as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct RecurringPayment {
    #[serde(with = "crate::b58")]
    pub creator: Pubkey,
    #[serde(with = "crate::b58")]
    pub recipient: Pubkey,
    pub amount_per_payment: u64,
    pub interval: PaymentInterval,
    pub total_payments: u64,
    pub payments_made: u64,
    /// Zero until the first payment executes.
    pub last_payment_time: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub description: String,
    pub bump: u8,
}

impl ProgramAccount for RecurringPayment {
    const NAME: &'static str = "recurring payment";
    const SPACE: usize = KEY
        + KEY
        + U64
        + ENUM_TAG
        + U64 * 3
        + BOOL
        + U64
        + VEC_LEN
        + MAX_DESCRIPTION_LEN
        + BUMP;
}

impl RecurringPayment {
    pub fn remaining_payments(&self) -> u64 {
        self.total_payments.saturating_sub(self.payments_made)
    }

    /// When the next payment may execute, or `None` once the schedule ends.
    /// The first payment is due as soon as the account exists.
    pub fn next_payment_at(&self) -> Option<i64> {
        if !self.is_active || self.remaining_payments() == 0 {
            return None;
        }
        if self.last_payment_time == 0 {
            return Some(self.created_at);
        }
        Some(self.last_payment_time.saturating_add(self.interval.interval_seconds()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct StakingPool {
    #[serde(with = "crate::b58")]
    pub mint: Pubkey,
    pub reward_rate_per_second: u64,
    pub total_staked: u64,
    pub created_at: i64,
    pub bump: u8,
}

impl ProgramAccount for StakingPool {
    const NAME: &'static str = "staking pool";
    const SPACE: usize = KEY + U64 + U64 + U64 + BUMP;
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct UserStake {
    #[serde(with = "crate::b58")]
    pub user: Pubkey,
    #[serde(with = "crate::b58")]
    pub staking_pool: Pubkey,
    pub amount: u64,
    pub lock_period: LockPeriod,
    pub lock_end_time: i64,
    pub last_claim_time: i64,
    pub total_claimed: u64,
    pub created_at: i64,
    pub bump: u8,
}

impl ProgramAccount for UserStake {
    const NAME: &'static str = "user stake";
    const SPACE: usize = KEY + KEY + U64 + 1 + U64 + U64 + U64 + U64 + BUMP;
}

impl UserStake {
    pub fn is_locked(&self, now: i64) -> bool {
        now < self.lock_end_time
    }

    pub fn pending_rewards(&self, now: i64) -> u64 {
        pending_rewards(self.amount, self.lock_period, self.last_claim_time, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded<T: BorshSerialize + ProgramAccount>(value: &T) -> Vec<u8> {
        let mut data = value.try_to_vec().unwrap();
        assert!(data.len() <= T::SPACE, "{} overflows SPACE", T::NAME);
        data.resize(T::SPACE, 0);
        data
    }

    fn escrow(description: &str) -> Escrow {
        Escrow {
            creator: [1; 32],
            recipient: [2; 32],
            amount: 10_000_000,
            created_at: 1_700_000_000,
            expiry_time: 1_700_604_800,
            is_funded: true,
            is_claimed: false,
            description: description.into(),
            bump: 254,
        }
    }

    #[test]
    fn spaces_match_program_allocations() {
        assert_eq!(Escrow::SPACE, 195);
        assert_eq!(Multisig::SPACE, 374);
        assert_eq!(MultisigTransaction::SPACE, 550);
        assert_eq!(RecurringPayment::SPACE, 211);
        assert_eq!(StakingPool::SPACE, 57);
        assert_eq!(UserStake::SPACE, 106);
    }

    #[test]
    fn full_escrow_fills_its_space_exactly() {
        let full = escrow(&"x".repeat(MAX_DESCRIPTION_LEN));
        assert_eq!(full.try_to_vec().unwrap().len(), Escrow::SPACE);
    }

    #[test]
    fn full_multisig_fills_its_space_exactly() {
        let full = Multisig {
            creator: [1; 32],
            owners: (0..MAX_SIGNERS as u8).map(|i| [i; 32]).collect(),
            threshold: 6,
            transaction_count: 3,
            created_at: 1,
            bump: 255,
        };
        assert_eq!(full.try_to_vec().unwrap().len(), Multisig::SPACE);
    }

    #[test]
    fn escrow_decodes_from_padded_account() {
        let original = escrow("rent");
        let decoded = Escrow::decode(&padded(&original)).unwrap();
        assert_eq!(decoded, original);
        assert!(decoded.is_claimable(1_700_000_100));
        assert!(!decoded.is_claimable(1_700_604_801));
    }

    #[test]
    fn short_account_is_rejected() {
        let err = StakingPool::decode(&[0u8; 10]).unwrap_err();
        assert!(err.to_string().contains("expected 57"));
    }

    #[test]
    fn multisig_transaction_roundtrip() {
        let tx = MultisigTransaction {
            multisig: [3; 32],
            recipient: [4; 32],
            amount: 5,
            transaction_index: 0,
            approvals: vec![[1; 32], [2; 32]],
            executed: false,
            proposer: [1; 32],
            created_at: 9,
            description: "payroll".into(),
            bump: 200,
        };
        let decoded = MultisigTransaction::decode(&padded(&tx)).unwrap();
        assert!(decoded.has_approved(&[2; 32]));
        assert!(decoded.is_executable(2));
        assert!(!decoded.is_executable(3));
    }

    fn recurring(description: &str) -> RecurringPayment {
        RecurringPayment {
            creator: [1; 32],
            recipient: [2; 32],
            amount_per_payment: 5_000_000,
            interval: PaymentInterval::Weekly,
            total_payments: 2,
            payments_made: 0,
            last_payment_time: 0,
            is_active: true,
            created_at: 1_000,
            description: description.into(),
            bump: 1,
        }
    }

    #[test]
    fn full_recurring_payment_fills_its_space_exactly() {
        let full = recurring(&"x".repeat(MAX_DESCRIPTION_LEN));
        assert_eq!(full.try_to_vec().unwrap().len(), RecurringPayment::SPACE);
    }

    #[test]
    fn recurring_payment_decodes_program_layout() {
        // Hand-built 211-byte account in the program's field order.
        let mut data = Vec::with_capacity(211);
        data.extend_from_slice(&[1u8; 32]);
        data.extend_from_slice(&[2u8; 32]);
        data.extend_from_slice(&5_000_000u64.to_le_bytes());
        data.push(2); // Monthly
        data.extend_from_slice(&12u64.to_le_bytes());
        data.extend_from_slice(&3u64.to_le_bytes());
        data.extend_from_slice(&1_700_500_000i64.to_le_bytes());
        data.push(1);
        data.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"rent");
        data.push(253);
        data.resize(211, 0);

        let rp = RecurringPayment::decode(&data).unwrap();
        assert_eq!(rp.creator, [1; 32]);
        assert_eq!(rp.amount_per_payment, 5_000_000);
        assert_eq!(rp.interval, PaymentInterval::Monthly);
        assert_eq!(rp.total_payments, 12);
        assert_eq!(rp.payments_made, 3);
        assert!(rp.is_active);
        assert_eq!(rp.created_at, 1_700_000_000);
        assert_eq!(rp.description, "rent");
        assert_eq!(rp.bump, 253);
        assert_eq!(rp.next_payment_at(), Some(1_700_500_000 + 30 * 24 * 60 * 60));
    }

    #[test]
    fn recurring_schedule() {
        let mut rp = recurring("");
        assert_eq!(RecurringPayment::decode(&padded(&rp)).unwrap(), rp);
        // First payment is due immediately.
        assert_eq!(rp.next_payment_at(), Some(1_000));

        rp.payments_made = 1;
        rp.last_payment_time = 1_150;
        assert_eq!(rp.next_payment_at(), Some(1_150 + 7 * 24 * 60 * 60));

        rp.payments_made = 2;
        assert_eq!(rp.next_payment_at(), None);

        rp.payments_made = 1;
        rp.is_active = false;
        assert_eq!(rp.next_payment_at(), None);
    }

    #[test]
    fn user_stake_lock_byte_and_rewards() {
        let stake = UserStake {
            user: [1; 32],
            staking_pool: [2; 32],
            amount: 100_000_000,
            lock_period: LockPeriod::ThirtyDays,
            lock_end_time: 2_000,
            last_claim_time: 0,
            total_claimed: 0,
            created_at: 0,
            bump: 7,
        };
        let data = padded(&stake);
        // user + pool + amount, then the lock period index
        assert_eq!(data[72], 1);

        let decoded = UserStake::decode(&data).unwrap();
        assert!(decoded.is_locked(1_999));
        assert!(!decoded.is_locked(2_000));
        assert_eq!(decoded.pending_rewards(365 * 24 * 60 * 60), 10_400_000);
    }
}
