//! PDA seed layouts for every program account, and seed id allocation.

use std::collections::HashMap;
use std::sync::Mutex;

use chain_sol::{find_program_address, Pubkey};

use crate::error::EncodeError;

pub const ESCROW_SEED: &[u8] = b"escrow";
pub const MULTISIG_SEED: &[u8] = b"multisig";
pub const TRANSACTION_SEED: &[u8] = b"transaction";
pub const RECURRING_PAYMENT_SEED: &[u8] = b"recurring_payment";
pub const STAKING_POOL_SEED: &[u8] = b"staking_pool";
pub const USER_STAKE_SEED: &[u8] = b"user_stake";

/// `["escrow", creator, seed_id]`
pub fn escrow_address(
    program_id: &Pubkey,
    creator: &Pubkey,
    seed_id: i64,
) -> Result<(Pubkey, u8), EncodeError> {
    Ok(find_program_address(&[ESCROW_SEED, creator, &seed_id.to_le_bytes()], program_id)?)
}

/// `["multisig", creator, seed_id]`
pub fn multisig_address(
    program_id: &Pubkey,
    creator: &Pubkey,
    seed_id: i64,
) -> Result<(Pubkey, u8), EncodeError> {
    Ok(find_program_address(&[MULTISIG_SEED, creator, &seed_id.to_le_bytes()], program_id)?)
}

/// `["transaction", multisig, transaction_index]`
pub fn transaction_address(
    program_id: &Pubkey,
    multisig: &Pubkey,
    transaction_index: u64,
) -> Result<(Pubkey, u8), EncodeError> {
    Ok(find_program_address(
        &[TRANSACTION_SEED, multisig, &transaction_index.to_le_bytes()],
        program_id,
    )?)
}

/// `["recurring_payment", payer, seed_id]`
pub fn recurring_payment_address(
    program_id: &Pubkey,
    payer: &Pubkey,
    seed_id: i64,
) -> Result<(Pubkey, u8), EncodeError> {
    Ok(find_program_address(
        &[RECURRING_PAYMENT_SEED, payer, &seed_id.to_le_bytes()],
        program_id,
    )?)
}

/// `["staking_pool", mint]`
pub fn staking_pool_address(program_id: &Pubkey, mint: &Pubkey) -> Result<(Pubkey, u8), EncodeError> {
    Ok(find_program_address(&[STAKING_POOL_SEED, mint], program_id)?)
}

/// `["user_stake", pool, user]`
pub fn user_stake_address(
    program_id: &Pubkey,
    pool: &Pubkey,
    user: &Pubkey,
) -> Result<(Pubkey, u8), EncodeError> {
    Ok(find_program_address(&[USER_STAKE_SEED, pool, user], program_id)?)
}

/// Hands out per-owner seed ids that never repeat within a process.
///
/// Ids start at the supplied wall-clock second so they stay close to the
/// timestamps other clients use, but two creations by the same owner in the
/// same second still get distinct ids.
#[derive(Debug, Default)]
pub struct SeedAllocator {
    last: Mutex<HashMap<Pubkey, i64>>,
}

impl SeedAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max(now, previous + 1)` for this owner.
    pub fn next(&self, owner: &Pubkey, now: i64) -> i64 {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = match last.get(owner) {
            Some(prev) => now.max(prev.saturating_add(1)),
            None => now,
        };
        last.insert(*owner, id);
        id
    }
}
