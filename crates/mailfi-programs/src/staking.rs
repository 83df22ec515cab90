//! Staking pool instructions and the client-side reward estimator.
//!
//! One pool exists per mint at `["staking_pool", mint]`; its associated token
//! account holds both the staked principal and the reward float. Each user's
//! position lives at `["user_stake", pool, user]`.

use borsh::{BorshDeserialize, BorshSerialize};
use chain_sol::{Pubkey, SolAccountMeta, SYSTEM_PROGRAM_ID};
use serde::{Deserialize, Serialize};

use crate::context::{EncodedInstruction, ProgramContext};
use crate::discriminator::Operation;
use crate::error::EncodeError;
use crate::layout::{FieldReader, FieldWriter};
use crate::seeds::{staking_pool_address, user_stake_address};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;
const BPS_DENOMINATOR: u128 = 10_000;

// ---------------------------------------------------------------------------
// Lock periods and tiers
// ---------------------------------------------------------------------------

/// How long a stake is locked. Encoded as its index, one byte.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize,
)]
pub enum LockPeriod {
    #[default]
    None,
    ThirtyDays,
    NinetyDays,
    OneEightyDays,
}

impl LockPeriod {
    pub const ALL: [LockPeriod; 4] = [
        LockPeriod::None,
        LockPeriod::ThirtyDays,
        LockPeriod::NinetyDays,
        LockPeriod::OneEightyDays,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Result<Self, EncodeError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| EncodeError::InvalidArgument(format!("lock period index {index} out of range")))
    }

    pub fn duration_secs(self) -> i64 {
        let days = match self {
            LockPeriod::None => 0,
            LockPeriod::ThirtyDays => 30,
            LockPeriod::NinetyDays => 90,
            LockPeriod::OneEightyDays => 180,
        };
        days * SECONDS_PER_DAY
    }

    /// Reward multiplier in percent (100 = 1.0x).
    pub fn multiplier_pct(self) -> u64 {
        match self {
            LockPeriod::None => 100,
            LockPeriod::ThirtyDays => 130,
            LockPeriod::NinetyDays => 170,
            LockPeriod::OneEightyDays => 250,
        }
    }
}

/// Stake size tiers, thresholds in base units of a 6-decimal mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StakingTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl StakingTier {
    pub fn for_amount(units: u64) -> Option<Self> {
        [StakingTier::Diamond, StakingTier::Gold, StakingTier::Silver, StakingTier::Bronze]
            .into_iter()
            .find(|tier| units >= tier.minimum_units())
    }

    pub fn minimum_units(self) -> u64 {
        match self {
            StakingTier::Bronze => 100_000_000,
            StakingTier::Silver => 1_000_000_000,
            StakingTier::Gold => 10_000_000_000,
            StakingTier::Diamond => 50_000_000_000,
        }
    }

    pub fn base_apy_bps(self) -> u64 {
        match self {
            StakingTier::Bronze => 800,
            StakingTier::Silver => 1_500,
            StakingTier::Gold => 2_500,
            StakingTier::Diamond => 4_000,
        }
    }
}

/// Effective APY in basis points: tier rate scaled by the lock multiplier.
pub fn apy_bps(amount: u64, lock_period: LockPeriod) -> u64 {
    StakingTier::for_amount(amount)
        .map(|tier| tier.base_apy_bps() * lock_period.multiplier_pct() / 100)
        .unwrap_or(0)
}

/// Rewards accrued since `last_claim_time`, in base units.
///
/// `amount * apy_bps * elapsed / (365 days * 10_000)`, computed in u128.
pub fn pending_rewards(amount: u64, lock_period: LockPeriod, last_claim_time: i64, now: i64) -> u64 {
    let elapsed = now.saturating_sub(last_claim_time);
    if amount == 0 || elapsed <= 0 {
        return 0;
    }
    let rewards = (amount as u128)
        .saturating_mul(apy_bps(amount, lock_period) as u128)
        .saturating_mul(elapsed as u128)
        / (SECONDS_PER_YEAR * BPS_DENOMINATOR);
    u64::try_from(rewards).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Instruction payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeStakingPoolArgs {
    pub reward_rate_per_second: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeArgs {
    pub amount: u64,
    pub lock_period: LockPeriod,
}

impl StakeArgs {
    pub(crate) fn read(r: &mut FieldReader<'_>) -> Result<Self, EncodeError> {
        Ok(Self {
            amount: r.u64()?,
            lock_period: LockPeriod::from_index(r.u8()?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeArgs {
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// The pool PDA for the context's mint.
pub fn pool_address(ctx: &ProgramContext) -> Result<Pubkey, EncodeError> {
    Ok(staking_pool_address(&ctx.program_id, &ctx.mint)?.0)
}

/// The pool's token account, which doubles as its reward vault.
pub fn pool_token_account(ctx: &ProgramContext) -> Result<Pubkey, EncodeError> {
    ctx.token_account(&pool_address(ctx)?)
}

struct StakeAccounts {
    pool: Pubkey,
    user_stake: Pubkey,
    pool_tokens: Pubkey,
    user_tokens: Pubkey,
}

impl StakeAccounts {
    fn derive(ctx: &ProgramContext, user: &Pubkey) -> Result<Self, EncodeError> {
        let pool = pool_address(ctx)?;
        Ok(Self {
            pool,
            user_stake: user_stake_address(&ctx.program_id, &pool, user)?.0,
            pool_tokens: ctx.token_account(&pool)?,
            user_tokens: ctx.token_account(user)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// `[poolPDA(w), authority(s,w), rewardVault(w), mint, tokenProgram, systemProgram]`
pub fn initialize_staking_pool(
    ctx: &ProgramContext,
    authority: &Pubkey,
    reward_rate_per_second: u64,
) -> Result<EncodedInstruction, EncodeError> {
    let pool = pool_address(ctx)?;
    let data = FieldWriter::new(Operation::InitializeStakingPool.discriminator())
        .u64(reward_rate_per_second)
        .finish();

    let mut accounts = vec![
        SolAccountMeta::writable(pool),
        SolAccountMeta::writable_signer(*authority),
        SolAccountMeta::writable(ctx.token_account(&pool)?),
    ];
    accounts.extend(ctx.token_accounts());
    accounts.push(SolAccountMeta::readonly(SYSTEM_PROGRAM_ID));

    Ok(EncodedInstruction {
        operation: Operation::InitializeStakingPool,
        address: pool,
        instruction: ctx.instruction(accounts, data),
    })
}

/// `[poolPDA(w), userStakePDA(w), user(s,w), userTokenAcct(w), poolTokenAcct(w),
///   mint, tokenProgram, systemProgram]`
pub fn stake(
    ctx: &ProgramContext,
    user: &Pubkey,
    amount: f64,
    lock_period: LockPeriod,
) -> Result<EncodedInstruction, EncodeError> {
    let data = FieldWriter::new(Operation::Stake.discriminator())
        .u64(ctx.base_units(amount)?)
        .u8(lock_period.index())
        .finish();

    let acc = StakeAccounts::derive(ctx, user)?;
    let mut accounts = vec![
        SolAccountMeta::writable(acc.pool),
        SolAccountMeta::writable(acc.user_stake),
        SolAccountMeta::writable_signer(*user),
        SolAccountMeta::writable(acc.user_tokens),
        SolAccountMeta::writable(acc.pool_tokens),
    ];
    accounts.extend(ctx.token_accounts());
    accounts.push(SolAccountMeta::readonly(SYSTEM_PROGRAM_ID));

    Ok(EncodedInstruction {
        operation: Operation::Stake,
        address: acc.user_stake,
        instruction: ctx.instruction(accounts, data),
    })
}

/// `[poolPDA(w), userStakePDA(w), user(s), rewardVault(w), userTokenAcct(w), mint, tokenProgram]`
pub fn claim_rewards(ctx: &ProgramContext, user: &Pubkey) -> Result<EncodedInstruction, EncodeError> {
    let acc = StakeAccounts::derive(ctx, user)?;
    let mut accounts = vec![
        SolAccountMeta::writable(acc.pool),
        SolAccountMeta::writable(acc.user_stake),
        SolAccountMeta::readonly_signer(*user),
        SolAccountMeta::writable(acc.pool_tokens),
        SolAccountMeta::writable(acc.user_tokens),
    ];
    accounts.extend(ctx.token_accounts());

    Ok(EncodedInstruction {
        operation: Operation::ClaimRewards,
        address: acc.user_stake,
        instruction: ctx.instruction(accounts, Operation::ClaimRewards.discriminator().to_vec()),
    })
}

/// `[poolPDA(w), userStakePDA(w), user(s), poolTokenAcct(w), userTokenAcct(w), mint, tokenProgram]`
pub fn unstake(
    ctx: &ProgramContext,
    user: &Pubkey,
    amount: f64,
) -> Result<EncodedInstruction, EncodeError> {
    let data = FieldWriter::new(Operation::Unstake.discriminator())
        .u64(ctx.base_units(amount)?)
        .finish();

    let acc = StakeAccounts::derive(ctx, user)?;
    let mut accounts = vec![
        SolAccountMeta::writable(acc.pool),
        SolAccountMeta::writable(acc.user_stake),
        SolAccountMeta::readonly_signer(*user),
        SolAccountMeta::writable(acc.pool_tokens),
        SolAccountMeta::writable(acc.user_tokens),
    ];
    accounts.extend(ctx.token_accounts());

    Ok(EncodedInstruction {
        operation: Operation::Unstake,
        address: acc.user_stake,
        instruction: ctx.instruction(accounts, data),
    })
}

/// `[poolPDA(w), userStakePDA(w), user(s), rewardVault(w), poolTokenAcct(w), mint, tokenProgram]`
pub fn compound_rewards(
    ctx: &ProgramContext,
    user: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let acc = StakeAccounts::derive(ctx, user)?;
    let mut accounts = vec![
        SolAccountMeta::writable(acc.pool),
        SolAccountMeta::writable(acc.user_stake),
        SolAccountMeta::readonly_signer(*user),
        SolAccountMeta::writable(acc.pool_tokens),
        SolAccountMeta::writable(acc.pool_tokens),
    ];
    accounts.extend(ctx.token_accounts());

    Ok(EncodedInstruction {
        operation: Operation::CompoundRewards,
        address: acc.user_stake,
        instruction: ctx.instruction(accounts, Operation::CompoundRewards.discriminator().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_instruction_data, InstructionArgs};

    const PYUSD: u64 = 1_000_000;
    const DAY: i64 = 24 * 60 * 60;

    fn ctx() -> ProgramContext {
        ProgramContext::new([9u8; 32], [8u8; 32])
    }

    // -- lock periods and tiers ----------------------------------------------

    #[test]
    fn lock_period_index_roundtrip() {
        for (i, period) in LockPeriod::ALL.iter().enumerate() {
            assert_eq!(period.index() as usize, i);
            assert_eq!(LockPeriod::from_index(i as u8).unwrap(), *period);
        }
        assert!(LockPeriod::from_index(4).is_err());
    }

    #[test]
    fn lock_durations() {
        assert_eq!(LockPeriod::None.duration_secs(), 0);
        assert_eq!(LockPeriod::NinetyDays.duration_secs(), 90 * DAY);
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(StakingTier::for_amount(99 * PYUSD), None);
        assert_eq!(StakingTier::for_amount(100 * PYUSD), Some(StakingTier::Bronze));
        assert_eq!(StakingTier::for_amount(999 * PYUSD), Some(StakingTier::Bronze));
        assert_eq!(StakingTier::for_amount(1_000 * PYUSD), Some(StakingTier::Silver));
        assert_eq!(StakingTier::for_amount(10_000 * PYUSD), Some(StakingTier::Gold));
        assert_eq!(StakingTier::for_amount(50_000 * PYUSD), Some(StakingTier::Diamond));
    }

    #[test]
    fn apy_applies_lock_multiplier() {
        assert_eq!(apy_bps(100 * PYUSD, LockPeriod::None), 800);
        assert_eq!(apy_bps(100 * PYUSD, LockPeriod::ThirtyDays), 1_040);
        assert_eq!(apy_bps(50_000 * PYUSD, LockPeriod::OneEightyDays), 10_000);
        assert_eq!(apy_bps(10 * PYUSD, LockPeriod::OneEightyDays), 0);
    }

    #[test]
    fn one_year_of_bronze_rewards() {
        let year = 365 * DAY;
        assert_eq!(pending_rewards(1_000 * PYUSD - 1, LockPeriod::None, 0, year), 79_999_999);
        assert_eq!(pending_rewards(100 * PYUSD, LockPeriod::None, 0, year), 8 * PYUSD);
    }

    #[test]
    fn no_rewards_without_elapsed_time() {
        assert_eq!(pending_rewards(100 * PYUSD, LockPeriod::None, 10, 10), 0);
        assert_eq!(pending_rewards(100 * PYUSD, LockPeriod::None, 10, 5), 0);
        assert_eq!(pending_rewards(0, LockPeriod::None, 0, 1_000), 0);
    }

    // -- builders -------------------------------------------------------------

    #[test]
    fn initialize_pool_layout() {
        let ctx = ctx();
        let ix = initialize_staking_pool(&ctx, &[1u8; 32], 42).unwrap();
        let pool = pool_address(&ctx).unwrap();

        assert_eq!(ix.address, pool);
        assert_eq!(&ix.data()[8..], &42u64.to_le_bytes());
        assert_eq!(
            ix.accounts(),
            &[
                SolAccountMeta::writable(pool),
                SolAccountMeta::writable_signer([1u8; 32]),
                SolAccountMeta::writable(pool_token_account(&ctx).unwrap()),
                SolAccountMeta::readonly(ctx.mint),
                SolAccountMeta::readonly(ctx.token_program),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID),
            ]
        );
    }

    #[test]
    fn stake_layout() {
        let ctx = ctx();
        let user = [1u8; 32];
        let ix = stake(&ctx, &user, 150.0, LockPeriod::NinetyDays).unwrap();
        let pool = pool_address(&ctx).unwrap();
        let (user_stake, _) = user_stake_address(&ctx.program_id, &pool, &user).unwrap();

        assert_eq!(ix.address, user_stake);
        let decoded = decode_instruction_data(ix.data()).unwrap();
        assert_eq!(
            decoded.args,
            Some(InstructionArgs::Stake(StakeArgs {
                amount: 150 * PYUSD,
                lock_period: LockPeriod::NinetyDays,
            }))
        );

        let keys: Vec<Pubkey> = ix.accounts().iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                pool,
                user_stake,
                user,
                ctx.token_account(&user).unwrap(),
                ctx.token_account(&pool).unwrap(),
                ctx.mint,
                ctx.token_program,
                SYSTEM_PROGRAM_ID,
            ]
        );
        assert!(ix.accounts()[2].is_signer && ix.accounts()[2].is_writable);
    }

    #[test]
    fn claim_unstake_compound_account_orders() {
        let ctx = ctx();
        let user = [1u8; 32];
        let pool_tokens = pool_token_account(&ctx).unwrap();
        let user_tokens = ctx.token_account(&user).unwrap();

        let claim = claim_rewards(&ctx, &user).unwrap();
        assert_eq!(claim.accounts()[2], SolAccountMeta::readonly_signer(user));
        assert_eq!(claim.accounts()[3].pubkey, pool_tokens);
        assert_eq!(claim.accounts()[4].pubkey, user_tokens);
        assert_eq!(claim.data(), &Operation::ClaimRewards.discriminator());

        let unstake_ix = unstake(&ctx, &user, 5.0).unwrap();
        assert_eq!(unstake_ix.accounts()[3].pubkey, pool_tokens);
        assert_eq!(unstake_ix.accounts()[4].pubkey, user_tokens);
        assert_eq!(&unstake_ix.data()[8..], &(5 * PYUSD).to_le_bytes());

        let compound = compound_rewards(&ctx, &user).unwrap();
        assert_eq!(compound.accounts().len(), 7);
        assert_eq!(compound.accounts()[3].pubkey, pool_tokens);
        assert_eq!(compound.accounts()[4].pubkey, pool_tokens);
    }

    #[test]
    fn stake_rejects_bad_amounts() {
        assert!(stake(&ctx(), &[1u8; 32], 0.0, LockPeriod::None).is_err());
        assert!(unstake(&ctx(), &[1u8; 32], -3.0).is_err());
    }
}
