//! High-level operations: encode, submit, confirm.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chain_sol::{build_create_associated_token_account_idempotent, bytes_to_address, Pubkey, SolInstruction};
use mailfi_programs::escrow::{self, CreateEscrow};
use mailfi_programs::multisig::{self, ProposeTransaction};
use mailfi_programs::recurring::{self, CreateRecurringPayment};
use mailfi_programs::staking;
use mailfi_programs::state::Multisig;
use mailfi_programs::{
    EncodeError, EncodedInstruction, LockPeriod, Operation, ProgramAccount, ProgramContext, SeedAllocator,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::confirm::{ConfirmOptions, ConfirmationWaiter};
use crate::error::ClientError;
use crate::network::{Network, ProgramAccountFilter};
use crate::rpc::RpcClient;
use crate::submit::Submitter;
use crate::wallet::WalletCapability;

/// A confirmed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub signature: String,
    /// The program account created or acted on.
    pub address: Pubkey,
    pub logs: Vec<String>,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One wallet talking to one deployment.
pub struct MailfiClient {
    ctx: ProgramContext,
    network: Arc<dyn Network>,
    submitter: Submitter,
    waiter: ConfirmationWaiter,
    seeds: SeedAllocator,
    clock: fn() -> i64,
}

impl MailfiClient {
    pub fn new(
        ctx: ProgramContext,
        wallet: Arc<dyn WalletCapability>,
        network: Arc<dyn Network>,
        options: ConfirmOptions,
    ) -> Result<Self, ClientError> {
        let submitter = Submitter::new(wallet, Arc::clone(&network))?;
        let waiter = ConfirmationWaiter::new(Arc::clone(&network), options);
        Ok(Self {
            ctx,
            network,
            submitter,
            waiter,
            seeds: SeedAllocator::new(),
            clock: unix_now,
        })
    }

    /// A client over JSON-RPC as described by `config`.
    pub fn from_config(config: &ClientConfig, wallet: Arc<dyn WalletCapability>) -> Result<Self, ClientError> {
        config.validate()?;
        let rpc = RpcClient::new(&config.network.rpc_url, config.network.commitment)
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Self::new(config.to_program_context()?, wallet, Arc::new(rpc), config.confirm_options())
    }

    /// Replace the wall clock used for seed ids and expiry checks.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn context(&self) -> &ProgramContext {
        &self.ctx
    }

    pub fn wallet_key(&self) -> Pubkey {
        self.submitter.payer()
    }

    pub fn waiter(&self) -> &ConfirmationWaiter {
        &self.waiter
    }

    // ------------------------------------------------------------------
    // Escrow
    // ------------------------------------------------------------------

    pub async fn create_escrow(
        &self,
        amount: f64,
        recipient: &Pubkey,
        expiry_time: i64,
        description: &str,
    ) -> Result<OperationOutcome, ClientError> {
        let creator = self.wallet_key();
        let now = (self.clock)();
        let req = CreateEscrow {
            creator,
            seed_id: self.seeds.next(&creator, now),
            amount,
            recipient: *recipient,
            expiry_time,
            description,
            now,
        };
        self.run(Operation::CreateEscrow, escrow::create_escrow(&self.ctx, &req)).await
    }

    /// Escrow expiring `days` whole days from now.
    pub async fn create_escrow_in_days(
        &self,
        amount: f64,
        recipient: &Pubkey,
        days: u32,
        description: &str,
    ) -> Result<OperationOutcome, ClientError> {
        let expiry = escrow::expiry_in_days((self.clock)(), days);
        self.create_escrow(amount, recipient, expiry, description).await
    }

    pub async fn fund_escrow(&self, escrow: &Pubkey) -> Result<OperationOutcome, ClientError> {
        let ix = escrow::fund_escrow(&self.ctx, &self.wallet_key(), escrow);
        self.run(Operation::FundEscrow, ix).await
    }

    pub async fn claim_escrow(&self, escrow: &Pubkey) -> Result<OperationOutcome, ClientError> {
        let ix = escrow::claim_escrow(&self.ctx, &self.wallet_key(), escrow);
        self.run(Operation::ClaimEscrow, ix).await
    }

    pub async fn cancel_escrow(&self, escrow: &Pubkey) -> Result<OperationOutcome, ClientError> {
        let ix = escrow::cancel_escrow(&self.ctx, &self.wallet_key(), escrow);
        self.run(Operation::CancelEscrow, ix).await
    }

    // ------------------------------------------------------------------
    // Multisig
    // ------------------------------------------------------------------

    pub async fn create_multisig(&self, owners: &[Pubkey], threshold: u8) -> Result<OperationOutcome, ClientError> {
        let creator = self.wallet_key();
        let seed_id = self.seeds.next(&creator, (self.clock)());
        let ix = multisig::create_multisig(&self.ctx, &creator, seed_id, owners, threshold);
        self.run(Operation::CreateMultisig, ix).await
    }

    /// Proposes a transfer out of `multisig`, indexed by its current
    /// transaction count.
    pub async fn propose_transaction(
        &self,
        multisig: &Pubkey,
        amount: f64,
        recipient: &Pubkey,
        description: &str,
    ) -> Result<OperationOutcome, ClientError> {
        let operation = Operation::ProposeTransaction.name();
        let mut req = ProposeTransaction {
            proposer: self.wallet_key(),
            multisig: *multisig,
            transaction_index: 0,
            amount,
            recipient: *recipient,
            description,
        };
        // Validate locally before the account read.
        multisig::propose_transaction(&self.ctx, &req).map_err(|e| ClientError::from_encode(operation, e))?;

        let account: Multisig = self
            .fetch_account(multisig)
            .await
            .map_err(|e| retag(e, operation))?
            .ok_or_else(|| ClientError::invalid(operation, format!("no multisig at {}", bytes_to_address(multisig))))?;
        debug!(operation, index = account.transaction_count, "proposing at multisig transaction index");

        req.transaction_index = account.transaction_count;
        self.run(Operation::ProposeTransaction, multisig::propose_transaction(&self.ctx, &req))
            .await
    }

    pub async fn approve_transaction(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
    ) -> Result<OperationOutcome, ClientError> {
        let ix = multisig::approve_transaction(&self.ctx, &self.wallet_key(), multisig, transaction);
        self.run(Operation::ApproveTransaction, ix).await
    }

    pub async fn execute_transaction(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
        recipient: &Pubkey,
    ) -> Result<OperationOutcome, ClientError> {
        let ix = multisig::execute_transaction(&self.ctx, &self.wallet_key(), multisig, transaction, recipient);
        self.run(Operation::ExecuteTransaction, ix).await
    }

    pub async fn reject_transaction(
        &self,
        multisig: &Pubkey,
        transaction: &Pubkey,
        proposer: &Pubkey,
    ) -> Result<OperationOutcome, ClientError> {
        let ix = multisig::reject_transaction(&self.ctx, &self.wallet_key(), multisig, transaction, proposer);
        self.run(Operation::RejectTransaction, ix).await
    }

    // ------------------------------------------------------------------
    // Recurring payments
    // ------------------------------------------------------------------

    pub async fn create_recurring_payment(
        &self,
        amount: f64,
        recipient: &Pubkey,
        interval_seconds: i64,
        total_payments: u64,
        description: &str,
    ) -> Result<OperationOutcome, ClientError> {
        let payer = self.wallet_key();
        let req = CreateRecurringPayment {
            payer,
            seed_id: self.seeds.next(&payer, (self.clock)()),
            amount,
            recipient: *recipient,
            interval_seconds,
            total_payments,
            description,
        };
        self.run(
            Operation::CreateRecurringPayment,
            recurring::create_recurring_payment(&self.ctx, &req),
        )
        .await
    }

    /// Anyone may crank a due payment; the wallet only pays the fee.
    pub async fn execute_recurring_payment(
        &self,
        recurring: &Pubkey,
        payer: &Pubkey,
        recipient: &Pubkey,
    ) -> Result<OperationOutcome, ClientError> {
        let ix = recurring::execute_recurring_payment(&self.ctx, recurring, payer, recipient);
        self.run(Operation::ExecuteRecurringPayment, ix).await
    }

    pub async fn cancel_recurring_payment(&self, recurring: &Pubkey) -> Result<OperationOutcome, ClientError> {
        let ix = recurring::cancel_recurring_payment(&self.ctx, &self.wallet_key(), recurring);
        self.run(Operation::CancelRecurringPayment, ix).await
    }

    // ------------------------------------------------------------------
    // Staking
    // ------------------------------------------------------------------

    pub async fn initialize_staking_pool(&self, reward_rate_per_second: u64) -> Result<OperationOutcome, ClientError> {
        let ix = staking::initialize_staking_pool(&self.ctx, &self.wallet_key(), reward_rate_per_second);
        self.run(Operation::InitializeStakingPool, ix).await
    }

    /// Stakes `amount`, creating the pool's token account first in the same
    /// transaction if it does not exist yet.
    pub async fn stake(&self, amount: f64, lock_period: LockPeriod) -> Result<OperationOutcome, ClientError> {
        let operation = Operation::Stake.name();
        let user = self.wallet_key();
        let encoded = staking::stake(&self.ctx, &user, amount, lock_period)
            .map_err(|e| ClientError::from_encode(operation, e))?;

        let pool_tokens = staking::pool_token_account(&self.ctx).map_err(|e| ClientError::from_encode(operation, e))?;
        let mut instructions = Vec::with_capacity(2);
        let existing = self
            .network
            .get_account_info(&pool_tokens)
            .await
            .map_err(|e| ClientError::rpc(operation, e))?;
        if existing.is_none() {
            let pool = staking::pool_address(&self.ctx).map_err(|e| ClientError::from_encode(operation, e))?;
            info!(operation, "pool token account missing, creating it in the same transaction");
            instructions.push(
                build_create_associated_token_account_idempotent(&user, &pool, &self.ctx.mint, &self.ctx.token_program)
                    .map_err(|e| ClientError::invalid(operation, e))?,
            );
        }
        instructions.push(encoded.instruction);

        self.execute(operation, encoded.address, &instructions).await
    }

    pub async fn claim_rewards(&self) -> Result<OperationOutcome, ClientError> {
        let ix = staking::claim_rewards(&self.ctx, &self.wallet_key());
        self.run(Operation::ClaimRewards, ix).await
    }

    pub async fn unstake(&self, amount: f64) -> Result<OperationOutcome, ClientError> {
        let ix = staking::unstake(&self.ctx, &self.wallet_key(), amount);
        self.run(Operation::Unstake, ix).await
    }

    pub async fn compound_rewards(&self) -> Result<OperationOutcome, ClientError> {
        let ix = staking::compound_rewards(&self.ctx, &self.wallet_key());
        self.run(Operation::CompoundRewards, ix).await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Decode the account at `address`, or `None` if it does not exist.
    pub async fn fetch_account<T: ProgramAccount>(&self, address: &Pubkey) -> Result<Option<T>, ClientError> {
        let info = self
            .network
            .get_account_info(address)
            .await
            .map_err(|e| ClientError::rpc(T::NAME, e))?;
        match info {
            None => Ok(None),
            Some(info) if info.owner != self.ctx.program_id => Err(ClientError::invalid(
                T::NAME,
                format!("{} is not owned by the program", bytes_to_address(address)),
            )),
            Some(info) => T::decode(&info.data)
                .map(Some)
                .map_err(|e| ClientError::from_encode(T::NAME, e)),
        }
    }

    /// Every `T` whose owner field equals `owner`.
    pub async fn fetch_all<T: ProgramAccount>(&self, owner: &Pubkey) -> Result<Vec<(Pubkey, T)>, ClientError> {
        let filters = [
            ProgramAccountFilter::DataSize(T::SPACE as u64),
            ProgramAccountFilter::Memcmp { offset: T::OWNER_OFFSET, bytes: owner.to_vec() },
        ];
        let accounts = self
            .network
            .get_program_accounts(&self.ctx.program_id, &filters)
            .await
            .map_err(|e| ClientError::rpc(T::NAME, e))?;

        let mut decoded = Vec::with_capacity(accounts.len());
        for (address, info) in accounts {
            match T::decode(&info.data) {
                Ok(account) => decoded.push((address, account)),
                Err(e) => warn!(
                    account = %bytes_to_address(&address),
                    error = %e,
                    "skipping undecodable {}",
                    T::NAME
                ),
            }
        }
        Ok(decoded)
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    async fn run(
        &self,
        operation: Operation,
        encoded: Result<EncodedInstruction, EncodeError>,
    ) -> Result<OperationOutcome, ClientError> {
        let encoded = encoded.map_err(|e| ClientError::from_encode(operation.name(), e))?;
        self.execute(operation.name(), encoded.address, &[encoded.instruction])
            .await
    }

    async fn execute(
        &self,
        operation: &'static str,
        address: Pubkey,
        instructions: &[SolInstruction],
    ) -> Result<OperationOutcome, ClientError> {
        let submission = self.submitter.submit(operation, instructions).await?;
        let confirmed = self.waiter.await_confirmation(&submission).await?;
        Ok(OperationOutcome {
            signature: confirmed.signature,
            address,
            logs: confirmed.logs,
        })
    }
}

/// Attribute an error raised by a helper read to the operation that made it.
fn retag(err: ClientError, operation: &'static str) -> ClientError {
    match err {
        ClientError::InvalidInput { reason, .. } => ClientError::InvalidInput { operation, reason },
        ClientError::Rpc { source, .. } => ClientError::Rpc { operation, source },
        other => other,
    }
}
