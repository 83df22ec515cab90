//! Shared test doubles for the client integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use borsh::BorshSerialize;
use chain_sol::{deserialize_transaction, signature_to_string, Pubkey, SolTransaction};
use mailfi_client::{
    AccountInfo, Blockhash, Commitment, ConfirmOptions, KeypairWallet, MailfiClient, Network,
    ProgramAccountFilter, RpcError, SendOptions, SignatureStatus, Submission, TransactionMeta,
    WalletCapability, WalletError,
};
use mailfi_programs::{ProgramAccount, ProgramContext};
use serde_json::Value;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DUMMY_PROGRAM_ID: Pubkey = [9u8; 32];
pub const DUMMY_MINT: Pubkey = [8u8; 32];
pub const DUMMY_RECIPIENT: Pubkey = [2u8; 32];
pub const DUMMY_WALLET_SEED: [u8; 32] = [7u8; 32];
/// A valid base58 32-byte blockhash.
pub const DUMMY_BLOCKHASH: &str = "11111111111111111111111111111111";
pub const DUMMY_LAST_VALID_BLOCK_HEIGHT: u64 = 1_000;
pub const DUMMY_NOW: i64 = 1_700_000_000;

pub fn fixed_now() -> i64 {
    DUMMY_NOW
}

pub fn test_context() -> ProgramContext {
    ProgramContext::new(DUMMY_PROGRAM_ID, DUMMY_MINT)
}

pub fn fast_options() -> ConfirmOptions {
    ConfirmOptions {
        commitment: Commitment::Confirmed,
        poll_interval: Duration::from_millis(5),
        timeout: Duration::from_millis(300),
        max_read_retries: 3,
        log_fetch_attempts: 2,
    }
}

pub fn submission(signature: &str) -> Submission {
    Submission {
        operation: "createEscrow",
        signature: signature.to_string(),
        last_valid_block_height: DUMMY_LAST_VALID_BLOCK_HEIGHT,
    }
}

pub fn confirmed_status(err: Option<Value>) -> SignatureStatus {
    SignatureStatus {
        slot: 4_242,
        confirmation_status: Some(Commitment::Confirmed),
        err,
    }
}

pub fn processed_status() -> SignatureStatus {
    SignatureStatus {
        slot: 4_241,
        confirmation_status: Some(Commitment::Processed),
        err: None,
    }
}

/// Program-owned account data padded to the record's allocation.
pub fn account_data<T: BorshSerialize + ProgramAccount>(value: &T) -> Vec<u8> {
    let mut data = value.try_to_vec().unwrap();
    data.resize(T::SPACE, 0);
    data
}

pub fn program_account(data: Vec<u8>) -> AccountInfo {
    AccountInfo {
        lamports: 2_000_000,
        owner: DUMMY_PROGRAM_ID,
        data,
        executable: false,
    }
}

// ============================================================================
// RECORDING NETWORK
// ============================================================================

/// In-memory node. Every call is recorded by method name; statuses are
/// served from a script, repeating the last entry once it runs out.
#[derive(Default)]
pub struct MockNetwork {
    pub calls: Mutex<Vec<&'static str>>,
    pub sent: Mutex<Vec<SolTransaction>>,
    pub accounts: Mutex<HashMap<Pubkey, AccountInfo>>,
    pub program_accounts: Mutex<Vec<(Pubkey, AccountInfo)>>,
    pub last_filters: Mutex<Vec<ProgramAccountFilter>>,
    statuses: Mutex<VecDeque<Result<Option<SignatureStatus>, RpcError>>>,
    transaction: Mutex<Option<TransactionMeta>>,
    transaction_failures: Mutex<u32>,
    block_height: Mutex<u64>,
    block_height_step: Mutex<u64>,
    send_error: Mutex<Option<RpcError>>,
    status_delay: Mutex<Option<Duration>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    pub fn push_status(&self, status: Result<Option<SignatureStatus>, RpcError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn set_transaction(&self, meta: TransactionMeta) {
        *self.transaction.lock().unwrap() = Some(meta);
    }

    /// Fail the next `n` getTransaction calls.
    pub fn fail_transaction_reads(&self, n: u32) {
        *self.transaction_failures.lock().unwrap() = n;
    }

    /// Block height starts at `start` and grows by `step` per read.
    pub fn set_block_height(&self, start: u64, step: u64) {
        *self.block_height.lock().unwrap() = start;
        *self.block_height_step.lock().unwrap() = step;
    }

    /// Every status read stalls for `delay` before answering.
    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_send_error(&self, err: RpcError) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    pub fn insert_account(&self, address: Pubkey, info: AccountInfo) {
        self.accounts.lock().unwrap().insert(address, info);
    }

    pub fn sent(&self) -> Vec<SolTransaction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        self.record("getAccountInfo");
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Blockhash, RpcError> {
        self.record("getLatestBlockhash");
        Ok(Blockhash {
            hash: DUMMY_BLOCKHASH.to_string(),
            last_valid_block_height: DUMMY_LAST_VALID_BLOCK_HEIGHT,
        })
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        self.record("getBlockHeight");
        let mut height = self.block_height.lock().unwrap();
        let current = *height;
        *height += *self.block_height_step.lock().unwrap();
        Ok(current)
    }

    async fn get_signature_status(&self, _signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        self.record("getSignatureStatuses");
        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            return statuses.pop_front().unwrap_or(Ok(None));
        }
        statuses.front().cloned().unwrap_or(Ok(None))
    }

    async fn get_transaction(&self, _signature: &str) -> Result<Option<TransactionMeta>, RpcError> {
        self.record("getTransaction");
        let mut failures = self.transaction_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(RpcError::Transport("connection reset".into()));
        }
        Ok(self.transaction.lock().unwrap().clone())
    }

    async fn get_program_accounts(
        &self,
        _program_id: &Pubkey,
        filters: &[ProgramAccountFilter],
    ) -> Result<Vec<(Pubkey, AccountInfo)>, RpcError> {
        self.record("getProgramAccounts");
        *self.last_filters.lock().unwrap() = filters.to_vec();
        Ok(self.program_accounts.lock().unwrap().clone())
    }

    async fn send_transaction(&self, wire: &[u8], _options: &SendOptions) -> Result<String, RpcError> {
        self.record("sendTransaction");
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        let (signatures, tx) = deserialize_transaction(wire).map_err(|e| RpcError::Decode(e.to_string()))?;
        self.sent.lock().unwrap().push(tx);
        Ok(signature_to_string(&signatures[0]))
    }
}

// ============================================================================
// WALLETS
// ============================================================================

/// A wallet whose user always declines.
pub struct RejectingWallet {
    pub key: Pubkey,
}

#[async_trait]
impl WalletCapability for RejectingWallet {
    fn public_key(&self) -> Pubkey {
        self.key
    }

    async fn sign_and_send(
        &self,
        _tx: &SolTransaction,
        _network: &dyn Network,
        _options: &SendOptions,
    ) -> Result<String, WalletError> {
        Err(WalletError::Rejected("User rejected the request.".into()))
    }
}

pub fn keypair_wallet() -> Arc<KeypairWallet> {
    Arc::new(KeypairWallet::from_seed(DUMMY_WALLET_SEED))
}

/// Client over a fresh mock network with a local keypair and a fixed clock.
pub fn setup_client() -> (Arc<MockNetwork>, MailfiClient) {
    let network = MockNetwork::new();
    let client = MailfiClient::new(test_context(), keypair_wallet(), network.clone(), fast_options())
        .unwrap()
        .with_clock(fixed_now);
    (network, client)
}
