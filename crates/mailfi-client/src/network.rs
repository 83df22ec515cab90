//! The read/broadcast surface the client needs from a Solana node.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chain_sol::Pubkey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// Commitment levels, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockhash {
    /// Base58 blockhash.
    pub hash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmation_status: Option<Commitment>,
    /// Transaction error as reported by the node; `None` on success.
    pub err: Option<Value>,
}

impl SignatureStatus {
    /// Whether the transaction has reached `target`.
    pub fn reached(&self, target: Commitment) -> bool {
        self.confirmation_status.is_some_and(|c| c >= target)
    }
}

/// The parts of `getTransaction` the waiter reports back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionMeta {
    pub slot: u64,
    pub err: Option<Value>,
    pub log_messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramAccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
    /// Node-side rebroadcast attempts; `None` leaves the node default.
    pub max_retries: Option<usize>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
            max_retries: None,
        }
    }
}

/// Solana node capability. Implemented over JSON-RPC by [`crate::RpcClient`]
/// and by in-memory doubles in tests.
#[async_trait]
pub trait Network: Send + Sync {
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError>;

    async fn get_latest_blockhash(&self) -> Result<Blockhash, RpcError>;

    async fn get_block_height(&self) -> Result<u64, RpcError>;

    /// `None` while the node has not seen the signature.
    async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError>;

    async fn get_transaction(&self, signature: &str) -> Result<Option<TransactionMeta>, RpcError>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[ProgramAccountFilter],
    ) -> Result<Vec<(Pubkey, AccountInfo)>, RpcError>;

    /// Broadcast a signed wire transaction, returning its signature.
    async fn send_transaction(&self, wire: &[u8], options: &SendOptions) -> Result<String, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commitment_ordering() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
        assert_eq!("Finalized".parse::<Commitment>().unwrap(), Commitment::Finalized);
        assert!("rooted".parse::<Commitment>().is_err());
    }

    #[test]
    fn status_reaches_target_at_or_above() {
        let status = SignatureStatus {
            slot: 10,
            confirmation_status: Some(Commitment::Confirmed),
            err: None,
        };
        assert!(status.reached(Commitment::Processed));
        assert!(status.reached(Commitment::Confirmed));
        assert!(!status.reached(Commitment::Finalized));

        let unknown = SignatureStatus { confirmation_status: None, ..status };
        assert!(!unknown.reached(Commitment::Processed));
    }

    #[test]
    fn commitment_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Commitment::Processed).unwrap(), json!("processed"));
    }
}
