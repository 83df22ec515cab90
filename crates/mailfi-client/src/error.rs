use chain_sol::SolError;
use mailfi_programs::EncodeError;
use thiserror::Error;

/// JSON-RPC transport and protocol errors.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Server { code: i64, message: String },

    /// `sendTransaction` simulation failed (code -32002).
    #[error("preflight failed: {message}")]
    Preflight {
        message: String,
        logs: Vec<String>,
        account_in_use: bool,
    },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

/// Errors raised by a [`crate::WalletCapability`].
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("rejected by wallet: {0}")]
    Rejected(String),

    #[error("invalid keypair: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(#[from] SolError),

    #[error("send failed: {0}")]
    Send(#[from] RpcError),
}

/// Outcome classes of a high-level operation.
///
/// Everything except `Config` names the operation it came from so a caller
/// juggling several in-flight operations can tell them apart.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{operation}: invalid input: {reason}")]
    InvalidInput { operation: &'static str, reason: String },

    #[error("{operation}: wallet rejected the transaction: {reason}")]
    WalletRejected { operation: &'static str, reason: String },

    #[error("{operation}: preflight simulation failed: {message}")]
    PreflightRejected {
        operation: &'static str,
        message: String,
        logs: Vec<String>,
    },

    #[error("{operation}: transaction {signature} failed: {error_detail}")]
    ExecutionFailed {
        operation: &'static str,
        signature: String,
        error_detail: String,
        logs: Vec<String>,
    },

    /// The transaction may or may not have landed.
    #[error("{operation}: transaction {signature} not confirmed before its blockhash expired")]
    ConfirmationTimeout { operation: &'static str, signature: String },

    #[error("{operation}: account in use by another transaction")]
    AccountContention {
        operation: &'static str,
        signature: Option<String>,
        logs: Vec<String>,
    },

    #[error("{operation}: stopped waiting for {signature}")]
    Cancelled { operation: &'static str, signature: String },

    #[error("{operation}: {source}")]
    Rpc {
        operation: &'static str,
        #[source]
        source: RpcError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub(crate) fn invalid(operation: &'static str, err: impl ToString) -> Self {
        ClientError::InvalidInput { operation, reason: err.to_string() }
    }

    pub(crate) fn rpc(operation: &'static str, source: RpcError) -> Self {
        ClientError::Rpc { operation, source }
    }

    pub(crate) fn from_encode(operation: &'static str, err: EncodeError) -> Self {
        Self::invalid(operation, err)
    }

    pub fn operation(&self) -> Option<&'static str> {
        match self {
            ClientError::InvalidInput { operation, .. }
            | ClientError::WalletRejected { operation, .. }
            | ClientError::PreflightRejected { operation, .. }
            | ClientError::ExecutionFailed { operation, .. }
            | ClientError::ConfirmationTimeout { operation, .. }
            | ClientError::AccountContention { operation, .. }
            | ClientError::Cancelled { operation, .. }
            | ClientError::Rpc { operation, .. } => Some(operation),
            ClientError::Config(_) => None,
        }
    }

    /// Signature of the broadcast transaction, if it got that far.
    pub fn signature(&self) -> Option<&str> {
        match self {
            ClientError::ExecutionFailed { signature, .. }
            | ClientError::ConfirmationTimeout { signature, .. }
            | ClientError::Cancelled { signature, .. } => Some(signature),
            ClientError::AccountContention { signature, .. } => signature.as_deref(),
            _ => None,
        }
    }

    /// Program logs captured by simulation or execution.
    pub fn logs(&self) -> &[String] {
        match self {
            ClientError::PreflightRejected { logs, .. }
            | ClientError::ExecutionFailed { logs, .. }
            | ClientError::AccountContention { logs, .. } => logs,
            _ => &[],
        }
    }

    /// Worth resubmitting unchanged once the competing transaction lands.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::AccountContention { .. })
    }

    /// Outcome unknown: check the signature before resubmitting.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ClientError::ConfirmationTimeout { .. })
    }
}
