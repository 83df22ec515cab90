//! Solana JSON-RPC client
//!
//! Implements [`Network`] over HTTP with `reqwest`. Only the handful of
//! methods the submit/confirm/query paths need are covered.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chain_sol::{address_to_bytes, bytes_to_address, Pubkey};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::RpcError;
use crate::network::{
    AccountInfo, Blockhash, Commitment, Network, ProgramAccountFilter, SendOptions, SignatureStatus,
    TransactionMeta,
};

/// Simulation failure returned by `sendTransaction` preflight.
const SEND_TRANSACTION_PREFLIGHT_FAILURE: i64 = -32002;

// ============================================================================
// WIRE STRUCTURES
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// `{ context, value }` envelope used by most account/state methods.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcAccount {
    lamports: u64,
    owner: String,
    /// `[base64, "base64"]`
    data: (String, String),
    #[serde(default)]
    executable: bool,
}

impl RpcAccount {
    fn into_account_info(self) -> Result<AccountInfo, RpcError> {
        let owner = address_to_bytes(&self.owner).map_err(|e| RpcError::Decode(e.to_string()))?;
        let data = BASE64
            .decode(self.data.0)
            .map_err(|e| RpcError::Decode(format!("account data: {e}")))?;
        Ok(AccountInfo {
            lamports: self.lamports,
            owner,
            data,
            executable: self.executable,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    slot: u64,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    confirmation_status: Option<Commitment>,
}

#[derive(Debug, Deserialize)]
struct RpcKeyedAccount {
    pubkey: String,
    account: RpcAccount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransactionMeta {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    log_messages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    slot: u64,
    meta: Option<RpcTransactionMeta>,
}

// ============================================================================
// CLIENT
// ============================================================================

/// JSON-RPC [`Network`] implementation.
pub struct RpcClient {
    client: Client,
    rpc_url: String,
    commitment: Commitment,
}

impl RpcClient {
    /// Creates a client for `rpc_url` reading at `commitment`.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - HTTP endpoint of the node (e.g. "https://api.devnet.solana.com")
    /// * `commitment` - Commitment used for reads and preflight
    pub fn new(rpc_url: &str, commitment: Commitment) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy()
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            commitment,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Sends one request and returns `result`, which may legitimately be null.
    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Option<T>, RpcError> {
        let request = JsonRpcRequest { jsonrpc: "2.0", method, params, id: 1 };
        debug!(method, url = %self.rpc_url, "rpc request");

        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{method} to {}: {e}", self.rpc_url)))?
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("{method} response: {e}")))?;

        if let Some(error) = response.error {
            return Err(classify_error(error));
        }
        Ok(response.result)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, RpcError> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| RpcError::Decode(format!("{method} returned no result")))
    }

    fn read_config(&self) -> Value {
        json!({ "commitment": self.commitment, "encoding": "base64" })
    }
}

/// Map a JSON-RPC error object, pulling simulation logs out of preflight
/// failures.
fn classify_error(error: JsonRpcError) -> RpcError {
    if error.code != SEND_TRANSACTION_PREFLIGHT_FAILURE {
        return RpcError::Server { code: error.code, message: error.message };
    }

    let data = error.data.unwrap_or(Value::Null);
    let logs = data
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| logs.iter().filter_map(|l| l.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();
    let account_in_use = data.get("err").is_some_and(is_account_in_use)
        || error.message.contains("AccountInUse")
        || error.message.contains("Account in use");

    RpcError::Preflight { message: error.message, logs, account_in_use }
}

/// `"AccountInUse"` as the node renders `TransactionError::AccountInUse`.
pub(crate) fn is_account_in_use(err: &Value) -> bool {
    err.as_str() == Some("AccountInUse")
}

fn filter_json(filter: &ProgramAccountFilter) -> Value {
    match filter {
        ProgramAccountFilter::DataSize(size) => json!({ "dataSize": size }),
        ProgramAccountFilter::Memcmp { offset, bytes } => json!({
            "memcmp": { "offset": offset, "bytes": bs58::encode(bytes).into_string() }
        }),
    }
}

#[async_trait]
impl Network for RpcClient {
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let response: WithContext<Option<RpcAccount>> = self
            .call("getAccountInfo", vec![json!(bytes_to_address(address)), self.read_config()])
            .await?;
        response.value.map(RpcAccount::into_account_info).transpose()
    }

    async fn get_latest_blockhash(&self) -> Result<Blockhash, RpcError> {
        let response: WithContext<RpcBlockhash> = self
            .call("getLatestBlockhash", vec![json!({ "commitment": self.commitment })])
            .await?;
        Ok(Blockhash {
            hash: response.value.blockhash,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        self.call("getBlockHeight", vec![json!({ "commitment": self.commitment })])
            .await
    }

    async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, RpcError> {
        let response: WithContext<Vec<Option<RpcSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                vec![json!([signature]), json!({ "searchTransactionHistory": true })],
            )
            .await?;
        Ok(response.value.into_iter().next().flatten().map(|s| SignatureStatus {
            slot: s.slot,
            confirmation_status: s.confirmation_status,
            err: s.err,
        }))
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<TransactionMeta>, RpcError> {
        // getTransaction does not accept "processed".
        let commitment = self.commitment.max(Commitment::Confirmed);
        let tx: Option<RpcTransaction> = self
            .call_optional(
                "getTransaction",
                vec![
                    json!(signature),
                    json!({
                        "encoding": "json",
                        "commitment": commitment,
                        "maxSupportedTransactionVersion": 0,
                    }),
                ],
            )
            .await?;

        Ok(tx.map(|tx| {
            let meta = tx.meta.unwrap_or(RpcTransactionMeta { err: None, log_messages: None });
            TransactionMeta {
                slot: tx.slot,
                err: meta.err,
                log_messages: meta.log_messages.unwrap_or_default(),
            }
        }))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[ProgramAccountFilter],
    ) -> Result<Vec<(Pubkey, AccountInfo)>, RpcError> {
        let mut config = self.read_config();
        config["filters"] = Value::Array(filters.iter().map(filter_json).collect());

        let accounts: Vec<RpcKeyedAccount> = self
            .call("getProgramAccounts", vec![json!(bytes_to_address(program_id)), config])
            .await?;

        accounts
            .into_iter()
            .map(|keyed| {
                let key = address_to_bytes(&keyed.pubkey).map_err(|e| RpcError::Decode(e.to_string()))?;
                Ok((key, keyed.account.into_account_info()?))
            })
            .collect()
    }

    async fn send_transaction(&self, wire: &[u8], options: &SendOptions) -> Result<String, RpcError> {
        let mut config = json!({
            "encoding": "base64",
            "skipPreflight": options.skip_preflight,
            "preflightCommitment": options.preflight_commitment,
        });
        if let Some(max_retries) = options.max_retries {
            config["maxRetries"] = json!(max_retries);
        }
        self.call("sendTransaction", vec![json!(BASE64.encode(wire)), config])
            .await
    }
}
