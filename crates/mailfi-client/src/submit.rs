//! Build, sign and broadcast.

use std::sync::Arc;

use chain_sol::{
    bytes_to_address, compile_transaction, is_on_curve, serialize_transaction, Pubkey, SolInstruction,
};
use tracing::{debug, info};

use crate::error::{ClientError, RpcError, WalletError};
use crate::network::{Network, SendOptions};
use crate::wallet::WalletCapability;

/// A broadcast transaction awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub operation: &'static str,
    pub signature: String,
    /// Block height after which the blockhash, and so the transaction, is dead.
    pub last_valid_block_height: u64,
}

pub struct Submitter {
    wallet: Arc<dyn WalletCapability>,
    network: Arc<dyn Network>,
    options: SendOptions,
}

impl Submitter {
    /// Fails if the wallet's key cannot sign, e.g. a program-derived address.
    pub fn new(wallet: Arc<dyn WalletCapability>, network: Arc<dyn Network>) -> Result<Self, ClientError> {
        let key = wallet.public_key();
        if !is_on_curve(&key) {
            return Err(ClientError::invalid(
                "connectWallet",
                format!("{} is not an ed25519 public key", bytes_to_address(&key)),
            ));
        }
        Ok(Self { wallet, network, options: SendOptions::default() })
    }

    pub fn payer(&self) -> Pubkey {
        self.wallet.public_key()
    }

    /// Compile `instructions` with the wallet as fee payer, hand them to the
    /// wallet and return once the node has accepted the broadcast.
    pub async fn submit(
        &self,
        operation: &'static str,
        instructions: &[SolInstruction],
    ) -> Result<Submission, ClientError> {
        let payer = self.payer();
        let blockhash = self
            .network
            .get_latest_blockhash()
            .await
            .map_err(|e| ClientError::rpc(operation, e))?;
        let recent: [u8; 32] = bs58::decode(&blockhash.hash)
            .into_vec()
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                ClientError::rpc(operation, RpcError::Decode(format!("blockhash {}", blockhash.hash)))
            })?;

        let tx = compile_transaction(instructions, &payer, &recent)
            .map_err(|e| ClientError::invalid(operation, e))?;
        // Placeholder signatures: reject oversized transactions before the
        // wallet prompts anyone.
        let placeholders = vec![[0u8; 64]; tx.num_required_signatures as usize];
        serialize_transaction(&tx, &placeholders).map_err(|e| ClientError::invalid(operation, e))?;
        debug!(operation, accounts = tx.account_keys.len(), "transaction compiled");

        let signature = self
            .wallet
            .sign_and_send(&tx, self.network.as_ref(), &self.options)
            .await
            .map_err(|e| wallet_failure(operation, e))?;

        info!(operation, %signature, last_valid_block_height = blockhash.last_valid_block_height, "transaction broadcast");
        Ok(Submission {
            operation,
            signature,
            last_valid_block_height: blockhash.last_valid_block_height,
        })
    }
}

fn wallet_failure(operation: &'static str, err: WalletError) -> ClientError {
    match err {
        WalletError::Send(RpcError::Preflight { logs, account_in_use: true, .. }) => {
            ClientError::AccountContention { operation, signature: None, logs }
        }
        WalletError::Send(RpcError::Preflight { message, logs, .. }) => {
            ClientError::PreflightRejected { operation, message, logs }
        }
        WalletError::Send(source) => ClientError::rpc(operation, source),
        WalletError::Rejected(reason) => ClientError::WalletRejected { operation, reason },
        other => ClientError::WalletRejected { operation, reason: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_contention_maps_to_retryable() {
        let err = wallet_failure(
            "stake",
            WalletError::Send(RpcError::Preflight {
                message: "Account in use".into(),
                logs: vec![],
                account_in_use: true,
            }),
        );
        assert!(err.is_retryable());
        assert_eq!(err.signature(), None);
    }

    #[test]
    fn wallet_reason_is_kept_verbatim() {
        let err = wallet_failure("fundEscrow", WalletError::Rejected("User rejected the request.".into()));
        match err {
            ClientError::WalletRejected { operation, reason } => {
                assert_eq!(operation, "fundEscrow");
                assert_eq!(reason, "User rejected the request.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn preflight_failure_keeps_logs() {
        let err = wallet_failure(
            "fundEscrow",
            WalletError::Send(RpcError::Preflight {
                message: "simulation failed".into(),
                logs: vec!["Program log: AlreadyFunded".into()],
                account_in_use: false,
            }),
        );
        assert!(matches!(err, ClientError::PreflightRejected { .. }));
        assert_eq!(err.logs(), &["Program log: AlreadyFunded".to_string()]);
    }
}
