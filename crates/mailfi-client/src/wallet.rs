//! Signing capability.

use std::fmt;

use async_trait::async_trait;
use chain_sol::{bytes_to_address, sign_transaction, signature_to_string, Pubkey, SolTransaction};
use ed25519_dalek::SigningKey;
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::network::{Network, SendOptions};

/// Something that can authorize and broadcast a transaction for one key.
///
/// A browser or hardware wallet signs and sends in one step, so the trait
/// does too: the submitter never sees the secret.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    fn public_key(&self) -> Pubkey;

    /// Sign `tx` as its fee payer and broadcast it through `network`.
    /// Returns the base58 transaction signature.
    async fn sign_and_send(
        &self,
        tx: &SolTransaction,
        network: &dyn Network,
        options: &SendOptions,
    ) -> Result<String, WalletError>;
}

/// A local ed25519 keypair.
pub struct KeypairWallet {
    seed: Zeroizing<[u8; 32]>,
    public_key: Pubkey,
}

impl KeypairWallet {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let public_key = SigningKey::from_bytes(&seed).verifying_key().to_bytes();
        Self { seed: Zeroizing::new(seed), public_key }
    }

    /// Accepts either a 32-byte seed or the 64-byte `seed || pubkey` form
    /// produced by `solana-keygen`, base58 encoded.
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| WalletError::InvalidKey(e.to_string()))?,
        );
        let mut seed = [0u8; 32];
        match bytes.len() {
            32 => seed.copy_from_slice(&bytes),
            64 => seed.copy_from_slice(&bytes[..32]),
            n => return Err(WalletError::InvalidKey(format!("expected 32 or 64 bytes, got {n}"))),
        }
        let wallet = Self::from_seed(seed);
        if bytes.len() == 64 && bytes[32..] != wallet.public_key {
            return Err(WalletError::InvalidKey("public half does not match seed".into()));
        }
        Ok(wallet)
    }
}

impl fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("public_key", &bytes_to_address(&self.public_key))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletCapability for KeypairWallet {
    fn public_key(&self) -> Pubkey {
        self.public_key
    }

    async fn sign_and_send(
        &self,
        tx: &SolTransaction,
        network: &dyn Network,
        options: &SendOptions,
    ) -> Result<String, WalletError> {
        let signed = sign_transaction(tx, &self.seed)?;
        let expected = signature_to_string(&signed.signature);
        let returned = network.send_transaction(&signed.wire, options).await?;
        if returned != expected {
            warn!(%expected, %returned, "node echoed a different signature");
        }
        Ok(expected)
    }
}
