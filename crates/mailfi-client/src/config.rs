//! Client configuration
//!
//! Loaded from a TOML file with `MAILFI_` environment overrides, e.g.
//! `MAILFI_NETWORK__RPC_URL=http://127.0.0.1:8899`.

use std::path::Path;
use std::time::Duration;

use chain_sol::{address_to_bytes, bytes_to_address, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID};
use mailfi_programs::{ProgramContext, DEFAULT_PROGRAM_ID, PYUSD_DECIMALS, PYUSD_DEVNET_MINT};
use serde::{Deserialize, Serialize};

use crate::confirm::ConfirmOptions;
use crate::error::ClientError;
use crate::network::Commitment;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const ENV_PREFIX: &str = "MAILFI";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    pub program: ProgramConfig,
    pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub commitment: Commitment,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: Commitment::Confirmed,
        }
    }
}

/// Deployment addresses, base58.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub program_id: String,
    pub mint: String,
    pub token_program: String,
    pub decimals: u8,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            mint: PYUSD_DEVNET_MINT.to_string(),
            token_program: bytes_to_address(&TOKEN_2022_PROGRAM_ID),
            decimals: PYUSD_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
    pub max_read_retries: u32,
    pub log_fetch_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        let defaults = ConfirmOptions::default();
        Self {
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
            timeout_secs: defaults.timeout.as_secs(),
            max_read_retries: defaults.max_read_retries,
            log_fetch_attempts: defaults.log_fetch_attempts,
        }
    }
}

impl ClientConfig {
    /// Load defaults, then `path` (if any), then `MAILFI_*` variables.
    pub fn load_from_path(path: Option<&Path>) -> Result<Self, ClientError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: ClientConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.network.rpc_url.starts_with("http://") && !self.network.rpc_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "rpc_url must be an http(s) URL, got {:?}",
                self.network.rpc_url
            )));
        }

        let ctx = self.to_program_context()?;
        if ctx.token_program != TOKEN_PROGRAM_ID && ctx.token_program != TOKEN_2022_PROGRAM_ID {
            return Err(ClientError::Config(format!(
                "token_program {} is neither SPL Token nor Token-2022",
                self.program.token_program
            )));
        }

        if self.confirmation.poll_interval_ms == 0 {
            return Err(ClientError::Config("poll_interval_ms must be greater than 0".into()));
        }
        if self.confirmation.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn to_program_context(&self) -> Result<ProgramContext, ClientError> {
        let key = |field: &str, value: &str| {
            address_to_bytes(value).map_err(|e| ClientError::Config(format!("program.{field}: {e}")))
        };
        Ok(
            ProgramContext::new(key("program_id", &self.program.program_id)?, key("mint", &self.program.mint)?)
                .with_token_program(key("token_program", &self.program.token_program)?)
                .with_decimals(self.program.decimals),
        )
    }

    pub fn confirm_options(&self) -> ConfirmOptions {
        ConfirmOptions {
            commitment: self.network.commitment,
            poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms),
            timeout: Duration::from_secs(self.confirmation.timeout_secs),
            max_read_retries: self.confirmation.max_read_retries,
            log_fetch_attempts: self.confirmation.log_fetch_attempts,
        }
    }
}
