use chain_sol::SolError;
use thiserror::Error;

/// Errors raised while validating, encoding or decoding program data.
///
/// Every variant is raised before any network call is made.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{field} is {len} bytes, limit is {max}")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("address derivation failed: {0}")]
    Derivation(#[from] SolError),

    #[error("unknown discriminator {}", hex_bytes(.0))]
    UnknownDiscriminator([u8; 8]),

    #[error("instruction data truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after instruction data")]
    TrailingBytes(usize),

    #[error("invalid account data: {0}")]
    AccountData(String),
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
