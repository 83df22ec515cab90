//! Solana primitives for the MailFi client.
//!
//! Addresses, program-derived addresses, associated token accounts and the
//! legacy transaction wire format are implemented by hand on top of
//! `ed25519-dalek`, `curve25519-dalek`, `sha2` and `bs58`, without
//! `solana-sdk`.

pub mod address;
pub mod error;
pub mod pda;
pub mod spl_token;
pub mod transaction;

pub use address::{
    address_to_bytes, bytes_to_address, is_on_curve, signature_from_str, signature_to_string,
    Pubkey,
};
pub use error::SolError;
pub use pda::{create_program_address, find_program_address};
pub use spl_token::{
    build_create_associated_token_account_idempotent, derive_associated_token_address,
    ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    compile_transaction, decode_compact_u16, deserialize_transaction, encode_compact_u16,
    serialize_message, serialize_transaction, sign_transaction, CompiledInstruction,
    SignedTransaction, SolAccountMeta, SolInstruction, SolTransaction, PACKET_DATA_SIZE,
    SYSTEM_PROGRAM_ID,
};
