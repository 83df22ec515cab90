//! Submit-and-confirm layer for the MailFi program.
//!
//! [`MailfiClient`] wires the pure encoders in `mailfi_programs` to a
//! [`Network`] and a [`WalletCapability`], both passed in explicitly:
//!
//! 1. validate and encode (no network traffic on bad input),
//! 2. [`Submitter`]: fetch a blockhash, compile, let the wallet sign and send,
//! 3. [`ConfirmationWaiter`]: poll to the target commitment and collect logs.

pub mod bridge;
pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod network;
pub mod rpc;
pub mod submit;
pub mod wallet;

pub use client::{MailfiClient, OperationOutcome};
pub use config::ClientConfig;
pub use confirm::{ConfirmOptions, Confirmed, ConfirmationWaiter};
pub use error::{ClientError, RpcError, WalletError};
pub use network::{
    AccountInfo, Blockhash, Commitment, Network, ProgramAccountFilter, SendOptions, SignatureStatus,
    TransactionMeta,
};
pub use rpc::RpcClient;
pub use submit::{Submission, Submitter};
pub use wallet::{KeypairWallet, WalletCapability};
