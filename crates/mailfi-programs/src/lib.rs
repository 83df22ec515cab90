//! Instruction encoding for the MailFi escrow / multisig / recurring-payment /
//! staking program.
//!
//! Every builder is pure: it validates typed input, derives the program
//! addresses it needs and returns an [`EncodedInstruction`] whose account
//! list is in the exact positional order the program reads. Nothing here
//! touches the network.
//!
//! Instruction data is an 8-byte discriminator followed by little-endian
//! integers, raw 32-byte keys and u8-length-prefixed strings (see
//! [`layout`]). Account state is decoded with borsh (see [`state`]).

mod b58;

pub mod amount;
pub mod context;
pub mod decode;
pub mod discriminator;
pub mod error;
pub mod escrow;
pub mod layout;
pub mod multisig;
pub mod recurring;
pub mod seeds;
pub mod staking;
pub mod state;

pub use amount::{to_base_units, PYUSD_DECIMALS};
pub use context::{
    EncodedInstruction, ProgramContext, DEFAULT_PROGRAM_ID, PYUSD_DEVNET_MINT, PYUSD_MAINNET_MINT,
};
pub use decode::{decode_instruction_data, DecodedInstruction, InstructionArgs};
pub use discriminator::Operation;
pub use error::EncodeError;
pub use seeds::SeedAllocator;
pub use recurring::PaymentInterval;
pub use staking::{LockPeriod, StakingTier};
pub use state::ProgramAccount;
