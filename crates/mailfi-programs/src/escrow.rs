//! Escrow instructions: create, fund, claim, cancel.
//!
//! An escrow is created empty at `["escrow", creator, seed_id]`, funded by its
//! creator, then either claimed by the recipient or cancelled by the creator
//! once `expiry_time` has passed.

use chain_sol::{Pubkey, SolAccountMeta, SYSTEM_PROGRAM_ID};
use serde::{Deserialize, Serialize};

use crate::context::{EncodedInstruction, ProgramContext};
use crate::discriminator::Operation;
use crate::error::EncodeError;
use crate::layout::{FieldReader, FieldWriter};
use crate::seeds::escrow_address;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// `createEscrow` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEscrowArgs {
    pub amount: u64,
    #[serde(with = "crate::b58")]
    pub recipient: Pubkey,
    pub expiry_time: i64,
    pub description: String,
}

impl CreateEscrowArgs {
    pub(crate) fn write(&self, w: FieldWriter) -> Result<FieldWriter, EncodeError> {
        w.u64(self.amount)
            .pubkey(&self.recipient)
            .i64(self.expiry_time)
            .string("description", &self.description)
    }

    pub(crate) fn read(r: &mut FieldReader<'_>) -> Result<Self, EncodeError> {
        Ok(Self {
            amount: r.u64()?,
            recipient: r.pubkey()?,
            expiry_time: r.i64()?,
            description: r.string()?,
        })
    }
}

/// Typed request for [`create_escrow`].
#[derive(Debug, Clone)]
pub struct CreateEscrow<'a> {
    pub creator: Pubkey,
    /// PDA seed component, normally from a `SeedAllocator`.
    pub seed_id: i64,
    pub amount: f64,
    pub recipient: Pubkey,
    /// Unix seconds after which the creator may cancel.
    pub expiry_time: i64,
    pub description: &'a str,
    /// Current unix time, used only to reject past expiries.
    pub now: i64,
}

/// Expiry `days` whole days after `now`.
pub fn expiry_in_days(now: i64, days: u32) -> i64 {
    now.saturating_add(i64::from(days) * SECONDS_PER_DAY)
}

/// `[escrowPDA(w), creator(s,w), systemProgram]`
pub fn create_escrow(
    ctx: &ProgramContext,
    req: &CreateEscrow<'_>,
) -> Result<EncodedInstruction, EncodeError> {
    if req.expiry_time <= req.now {
        return Err(EncodeError::InvalidArgument(format!(
            "expiry {} is not after current time {}",
            req.expiry_time, req.now
        )));
    }

    let args = CreateEscrowArgs {
        amount: ctx.base_units(req.amount)?,
        recipient: req.recipient,
        expiry_time: req.expiry_time,
        description: req.description.to_owned(),
    };
    let data = args.write(FieldWriter::new(Operation::CreateEscrow.discriminator()))?.finish();

    let (escrow, _) = escrow_address(&ctx.program_id, &req.creator, req.seed_id)?;
    let accounts = vec![
        SolAccountMeta::writable(escrow),
        SolAccountMeta::writable_signer(req.creator),
        SolAccountMeta::readonly(SYSTEM_PROGRAM_ID),
    ];

    Ok(EncodedInstruction {
        operation: Operation::CreateEscrow,
        address: escrow,
        instruction: ctx.instruction(accounts, data),
    })
}

/// Shared shape of fund / claim / cancel:
/// `[escrowPDA(w), signer(s,w), escrowTokenAcct(w), signerTokenAcct(w), mint, tokenProgram]`
fn escrow_transfer(
    ctx: &ProgramContext,
    operation: Operation,
    signer: &Pubkey,
    escrow: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let mut accounts = vec![
        SolAccountMeta::writable(*escrow),
        SolAccountMeta::writable_signer(*signer),
        SolAccountMeta::writable(ctx.token_account(escrow)?),
        SolAccountMeta::writable(ctx.token_account(signer)?),
    ];
    accounts.extend(ctx.token_accounts());

    Ok(EncodedInstruction {
        operation,
        address: *escrow,
        instruction: ctx.instruction(accounts, operation.discriminator().to_vec()),
    })
}

/// Move the escrowed amount from the creator into the escrow's token account.
pub fn fund_escrow(
    ctx: &ProgramContext,
    creator: &Pubkey,
    escrow: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    escrow_transfer(ctx, Operation::FundEscrow, creator, escrow)
}

/// Release a funded escrow to its recipient.
pub fn claim_escrow(
    ctx: &ProgramContext,
    recipient: &Pubkey,
    escrow: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    escrow_transfer(ctx, Operation::ClaimEscrow, recipient, escrow)
}

/// Return an expired, unclaimed escrow to its creator.
pub fn cancel_escrow(
    ctx: &ProgramContext,
    creator: &Pubkey,
    escrow: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    escrow_transfer(ctx, Operation::CancelEscrow, creator, escrow)
}
