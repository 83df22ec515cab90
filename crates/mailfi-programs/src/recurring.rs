//! Recurring payment instructions.

use borsh::{BorshDeserialize, BorshSerialize};
use chain_sol::{Pubkey, SolAccountMeta, SYSTEM_PROGRAM_ID};
use serde::{Deserialize, Serialize};

use crate::context::{EncodedInstruction, ProgramContext};
use crate::discriminator::Operation;
use crate::error::EncodeError;
use crate::layout::{FieldReader, FieldWriter};
use crate::seeds::recurring_payment_address;

/// Schedule stored on the payment account, one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PaymentInterval {
    Daily,
    Weekly,
    Monthly,
}

impl PaymentInterval {
    pub fn interval_seconds(self) -> i64 {
        const DAY: i64 = 24 * 60 * 60;
        match self {
            PaymentInterval::Daily => DAY,
            PaymentInterval::Weekly => 7 * DAY,
            PaymentInterval::Monthly => 30 * DAY,
        }
    }
}

/// `createRecurringPayment` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecurringPaymentArgs {
    pub amount: u64,
    #[serde(with = "crate::b58")]
    pub recipient: Pubkey,
    pub interval_seconds: i64,
    pub total_payments: u64,
    pub description: String,
}

impl CreateRecurringPaymentArgs {
    pub(crate) fn write(&self, w: FieldWriter) -> Result<FieldWriter, EncodeError> {
        w.u64(self.amount)
            .pubkey(&self.recipient)
            .i64(self.interval_seconds)
            .u64(self.total_payments)
            .string("description", &self.description)
    }

    pub(crate) fn read(r: &mut FieldReader<'_>) -> Result<Self, EncodeError> {
        Ok(Self {
            amount: r.u64()?,
            recipient: r.pubkey()?,
            interval_seconds: r.i64()?,
            total_payments: r.u64()?,
            description: r.string()?,
        })
    }
}

/// Typed request for [`create_recurring_payment`].
#[derive(Debug, Clone)]
pub struct CreateRecurringPayment<'a> {
    pub payer: Pubkey,
    pub seed_id: i64,
    /// Amount per payment.
    pub amount: f64,
    pub recipient: Pubkey,
    pub interval_seconds: i64,
    pub total_payments: u64,
    pub description: &'a str,
}

/// `[recurringPDA(w), payer(s,w), systemProgram]`
pub fn create_recurring_payment(
    ctx: &ProgramContext,
    req: &CreateRecurringPayment<'_>,
) -> Result<EncodedInstruction, EncodeError> {
    if req.interval_seconds <= 0 {
        return Err(EncodeError::InvalidArgument(format!(
            "interval must be positive, got {}s",
            req.interval_seconds
        )));
    }
    if req.total_payments == 0 {
        return Err(EncodeError::InvalidArgument(
            "total payments must be greater than 0".into(),
        ));
    }

    let args = CreateRecurringPaymentArgs {
        amount: ctx.base_units(req.amount)?,
        recipient: req.recipient,
        interval_seconds: req.interval_seconds,
        total_payments: req.total_payments,
        description: req.description.to_owned(),
    };
    let data = args
        .write(FieldWriter::new(Operation::CreateRecurringPayment.discriminator()))?
        .finish();

    let (recurring, _) = recurring_payment_address(&ctx.program_id, &req.payer, req.seed_id)?;
    let accounts = vec![
        SolAccountMeta::writable(recurring),
        SolAccountMeta::writable_signer(req.payer),
        SolAccountMeta::readonly(SYSTEM_PROGRAM_ID),
    ];

    Ok(EncodedInstruction {
        operation: Operation::CreateRecurringPayment,
        address: recurring,
        instruction: ctx.instruction(accounts, data),
    })
}

/// `[recurringPDA(w), payer(w), recipient(w), payerTokenAcct(w),
///   recipientTokenAcct(w), mint, tokenProgram]`
///
/// The payer pre-authorized the schedule, so nobody signs here; whoever
/// submits only pays the fee.
pub fn execute_recurring_payment(
    ctx: &ProgramContext,
    recurring: &Pubkey,
    payer: &Pubkey,
    recipient: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let mut accounts = vec![
        SolAccountMeta::writable(*recurring),
        SolAccountMeta::writable(*payer),
        SolAccountMeta::writable(*recipient),
        SolAccountMeta::writable(ctx.token_account(payer)?),
        SolAccountMeta::writable(ctx.token_account(recipient)?),
    ];
    accounts.extend(ctx.token_accounts());

    Ok(EncodedInstruction {
        operation: Operation::ExecuteRecurringPayment,
        address: *recurring,
        instruction: ctx.instruction(
            accounts,
            Operation::ExecuteRecurringPayment.discriminator().to_vec(),
        ),
    })
}

/// `[recurringPDA(w), payer(s,w)]`
pub fn cancel_recurring_payment(
    ctx: &ProgramContext,
    payer: &Pubkey,
    recurring: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let accounts = vec![
        SolAccountMeta::writable(*recurring),
        SolAccountMeta::writable_signer(*payer),
    ];

    Ok(EncodedInstruction {
        operation: Operation::CancelRecurringPayment,
        address: *recurring,
        instruction: ctx.instruction(
            accounts,
            Operation::CancelRecurringPayment.discriminator().to_vec(),
        ),
    })
}
