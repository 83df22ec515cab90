//! Decoding instruction data back into typed arguments.

use serde::Serialize;

use crate::discriminator::Operation;
use crate::error::EncodeError;
use crate::escrow::CreateEscrowArgs;
use crate::layout::FieldReader;
use crate::multisig::{CreateMultisigArgs, ProposeTransactionArgs};
use crate::recurring::CreateRecurringPaymentArgs;
use crate::staking::{InitializeStakingPoolArgs, StakeArgs, UnstakeArgs};

/// Payload of an operation that carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InstructionArgs {
    CreateEscrow(CreateEscrowArgs),
    CreateMultisig(CreateMultisigArgs),
    ProposeTransaction(ProposeTransactionArgs),
    CreateRecurringPayment(CreateRecurringPaymentArgs),
    InitializeStakingPool(InitializeStakingPoolArgs),
    Stake(StakeArgs),
    Unstake(UnstakeArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedInstruction {
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<InstructionArgs>,
}

/// Parse raw instruction data. Unknown discriminators, truncated payloads
/// and trailing bytes are all errors.
pub fn decode_instruction_data(data: &[u8]) -> Result<DecodedInstruction, EncodeError> {
    let (disc, mut r) = FieldReader::with_discriminator(data)?;
    let operation = Operation::from_discriminator(&disc)?;

    let args = match operation {
        Operation::CreateEscrow => Some(InstructionArgs::CreateEscrow(CreateEscrowArgs::read(&mut r)?)),
        Operation::CreateMultisig => {
            Some(InstructionArgs::CreateMultisig(CreateMultisigArgs::read(&mut r)?))
        }
        Operation::ProposeTransaction => Some(InstructionArgs::ProposeTransaction(
            ProposeTransactionArgs::read(&mut r)?,
        )),
        Operation::CreateRecurringPayment => Some(InstructionArgs::CreateRecurringPayment(
            CreateRecurringPaymentArgs::read(&mut r)?,
        )),
        Operation::InitializeStakingPool => {
            Some(InstructionArgs::InitializeStakingPool(InitializeStakingPoolArgs {
                reward_rate_per_second: r.u64()?,
            }))
        }
        Operation::Stake => Some(InstructionArgs::Stake(StakeArgs::read(&mut r)?)),
        Operation::Unstake => Some(InstructionArgs::Unstake(UnstakeArgs { amount: r.u64()? })),
        Operation::FundEscrow
        | Operation::ClaimEscrow
        | Operation::CancelEscrow
        | Operation::ApproveTransaction
        | Operation::ExecuteTransaction
        | Operation::RejectTransaction
        | Operation::ClaimRewards
        | Operation::CompoundRewards
        | Operation::ExecuteRecurringPayment
        | Operation::CancelRecurringPayment => None,
    };

    r.finish()?;
    Ok(DecodedInstruction { operation, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_discriminator_decodes_without_args() {
        let decoded = decode_instruction_data(&Operation::ClaimEscrow.discriminator()).unwrap();
        assert_eq!(decoded.operation, Operation::ClaimEscrow);
        assert_eq!(decoded.args, None);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut data = Operation::ClaimRewards.discriminator().to_vec();
        data.push(0);
        assert!(matches!(
            decode_instruction_data(&data),
            Err(EncodeError::TrailingBytes(1))
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut data = Operation::Unstake.discriminator().to_vec();
        data.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            decode_instruction_data(&data),
            Err(EncodeError::Truncated { .. })
        ));
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        assert!(matches!(
            decode_instruction_data(&[0u8; 8]),
            Err(EncodeError::UnknownDiscriminator(_))
        ));
    }

    #[test]
    fn json_renders_keys_as_base58() {
        let mut data = Operation::CreateEscrow.discriminator().to_vec();
        data.extend_from_slice(&10_000_000u64.to_le_bytes());
        data.extend_from_slice(&[0u8; 32]);
        data.extend_from_slice(&1_700_000_000i64.to_le_bytes());
        data.extend_from_slice(&[4, b'r', b'e', b'n', b't']);

        let decoded = decode_instruction_data(&data).unwrap();
        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json["operation"], "createEscrow");
        assert_eq!(json["args"]["recipient"], "11111111111111111111111111111111");
        assert_eq!(json["args"]["amount"], 10_000_000);
        assert_eq!(json["args"]["description"], "rent");
    }
}
