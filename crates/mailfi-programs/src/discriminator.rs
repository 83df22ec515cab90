//! Program operations and their 8-byte discriminators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Every instruction the MailFi program dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    // Escrow
    CreateEscrow,
    FundEscrow,
    ClaimEscrow,
    CancelEscrow,
    // Multisig
    CreateMultisig,
    ProposeTransaction,
    ApproveTransaction,
    ExecuteTransaction,
    RejectTransaction,
    // Staking
    InitializeStakingPool,
    Stake,
    ClaimRewards,
    Unstake,
    CompoundRewards,
    // Recurring payments
    CreateRecurringPayment,
    ExecuteRecurringPayment,
    CancelRecurringPayment,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::CreateEscrow,
        Operation::FundEscrow,
        Operation::ClaimEscrow,
        Operation::CancelEscrow,
        Operation::CreateMultisig,
        Operation::ProposeTransaction,
        Operation::ApproveTransaction,
        Operation::ExecuteTransaction,
        Operation::RejectTransaction,
        Operation::InitializeStakingPool,
        Operation::Stake,
        Operation::ClaimRewards,
        Operation::Unstake,
        Operation::CompoundRewards,
        Operation::CreateRecurringPayment,
        Operation::ExecuteRecurringPayment,
        Operation::CancelRecurringPayment,
    ];

    /// The deployed program's dispatch prefix for this operation.
    pub const fn discriminator(self) -> [u8; 8] {
        match self {
            Operation::CreateEscrow => [0xfd, 0xd7, 0xa5, 0x74, 0x24, 0x6c, 0x44, 0x50],
            Operation::FundEscrow => [0x9b, 0x12, 0xda, 0x8d, 0xb6, 0xd5, 0x45, 0xc9],
            Operation::ClaimEscrow => [0xc8, 0x50, 0xb6, 0x9f, 0x3d, 0x4b, 0x09, 0xcd],
            Operation::CancelEscrow => [0x9c, 0xcb, 0x36, 0xb3, 0x26, 0x48, 0x21, 0x15],
            Operation::CreateMultisig => [0x9c, 0x32, 0x7e, 0x9b, 0x5d, 0x4f, 0x8a, 0x12],
            Operation::ProposeTransaction => [0x7a, 0x3d, 0x8e, 0x6f, 0x1c, 0x9b, 0x4a, 0x5d],
            Operation::ApproveTransaction => [0x3b, 0x8f, 0x2d, 0x6a, 0x7e, 0x1c, 0x9d, 0x4f],
            Operation::ExecuteTransaction => [0x5c, 0x9a, 0x3f, 0x7b, 0x2e, 0x6d, 0x1a, 0x8c],
            Operation::RejectTransaction => [0x4d, 0x7e, 0x2b, 0x9f, 0x3c, 0x8a, 0x5d, 0x1e],
            Operation::InitializeStakingPool => [0x95, 0xc0, 0xa0, 0xfe, 0xf8, 0x6c, 0x5c, 0x9d],
            Operation::Stake => [0xf2, 0xc7, 0x7e, 0x4d, 0x7d, 0x5e, 0x5b, 0xa9],
            Operation::ClaimRewards => [0x62, 0x19, 0x8f, 0x6e, 0x9f, 0x30, 0x8b, 0x1a],
            Operation::Unstake => [0x90, 0x95, 0xeb, 0xf9, 0xfe, 0xfd, 0x90, 0x66],
            Operation::CompoundRewards => [0x8b, 0x7f, 0xd6, 0x4e, 0xa7, 0x5f, 0x3c, 0x2d],
            Operation::CreateRecurringPayment => [0x6a, 0x4e, 0x8f, 0x3d, 0x9c, 0x7b, 0x2a, 0x5f],
            Operation::ExecuteRecurringPayment => [0x7b, 0x5f, 0x9e, 0x4c, 0x8d, 0x6a, 0x3b, 0x1e],
            Operation::CancelRecurringPayment => [0x8c, 0x6d, 0x9f, 0x5b, 0x7e, 0x4a, 0x2c, 0x1d],
        }
    }

    /// Name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::CreateEscrow => "createEscrow",
            Operation::FundEscrow => "fundEscrow",
            Operation::ClaimEscrow => "claimEscrow",
            Operation::CancelEscrow => "cancelEscrow",
            Operation::CreateMultisig => "createMultisig",
            Operation::ProposeTransaction => "proposeTransaction",
            Operation::ApproveTransaction => "approveTransaction",
            Operation::ExecuteTransaction => "executeTransaction",
            Operation::RejectTransaction => "rejectTransaction",
            Operation::InitializeStakingPool => "initializeStakingPool",
            Operation::Stake => "stake",
            Operation::ClaimRewards => "claimRewards",
            Operation::Unstake => "unstake",
            Operation::CompoundRewards => "compoundRewards",
            Operation::CreateRecurringPayment => "createRecurringPayment",
            Operation::ExecuteRecurringPayment => "executeRecurringPayment",
            Operation::CancelRecurringPayment => "cancelRecurringPayment",
        }
    }

    pub fn from_discriminator(disc: &[u8; 8]) -> Result<Self, EncodeError> {
        Self::ALL
            .into_iter()
            .find(|op| op.discriminator() == *disc)
            .ok_or(EncodeError::UnknownDiscriminator(*disc))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EncodeError::InvalidArgument(format!("unknown operation {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn discriminators_are_unique() {
        let set: HashSet<[u8; 8]> = Operation::ALL.iter().map(|op| op.discriminator()).collect();
        assert_eq!(set.len(), Operation::ALL.len());
    }

    #[test]
    fn discriminator_lookup_inverts() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_discriminator(&op.discriminator()).unwrap(), op);
        }
    }

    #[test]
    fn create_escrow_discriminator() {
        assert_eq!(
            hex::encode(Operation::CreateEscrow.discriminator()),
            "fdd7a574246c4450"
        );
    }

    #[test]
    fn unknown_discriminator_is_an_error() {
        assert!(Operation::from_discriminator(&[0; 8]).is_err());
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("createEscrow".parse::<Operation>().unwrap(), Operation::CreateEscrow);
        assert_eq!("STAKE".parse::<Operation>().unwrap(), Operation::Stake);
        assert!("transfer".parse::<Operation>().is_err());
    }

    #[test]
    fn serde_uses_camel_case_names() {
        let json = serde_json::to_string(&Operation::InitializeStakingPool).unwrap();
        assert_eq!(json, "\"initializeStakingPool\"");
    }
}
