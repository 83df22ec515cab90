//! Multisig wallet instructions.
//!
//! A multisig lives at `["multisig", creator, seed_id]`. Each proposal is its
//! own account at `["transaction", multisig, transaction_index]`, where the
//! index is the multisig's running `transaction_count` at proposal time.

use std::collections::HashSet;

use chain_sol::{Pubkey, SolAccountMeta, SYSTEM_PROGRAM_ID};
use serde::{Deserialize, Serialize};

use crate::context::{EncodedInstruction, ProgramContext};
use crate::discriminator::Operation;
use crate::error::EncodeError;
use crate::layout::{FieldReader, FieldWriter};
use crate::seeds::{multisig_address, transaction_address};

/// Owner slots the program allocates per multisig.
pub const MAX_OWNERS: usize = 10;

/// `createMultisig` payload: owner count byte, owners, threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMultisigArgs {
    #[serde(with = "crate::b58::vec")]
    pub owners: Vec<Pubkey>,
    pub threshold: u8,
}

impl CreateMultisigArgs {
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.owners.is_empty() || self.owners.len() > MAX_OWNERS {
            return Err(EncodeError::InvalidArgument(format!(
                "multisig needs 1 to {MAX_OWNERS} owners, got {}",
                self.owners.len()
            )));
        }
        let distinct: HashSet<&Pubkey> = self.owners.iter().collect();
        if distinct.len() != self.owners.len() {
            return Err(EncodeError::InvalidArgument("multisig owners must be distinct".into()));
        }
        if self.threshold == 0 || self.threshold as usize > self.owners.len() {
            return Err(EncodeError::InvalidArgument(format!(
                "threshold {} must be between 1 and {}",
                self.threshold,
                self.owners.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn write(&self, w: FieldWriter) -> FieldWriter {
        // validate() bounds the count to MAX_OWNERS
        let w = w.u8(self.owners.len() as u8);
        self.owners
            .iter()
            .fold(w, |w, owner| w.pubkey(owner))
            .u8(self.threshold)
    }

    pub(crate) fn read(r: &mut FieldReader<'_>) -> Result<Self, EncodeError> {
        let count = r.u8()? as usize;
        let owners = (0..count).map(|_| r.pubkey()).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { owners, threshold: r.u8()? })
    }
}

/// `proposeTransaction` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeTransactionArgs {
    pub amount: u64,
    #[serde(with = "crate::b58")]
    pub recipient: Pubkey,
    pub description: String,
}

impl ProposeTransactionArgs {
    pub(crate) fn write(&self, w: FieldWriter) -> Result<FieldWriter, EncodeError> {
        w.u64(self.amount)
            .pubkey(&self.recipient)
            .string("description", &self.description)
    }

    pub(crate) fn read(r: &mut FieldReader<'_>) -> Result<Self, EncodeError> {
        Ok(Self {
            amount: r.u64()?,
            recipient: r.pubkey()?,
            description: r.string()?,
        })
    }
}

/// `[multisigPDA(w), creator(s,w), systemProgram]`
pub fn create_multisig(
    ctx: &ProgramContext,
    creator: &Pubkey,
    seed_id: i64,
    owners: &[Pubkey],
    threshold: u8,
) -> Result<EncodedInstruction, EncodeError> {
    let args = CreateMultisigArgs { owners: owners.to_vec(), threshold };
    args.validate()?;
    let data = args.write(FieldWriter::new(Operation::CreateMultisig.discriminator())).finish();

    let (multisig, _) = multisig_address(&ctx.program_id, creator, seed_id)?;
    let accounts = vec![
        SolAccountMeta::writable(multisig),
        SolAccountMeta::writable_signer(*creator),
        SolAccountMeta::readonly(SYSTEM_PROGRAM_ID),
    ];

    Ok(EncodedInstruction {
        operation: Operation::CreateMultisig,
        address: multisig,
        instruction: ctx.instruction(accounts, data),
    })
}

/// Typed request for [`propose_transaction`].
#[derive(Debug, Clone)]
pub struct ProposeTransaction<'a> {
    pub proposer: Pubkey,
    pub multisig: Pubkey,
    /// The multisig's current `transaction_count`.
    pub transaction_index: u64,
    pub amount: f64,
    pub recipient: Pubkey,
    pub description: &'a str,
}

/// `[multisigPDA(w), txPDA(w), proposer(s,w), systemProgram]`
pub fn propose_transaction(
    ctx: &ProgramContext,
    req: &ProposeTransaction<'_>,
) -> Result<EncodedInstruction, EncodeError> {
    let args = ProposeTransactionArgs {
        amount: ctx.base_units(req.amount)?,
        recipient: req.recipient,
        description: req.description.to_owned(),
    };
    let data = args
        .write(FieldWriter::new(Operation::ProposeTransaction.discriminator()))?
        .finish();

    let (transaction, _) = transaction_address(&ctx.program_id, &req.multisig, req.transaction_index)?;
    let accounts = vec![
        SolAccountMeta::writable(req.multisig),
        SolAccountMeta::writable(transaction),
        SolAccountMeta::writable_signer(req.proposer),
        SolAccountMeta::readonly(SYSTEM_PROGRAM_ID),
    ];

    Ok(EncodedInstruction {
        operation: Operation::ProposeTransaction,
        address: transaction,
        instruction: ctx.instruction(accounts, data),
    })
}

/// `[multisigPDA(w), txPDA(w), approver(s)]`
pub fn approve_transaction(
    ctx: &ProgramContext,
    approver: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let accounts = vec![
        SolAccountMeta::writable(*multisig),
        SolAccountMeta::writable(*transaction),
        SolAccountMeta::readonly_signer(*approver),
    ];

    Ok(EncodedInstruction {
        operation: Operation::ApproveTransaction,
        address: *transaction,
        instruction: ctx.instruction(accounts, Operation::ApproveTransaction.discriminator().to_vec()),
    })
}

/// `[multisigPDA(w), txPDA(w), multisigTokenAcct(w), recipientTokenAcct(w),
///   executor(s,w), recipient(w), mint, tokenProgram, systemProgram]`
pub fn execute_transaction(
    ctx: &ProgramContext,
    executor: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    recipient: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let mut accounts = vec![
        SolAccountMeta::writable(*multisig),
        SolAccountMeta::writable(*transaction),
        SolAccountMeta::writable(ctx.token_account(multisig)?),
        SolAccountMeta::writable(ctx.token_account(recipient)?),
        SolAccountMeta::writable_signer(*executor),
        SolAccountMeta::writable(*recipient),
    ];
    accounts.extend(ctx.token_accounts());
    accounts.push(SolAccountMeta::readonly(SYSTEM_PROGRAM_ID));

    Ok(EncodedInstruction {
        operation: Operation::ExecuteTransaction,
        address: *transaction,
        instruction: ctx.instruction(accounts, Operation::ExecuteTransaction.discriminator().to_vec()),
    })
}

/// `[txPDA(w), multisigPDA(w), proposer(w), rejector(s)]`
pub fn reject_transaction(
    ctx: &ProgramContext,
    rejector: &Pubkey,
    multisig: &Pubkey,
    transaction: &Pubkey,
    proposer: &Pubkey,
) -> Result<EncodedInstruction, EncodeError> {
    let accounts = vec![
        SolAccountMeta::writable(*transaction),
        SolAccountMeta::writable(*multisig),
        SolAccountMeta::writable(*proposer),
        SolAccountMeta::readonly_signer(*rejector),
    ];

    Ok(EncodedInstruction {
        operation: Operation::RejectTransaction,
        address: *transaction,
        instruction: ctx.instruction(accounts, Operation::RejectTransaction.discriminator().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_instruction_data, InstructionArgs};

    fn ctx() -> ProgramContext {
        ProgramContext::new([9u8; 32], [8u8; 32])
    }

    #[test]
    fn create_multisig_layout() {
        let owners = [[1u8; 32], [2u8; 32], [3u8; 32]];
        let ix = create_multisig(&ctx(), &owners[0], 77, &owners, 2).unwrap();

        let data = ix.data();
        assert_eq!(&data[..8], &Operation::CreateMultisig.discriminator());
        assert_eq!(data[8], 3);
        assert_eq!(&data[9..41], &[1u8; 32]);
        assert_eq!(&data[73..105], &[3u8; 32]);
        assert_eq!(data[105], 2);
        assert_eq!(data.len(), 106);

        let (pda, _) = multisig_address(&[9u8; 32], &owners[0], 77).unwrap();
        assert_eq!(ix.accounts()[0], SolAccountMeta::writable(pda));
        assert_eq!(ix.accounts()[1], SolAccountMeta::writable_signer(owners[0]));
        assert_eq!(ix.accounts()[2], SolAccountMeta::readonly(SYSTEM_PROGRAM_ID));
    }

    #[test]
    fn create_multisig_rejects_bad_thresholds() {
        let owners = [[1u8; 32], [2u8; 32]];
        assert!(create_multisig(&ctx(), &owners[0], 1, &owners, 0).is_err());
        assert!(create_multisig(&ctx(), &owners[0], 1, &owners, 3).is_err());
        assert!(create_multisig(&ctx(), &owners[0], 1, &owners, 2).is_ok());
    }

    #[test]
    fn create_multisig_rejects_bad_owner_sets() {
        let creator = [1u8; 32];
        assert!(create_multisig(&ctx(), &creator, 1, &[], 1).is_err());
        assert!(create_multisig(&ctx(), &creator, 1, &[creator, creator], 1).is_err());

        let eleven: Vec<Pubkey> = (0..11u8).map(|i| [i; 32]).collect();
        let err = create_multisig(&ctx(), &creator, 1, &eleven, 1).unwrap_err();
        assert!(err.to_string().contains("1 to 10 owners"));
    }

    #[test]
    fn propose_uses_transaction_index_seed() {
        let ctx = ctx();
        let multisig = [4u8; 32];
        let req = ProposeTransaction {
            proposer: [1u8; 32],
            multisig,
            transaction_index: 5,
            amount: 2.5,
            recipient: [6u8; 32],
            description: "payroll",
        };
        let ix = propose_transaction(&ctx, &req).unwrap();
        let (tx_pda, _) = transaction_address(&ctx.program_id, &multisig, 5).unwrap();

        assert_eq!(ix.address, tx_pda);
        assert_eq!(
            ix.accounts(),
            &[
                SolAccountMeta::writable(multisig),
                SolAccountMeta::writable(tx_pda),
                SolAccountMeta::writable_signer([1u8; 32]),
                SolAccountMeta::readonly(SYSTEM_PROGRAM_ID),
            ]
        );

        let decoded = decode_instruction_data(ix.data()).unwrap();
        assert_eq!(
            decoded.args,
            Some(InstructionArgs::ProposeTransaction(ProposeTransactionArgs {
                amount: 2_500_000,
                recipient: [6u8; 32],
                description: "payroll".into(),
            }))
        );
    }

    #[test]
    fn approve_and_reject_account_orders() {
        let ctx = ctx();
        let (signer, multisig, tx, proposer) = ([1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]);

        let approve = approve_transaction(&ctx, &signer, &multisig, &tx).unwrap();
        assert_eq!(
            approve.accounts(),
            &[
                SolAccountMeta::writable(multisig),
                SolAccountMeta::writable(tx),
                SolAccountMeta::readonly_signer(signer),
            ]
        );
        assert_eq!(approve.data(), &Operation::ApproveTransaction.discriminator());

        let reject = reject_transaction(&ctx, &signer, &multisig, &tx, &proposer).unwrap();
        assert_eq!(
            reject.accounts(),
            &[
                SolAccountMeta::writable(tx),
                SolAccountMeta::writable(multisig),
                SolAccountMeta::writable(proposer),
                SolAccountMeta::readonly_signer(signer),
            ]
        );
    }

    #[test]
    fn execute_account_order() {
        let ctx = ctx();
        let (executor, multisig, tx, recipient) = ([1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]);
        let ix = execute_transaction(&ctx, &executor, &multisig, &tx, &recipient).unwrap();

        let keys: Vec<Pubkey> = ix.accounts().iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                multisig,
                tx,
                ctx.token_account(&multisig).unwrap(),
                ctx.token_account(&recipient).unwrap(),
                executor,
                recipient,
                ctx.mint,
                ctx.token_program,
                SYSTEM_PROGRAM_ID,
            ]
        );
        let signers: Vec<bool> = ix.accounts().iter().map(|m| m.is_signer).collect();
        assert_eq!(signers, vec![false, false, false, false, true, false, false, false, false]);
    }
}
