use chain_sol::{
    address_to_bytes, derive_associated_token_address, Pubkey, SolAccountMeta, SolInstruction,
    TOKEN_2022_PROGRAM_ID,
};

use crate::amount::{to_base_units, PYUSD_DECIMALS};
use crate::discriminator::Operation;
use crate::error::EncodeError;

/// Devnet deployment of the MailFi program.
pub const DEFAULT_PROGRAM_ID: &str = "Ezs5NC81twpytKzrHtPbe11VvXggAZFqLR9ELz562jt";

/// PYUSD mint on devnet (Token-2022).
pub const PYUSD_DEVNET_MINT: &str = "CXk2AMBfi3TwaEL2468s6zP8xq9NxTXjp9gjMgzeUynM";

/// PYUSD mint on mainnet-beta (Token-2022).
pub const PYUSD_MAINNET_MINT: &str = "2b1kV6DkPAnxd5ixfnxCpjxmKwqjjaYmCZfHsFu24GXo";

/// Everything an encoder needs to know about the deployment it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramContext {
    pub program_id: Pubkey,
    pub mint: Pubkey,
    pub token_program: Pubkey,
    pub decimals: u8,
}

impl ProgramContext {
    /// A Token-2022 mint with PYUSD's six decimals.
    pub fn new(program_id: Pubkey, mint: Pubkey) -> Self {
        Self {
            program_id,
            mint,
            token_program: TOKEN_2022_PROGRAM_ID,
            decimals: PYUSD_DECIMALS,
        }
    }

    pub fn devnet() -> Result<Self, EncodeError> {
        Ok(Self::new(
            address_to_bytes(DEFAULT_PROGRAM_ID)?,
            address_to_bytes(PYUSD_DEVNET_MINT)?,
        ))
    }

    pub fn with_token_program(mut self, token_program: Pubkey) -> Self {
        self.token_program = token_program;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Scale a decimal amount to this mint's base units.
    pub fn base_units(&self, amount: f64) -> Result<u64, EncodeError> {
        to_base_units(amount, self.decimals)
    }

    /// Associated token account of `owner` for the configured mint.
    pub fn token_account(&self, owner: &Pubkey) -> Result<Pubkey, EncodeError> {
        Ok(derive_associated_token_address(owner, &self.mint, &self.token_program)?)
    }

    pub(crate) fn instruction(&self, accounts: Vec<SolAccountMeta>, data: Vec<u8>) -> SolInstruction {
        SolInstruction { program_id: self.program_id, accounts, data }
    }

    /// Trailing `[mint, token_program]` shared by every token-moving operation.
    pub(crate) fn token_accounts(&self) -> [SolAccountMeta; 2] {
        [
            SolAccountMeta::readonly(self.mint),
            SolAccountMeta::readonly(self.token_program),
        ]
    }
}

/// A built instruction together with the operation it invokes and the
/// program account it creates or acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInstruction {
    pub operation: Operation,
    pub address: Pubkey,
    pub instruction: SolInstruction,
}

impl EncodedInstruction {
    pub fn data(&self) -> &[u8] {
        &self.instruction.data
    }

    pub fn accounts(&self) -> &[SolAccountMeta] {
        &self.instruction.accounts
    }
}
