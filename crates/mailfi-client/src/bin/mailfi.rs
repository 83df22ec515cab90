//! MailFi command line tool
//!
//! Offline helpers around the program encoders plus a confirmation watcher.
//!
//! ## Usage
//!
//! ```bash
//! mailfi pda escrow --owner <CREATOR> --seed 1700000000
//! mailfi encode create-escrow --signer <CREATOR> --amount 10 --recipient <KEY> --days 7
//! mailfi decode <HEX>
//! mailfi --config mailfi.toml status <SIGNATURE> --last-valid-block-height 123456
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chain_sol::{address_to_bytes, bytes_to_address, Pubkey};
use clap::{Args, Parser, Subcommand};
use mailfi_client::{ClientConfig, ConfirmationWaiter, RpcClient, Submission};
use mailfi_programs::escrow::{self, CreateEscrow};
use mailfi_programs::multisig::{self, ProposeTransaction};
use mailfi_programs::recurring::{self, CreateRecurringPayment};
use mailfi_programs::{decode_instruction_data, seeds, staking, EncodedInstruction, LockPeriod, Operation, ProgramContext};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mailfi")]
#[command(about = "MailFi program encoder and transaction watcher")]
struct Cli {
    /// Path to configuration file (default: MAILFI_CONFIG_PATH env var, else built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a program address
    Pda {
        #[command(subcommand)]
        kind: PdaKind,
    },
    /// Print the instruction an operation would send
    Encode(EncodeArgs),
    /// Decode hex instruction data into typed arguments
    Decode { data: String },
    /// Wait for a broadcast transaction to confirm
    Status {
        signature: String,
        #[arg(long)]
        last_valid_block_height: u64,
    },
}

#[derive(Subcommand, Debug)]
enum PdaKind {
    Escrow {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        seed: i64,
    },
    Multisig {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        seed: i64,
    },
    Transaction {
        #[arg(long)]
        multisig: String,
        #[arg(long)]
        index: u64,
    },
    Recurring {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        seed: i64,
    },
    Pool,
    UserStake {
        #[arg(long)]
        owner: String,
    },
    TokenAccount {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Operation name, e.g. createEscrow or create-escrow
    operation: String,
    /// Wallet that signs (creator, proposer, user...)
    #[arg(long)]
    signer: String,
    /// Existing escrow / multisig / recurring account the operation acts on
    #[arg(long)]
    account: Option<String>,
    /// Multisig transaction account
    #[arg(long)]
    transaction: Option<String>,
    #[arg(long)]
    recipient: Option<String>,
    #[arg(long)]
    payer: Option<String>,
    #[arg(long)]
    proposer: Option<String>,
    #[arg(long)]
    amount: Option<f64>,
    #[arg(long)]
    expiry: Option<i64>,
    #[arg(long)]
    days: Option<u32>,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    seed: Option<i64>,
    #[arg(long = "owner")]
    owners: Vec<String>,
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(long)]
    index: Option<u64>,
    #[arg(long)]
    interval: Option<i64>,
    #[arg(long)]
    total: Option<u64>,
    /// Lock period index: 0 none, 1 thirty days, 2 ninety, 3 one-eighty
    #[arg(long, default_value_t = 0)]
    lock: u8,
    #[arg(long)]
    rate: Option<u64>,
}

fn key(value: &str) -> Result<Pubkey> {
    address_to_bytes(value).with_context(|| format!("invalid address {value:?}"))
}

fn required<T: Clone>(value: &Option<T>, flag: &str) -> Result<T> {
    value.clone().ok_or_else(|| anyhow!("--{flag} is required for this operation"))
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn load_config(path: Option<PathBuf>) -> Result<ClientConfig> {
    let path = path.or_else(|| std::env::var_os("MAILFI_CONFIG_PATH").map(PathBuf::from));
    if let Some(path) = &path {
        info!("Loading configuration from: {}", path.display());
    }
    ClientConfig::load_from_path(path.as_deref()).context("failed to load configuration")
}

fn pda(ctx: &ProgramContext, kind: &PdaKind) -> Result<(Pubkey, Option<u8>)> {
    let program = &ctx.program_id;
    let (address, bump) = match kind {
        PdaKind::Escrow { owner, seed } => seeds::escrow_address(program, &key(owner)?, *seed)?,
        PdaKind::Multisig { owner, seed } => seeds::multisig_address(program, &key(owner)?, *seed)?,
        PdaKind::Transaction { multisig, index } => {
            seeds::transaction_address(program, &key(multisig)?, *index)?
        }
        PdaKind::Recurring { owner, seed } => {
            seeds::recurring_payment_address(program, &key(owner)?, *seed)?
        }
        PdaKind::Pool => seeds::staking_pool_address(program, &ctx.mint)?,
        PdaKind::UserStake { owner } => {
            let pool = staking::pool_address(ctx)?;
            seeds::user_stake_address(program, &pool, &key(owner)?)?
        }
        PdaKind::TokenAccount { owner } => return Ok((ctx.token_account(&key(owner)?)?, None)),
    };
    Ok((address, Some(bump)))
}

fn encode(ctx: &ProgramContext, args: &EncodeArgs) -> Result<EncodedInstruction> {
    let operation: Operation = args
        .operation
        .replace('-', "")
        .parse()
        .map_err(|e| anyhow!("{e}"))?;
    let signer = key(&args.signer)?;
    let account = || required(&args.account, "account").and_then(|a| key(&a));
    let recipient = || required(&args.recipient, "recipient").and_then(|r| key(&r));
    let seed_id = args.seed.unwrap_or_else(unix_now);

    let encoded = match operation {
        Operation::CreateEscrow => {
            let now = unix_now();
            let expiry_time = match (args.expiry, args.days) {
                (Some(expiry), _) => expiry,
                (None, Some(days)) => escrow::expiry_in_days(now, days),
                (None, None) => bail!("--expiry or --days is required for createEscrow"),
            };
            escrow::create_escrow(
                ctx,
                &CreateEscrow {
                    creator: signer,
                    seed_id,
                    amount: required(&args.amount, "amount")?,
                    recipient: recipient()?,
                    expiry_time,
                    description: &args.description,
                    now,
                },
            )?
        }
        Operation::FundEscrow => escrow::fund_escrow(ctx, &signer, &account()?)?,
        Operation::ClaimEscrow => escrow::claim_escrow(ctx, &signer, &account()?)?,
        Operation::CancelEscrow => escrow::cancel_escrow(ctx, &signer, &account()?)?,
        Operation::CreateMultisig => {
            let owners = args.owners.iter().map(|o| key(o)).collect::<Result<Vec<_>>>()?;
            multisig::create_multisig(ctx, &signer, seed_id, &owners, required(&args.threshold, "threshold")?)?
        }
        Operation::ProposeTransaction => multisig::propose_transaction(
            ctx,
            &ProposeTransaction {
                proposer: signer,
                multisig: account()?,
                transaction_index: required(&args.index, "index")?,
                amount: required(&args.amount, "amount")?,
                recipient: recipient()?,
                description: &args.description,
            },
        )?,
        Operation::ApproveTransaction => {
            let tx = key(&required(&args.transaction, "transaction")?)?;
            multisig::approve_transaction(ctx, &signer, &account()?, &tx)?
        }
        Operation::ExecuteTransaction => {
            let tx = key(&required(&args.transaction, "transaction")?)?;
            multisig::execute_transaction(ctx, &signer, &account()?, &tx, &recipient()?)?
        }
        Operation::RejectTransaction => {
            let tx = key(&required(&args.transaction, "transaction")?)?;
            let proposer = key(&required(&args.proposer, "proposer")?)?;
            multisig::reject_transaction(ctx, &signer, &account()?, &tx, &proposer)?
        }
        Operation::CreateRecurringPayment => recurring::create_recurring_payment(
            ctx,
            &CreateRecurringPayment {
                payer: signer,
                seed_id,
                amount: required(&args.amount, "amount")?,
                recipient: recipient()?,
                interval_seconds: required(&args.interval, "interval")?,
                total_payments: required(&args.total, "total")?,
                description: &args.description,
            },
        )?,
        Operation::ExecuteRecurringPayment => {
            let payer = key(&required(&args.payer, "payer")?)?;
            recurring::execute_recurring_payment(ctx, &account()?, &payer, &recipient()?)?
        }
        Operation::CancelRecurringPayment => recurring::cancel_recurring_payment(ctx, &signer, &account()?)?,
        Operation::InitializeStakingPool => {
            staking::initialize_staking_pool(ctx, &signer, required(&args.rate, "rate")?)?
        }
        Operation::Stake => staking::stake(
            ctx,
            &signer,
            required(&args.amount, "amount")?,
            LockPeriod::from_index(args.lock)?,
        )?,
        Operation::ClaimRewards => staking::claim_rewards(ctx, &signer)?,
        Operation::Unstake => staking::unstake(ctx, &signer, required(&args.amount, "amount")?)?,
        Operation::CompoundRewards => staking::compound_rewards(ctx, &signer)?,
    };
    Ok(encoded)
}

fn render(encoded: &EncodedInstruction) -> serde_json::Value {
    let accounts: Vec<_> = encoded
        .accounts()
        .iter()
        .map(|meta| {
            json!({
                "pubkey": bytes_to_address(&meta.pubkey),
                "isSigner": meta.is_signer,
                "isWritable": meta.is_writable,
            })
        })
        .collect();
    json!({
        "operation": encoded.operation,
        "programId": bytes_to_address(&encoded.instruction.program_id),
        "address": bytes_to_address(&encoded.address),
        "data": hex::encode(encoded.data()),
        "accounts": accounts,
    })
}

async fn status(config: &ClientConfig, signature: String, last_valid_block_height: u64) -> Result<()> {
    let rpc = RpcClient::new(&config.network.rpc_url, config.network.commitment)?;
    let waiter = ConfirmationWaiter::new(Arc::new(rpc), config.confirm_options());
    let submission = Submission { operation: "status", signature, last_valid_block_height };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!("Waiting for {} at {}", submission.signature, config.network.commitment);
    let confirmed = waiter.await_confirmation_with_cancel(&submission, &cancel).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "signature": confirmed.signature,
            "slot": confirmed.slot,
            "logs": confirmed.logs,
        }))?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    let config = load_config(cli.config)?;
    let ctx = config.to_program_context()?;

    match cli.command {
        Command::Pda { kind } => {
            let (address, bump) = pda(&ctx, &kind)?;
            println!("{}", json!({ "address": bytes_to_address(&address), "bump": bump }));
        }
        Command::Encode(args) => {
            let encoded = encode(&ctx, &args)?;
            println!("{}", serde_json::to_string_pretty(&render(&encoded))?);
        }
        Command::Decode { data } => {
            let bytes = hex::decode(data.trim().trim_start_matches("0x")).context("data is not hex")?;
            let decoded = decode_instruction_data(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Command::Status { signature, last_valid_block_height } => {
            status(&config, signature, last_valid_block_height).await?;
        }
    }
    Ok(())
}
