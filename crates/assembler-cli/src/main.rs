use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use assembler_core::assembler::{DEFAULT_HEIGHT, DEFAULT_VERSION};
use assembler_core::miner::NONCE_SPACE;
use assembler_core::{
    AcceptAll, BlockArtifact, BlockAssembler, BlockParams, SearchLimits, SignatureVerifier,
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod mempool;
mod verifier;

use verifier::CommandVerifier;

const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Seconds added to the current time for the default header timestamp.
const TIME_OFFSET_SECS: u64 = 50;

#[derive(Parser, Debug)]
#[command(name = "assemble-block")]
#[command(about = "Assemble and mine a SegWit block from a mempool directory")]
struct Cli {
    /// Directory of JSON transaction files
    #[arg(long, default_value = "mempool")]
    mempool: PathBuf,
    /// Output file: header, coinbase, then one txid per line
    #[arg(long, default_value = "out.txt")]
    out: PathBuf,
    /// Block height
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,
    /// Payout identity for the block reward
    #[arg(long)]
    address: String,
    /// Block version
    #[arg(long, default_value_t = DEFAULT_VERSION)]
    version: i32,
    /// Previous block hash (display hex)
    #[arg(long, default_value = ZERO_HASH)]
    prev_block: String,
    /// Compact target, decimal or 0x-prefixed hex
    #[arg(long, default_value = "0x1f00ffff", value_parser = parse_bits)]
    bits: u32,
    /// Explicit 256-bit target in hex (defaults to the target encoded by --bits)
    #[arg(long)]
    target: Option<String>,
    /// Header timestamp (defaults to now + 50 seconds)
    #[arg(long)]
    time: Option<u32>,
    /// First nonce to try
    #[arg(long, default_value_t = 0)]
    start_nonce: u32,
    /// Maximum nonces to try before giving up
    #[arg(long, default_value_t = NONCE_SPACE)]
    max_attempts: u64,
    /// External verifier program: raw hex on stdin, exit 0 means valid
    #[arg(long)]
    verify_with: Option<PathBuf>,
    /// Search nonces on all cores
    #[cfg(feature = "parallel")]
    #[arg(long)]
    parallel: bool,
    /// Also print the artifact as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn parse_bits(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse::<u32>().map_err(|e| e.to_string()),
    }
}

fn default_time() -> Result<u32> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before Unix epoch")?
        .as_secs();
    u32::try_from(now + TIME_OFFSET_SECS).context("timestamp does not fit in 32 bits")
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let artifact = run(&cli)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    }

    Ok(())
}

/// Assemble and mine the block described by `cli`, then write the out file.
fn run(cli: &Cli) -> Result<BlockArtifact> {
    let params = BlockParams {
        height: cli.height,
        version: cli.version,
        prev_block_hash: cli.prev_block.clone(),
        time: match cli.time {
            Some(time) => time,
            None => default_time()?,
        },
        bits: cli.bits,
        target: cli.target.clone(),
        payout: cli.address.clone(),
        limits: SearchLimits {
            start_nonce: cli.start_nonce,
            max_attempts: cli.max_attempts,
        },
    };
    let assembler = BlockAssembler::new(params).context("invalid block parameters")?;

    let candidates = mempool::load_mempool(&cli.mempool)?;
    info!(count = candidates.len(), dir = %cli.mempool.display(), "loaded mempool");

    let verifier: Box<dyn SignatureVerifier> = match &cli.verify_with {
        Some(program) => Box::new(CommandVerifier::new(program)),
        None => {
            warn!("no --verify-with program given, accepting every candidate");
            Box::new(AcceptAll)
        }
    };

    let prepared = assembler.prepare(&candidates, verifier.as_ref())?;
    let cancel = AtomicBool::new(false);
    let limits = assembler.params().limits;

    #[cfg(feature = "parallel")]
    let artifact = if cli.parallel {
        prepared.mine_parallel(limits, &cancel)?
    } else {
        prepared.mine(limits, &cancel)?
    };
    #[cfg(not(feature = "parallel"))]
    let artifact = prepared.mine(limits, &cancel)?;

    fs::write(&cli.out, artifact.to_string())
        .with_context(|| format!("writing {}", cli.out.display()))?;
    info!(
        out = %cli.out.display(),
        hash = %artifact.block_hash()?,
        txs = artifact.txids.len(),
        "block written"
    );

    Ok(artifact)
}
