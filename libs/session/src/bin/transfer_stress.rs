//! Transfer stress driver - hammers one transfer from many threads
//!
//! Usage:
//!   transfer-stress --threads 16 --calls 10000
//!   transfer-stress --wait-strategy per-executor --remove-midway
//!   transfer-stress --config config/dispatch.toml --json-logs

use actor_dispatch::WaitStrategy;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dispatch_config::{init_logging, RuntimeConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use transfer_session::{Session, TransferHandle, TransferParams};

const PIECE_LENGTH: u32 = 1024;

#[derive(Parser, Debug)]
#[command(name = "transfer-stress")]
#[command(about = "Concurrent dispatch stress test against a single transfer")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment overlay to apply on top of the configuration file
    #[arg(short, long)]
    environment: Option<String>,

    /// Number of caller threads
    #[arg(short, long, default_value_t = 8)]
    threads: usize,

    /// Calls issued by each thread
    #[arg(long, default_value_t = 1000)]
    calls: usize,

    /// Override the configured wait strategy
    #[arg(long, value_enum)]
    wait_strategy: Option<StrategyArg>,

    /// Remove the transfer halfway through the run
    #[arg(long)]
    remove_midway: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    PerCall,
    PerExecutor,
}

impl From<StrategyArg> for WaitStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::PerCall => WaitStrategy::PerCall,
            StrategyArg::PerExecutor => WaitStrategy::PerExecutor,
        }
    }
}

#[derive(Default)]
struct Tally {
    issued: AtomicU64,
    defaulted: AtomicU64,
    rejected: AtomicU64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::load(args.config.as_deref(), args.environment.as_deref())
        .context("Failed to load runtime configuration")?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }
    if let Some(strategy) = args.wait_strategy {
        config.executor.wait_strategy = strategy.into();
    }

    init_logging(&config.logging)?;

    info!(
        threads = args.threads,
        calls = args.calls,
        wait_strategy = ?config.executor.wait_strategy,
        remove_midway = args.remove_midway,
        "Starting transfer stress run"
    );

    let session = Session::new(config.executor.clone())?;
    let num_pieces = args.calls.max(1);
    let handle = session.add_transfer(TransferParams::single_file(
        "stress.bin",
        num_pieces as u64 * u64::from(PIECE_LENGTH),
        PIECE_LENGTH,
    ))?;

    let tally = Tally::default();
    let barrier = Barrier::new(args.threads + 1);
    let started = Instant::now();

    thread::scope(|scope| {
        for worker in 0..args.threads {
            let handle = handle.clone();
            let (tally, barrier) = (&tally, &barrier);
            let calls = args.calls;
            scope.spawn(move || {
                barrier.wait();
                run_caller(worker, calls, &handle, tally);
            });
        }

        barrier.wait();
        if args.remove_midway {
            while tally.issued.load(Ordering::Relaxed) < (args.threads * args.calls / 2) as u64 {
                thread::yield_now();
            }
            let removed = session.remove_transfer(&handle);
            info!(removed, "Transfer removed mid-run");
        }
    });

    let elapsed = started.elapsed();
    let stats = session.stats();
    let issued = tally.issued.load(Ordering::Relaxed);

    info!(
        issued,
        defaulted = tally.defaulted.load(Ordering::Relaxed),
        rejected = tally.rejected.load(Ordering::Relaxed),
        elapsed_ms = elapsed.as_millis() as u64,
        calls_per_sec = (issued as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
        "Caller threads finished"
    );
    info!(
        submitted = stats.tasks_submitted,
        executed = stats.tasks_executed,
        refused = stats.submissions_refused,
        panics = stats.task_panics,
        blocking_waits = stats.blocking_waits,
        herd_wake_ratio = stats.herd_wake_ratio(),
        "Dispatch metrics"
    );

    if handle.is_valid() {
        let status = handle.status();
        info!(
            pieces_done = status.pieces_done,
            progress = status.progress,
            upload_limit = status.upload_limit,
            "Final transfer status"
        );
        debug!(status = %serde_json::to_string(&status)?, "Final status snapshot");
    } else if !args.remove_midway {
        warn!("Transfer expired without being removed");
    }

    session.shutdown();
    Ok(())
}

fn run_caller(worker: usize, calls: usize, handle: &TransferHandle, tally: &Tally) {
    for call in 0..calls {
        let piece = (worker * calls + call) % calls.max(1);
        match call % 4 {
            0 => {
                if handle.set_upload_limit(call as i32).is_err() {
                    tally.rejected.fetch_add(1, Ordering::Relaxed);
                }
            }
            1 => {
                if handle.queue_position() == -1 {
                    tally.defaulted.fetch_add(1, Ordering::Relaxed);
                }
            }
            2 => {
                if handle.add_piece(piece, vec![0; PIECE_LENGTH as usize]).is_err() {
                    tally.rejected.fetch_add(1, Ordering::Relaxed);
                }
            }
            _ => {
                if handle.status().info_hash.is_zero() {
                    tally.defaulted.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        tally.issued.fetch_add(1, Ordering::Relaxed);
    }
    debug!(worker, calls, "Caller finished");
}
