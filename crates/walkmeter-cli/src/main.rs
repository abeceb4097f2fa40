//! `walkmeter` command line: feed sample streams into a SQLite-backed
//! aggregator, inspect the resulting counters, and verify replay
//! determinism.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use walkmeter_core::aggregator::WalkAggregator;
use walkmeter_core::config::WalkmeterConfig;
use walkmeter_core::sample::{ActivityKind, ActivitySample};
use walkmeter_core::store::MemoryStore;
use walkmeter_store::SqliteStateStore;

/// Transitions below this confidence are not worth announcing.
const TRANSITION_CONFIDENCE_FLOOR: u8 = 50;

#[derive(Parser)]
#[command(name = "walkmeter")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the state database (idempotent).
    Init { db: String },
    /// Ingest a JSONL stream of activity samples into the database.
    Feed {
        db: String,
        /// Path to a file with one JSON sample per line.
        samples: PathBuf,
        /// Optional TOML config; defaults apply when absent.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print today's, yesterday's and the all-time best counters.
    Status { db: String },
    /// Replay a sample stream twice in memory and compare state hashes.
    Verify {
        samples: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Init { db } => {
            SqliteStateStore::open(&db)?;
            println!("Initialized state database at {}", db);
        }
        Commands::Feed {
            db,
            samples,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let mut log_store = SqliteStateStore::open(&db)?;
            let mut agg = WalkAggregator::open(SqliteStateStore::open(&db)?, config)?;

            let mut prev_kind: Option<ActivityKind> = None;
            let mut ingested = 0u64;
            let mut dropped = 0u64;
            for sample in read_samples(&samples)? {
                let sample = sample?;
                log_store.append_samples(std::slice::from_ref(&sample))?;
                match agg.ingest(&sample) {
                    Ok(closed) => {
                        ingested += 1;
                        if let Some(bucket) = closed {
                            tracing::debug!(
                                kind = bucket.kind.name(),
                                confidence = bucket.confidence,
                                start_ms = bucket.start_ms,
                                "bucket closed"
                            );
                        }
                        announce_transition(&mut prev_kind, &sample);
                    }
                    Err(walkmeter_core::sample::AggregateError::MalformedSample(reason)) => {
                        dropped += 1;
                        tracing::warn!(%reason, "dropped malformed sample");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let summary = agg.summary();
            println!("Ingested {} samples ({} dropped)", ingested, dropped);
            print_summary(&summary);
        }
        Commands::Status { db } => {
            let agg = WalkAggregator::open(SqliteStateStore::open(&db)?, WalkmeterConfig::default())?;
            print_summary(&agg.summary());
        }
        Commands::Verify { samples, config } => {
            let config = load_config(config.as_deref())?;
            let stream: Vec<ActivitySample> =
                read_samples(&samples)?.collect::<Result<_, _>>()?;
            let first = replay(&stream, config.clone())?;
            let second = replay(&stream, config)?;
            println!("replay hash: {}", hex::encode(first));
            if first == second {
                println!("deterministic: yes");
            } else {
                println!("deterministic: NO ({})", hex::encode(second));
                return Err("replays diverged".into());
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<WalkmeterConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(WalkmeterConfig::from_file_with_env(p)?),
        None => Ok(WalkmeterConfig::default()),
    }
}

fn read_samples(
    path: &std::path::Path,
) -> Result<impl Iterator<Item = Result<ActivitySample, Box<dyn std::error::Error>>>, Box<dyn std::error::Error>>
{
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().filter_map(|line| match line {
        Ok(l) if l.trim().is_empty() => None,
        Ok(l) => Some(serde_json::from_str::<ActivitySample>(&l).map_err(Into::into)),
        Err(e) => Some(Err(e.into())),
    }))
}

/// Log a movement transition when the classification changes to a
/// moving kind with enough confidence, mirroring what a foreground
/// notification would announce.
fn announce_transition(prev_kind: &mut Option<ActivityKind>, sample: &ActivitySample) {
    let changed = *prev_kind != Some(sample.kind);
    if changed && sample.kind.is_moving() && sample.confidence >= TRANSITION_CONFIDENCE_FLOOR {
        tracing::info!(
            kind = sample.kind.name(),
            confidence = sample.confidence,
            at_ms = sample.timestamp_ms,
            "movement transition"
        );
    }
    *prev_kind = Some(sample.kind);
}

fn print_summary(summary: &walkmeter_core::aggregator::DailySummary) {
    println!("walked today:     {} min", summary.walked_today);
    println!("walked yesterday: {} min", summary.walked_yesterday);
    match &summary.best_date {
        Some(date) => println!("best day:         {} min (set {})", summary.best_count, date),
        None => println!("best day:         not yet established"),
    }
}

fn replay(
    stream: &[ActivitySample],
    config: WalkmeterConfig,
) -> Result<[u8; 32], Box<dyn std::error::Error>> {
    let mut agg = WalkAggregator::open(MemoryStore::new(), config)?;
    for sample in stream {
        agg.ingest(sample)?;
    }
    Ok(agg
        .state()
        .map(|s| s.hash())
        .unwrap_or([0u8; 32]))
}
