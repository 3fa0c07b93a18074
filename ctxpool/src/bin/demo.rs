use anyhow::{Context, Result, bail};
use clap::Parser;
use ctxpool::{PoolBuilder, PoolConfig, PrincipalService, Propagation, RejectionPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Concurrent submitters calling a pooled service, each checking that the
/// service answers with its own identity.
#[derive(Parser)]
#[command(name = "ctxpool-demo")]
#[command(about = "Exercise context propagation across a reusing worker pool", long_about = None)]
struct Cli {
    /// Propagation strategy: none, inherit-at-spawn, capture-and-restore
    #[arg(short, long, env = "CTXPOOL_PROPAGATION")]
    propagation: Option<Propagation>,

    /// Identities of the concurrent submitters
    #[arg(short, long, value_delimiter = ',', default_value = "Timon,Pumbaa")]
    submitters: Vec<String>,

    /// Requests issued by each submitter
    #[arg(short, long, default_value_t = 500)]
    requests: usize,

    /// Core worker threads
    #[arg(long)]
    core_threads: Option<usize>,

    /// Maximum worker threads
    #[arg(long)]
    max_threads: Option<usize>,

    /// Backlog capacity
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Rejection policy: block, reject
    #[arg(long)]
    rejection: Option<RejectionPolicy>,

    /// Simulated work per request, in milliseconds
    #[arg(long, default_value_t = 10)]
    delay_ms: u64,

    /// JSON pool configuration; flags override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn pool_config(&self) -> Result<PoolConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                PoolConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
            }
            None => PoolConfig::default(),
        };

        if let Some(propagation) = self.propagation {
            config.propagation = propagation;
        }
        if let Some(n) = self.core_threads {
            config.core_threads = n;
        }
        if let Some(n) = self.max_threads {
            config.max_threads = n;
        }
        if let Some(n) = self.queue_capacity {
            config.queue_capacity = n;
        }
        if let Some(rejection) = self.rejection {
            config.rejection = rejection;
        }

        Ok(config)
    }
}

/// Outcome of one submitter's run.
#[derive(Debug, Default)]
struct Tally {
    matched: usize,
    foreign: usize,
    failed: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.pool_config()?;

    info!(
        propagation = %config.propagation,
        core_threads = config.core_threads,
        max_threads = config.max_threads,
        queue_capacity = config.queue_capacity,
        rejection = %config.rejection,
        "starting pool"
    );

    let pool = Arc::new(PoolBuilder::from_config(config).build()?);
    let service = PrincipalService::new(pool.clone())
        .with_delay(std::time::Duration::from_millis(cli.delay_ms));

    let submitters: Vec<_> = cli
        .submitters
        .iter()
        .cloned()
        .map(|identity| {
            let service = service.clone();
            let requests = cli.requests;

            thread::Builder::new()
                .name(format!("submitter-{identity}"))
                .spawn(move || {
                    let source = || identity.clone();
                    let mut tally = Tally::default();

                    for _ in 0..requests {
                        match service.serve(&source, &identity) {
                            Ok(answer) if answer == identity => tally.matched += 1,
                            Ok(answer) => {
                                warn!(expected = %identity, got = %answer, "foreign identity");
                                tally.foreign += 1;
                            }
                            Err(err) => {
                                warn!(expected = %identity, error = %format!("{err:#}"), "request failed");
                                tally.failed += 1;
                            }
                        }
                    }

                    (identity, tally)
                })
                .context("spawning submitter thread")
        })
        .collect::<Result<_>>()?;

    let mut mismatches = 0;

    for submitter in submitters {
        let (identity, tally) = submitter
            .join()
            .map_err(|_| anyhow::anyhow!("submitter thread panicked"))?;

        info!(
            submitter = %identity,
            matched = tally.matched,
            foreign = tally.foreign,
            failed = tally.failed,
            "submitter finished"
        );

        mismatches += tally.foreign + tally.failed;
    }

    drop(service);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        pool.join();
    }

    if mismatches > 0 {
        bail!("{mismatches} requests did not see their own identity");
    }

    info!("every request saw its own identity");
    Ok(())
}
