//! ADL sandbox runner
//!
//! Repeatedly exercises every attribute kind of one entity against an
//! in-memory attribute store and logs what it reads back:
//! 1. Read the visit counter
//! 2. Stage property, metadata, set, list and counter writes
//! 3. Commit them in one request
//! 4. Read everything back in one request
//!
//! Usage:
//!   adl-sandbox --interval-secs 5 --iterations 3

use std::{sync::Arc, time::Duration};
use adl_client::{AdlClient, ClientConfig, InMemoryStore, RequestContext};
use adl_sandbox::run_iteration;
use adl_types::Caller;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "adl-sandbox")]
#[command(about = "Exercise the ADL client against an in-memory attribute store")]
struct Args {
    /// Entity to read and write
    #[arg(short, long, default_value = "THIS-IS-A-FID")]
    entity: String,

    /// Seconds between iterations
    #[arg(long, default_value = "5")]
    interval_secs: u64,

    /// Stop after this many iterations (0 runs until interrupted)
    #[arg(short = 'n', long, default_value = "0")]
    iterations: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let client = AdlClient::with_config(
        Arc::new(InMemoryStore::new()),
        ClientConfig {
            request_timeout_ms: args.timeout_ms,
            ..ClientConfig::default()
        },
    );
    let ctx = RequestContext::new(Caller::new("sandbox", "sandbox"));

    info!(entity = %args.entity, interval_secs = args.interval_secs, "ADL sandbox starting");
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs.max(1)));
    let mut iteration = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }

        iteration += 1;
        match run_iteration(&client, &ctx, &args.entity)
            .await
            .with_context(|| format!("iteration {iteration}"))
        {
            Ok(report) => {
                info!(
                    applied = report.applied,
                    counter = report.counter,
                    "{}: {:?}",
                    adl_sandbox::PROPERTY,
                    report.property
                );
                info!("{}: {:?}", adl_sandbox::SECOND_PROPERTY, report.second_property);
                info!("meta: {:?}", report.metadata);
                for member in &report.set {
                    info!("set item: {member}");
                }
                if report.list.is_empty() {
                    info!("no list items returned");
                }
                for item in &report.list {
                    info!("list item {} => {}", item.key, item.value);
                }
            }
            Err(e) => warn!("{e:#}"),
        }

        if args.iterations > 0 && iteration >= args.iterations {
            break;
        }
    }

    info!(iterations = iteration, "ADL sandbox stopped");
    Ok(())
}
