// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod state;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::db::{Database, FileDb, MemDb};
use crate::engine::SchedulerHandle;
use crate::state::{Job, RawJob, RawParser, Scheduler};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the store backend (log file or memory)
/// - the scheduler and its metrics registry
/// - the scheduler actor every subcommand talks to
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg, &args);
        return Ok(());
    }

    let store_path = args.db.clone().or_else(|| cfg.store.path.clone());
    let (db, file): (Arc<dyn Database>, Option<Arc<FileDb>>) = match &store_path {
        Some(path) => {
            let file = Arc::new(
                FileDb::open(path, cfg.store.sync)
                    .with_context(|| format!("failed to open store {}", path.display()))?,
            );
            let shared: Arc<dyn Database> = file.clone();
            (shared, Some(file))
        }
        None => {
            info!("no store path configured; using an in-memory store");
            (Arc::new(MemDb::new()), None)
        }
    };

    let registry = Registry::new();
    let scheduler = Scheduler::open(db, RawParser, &cfg.scheduler_options(), Some(&registry))?;
    let (handle, task) = SchedulerHandle::spawn(scheduler);

    match &args.command {
        Command::Stats { metrics } => {
            print_stats(&handle).await?;
            if *metrics {
                print_metrics(&registry)?;
            }
        }
        Command::Missing => {
            for id in handle.missing_job_ids().await? {
                println!("{id}");
            }
        }
        Command::Push { files } => {
            let mut pushed = 0usize;
            for path in files {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read job file {}", path.display()))?;
                let job = RawJob::new(bytes);
                let id = job.id();
                if handle.has_job(id).await? {
                    println!("{id} already queued");
                    continue;
                }
                handle.put_job(job).await?;
                handle.add_runnable_job(id).await?;
                println!("{id}");
                pushed += 1;
            }
            info!(pushed, "pushed jobs");
        }
        Command::Drain { limit } => {
            let print_id = |job: &RawJob| -> errors::Result<()> {
                println!("{}", job.id());
                Ok(())
            };
            let drained = handle
                .execute(print_id, *limit, cfg.execution.progress_interval)
                .await?;
            info!(drained, "drained runnable jobs");
        }
        Command::Reset => {
            handle.clear().await?;
            println!("cleared");
        }
        Command::Compact => match &file {
            Some(file) => {
                file.compact()?;
                println!("compacted {} ({} records)", file.path().display(), file.records());
            }
            None => anyhow::bail!("compact needs a store file (set [store].path or --db)"),
        },
    }

    handle.shutdown(task).await?;
    debug!("scheduler shut down");
    Ok(())
}

/// `--config` must exist when given; the default location is optional.
fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let path = default_config_path();
            if path.exists() {
                load_and_validate(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))
            } else {
                debug!(path = %path.display(), "no config file; using defaults");
                Ok(ConfigFile::default())
            }
        }
    }
}

async fn print_stats(handle: &SchedulerHandle<RawJob>) -> Result<()> {
    println!("pending jobs:  {}", handle.pending_jobs().await?);
    println!("runnable jobs: {}", handle.runnable_job_ids().await?.len());
    println!("missing IDs:   {}", handle.num_missing_job_ids().await?);
    Ok(())
}

fn print_metrics(registry: &Registry) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    print!("{}", String::from_utf8(buffer)?);
    Ok(())
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile, args: &CliArgs) {
    println!("bootqueue dry-run");
    match args.db.as_ref().or(cfg.store.path.as_ref()) {
        Some(path) => println!("  store.path = {}", path.display()),
        None => println!("  store.path = <memory>"),
    }
    println!("  store.sync = {}", cfg.store.sync);
    println!("  cache.enabled = {}", cfg.cache.enabled);
    println!("  cache.jobs = {}", cfg.cache.jobs);
    println!("  cache.dependents = {}", cfg.cache.dependents);
    println!("  metrics.namespace = {}", cfg.metrics.namespace);
    println!(
        "  execution.progress_interval = {}",
        cfg.execution.progress_interval
    );

    debug!("dry-run complete (store not opened)");
}
