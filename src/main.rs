//! Command-line interface for mssql-sync
//!
//! # Usage Examples
//!
//! ## Run Jobs
//! ```bash
//! export MSSQL_CONNECTION_STRING="server=tcp:localhost,1433;database=Sales;user id=sync;password=...;TrustServerCertificate=true"
//! export DESTINATION_URL=https://xyz.supabase.co
//! export DESTINATION_API_KEY=...
//!
//! # Every job in the file, as one batch
//! mssql-sync run --config jobs.yaml
//!
//! # Selected jobs, reading and transforming only
//! mssql-sync run --config jobs.yaml --table tblcity --dry-run
//! ```
//!
//! ## Inspect Jobs
//! ```bash
//! mssql-sync list --config jobs.yaml
//! ```
//!
//! ## Watermark
//! ```bash
//! mssql-sync watermark show --config jobs.yaml
//!
//! # Defaults to now in the jobs file's timezone
//! mssql-sync watermark set --config jobs.yaml --at "2024-01-01 00:00:00"
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use mssql_source::{source_sql, SqlServerSource};
use mssql_sync::replicate::SyncLogger;
use mssql_sync::{run_batch, BatchSettings, DestinationOpts, JobsFile, SourceOpts};
use rest_sink::RestSink;
use std::path::PathBuf;
use sync_core::Watermark;
use table_sink::{NullSink, TableSink};

#[derive(Parser)]
#[command(name = "mssql-sync")]
#[command(about = "Replicate SQL Server tables into a PostgREST-style datastore")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run table jobs as one batch
    Run {
        /// Jobs file (YAML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,

        /// Only run these jobs (repeatable; default: all)
        #[arg(long = "table", value_name = "NAME")]
        tables: Vec<String>,

        /// Source database connection options
        #[command(flatten)]
        source: SourceOpts,

        /// Destination options
        #[command(flatten)]
        destination: DestinationOpts,

        /// Read and transform, but don't truncate, insert, or log
        #[arg(long)]
        dry_run: bool,
    },

    /// Print each job and the source query it runs
    List {
        /// Jobs file (YAML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Inspect or overwrite the incremental watermark
    Watermark {
        #[command(subcommand)]
        command: WatermarkCommand,
    },
}

#[derive(Subcommand)]
enum WatermarkCommand {
    /// Print the stored watermark
    Show {
        /// Jobs file (YAML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,

        #[command(flatten)]
        destination: DestinationOpts,
    },

    /// Overwrite the stored watermark
    Set {
        /// Jobs file (YAML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,

        /// New value, e.g. "2024-01-01 00:00:00" (default: now)
        #[arg(long)]
        at: Option<String>,

        #[command(flatten)]
        destination: DestinationOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            tables,
            source,
            destination,
            dry_run,
        } => run_jobs(config, tables, source, destination, dry_run).await,
        Commands::List { config } => list_jobs(config),
        Commands::Watermark { command } => match command {
            WatermarkCommand::Show {
                config,
                destination,
            } => show_watermark(config, destination).await,
            WatermarkCommand::Set {
                config,
                at,
                destination,
            } => set_watermark(config, at, destination).await,
        },
    }
}

async fn run_jobs(
    config: PathBuf,
    tables: Vec<String>,
    source_opts: SourceOpts,
    destination: DestinationOpts,
    dry_run: bool,
) -> anyhow::Result<()> {
    let jobs_file = JobsFile::load(&config)?;
    let jobs = jobs_file.select(&tables)?;
    let settings = BatchSettings::from(&jobs_file);

    let rest = RestSink::new(destination.rest_config(&jobs_file)?)
        .context("Failed to create destination client")?;
    let sink: Box<dyn TableSink> = if dry_run {
        tracing::info!("Dry-run mode: the destination will not be modified");
        Box::new(NullSink::reading_from(rest))
    } else {
        Box::new(rest)
    };

    let mut source = SqlServerSource::connect(&source_opts.source_connection_string)
        .await
        .context("Failed to connect to SQL Server")?;

    let report = run_batch(&mut source, sink.as_ref(), &jobs, &settings).await?;

    for job in &report.jobs {
        println!("{job}");
    }
    for e in &report.fatal {
        println!("{}: failed: {e}", e.table());
    }
    for (table, e) in &report.log_failures {
        println!("{table}: failed run entry not logged: {e}");
    }

    if report.has_fatal() {
        anyhow::bail!(
            "{} of {} jobs failed",
            report.fatal.len(),
            report.fatal.len() + report.jobs.len()
        );
    }
    Ok(())
}

fn list_jobs(config: PathBuf) -> anyhow::Result<()> {
    let jobs_file = JobsFile::load(&config)?;

    for job in &jobs_file.tables {
        let sql = source_sql(job).with_context(|| format!("Job {}", job.name))?;
        println!("{} ({}, batch size {})", job.name, job.mode, job.batch_size);
        println!("  {sql}");
    }
    Ok(())
}

async fn show_watermark(config: PathBuf, destination: DestinationOpts) -> anyhow::Result<()> {
    let jobs_file = JobsFile::load(&config)?;
    let sink = RestSink::new(destination.rest_config(&jobs_file)?)
        .context("Failed to create destination client")?;

    match SyncLogger::new(&sink)
        .current_watermark()
        .await
        .context("Failed to read the sync watermark")?
    {
        Some(watermark) => println!("{}", watermark.to_log_string()),
        None => println!(
            "No watermark stored (incremental jobs start from {})",
            jobs_file.default_watermark.to_log_string()
        ),
    }
    Ok(())
}

async fn set_watermark(
    config: PathBuf,
    at: Option<String>,
    destination: DestinationOpts,
) -> anyhow::Result<()> {
    let jobs_file = JobsFile::load(&config)?;
    let watermark = match at {
        Some(text) => Watermark::parse_in(&text, &jobs_file.timezone)?,
        None => Watermark::now_in(&jobs_file.timezone),
    };

    let sink = RestSink::new(destination.rest_config(&jobs_file)?)
        .context("Failed to create destination client")?;
    SyncLogger::new(&sink)
        .advance_watermark(&watermark)
        .await
        .context("Failed to write the sync watermark")?;

    println!("Watermark set to {}", watermark.to_log_string());
    Ok(())
}
