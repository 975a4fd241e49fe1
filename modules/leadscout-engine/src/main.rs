use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use leadscout_common::{Config, LeadStatus, Mode};
use leadscout_engine::{AcquisitionEngine, ExportFormat};

#[derive(Parser)]
#[command(name = "leadscout", about = "Discover, verify and track B2B leads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the acquisition loop in the foreground until Ctrl-C.
    Run {
        #[arg(long)]
        niche: String,
        /// Defaults to DEFAULT_COUNTRY.
        #[arg(long)]
        country: Option<String>,
        #[arg(long, default_value = "quantum")]
        mode: Mode,
        /// Stop after this many completed cycles.
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// List leads, newest first.
    List {
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Export all leads as `phones` or `csv`.
    Export {
        format: ExportFormat,
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete one lead.
    Delete { id: Uuid },
    /// Move a lead to a new status.
    Status { id: Uuid, status: LeadStatus },
    /// Delete every lead.
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscout=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Command::Run {
        niche,
        country,
        mode,
        cycles,
    } = cli.command
    {
        let config = Config::from_env();
        config.log_redacted();
        let engine = AcquisitionEngine::from_config(&config).context("Failed to load working set")?;
        let country = country.unwrap_or_else(|| config.default_country.clone());
        return run(&engine, &niche, &country, mode, cycles).await;
    }

    // Everything else only touches the local store.
    let config = Config::local_from_env();
    let engine = AcquisitionEngine::from_config(&config).context("Failed to load working set")?;

    match cli.command {
        Command::List { query } => {
            for lead in engine.leads(query.as_deref()) {
                println!(
                    "{}  {:<11} {:>3.0}  {:<15} {} ({})",
                    lead.id, lead.status.as_str(), lead.integrity, lead.phone_number, lead.name, lead.company
                );
            }
        }
        Command::Export { format, output } => {
            let body = engine.export(format);
            match output {
                Some(path) => {
                    std::fs::write(&path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Export written");
                }
                None => println!("{body}"),
            }
        }
        Command::Delete { id } => {
            let lead = engine.delete_record(id).await?;
            println!("Deleted {} ({})", lead.name, lead.phone_number);
        }
        Command::Status { id, status } => {
            let lead = engine.set_status(id, status).await?;
            println!("{} is now {}", lead.name, lead.status);
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to clear all leads without --yes");
            }
            let dropped = engine.clear_all(true).await?;
            println!("Cleared {dropped} leads");
        }
        Command::Run { .. } => {}
    }
    Ok(())
}

async fn run(
    engine: &AcquisitionEngine,
    niche: &str,
    country: &str,
    mode: Mode,
    cycles: Option<u64>,
) -> Result<()> {
    engine.start(niche, country, mode)?;

    let mut poll = tokio::time::interval(Duration::from_millis(250));
    let mut last_seq: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = poll.tick() => {
                let seen = last_seq;
                for entry in engine.activity().into_iter().filter(|e| e.seq > seen) {
                    println!("[{}] {:<7} {}", entry.at.format("%H:%M:%S"), entry.level.to_string(), entry.message);
                    last_seq = entry.seq;
                }

                if let Some(limit) = cycles {
                    if engine.snapshot().cycles >= limit {
                        info!(cycles = limit, "Cycle limit reached");
                        break;
                    }
                }
            }
        }
    }

    engine.stop()?;
    println!("{} leads in working set", engine.snapshot().lead_count);
    Ok(())
}
