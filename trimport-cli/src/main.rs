use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trimport_core::DedupScope;
use trimport_ingest::NumberPolicy;
use trimport_ledger::ExportFormat;

mod config;
mod scan;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "trimport",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TRIMPORT_BUILD_SHA"), ")"),
    about = "Import brokerage statement PDFs into a SQLite ledger"
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract transactions from statement PDFs and store the new ones
    Scan {
        /// PDF files or directories to scan
        paths: Vec<PathBuf>,

        /// Directory to scan recursively for PDFs
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Ledger database (default: [storage].db_path from config)
        #[arg(long)]
        db: Option<PathBuf>,

        /// auto, continental (1.234,56) or anglo (1,234.56)
        #[arg(long)]
        number_format: Option<NumberPolicy>,

        /// per-document or global
        #[arg(long)]
        dedup_scope: Option<DedupScope>,
    },

    /// Write stored transactions to CSV, JSON or XLSX
    Export {
        /// csv, json or xlsx (default: from the output extension, else csv)
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Output file
        #[arg(long)]
        out: PathBuf,

        /// Export at most this many rows, oldest first
        #[arg(long)]
        limit: Option<usize>,

        /// Ledger database (default: [storage].db_path from config)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Manage ~/.trimport/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,

    /// Print the effective config
    Show,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan {
            paths,
            folder,
            db,
            number_format,
            dedup_scope,
        } => {
            let mut cfg = config::load_config()?;
            if let Some(policy) = number_format {
                cfg.pipeline.number_format = policy;
            }
            if let Some(scope) = dedup_scope {
                cfg.pipeline.dedup_scope = scope;
            }
            let db_path = db.unwrap_or_else(|| cfg.storage.db_path.clone());
            let pdfs = scan::discover_pdfs(&paths, folder.as_deref())?;
            scan::run_scan(cfg, &pdfs, &db_path)?;
        }

        Command::Export {
            format,
            out,
            limit,
            db,
        } => {
            let cfg = config::load_config()?;
            let db_path = db.unwrap_or(cfg.storage.db_path);
            scan::run_export(&db_path, format, &out, limit)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config(&config::load_config()?)?,
        },
    }

    Ok(())
}
