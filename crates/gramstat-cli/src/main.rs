//! gramstat — GRAM5 usage packet ingest.
//!
//! # Usage
//!
//! ```text
//! gramstat init --database /var/lib/gramstat/usage.db
//! gramstat upload --input packets.jsonl
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use gramstat_core::GramstatConfig;
use gramstat_core::config::LoggingConfig;

mod commands;

const DEFAULT_CONFIG: &str = "gramstat.toml";

#[derive(Parser)]
#[command(
    name = "gramstat",
    about = "Normalize GRAM5 usage packets into a star-schema store",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Configuration file (default: ./gramstat.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override [database].path from the configuration
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and seed the standard RSL attributes
    Init,
    /// Upload JSON-lines usage packets
    Upload {
        /// Packet file, one JSON packet per line ("-" reads stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<GramstatConfig> {
    let mut config = match &cli.config {
        Some(path) => GramstatConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            GramstatConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => GramstatConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.filter))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Init => commands::init::run(&config),
        Commands::Upload { input } => {
            let summary = commands::upload::run(&config, &input)?;
            if !summary.is_clean() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
