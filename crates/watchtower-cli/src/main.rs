use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "watchtower", version, about = "Research watchtower CLI")]
struct Cli {
    /// Config file (defaults to ~/.config/watchtower/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use an in-process store instead of the configured REST store
    #[arg(long, global = true)]
    memory: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until interrupted
    Run,
    /// Show the last recorded scan, match and compliance results
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one task tick now (scan, match, compliance, report, notify)
    Tick {
        /// Task name
        task: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score opportunities from a JSON file
    Score {
        /// Opportunity JSON (object or array)
        file: PathBuf,
        /// Capability profile JSON; the configured profile otherwise
        #[arg(long)]
        capabilities: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Draft a grant proposal for a cached opportunity
    Proposal {
        /// Opportunity id (e.g. "NIH_R01_CA_2024_001")
        opportunity: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register a draft clinical trial from a JSON file
    RegisterTrial {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Research coordinations
    Coordination {
        #[command(subcommand)]
        action: commands::coordination::CoordinationAction,
    },
    /// Summarise variant classification histories from a JSON file
    Variants {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context {
        config_path: cli.config,
        memory: cli.memory,
    };

    let result = match cli.command {
        Commands::Run => commands::watch::run(&ctx),
        Commands::Status { json } => commands::watch::status(&ctx, json),
        Commands::Tick { task, json } => commands::watch::tick(&ctx, &task, json),
        Commands::Score {
            file,
            capabilities,
            json,
        } => commands::score::run(&ctx, &file, capabilities.as_deref(), json),
        Commands::Proposal { opportunity, json } => {
            commands::documents::proposal(&ctx, &opportunity, json)
        }
        Commands::RegisterTrial { file, json } => commands::documents::register_trial(&ctx, &file, json),
        Commands::Coordination { action } => commands::coordination::run(&ctx, action),
        Commands::Variants { file, json } => commands::variants::run(&file, json),
        Commands::Config { action } => commands::config::run(&ctx, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
