use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratekeeper::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for ratekeeper::AppCommand {
    fn from(cmd: Commands) -> ratekeeper::AppCommand {
        match cmd {
            Commands::Rate { base, target } => ratekeeper::AppCommand::Rate { base, target },
            Commands::Sync => ratekeeper::AppCommand::Sync,
            Commands::Watch { interval_minutes } => {
                ratekeeper::AppCommand::Watch { interval_minutes }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Look up the exchange rate between two currencies
    Rate {
        /// Currency to convert from, e.g. EUR
        base: String,
        /// Currency to convert to, e.g. GBP
        target: String,
    },
    /// Fetch the latest rates once and store them
    Sync,
    /// Keep syncing rates on an interval until interrupted
    Watch {
        /// Override `sync.interval_minutes` from the config
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ratekeeper::cli::setup::setup(),
        Some(cmd) => ratekeeper::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
