mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snapflow")]
#[command(about = "Declare it. Snapshot it. Instance snapshots as code.", long_about = None)]
struct Cli {
    /// Declaration file (skips discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the actions needed to match the declarations
    Plan,
    /// Create, replace and delete snapshots to match the declarations
    Apply {
        /// Execute without the confirmation guard
        #[arg(short, long)]
        yes: bool,
    },
    /// Re-read tracked snapshots and resume unfinished waits
    Refresh,
    /// Delete tracked snapshots
    Destroy {
        /// Snapshot name (all tracked snapshots when omitted)
        name: Option<String>,
        /// Execute without the confirmation guard
        #[arg(short, long)]
        yes: bool,
    },
    /// Inspect the local state file
    #[command(subcommand)]
    State(StateCommands),
    /// Validate the declaration file
    Validate,
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum StateCommands {
    /// List tracked snapshots
    List,
    /// Show one tracked snapshot as JSON
    Show {
        /// Snapshot name
        name: String,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Plan => commands::plan::handle(config).await?,
        Commands::Apply { yes } => commands::apply::handle(config, yes).await?,
        Commands::Refresh => commands::refresh::handle(config).await?,
        Commands::Destroy { name, yes } => commands::destroy::handle(config, name, yes).await?,
        Commands::State(StateCommands::List) => commands::state::list(config).await?,
        Commands::State(StateCommands::Show { name }) => {
            commands::state::show(config, &name).await?
        }
        Commands::Validate => commands::validate::handle(config)?,
        Commands::Version => println!("snapflow {}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}
