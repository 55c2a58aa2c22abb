//! kpfm CLI - Keep Kubernetes port forwards alive
//!
//! Runs every port forward configured for the active kube context,
//! restarts them when they fail and re-targets them on context switches.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "kpfm")]
#[command(author, version, about = "Keep Kubernetes port forwards alive across context switches")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the contexts file (default: ~/.config/.kpf)
    #[arg(short, long, global = true, env = "KPFM_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run and supervise the port forwards of the active context
    Run {
        /// Context polling interval in seconds (overrides the config file)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// List configured contexts and their connections
    #[command(alias = "ls")]
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the active kube context
    Current,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "kpfm=debug,kpfm_core=debug"
    } else {
        "kpfm=info,kpfm_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::List { json }) => commands::list::run(cli.config, json).await?,
        Some(Commands::Current) => commands::current::run().await?,
        Some(Commands::Run { interval }) => commands::run::run(cli.config, interval).await?,
        None => commands::run::run(cli.config, None).await?,
    }

    Ok(())
}
