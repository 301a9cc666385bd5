mod cmd_check;
mod cmd_scan;
mod cmd_serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pushsync",
    version,
    about = "Synchronize source-control pushes into a project tracker"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook receiver
    Serve {
        /// Path to the JSON config file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "8080")]
        port: u16,
    },
    /// Show the artifacts and state changes a commit message would produce
    Scan {
        /// Commit message
        message: String,
    },
    /// Validate the config and resolve the workspace against the tracker
    Check {
        /// Path to the JSON config file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.cmd {
        Command::Serve { config, bind, port } => cmd_serve::execute(&config, &bind, port),
        Command::Scan { message } => cmd_scan::execute(&message),
        Command::Check { config } => cmd_check::execute(&config),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
