mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::commands::users::UsersCommand;
use crate::logging::init_logging;

#[derive(clap::Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, default_value = "/etc/ftpgate.yaml", env = "FTPGATE_CONFIG")]
    config: PathBuf,

    /// Account file to use instead of the one named in the config file
    #[clap(long, short, global = true)]
    accounts: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a password hash for use in the account file
    Hash,
    /// Validate the config and account files
    Check,
    /// Manage FTP accounts
    Users {
        #[clap(subcommand)]
        command: UsersCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();

    match &cli.command {
        Commands::Hash => crate::commands::hash::command().await,
        Commands::Check => crate::commands::check::command(&cli).await,
        Commands::Users { command } => crate::commands::users::command(&cli, command).await,
    }
}
