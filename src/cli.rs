use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Bayesian rating aggregation service")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
        /// Keep votes and entities in memory instead of SQLite
        #[arg(long)]
        ephemeral: bool,
    },
    /// Create the database schema at DATABASE_PATH
    Setup,
}
