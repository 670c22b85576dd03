use anyhow::Result;

use rating_aggregator::cli::Command;
use rating_aggregator::{handle_serve, handle_setup, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Serve { port, ephemeral } => handle_serve(*port, *ephemeral),
        Command::Setup => handle_setup(),
    }
}
