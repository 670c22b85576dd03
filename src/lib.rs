pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod pagination;
pub mod rating;
pub mod services;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

use crate::cli::Command;
use crate::config::settings::AppConfig;
use crate::services::server::ServerService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16, ephemeral: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::from_env();
        let service = ServerService::new(port, config, ephemeral);
        service.run().await
    })
}

pub fn handle_setup() -> Result<()> {
    let config = AppConfig::from_env();
    let pool = database::create_pool(&config.server.database_path)?;
    let mut conn = database::get_connection(&pool)?;
    database::setup::initialize_schema(&mut conn)?;

    info!("Database ready at {}", config.server.database_path);
    Ok(())
}
