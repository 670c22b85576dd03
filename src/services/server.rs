use anyhow::{Context, Result};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use crate::api::handlers::AppState;
use crate::api::routes::create_router;
use crate::cache::{Cache, MemoryCache, NoopCache};
use crate::config::settings::AppConfig;
use crate::database::{
    self, EntityCatalog, MemoryEntityCatalog, MemoryVoteStore, SqliteEntityCatalog,
    SqliteVoteStore, VoteStore, setup,
};

pub struct ServerService {
    port: u16,
    config: AppConfig,
    ephemeral: bool,
}

impl ServerService {
    pub fn new(port: u16, config: AppConfig, ephemeral: bool) -> Self {
        Self {
            port,
            config,
            ephemeral,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let (votes, entities) = self.open_stores()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut background: Vec<JoinHandle<()>> = Vec::new();

        let cache: Arc<dyn Cache> = if self.config.cache.enabled {
            let memory = Arc::new(MemoryCache::new());
            let purge =
                memory.spawn_purge_task(self.config.cache.purge_interval, shutdown_rx.clone());
            background.push(purge);
            memory
        } else {
            info!("Caching disabled");
            Arc::new(NoopCache)
        };

        let state = Arc::new(AppState::new(self.config.clone(), votes, entities, cache));

        let prior = state.ratings.prior().clone();
        prior.initialize(self.config.refresh.startup_timeout).await;
        background.push(prior.start_periodic_refresh(self.config.refresh.interval, shutdown_rx));

        let app = create_router(state).layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Shutting down background tasks");
        let _ = shutdown_tx.send(true);
        for task in background {
            if let Err(e) = task.await {
                error!("Background task ended abnormally: {e}");
            }
        }

        Ok(())
    }

    fn open_stores(&self) -> Result<(Arc<dyn VoteStore>, Arc<dyn EntityCatalog>)> {
        if self.ephemeral {
            info!("Using in-memory stores; data is lost on exit");
            let votes: Arc<dyn VoteStore> = Arc::new(MemoryVoteStore::new());
            let entities: Arc<dyn EntityCatalog> = Arc::new(MemoryEntityCatalog::new());
            return Ok((votes, entities));
        }

        let db_path = &self.config.server.database_path;
        info!("Opening database at {db_path}");
        let pool = database::create_pool(db_path)?;
        setup::initialize_schema(&mut database::get_connection(&pool)?)?;

        let votes: Arc<dyn VoteStore> = Arc::new(SqliteVoteStore::new(pool.clone()));
        let entities: Arc<dyn EntityCatalog> = Arc::new(SqliteEntityCatalog::new(pool));
        Ok((votes, entities))
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, stopping server"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
