#![allow(clippy::must_use_candidate)]

mod cors;
mod sweeper;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sonata_config::Config;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use sweeper::Sweeper;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    sweeper: Option<Sweeper>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Creates the scratch directory and loads the model before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable, the scratch
    /// directory cannot be created, or the model fails to load
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_addr();
        let request_timeout = config.server.request_timeout()?;

        let music_state = musicgen::build_server(&config)?;

        let store = Arc::clone(music_state.store());
        store
            .ensure_dir()
            .map_err(|e| anyhow::anyhow!("Failed to prepare scratch directory: {e}"))?;

        music_state
            .load_model()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load model '{}': {e}", config.model.model_id))?;

        let sweeper = match config.artifacts.retention()? {
            Some(retention) => Some(Sweeper {
                store,
                retention,
                interval: config.artifacts.sweep_interval()?,
            }),
            None => {
                tracing::debug!("artifact sweeper disabled");
                None
            }
        };

        // Feature routes
        let mut app = musicgen::endpoint_router();

        // Health check
        if config.server.health.enabled {
            app = app.merge(musicgen::health_router(&config.server.health.path));
        }

        let mut app = app.with_state(music_state);

        // Apply middleware layers (innermost first)

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // Bound the HTTP exchange; generation itself keeps running
        app = app.layer(TimeoutLayer::new(request_timeout));

        // CORS
        if config.server.cors.enabled {
            app = app.layer(cors::cors_layer(&config.server.cors));
        }

        Ok(Self {
            router: app,
            listen_address,
            sweeper,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener. The artifact
    /// sweeper is not started.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let sweeper = self.sweeper.map(|sweeper| sweeper.spawn(shutdown.child_token()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        if let Some(sweeper) = sweeper
            && let Err(e) = sweeper.await
        {
            tracing::warn!(error = %e, "artifact sweeper ended abnormally");
        }

        Ok(())
    }
}
