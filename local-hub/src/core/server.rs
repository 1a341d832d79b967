use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api;
use crate::core::{Config, Result, ServerError, ServerState};

/// HTTP / WebSocket server for POS and KDS clients
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Use pre-built state (tests, custom repositories)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until Ctrl-C or the root token fires
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let state = match self.state {
            Some(state) => state,
            None => ServerState::initialize(self.config, CancellationToken::new()),
        };
        state.start_background_tasks();

        let shutdown = state.shutdown.clone();
        let app = api::build_app(state);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "Local hub listening");
        }

        let signal = shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
                    _ = signal.cancelled() => {}
                }
                // ends the hub loop, the cloud worker and every session
                signal.cancel();
            })
            .await
            .map_err(|e| ServerError::Internal(e.into()))?;

        shutdown.cancel();
        tracing::info!("Local hub stopped");
        Ok(())
    }
}
