use std::future::IntoFuture;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Bundle sync HTTP server.
pub struct GbsServer {
    config: ServerConfig,
    state: AppState,
}

impl GbsServer {
    /// Validate `config` and set up the engine behind the handlers.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let state = AppState::from_config(&config);
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.max_body())
    }

    fn max_body(&self) -> usize {
        usize::try_from(self.config.max_bundle_size).unwrap_or(usize::MAX)
    }

    /// Serve until SIGINT or SIGTERM. In-flight requests get
    /// `shutdown_timeout` to finish.
    pub async fn serve(self) -> ServerResult<()> {
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            source_repo = ?self.config.source_repo,
            sink_repo = ?self.config.sink_repo,
            scratch_dir = %self.config.scratch_dir.display(),
            "git-bundle-sync server listening"
        );

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let graceful = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                tracing::info!("shutting down");
                let _ = stop_tx.send(true);
            })
            .into_future();
        let timeout = self.config.shutdown_timeout();
        let deadline = async move {
            if stop_rx.wait_for(|stopping| *stopping).await.is_ok() {
                tokio::time::sleep(timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = graceful => result.map_err(|e| ServerError::Internal(e.to_string()))?,
            () = deadline => tracing::warn!(?timeout, "shutdown timed out, dropping in-flight requests"),
        }
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
