//! HTTP server.

use crate::error::ServerError;
use crate::routes;
use crate::state::AppState;
use std::future::Future;
use tokio::net::TcpListener;

pub struct DatatalkServer {
    bind: String,
    state: AppState,
}

impl DatatalkServer {
    pub fn new(bind: impl Into<String>, state: AppState) -> Self {
        Self {
            bind: bind.into(),
            state,
        }
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind.clone(),
                source,
            })?;
        tracing::info!(address = %self.bind, "datatalk server listening");

        axum::serve(listener, routes::create_router(self.state.clone()))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("datatalk server stopped");
        Ok(())
    }

    pub fn bind_address(&self) -> &str {
        &self.bind
    }
}
