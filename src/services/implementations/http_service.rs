use crate::http::{self, AppState};
use crate::logger::{self, LogTag};
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Binds the thin HTTP boundary (§4.13) to the configured loopback
/// address and serves it for the engine's lifetime.
pub struct HttpService {
    state: Option<AppState>,
}

impl HttpService {
    pub fn new(state: AppState) -> Self {
        Self { state: Some(state) }
    }
}

#[async_trait]
impl Service for HttpService {
    fn name(&self) -> &'static str {
        "http"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["collector"]
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let state = self.state.take().ok_or("http service already started")?;
        let bind_address = state.config.webserver.bind_address();
        let router = http::build_router(state);

        let listener = tokio::net::TcpListener::bind(&bind_address)
            .await
            .map_err(|e| format!("failed to bind {bind_address}: {e}"))?;
        logger::info(LogTag::System, &format!("http boundary listening on {bind_address}"));

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                shutdown.notified().await;
            });
            if let Err(e) = server.await {
                logger::error(LogTag::System, &format!("http server error: {e}"));
            }
        });

        Ok(vec![handle])
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}
