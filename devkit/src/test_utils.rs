/*!
Test Harness pour le dashboard

Facilite l'écriture de tests d'intégration avec:
- Un FakeBackend scripté branché dans un AppState complet
- Des intervalles de polling courts
- Des attentes bornées sur l'état des vues (snapshot, offset, slot retiré)
*/

use crate::backend_stub::FakeBackend;
use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use caniot_dashboard::config::DashboardConfig;
use caniot_dashboard::http::{build_router, AppState};
use caniot_dashboard::poller::ViewPoller;
use caniot_dashboard::state::{ViewId, ViewSlot};
use caniot_dashboard::view_model::ViewSnapshot;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_POLL_MS: u64 = 200;
pub const TEST_TICK_MS: u64 = 50;

/// Harness de test : backend factice + état applicatif complet
pub struct TestHarness {
    pub backend: FakeBackend,
    pub app: AppState,
}

impl TestHarness {
    pub fn new() -> Self {
        let mut cfg = DashboardConfig::default();
        cfg.polling.poll_interval_ms = TEST_POLL_MS;
        cfg.polling.tick_interval_ms = TEST_TICK_MS;
        Self::with_config(cfg)
    }

    pub fn with_config(cfg: DashboardConfig) -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        let backend = FakeBackend::new();
        let app = AppState::new(&cfg, Arc::new(backend.clone()));
        Self { backend, app }
    }

    pub fn poller(&self) -> &ViewPoller {
        &self.app.poller
    }

    pub fn router(&self) -> Router {
        build_router(self.app.clone())
    }

    /// Envoie une requête au router, renvoie le statut et le corps JSON
    /// (Value::Null si corps vide, Value::String si non-JSON)
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&v)?)
            }
            None => Body::empty(),
        };

        let resp = self.router().oneshot(builder.body(body)?).await?;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        log::info!("📨 {} {} -> {}", method, path, status);
        Ok((status, json))
    }

    pub async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.request("GET", path, None, &[]).await
    }

    pub fn slot(&self, id: ViewId) -> Option<ViewSlot> {
        self.app.store.lock().get(&id).cloned()
    }

    pub fn snapshot(&self, id: ViewId) -> Option<ViewSnapshot> {
        self.slot(id).and_then(|s| s.snapshot)
    }

    /// Attend qu'une condition sur le harness devienne vraie
    pub async fn wait_until<F>(&self, timeout_ms: u64, mut cond: F) -> Result<()>
    where
        F: FnMut(&Self) -> bool,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if cond(self) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        log::warn!("⏰ Timeout after {}ms", timeout_ms);
        anyhow::bail!("condition not met within {timeout_ms}ms");
    }

    /// Attend le premier snapshot commité pour la vue
    pub async fn wait_for_snapshot(&self, id: ViewId, timeout_ms: u64) -> Result<ViewSnapshot> {
        self.wait_until(timeout_ms, |h| h.snapshot(id).is_some()).await?;
        self.snapshot(id).ok_or_else(|| anyhow::anyhow!("view {id:?} disappeared"))
    }

    /// Attend que le slot de la vue soit retiré du store
    pub async fn wait_for_removal(&self, id: ViewId, timeout_ms: u64) -> Result<()> {
        self.wait_until(timeout_ms, |h| h.slot(id).is_none()).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
