/**
 * CANIOT DASHBOARD - Point d'entrée du serveur de vues
 *
 * RÔLE : Bootstrap : config, client contrôleur, montage des écrans
 * permanents, serveur HTTP. Arrêt propre sur Ctrl-C (les vues sont
 * démontées, leurs requêtes en vol abandonnées).
 */

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use caniot_dashboard::config::load_config;
use caniot_dashboard::http::{build_router, AppState};
use caniot_dashboard::state::ViewKind;
use caniot_dashboard::{DashboardError, HttpBackend, SharedBackend};

const PERMANENT_VIEWS: [ViewKind; 5] =
    [ViewKind::Home, ViewKind::BleDevices, ViewKind::Garage, ViewKind::Heaters, ViewKind::Alarm];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await.context("loading dashboard configuration")?;

    let backend: SharedBackend = Arc::new(HttpBackend::new(&cfg.backend).map_err(DashboardError::from)?);
    info!(base_url = %cfg.backend.base_url, "controller backend ready");

    let app_state = AppState::new(&cfg, backend);
    for kind in PERMANENT_VIEWS {
        app_state.ensure_mounted(kind);
    }

    let app = build_router(app_state.clone());

    let addr: SocketAddr = cfg
        .http
        .listen
        .parse()
        .map_err(|_| DashboardError::InvalidAddress(cfg.http.listen.clone()))?;
    let listener = TcpListener::bind(addr).await.map_err(DashboardError::from)?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("http server")?;

    for kind in PERMANENT_VIEWS {
        app_state.unmount(kind).await;
    }
    info!("dashboard stopped");
    Ok(())
}
