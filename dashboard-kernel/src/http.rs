/**
 * API REST DASHBOARD - Exposition des vues en JSON
 *
 * RÔLE :
 * Sert les view models (home, ble, garage, heaters, alarm, devices/{did})
 * tels que calculés depuis le dernier snapshot commité par le poller.
 *
 * FONCTIONNEMENT :
 * - GET /views/{route} monte la vue au premier accès, puis rend son snapshot
 * - DELETE /views/{route} démonte la vue (annulation du polling)
 * - POST /devices/{did}/command relaie une commande au contrôleur
 * - /notifications : toasts actifs, /ui/debug : bascule du mode debug
 *
 * SÉCURITÉ :
 * - Header x-api-key exigé si http.api_key est configurée
 * - /health toujours accessible
 */

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::SharedBackend;
use crate::comfort::SeasonPolicy;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::health::{DashboardHealth, PollerHealth};
use crate::liveness::LivenessPolicy;
use crate::models::{Command, DeviceRef};
use crate::notifications::{Notifier, Toast};
use crate::poller::{PollIntervals, ViewHandle, ViewPoller};
use crate::state::{new_state, new_view_store, Shared, ViewId, ViewKind, ViewStore};
use crate::view_model::{DeviceViewModel, ViewContext, ViewModel};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UiState {
    pub debug_mode: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub store: ViewStore,
    pub mounted: Shared<HashMap<ViewKind, ViewHandle>>,
    pub poller: ViewPoller,
    pub backend: SharedBackend,
    pub notifier: Notifier,
    pub health: PollerHealth,
    pub ui: Shared<UiState>,
    pub liveness: LivenessPolicy,
    pub season: SeasonPolicy,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub route: String,
    /// true tant qu'aucun poll n'a abouti pour cette vue
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ViewModel>,
}

impl AppState {
    pub fn new(cfg: &DashboardConfig, backend: SharedBackend) -> Self {
        let store = new_view_store();
        let notifier = Notifier::new(&cfg.notifications);
        let health = PollerHealth::new();
        let poller = ViewPoller::new(
            backend.clone(),
            notifier.clone(),
            health.clone(),
            store.clone(),
            PollIntervals::from_config(cfg),
        );
        Self {
            store,
            mounted: new_state(HashMap::new()),
            poller,
            backend,
            notifier,
            health,
            ui: new_state(UiState { debug_mode: cfg.ui.debug_mode }),
            liveness: cfg.liveness,
            season: cfg.season_policy(),
            api_key: cfg.http.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    /// Monte la vue si besoin, une seule instance par route
    pub fn ensure_mounted(&self, kind: ViewKind) -> ViewId {
        let mut mounted = self.mounted.lock();
        if let Some(handle) = mounted.get(&kind) {
            return handle.id();
        }
        let handle = self.poller.mount(kind);
        let id = handle.id();
        mounted.insert(kind, handle);
        id
    }

    pub async fn unmount(&self, kind: ViewKind) -> bool {
        let handle = self.mounted.lock().remove(&kind);
        match handle {
            Some(h) => {
                h.unmount().await;
                true
            }
            None => false,
        }
    }

    fn context(&self, now_offset_seconds: u64) -> ViewContext<'_> {
        ViewContext {
            policy: &self.liveness,
            season_adjusted: self.season.is_summer_now(),
            debug_mode: self.ui.lock().debug_mode,
            now_offset_seconds,
        }
    }

    pub fn render(&self, kind: ViewKind, id: ViewId) -> ViewResponse {
        let slot = self.store.lock().get(&id).cloned();
        let route = kind.route();
        let Some(slot) = slot else {
            return ViewResponse { route, loading: true, polled_at: None, model: None };
        };

        let ctx = self.context(slot.offset);
        let model = slot.snapshot.as_ref().map(|s| s.render(&ctx));
        ViewResponse {
            route,
            loading: model.is_none(),
            polled_at: slot.polled_at.and_then(|t| t.format(&Rfc3339).ok()),
            model,
        }
    }
}

async fn require_api_key(State(app): State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    let path = req.uri().path();

    // Health check toujours accessible
    if path.starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let Some(expected) = app.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        warn!(path, "rejected request without valid api key");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/views", get(list_views))
        .route("/views/{*route}", get(get_view).delete(unmount_view))
        .route("/devices/{did}/command", post(send_command))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}", delete(dismiss_notification))
        .route("/ui/debug", get(get_debug).put(set_debug))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_api_key))
        .with_state(app_state)
}

// GET /system/health (compteurs du polling)
async fn get_system_health(State(app): State<AppState>) -> Json<DashboardHealth> {
    Json(app.health.get_health(&app.store))
}

// GET /views (routes montées)
async fn list_views(State(app): State<AppState>) -> Json<Vec<String>> {
    let mut routes: Vec<String> = app.mounted.lock().keys().map(|k| k.route()).collect();
    routes.sort();
    Json(routes)
}

// GET /views/{route}
async fn get_view(State(app): State<AppState>, Path(route): Path<String>) -> Result<Json<ViewResponse>, DashboardError> {
    let kind = ViewKind::from_route(&route).ok_or(DashboardError::UnknownView(route))?;
    let id = app.ensure_mounted(kind);
    Ok(Json(app.render(kind, id)))
}

// DELETE /views/{route}
async fn unmount_view(State(app): State<AppState>, Path(route): Path<String>) -> Result<StatusCode, DashboardError> {
    let kind = ViewKind::from_route(&route).ok_or(DashboardError::UnknownView(route))?;
    if app.unmount(kind).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

// POST /devices/{did}/command
async fn send_command(
    State(app): State<AppState>,
    Path(did): Path<u8>,
    Json(command): Json<Command>,
) -> Result<Json<DeviceViewModel>, DashboardError> {
    let device = DeviceRef(did);
    info!(%device, ?command, "sending command");
    match app.backend.send_command(device, &command).await {
        Ok(state) => {
            app.notifier.report_success(&format!("command sent to {}", state.name));
            Ok(Json(DeviceViewModel::caniot(&state, &app.context(0))))
        }
        Err(e) => {
            warn!(%device, error = %e, "command failed");
            app.notifier.report_error(&e);
            Err(e.into())
        }
    }
}

// GET /notifications (toasts non expirés)
async fn list_notifications(State(app): State<AppState>) -> Json<Vec<Toast>> {
    Json(app.notifier.visible())
}

// DELETE /notifications/{id}
async fn dismiss_notification(State(app): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if app.notifier.dismiss(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn get_debug(State(app): State<AppState>) -> Json<UiState> {
    Json(*app.ui.lock())
}

async fn set_debug(State(app): State<AppState>, Json(ui): Json<UiState>) -> Json<UiState> {
    *app.ui.lock() = ui;
    info!(debug_mode = ui.debug_mode, "ui mode changed");
    Json(ui)
}
