use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::backend::{RpcCode, RpcError};
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("controller error: {0}")]
    Rpc(#[from] RpcError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),
    #[error("unknown view: {0}")]
    UnknownView(String),
}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::Rpc(e) => match e.code {
                RpcCode::NotFound => StatusCode::NOT_FOUND,
                RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
                RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                RpcCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
                RpcCode::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
                RpcCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
                // refus du contrôleur envers le dashboard, pas envers l'appelant
                RpcCode::Unauthenticated | RpcCode::PermissionDenied => StatusCode::BAD_GATEWAY,
                RpcCode::Internal | RpcCode::Unknown => StatusCode::BAD_GATEWAY,
            },
            DashboardError::UnknownView(_) => StatusCode::NOT_FOUND,
            DashboardError::Config(_) | DashboardError::Io(_) | DashboardError::InvalidAddress(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "ok": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
