/**
 * BACKEND CONTRÔLEUR - Client des services du contrôleur domotique
 *
 * RÔLE : Seam unique entre le dashboard et le contrôleur. Un appel = une
 * requête typée, les erreurs remontent en RpcError (jamais de panique).
 *
 * ARCHITECTURE :
 * - ControllerBackend : trait async injecté (Arc<dyn ...>) dans les vues
 * - HttpBackend : implémentation JSON sur la passerelle HTTP du contrôleur
 * - Les fakes de test vivent dans le devkit
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConf;
use crate::models::{
    AlarmState, BleDeviceList, Command, DeviceRef, DeviceState, GarageState, HeaterState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcCode {
    Unknown,
    NotFound,
    Unavailable,
    DeadlineExceeded,
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    ResourceExhausted,
    Unimplemented,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct RpcError {
    pub code: RpcCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            RpcCode::DeadlineExceeded
        } else if e.is_connect() {
            RpcCode::Unavailable
        } else if e.is_decode() {
            RpcCode::Internal
        } else if let Some(status) = e.status() {
            code_for_status(status)
        } else {
            RpcCode::Unknown
        };
        Self::new(code, e.to_string())
    }
}

/// Statut HTTP d'échec -> code RPC. Unknown reste réservé aux erreurs sans statut.
pub fn code_for_status(status: StatusCode) -> RpcCode {
    match status {
        StatusCode::UNAUTHORIZED => RpcCode::Unauthenticated,
        StatusCode::FORBIDDEN => RpcCode::PermissionDenied,
        StatusCode::TOO_MANY_REQUESTS => RpcCode::ResourceExhausted,
        StatusCode::NOT_IMPLEMENTED => RpcCode::Unimplemented,
        StatusCode::NOT_FOUND => RpcCode::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RpcCode::InvalidArgument,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => RpcCode::Unavailable,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RpcCode::DeadlineExceeded,
        s if s.is_client_error() => RpcCode::InvalidArgument,
        _ => RpcCode::Internal,
    }
}

#[async_trait]
pub trait ControllerBackend: Send + Sync {
    async fn get_device_state(&self, device: DeviceRef) -> Result<DeviceState, RpcError>;

    async fn get_devices_with_alert(&self) -> Result<Vec<DeviceState>, RpcError>;

    async fn get_alarm_state(&self) -> Result<AlarmState, RpcError>;

    async fn get_garage_state(&self) -> Result<GarageState, RpcError>;

    async fn get_heater_state(&self) -> Result<HeaterState, RpcError>;

    async fn get_ble_device_list(&self) -> Result<BleDeviceList, RpcError>;

    /// Envoie une commande et renvoie l'état mis à jour de l'équipement
    async fn send_command(&self, device: DeviceRef, command: &Command) -> Result<DeviceState, RpcError>;
}

pub type SharedBackend = Arc<dyn ControllerBackend>;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(conf: &BackendConf) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(conf.timeout_ms))
            .build()?;
        Ok(Self { client, base_url: conf.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RpcError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let resp = self.client.get(&url).send().await?;
        Self::decode(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, RpcError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let resp = self.client.post(&url).json(body).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RpcError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = if body.is_empty() { status.to_string() } else { body };
            return Err(RpcError::new(code_for_status(status), message));
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ControllerBackend for HttpBackend {
    async fn get_device_state(&self, device: DeviceRef) -> Result<DeviceState, RpcError> {
        self.get_json(&format!("/devices/{device}")).await
    }

    async fn get_devices_with_alert(&self) -> Result<Vec<DeviceState>, RpcError> {
        self.get_json("/devices/alerts").await
    }

    async fn get_alarm_state(&self) -> Result<AlarmState, RpcError> {
        self.get_json("/alarm").await
    }

    async fn get_garage_state(&self) -> Result<GarageState, RpcError> {
        self.get_json("/garage").await
    }

    async fn get_heater_state(&self) -> Result<HeaterState, RpcError> {
        self.get_json("/heaters").await
    }

    async fn get_ble_device_list(&self) -> Result<BleDeviceList, RpcError> {
        self.get_json("/ble/devices").await
    }

    async fn send_command(&self, device: DeviceRef, command: &Command) -> Result<DeviceState, RpcError> {
        self.post_json(&format!("/devices/{device}/command"), command).await
    }
}
