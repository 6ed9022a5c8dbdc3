/**
 * CONFIGURATION DASHBOARD - Chargement YAML + valeurs par défaut
 *
 * RÔLE : Objet de configuration unique injecté une fois au démarrage.
 * Seuils de liveness, intervalles de polling, politique d'alertes, saison,
 * notifications et serveur HTTP.
 *
 * FONCTIONNEMENT :
 * - Fichier désigné par CANIOT_DASHBOARD_CONFIG (défaut "dashboard.yaml")
 * - Fichier absent ou vide => DashboardConfig::default()
 * - Fichier présent mais invalide => erreur, pas de repli silencieux
 */

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::comfort::SeasonPolicy;
use crate::liveness::LivenessPolicy;

pub const CONFIG_ENV_VAR: &str = "CANIOT_DASHBOARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "dashboard.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendConf,
    pub liveness: LivenessPolicy,
    pub polling: PollingConf,
    pub ui: UiConf,
    pub notifications: NotificationsConf,
    pub http: HttpConf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConf {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConf {
    pub tick_interval_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConf {
    pub debug_mode: bool,
    /// Mois (1-12) considérés comme "été" pour l'ajustement de confort
    pub summer_months: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConf {
    pub capacity: usize,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConf {
    pub listen: String,
    /// Si absent, l'API est ouverte (usage LAN)
    pub api_key: Option<String>,
}

impl Default for BackendConf {
    fn default() -> Self {
        Self { base_url: "http://localhost:50051".into(), timeout_ms: 5000 }
    }
}

impl Default for PollingConf {
    fn default() -> Self {
        Self { tick_interval_ms: 1000, poll_interval_ms: 5000 }
    }
}

impl Default for UiConf {
    fn default() -> Self {
        Self { debug_mode: false, summer_months: (5..=10).collect() }
    }
}

impl Default for NotificationsConf {
    fn default() -> Self {
        Self { capacity: 5, duration_secs: 3 }
    }
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { listen: "0.0.0.0:8080".into(), api_key: None }
    }
}

impl DashboardConfig {
    pub fn from_yaml(txt: &str) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: DashboardConfig = serde_yaml::from_str(txt)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liveness.caniot_online_threshold_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "liveness.caniot_online_threshold_secs",
                reason: "must be positive".into(),
            });
        }
        if self.liveness.ble_online_threshold_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "liveness.ble_online_threshold_secs",
                reason: "must be positive".into(),
            });
        }
        if self.polling.tick_interval_ms == 0 || self.polling.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "polling",
                reason: "intervals must be positive".into(),
            });
        }
        if let Some(m) = self.ui.summer_months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(ConfigError::Invalid {
                field: "ui.summer_months",
                reason: format!("{m} is not a month"),
            });
        }
        if self.notifications.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "notifications.capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn season_policy(&self) -> SeasonPolicy {
        SeasonPolicy::new(self.ui.summer_months.iter().copied())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.poll_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.polling.tick_interval_ms)
    }
}

pub async fn load_config() -> Result<DashboardConfig, ConfigError> {
    let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    if !Path::new(&path).exists() {
        warn!(path = %path, "no configuration file, using defaults");
        return Ok(DashboardConfig::default());
    }

    let txt = fs::read_to_string(&path)
        .await
        .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
    let cfg = DashboardConfig::from_yaml(&txt)?;
    info!(path = %path, "configuration loaded");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::DeviceClass;

    #[test]
    fn test_default_config() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.liveness.caniot_online_threshold_secs, 60);
        assert!(cfg.liveness.ble_online_threshold_secs > 60);
        assert_eq!(cfg.polling.tick_interval_ms, 1000);
        assert_eq!(cfg.polling.poll_interval_ms, 5000);
        assert_eq!(cfg.ui.summer_months, vec![5, 6, 7, 8, 9, 10]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let cfg = DashboardConfig::from_yaml("   \n").unwrap();
        assert_eq!(cfg.http.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = DashboardConfig::from_yaml(
            "liveness:\n  ble_online_threshold_secs: 600\nui:\n  debug_mode: true\n",
        )
        .unwrap();
        assert_eq!(cfg.liveness.ble_online_threshold_secs, 600);
        assert_eq!(cfg.liveness.caniot_online_threshold_secs, 60);
        assert!(cfg.ui.debug_mode);
        assert_eq!(cfg.notifications.capacity, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = DashboardConfig::from_yaml("liveness:\n  caniot_online_threshold_secs: 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "liveness.caniot_online_threshold_secs", .. }));

        let err = DashboardConfig::from_yaml("ui:\n  summer_months: [5, 13]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ui.summer_months", .. }));
    }

    #[test]
    fn test_liveness_section_is_the_policy() {
        let cfg = DashboardConfig::from_yaml("liveness:\n  ble_online_threshold_secs: 120\n").unwrap();
        assert_eq!(
            cfg.liveness,
            LivenessPolicy { ble_online_threshold_secs: 120, ..LivenessPolicy::default() }
        );
        assert_eq!(DashboardConfig::default().liveness, LivenessPolicy::default());
    }

    #[test]
    fn test_policies_follow_config() {
        let cfg = DashboardConfig::from_yaml("liveness:\n  caniot_online_threshold_secs: 90\n").unwrap();
        assert_eq!(cfg.liveness.threshold_for(DeviceClass::Caniot), 90);
        assert_eq!(cfg.liveness.threshold_for(DeviceClass::Ble), 300);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(5000));
    }
}
