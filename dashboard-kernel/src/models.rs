use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::alerts::AlertRecord;
use crate::comfort::Domain;

/// Identifiant CANIOT d'un équipement (did)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceRef(pub u8);

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeasurementKind {
    Temperature { domain: Domain },
    Humidity,
    Battery,
}

/// Mesure remontée par le contrôleur, valeur absente si capteur muet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    pub kind: MeasurementKind,
    #[serde(default)]
    pub value: Option<f64>,
}

// Forme commune liveness / alerte / mesures partagée par tous les payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub name: String,
    #[serde(default)]
    pub did: Option<DeviceRef>,
    #[serde(default)]
    pub ui_view_name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_seen_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub last_seen_from_now: Option<u64>,
    #[serde(default)]
    pub alert: Option<AlertRecord>,
    #[serde(default)]
    pub readings: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmState {
    pub device: DeviceState,
    pub enabled: bool,
    #[serde(default)]
    pub siren_active: bool,
    #[serde(default)]
    pub south_detector: bool,
    #[serde(default)]
    pub east_detector: bool,
    #[serde(default)]
    pub south_light: bool,
    #[serde(default)]
    pub east_light: bool,
    #[serde(default)]
    pub sabotage: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_siren_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub sirens_triggered_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Open,
    Closed,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoorStatus {
    pub state: DoorState,
    /// Progression 0-100 pendant un mouvement
    #[serde(default)]
    pub progress: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarageState {
    pub device: DeviceState,
    #[serde(default)]
    pub left: DoorStatus,
    #[serde(default)]
    pub right: DoorStatus,
    #[serde(default)]
    pub gate: DoorState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaterMode {
    None,
    Comfort,
    ComfortMin1,
    ComfortMin2,
    EnergySaving,
    FrostFree,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaterState {
    pub device: DeviceState,
    pub heaters: Vec<HeaterMode>,
    #[serde(default)]
    pub power_status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BleDevice {
    pub mac: String,
    pub name: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_seen_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub last_seen_from_now: Option<u64>,
    #[serde(default)]
    pub alert: Option<AlertRecord>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub battery_voltage: Option<f64>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub rx_packets: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BleDeviceList {
    pub devices: Vec<BleDevice>,
    /// Alerte globale du coprocesseur BLE
    #[serde(default)]
    pub copro_alert: Option<AlertRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GarageDoor {
    Left,
    Right,
    Gate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightAction {
    None,
    On,
    Off,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Garage { door: GarageDoor },
    Heater { index: usize, mode: HeaterMode },
    Alarm { enabled: bool },
    AlarmLights { south: LightAction, east: LightAction },
    Reboot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;

    #[test]
    fn test_device_state_minimal_payload() {
        let st: DeviceState = serde_json::from_str(r#"{"name":"heaters"}"#).unwrap();
        assert_eq!(st.last_seen_at, None);
        assert_eq!(st.alert, None);
        assert!(st.readings.is_empty());
    }

    #[test]
    fn test_device_state_full_payload() {
        let st: DeviceState = serde_json::from_str(
            r#"{
                "name": "outdoor alarm",
                "did": 24,
                "ui_view_name": "alarms",
                "last_seen_at": "2024-06-01T12:00:00Z",
                "last_seen_from_now": 12,
                "alert": {"kind": "INHIBITTED", "message": "inhibée"},
                "readings": [
                    {"label": "ext", "kind": {"type": "temperature", "domain": "outdoor"}, "value": 18.5},
                    {"label": "board", "kind": {"type": "temperature", "domain": "indoor"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(st.did, Some(DeviceRef(24)));
        assert_eq!(st.alert.unwrap().kind, AlertKind::Inhibited);
        assert_eq!(st.readings[0].kind, MeasurementKind::Temperature { domain: Domain::Outdoor });
        assert_eq!(st.readings[1].value, None);
    }

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_value(Command::Garage { door: GarageDoor::Left }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "garage", "door": "left"}));
    }
}
