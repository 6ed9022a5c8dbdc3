/*!
Builders de payloads contrôleur pour les tests

Évite de répéter les structures complètes de DeviceState / BleDevice dans
chaque test. Un builder vierge produit un équipement "jamais vu", sans
alerte ni mesure.
*/

use caniot_dashboard::alerts::{AlertKind, AlertRecord};
use caniot_dashboard::comfort::Domain;
use caniot_dashboard::models::{
    AlarmState, BleDevice, BleDeviceList, DeviceRef, DeviceState, DoorState, DoorStatus, GarageState, HeaterMode,
    HeaterState, Measurement, MeasurementKind,
};
use time::{Duration, OffsetDateTime};

pub fn alert(kind: AlertKind, message: &str) -> AlertRecord {
    AlertRecord { kind, message: message.to_string(), description: None }
}

pub struct DeviceStateBuilder {
    state: DeviceState,
}

impl DeviceStateBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            state: DeviceState {
                name: name.to_string(),
                did: None,
                ui_view_name: None,
                last_seen_at: None,
                last_seen_from_now: None,
                alert: None,
                readings: Vec::new(),
            },
        }
    }

    pub fn did(mut self, did: u8) -> Self {
        self.state.did = Some(DeviceRef(did));
        self
    }

    pub fn view(mut self, ui_view_name: &str) -> Self {
        self.state.ui_view_name = Some(ui_view_name.to_string());
        self
    }

    /// Dernier passage il y a `age` secondes
    pub fn seen(mut self, age: u64) -> Self {
        self.state.last_seen_at = Some(OffsetDateTime::now_utc() - Duration::seconds(age as i64));
        self.state.last_seen_from_now = Some(age);
        self
    }

    pub fn alert(mut self, kind: AlertKind, message: &str) -> Self {
        self.state.alert = Some(alert(kind, message));
        self
    }

    pub fn temperature(mut self, label: &str, domain: Domain, value: Option<f64>) -> Self {
        self.state.readings.push(Measurement {
            label: label.to_string(),
            kind: MeasurementKind::Temperature { domain },
            value,
        });
        self
    }

    pub fn humidity(mut self, label: &str, value: Option<f64>) -> Self {
        self.state.readings.push(Measurement { label: label.to_string(), kind: MeasurementKind::Humidity, value });
        self
    }

    pub fn build(self) -> DeviceState {
        self.state
    }
}

pub struct BleDeviceBuilder {
    device: BleDevice,
}

impl BleDeviceBuilder {
    pub fn new(mac: &str, name: &str) -> Self {
        Self {
            device: BleDevice {
                mac: mac.to_string(),
                name: name.to_string(),
                last_seen_at: None,
                last_seen_from_now: None,
                alert: None,
                temperature: None,
                humidity: None,
                battery_level: None,
                battery_voltage: None,
                rssi: None,
                rx_packets: None,
            },
        }
    }

    pub fn seen(mut self, age: u64) -> Self {
        self.device.last_seen_at = Some(OffsetDateTime::now_utc() - Duration::seconds(age as i64));
        self.device.last_seen_from_now = Some(age);
        self
    }

    pub fn climate(mut self, temperature: f64, humidity: f64) -> Self {
        self.device.temperature = Some(temperature);
        self.device.humidity = Some(humidity);
        self
    }

    pub fn battery(mut self, level: f64, voltage: f64) -> Self {
        self.device.battery_level = Some(level);
        self.device.battery_voltage = Some(voltage);
        self
    }

    pub fn radio(mut self, rssi: i32, rx_packets: u32) -> Self {
        self.device.rssi = Some(rssi);
        self.device.rx_packets = Some(rx_packets);
        self
    }

    pub fn alert(mut self, kind: AlertKind, message: &str) -> Self {
        self.device.alert = Some(alert(kind, message));
        self
    }

    pub fn build(self) -> BleDevice {
        self.device
    }
}

pub fn ble_list(devices: Vec<BleDevice>, copro_alert: Option<AlertRecord>) -> BleDeviceList {
    BleDeviceList { devices, copro_alert }
}

pub fn alarm_state(device: DeviceState, enabled: bool) -> AlarmState {
    AlarmState {
        device,
        enabled,
        siren_active: false,
        south_detector: false,
        east_detector: false,
        south_light: false,
        east_light: false,
        sabotage: false,
        last_siren_at: None,
        sirens_triggered_count: 0,
    }
}

pub fn garage_state(device: DeviceState, left: DoorState, right: DoorState) -> GarageState {
    GarageState {
        device,
        left: DoorStatus { state: left, progress: None },
        right: DoorStatus { state: right, progress: None },
        gate: DoorState::Closed,
    }
}

pub fn heater_state(device: DeviceState, heaters: Vec<HeaterMode>) -> HeaterState {
    HeaterState { device, heaters, power_status: true }
}
