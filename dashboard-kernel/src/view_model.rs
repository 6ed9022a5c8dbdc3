/**
 * VIEW MODEL - Composition liveness + alertes + confort par équipement
 *
 * RÔLE : Produit la structure prête à rendre pour chaque vue du dashboard.
 * Aucune logique nouvelle ici : on assemble evaluate(), classify() et
 * temperature_tier() / humidity_color().
 *
 * INVARIANT : une donnée absente (mesure, alerte, dernier passage) reste
 * explicitement "N/A" / "never" / pas de badge. Jamais de faux "online" ni "ok".
 */

use serde::Serialize;

use crate::alerts::{ActiveAlertsPanel, AlertBadge, AlertEntry, AlertRecord};
use crate::comfort::{
    battery_icon, humidity_color, temperature_tier, BatteryIcon, Color, ComfortIcon, Domain, NEUTRAL_GRAY,
};
use crate::liveness::{badge_text, evaluate, format_timestamp, DeviceClass, LabelStyle, LivenessPolicy, LivenessSample};
use crate::models::{
    AlarmState, BleDevice, BleDeviceList, DeviceState, DoorStatus, DoorState, GarageState, HeaterMode, HeaterState,
    Measurement, MeasurementKind,
};

pub const NOT_AVAILABLE: &str = "N/A";

/// Contexte de rendu commun à toutes les vues d'un cycle
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub policy: &'a LivenessPolicy,
    pub season_adjusted: bool,
    pub debug_mode: bool,
    /// Secondes écoulées depuis la capture du snapshot
    pub now_offset_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingIcon {
    Thermometer(ComfortIcon),
    ThermometerEmpty,
    Droplet,
    DropletSlash,
    Battery(BatteryIcon),
    BluetoothConnected,
    NoSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReadingView {
    Available { label: String, value: f64, text: String, color: Color, icon: ReadingIcon },
    Unavailable { label: String, text: String, color: Color, icon: ReadingIcon },
}

impl ReadingView {
    pub fn temperature(label: &str, value: Option<f64>, domain: Domain, season_adjusted: bool) -> Self {
        match value {
            Some(v) => {
                let tier = temperature_tier(v, domain, season_adjusted);
                ReadingView::Available {
                    label: label.to_string(),
                    value: v,
                    text: format!("{:.1} °C", (v * 10.0).round() / 10.0),
                    color: tier.color,
                    icon: ReadingIcon::Thermometer(tier.icon),
                }
            }
            None => Self::unavailable(label, "°C", ReadingIcon::ThermometerEmpty),
        }
    }

    pub fn humidity(label: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => ReadingView::Available {
                label: label.to_string(),
                value: v,
                text: format!("{} %", v.round() as i64),
                color: humidity_color(v),
                icon: ReadingIcon::Droplet,
            },
            None => Self::unavailable(label, "%", ReadingIcon::DropletSlash),
        }
    }

    pub fn battery(label: &str, level: Option<f64>) -> Self {
        match level {
            Some(v) => ReadingView::Available {
                label: label.to_string(),
                value: v,
                text: format!("{} %", v.round() as i64),
                color: NEUTRAL_GRAY,
                icon: ReadingIcon::Battery(battery_icon(v)),
            },
            None => Self::unavailable(label, "%", ReadingIcon::Battery(BatteryIcon::Empty)),
        }
    }

    /// Lien radio BLE : "-70 dBm / 12p"
    pub fn signal(label: &str, rssi: Option<i32>, rx_packets: Option<u32>) -> Self {
        let rx = rx_packets.map(|p| p.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        match rssi {
            Some(r) => ReadingView::Available {
                label: label.to_string(),
                value: r as f64,
                text: format!("{r} dBm / {rx}p"),
                color: NEUTRAL_GRAY,
                icon: ReadingIcon::BluetoothConnected,
            },
            None => ReadingView::Unavailable {
                label: label.to_string(),
                text: format!("{NOT_AVAILABLE} dBm / {rx}p"),
                color: NEUTRAL_GRAY,
                icon: ReadingIcon::NoSignal,
            },
        }
    }

    pub fn from_measurement(m: &Measurement, season_adjusted: bool) -> Self {
        match m.kind {
            MeasurementKind::Temperature { domain } => Self::temperature(&m.label, m.value, domain, season_adjusted),
            MeasurementKind::Humidity => Self::humidity(&m.label, m.value),
            MeasurementKind::Battery => Self::battery(&m.label, m.value),
        }
    }

    fn unavailable(label: &str, unit: &str, icon: ReadingIcon) -> Self {
        ReadingView::Unavailable {
            label: label.to_string(),
            text: format!("{NOT_AVAILABLE} {unit}"),
            color: NEUTRAL_GRAY,
            icon,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ReadingView::Available { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            ReadingView::Available { text, .. } | ReadingView::Unavailable { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivenessView {
    pub online: bool,
    /// Forme compacte ("45s" / "never")
    pub label: String,
    /// Forme complète avec horodatage absolu
    pub badge: String,
}

impl LivenessView {
    pub fn new(sample: &LivenessSample, now_offset_seconds: u64) -> Self {
        let l = evaluate(sample, now_offset_seconds, LabelStyle::Minimal);
        Self { online: l.online, label: l.label, badge: badge_text(sample, now_offset_seconds) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceViewModel {
    pub name: String,
    pub class: DeviceClass,
    pub liveness: LivenessView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertBadge>,
    pub readings: Vec<ReadingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
}

pub fn controller_route(state: &DeviceState) -> Option<String> {
    state.ui_view_name.as_ref().map(|v| format!("devices/{v}"))
}

impl DeviceViewModel {
    pub fn caniot(state: &DeviceState, ctx: &ViewContext<'_>) -> Self {
        let sample = LivenessSample::from_report(
            state.last_seen_at,
            state.last_seen_from_now,
            DeviceClass::Caniot,
            ctx.policy,
        );
        let navigate_to = controller_route(state);
        Self {
            name: state.name.clone(),
            class: DeviceClass::Caniot,
            liveness: LivenessView::new(&sample, ctx.now_offset_seconds),
            alert: state.alert.as_ref().map(|a| AlertBadge::from_record(a, true, navigate_to.clone())),
            readings: state
                .readings
                .iter()
                .map(|m| ReadingView::from_measurement(m, ctx.season_adjusted))
                .collect(),
            navigate_to,
        }
    }

    pub fn ble(device: &BleDevice, ctx: &ViewContext<'_>) -> Self {
        let sample = LivenessSample::from_report(
            device.last_seen_at,
            device.last_seen_from_now,
            DeviceClass::Ble,
            ctx.policy,
        );
        Self {
            name: device.name.clone(),
            class: DeviceClass::Ble,
            liveness: LivenessView::new(&sample, ctx.now_offset_seconds),
            alert: device.alert.as_ref().map(|a| AlertBadge::from_record(a, true, None)),
            readings: vec![
                // capteurs BLE : sondes d'intérieur
                ReadingView::temperature("temperature", device.temperature, Domain::Indoor, ctx.season_adjusted),
                ReadingView::humidity("humidity", device.humidity),
                ReadingView::battery("battery", device.battery_level),
                ReadingView::signal("signal", device.rssi, device.rx_packets),
            ],
            navigate_to: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeSnapshot {
    pub heaters: Option<HeaterState>,
    pub alarm: Option<AlarmState>,
    pub devices_with_alert: Option<Vec<DeviceState>>,
    pub ble: Option<BleDeviceList>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeView {
    pub heaters: Option<DeviceViewModel>,
    pub outdoor_alarm: Option<DeviceViewModel>,
    pub active_alerts: ActiveAlertsPanel,
}

impl HomeView {
    pub fn build(snap: &HomeSnapshot, ctx: &ViewContext<'_>) -> Self {
        let copro = snap.ble.as_ref().and_then(|b| b.copro_alert.as_ref());
        let devices = snap.devices_with_alert.as_deref().unwrap_or_default();

        let entries = copro
            .map(|record| AlertEntry { record, navigate_to: Some("ble".to_string()) })
            .into_iter()
            .chain(devices.iter().filter_map(|d| {
                d.alert.as_ref().map(|record| AlertEntry { record, navigate_to: controller_route(d) })
            }));

        Self {
            heaters: snap.heaters.as_ref().map(|h| DeviceViewModel::caniot(&h.device, ctx)),
            outdoor_alarm: snap.alarm.as_ref().map(|a| DeviceViewModel::caniot(&a.device, ctx)),
            active_alerts: ActiveAlertsPanel::collect(entries, ctx.debug_mode),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BleListView {
    pub devices: Vec<DeviceViewModel>,
    pub active_alerts: ActiveAlertsPanel,
}

impl BleListView {
    pub fn build(list: &BleDeviceList, ctx: &ViewContext<'_>) -> Self {
        let entries = list
            .copro_alert
            .iter()
            .map(|record| AlertEntry { record, navigate_to: None })
            .chain(list.devices.iter().filter_map(|d| {
                d.alert.as_ref().map(|record: &AlertRecord| AlertEntry { record, navigate_to: None })
            }));

        Self {
            devices: list.devices.iter().map(|d| DeviceViewModel::ble(d, ctx)).collect(),
            active_alerts: ActiveAlertsPanel::collect(entries, ctx.debug_mode),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GarageView {
    pub device: DeviceViewModel,
    pub left: DoorStatus,
    pub right: DoorStatus,
    pub gate: DoorState,
}

impl GarageView {
    pub fn build(state: &GarageState, ctx: &ViewContext<'_>) -> Self {
        Self {
            device: DeviceViewModel::caniot(&state.device, ctx),
            left: state.left,
            right: state.right,
            gate: state.gate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatersView {
    pub device: DeviceViewModel,
    pub heaters: Vec<HeaterMode>,
    pub power_status: bool,
}

impl HeatersView {
    pub fn build(state: &HeaterState, ctx: &ViewContext<'_>) -> Self {
        Self {
            device: DeviceViewModel::caniot(&state.device, ctx),
            heaters: state.heaters.clone(),
            power_status: state.power_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmView {
    pub device: DeviceViewModel,
    pub enabled: bool,
    pub siren_active: bool,
    pub south_detector: bool,
    pub east_detector: bool,
    pub south_light: bool,
    pub east_light: bool,
    pub sabotage: bool,
    pub last_siren: String,
    pub sirens_triggered_count: u32,
}

impl AlarmView {
    pub fn build(state: &AlarmState, ctx: &ViewContext<'_>) -> Self {
        Self {
            device: DeviceViewModel::caniot(&state.device, ctx),
            enabled: state.enabled,
            siren_active: state.siren_active,
            south_detector: state.south_detector,
            east_detector: state.east_detector,
            south_light: state.south_light,
            east_light: state.east_light,
            sabotage: state.sabotage,
            last_siren: state
                .last_siren_at
                .map(format_timestamp)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            sirens_triggered_count: state.sirens_triggered_count,
        }
    }
}

/// État "live" du contrôleur propriétaire d'un équipement
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Garage(GarageState),
    Heaters(HeaterState),
    Alarm(AlarmState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub state: DeviceState,
    pub live: Option<ControllerState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDetailView {
    pub device: DeviceViewModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<ControllerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "controller", rename_all = "snake_case")]
pub enum ControllerView {
    Garage(GarageView),
    Heaters(HeatersView),
    Alarm(AlarmView),
}

impl DeviceDetailView {
    pub fn build(snap: &DeviceSnapshot, ctx: &ViewContext<'_>) -> Self {
        Self {
            device: DeviceViewModel::caniot(&snap.state, ctx),
            controller: snap.live.as_ref().map(|live| match live {
                ControllerState::Garage(g) => ControllerView::Garage(GarageView::build(g, ctx)),
                ControllerState::Heaters(h) => ControllerView::Heaters(HeatersView::build(h, ctx)),
                ControllerState::Alarm(a) => ControllerView::Alarm(AlarmView::build(a, ctx)),
            }),
        }
    }
}

/// Dernier état connu d'une vue, tel que commité par le poller
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSnapshot {
    Home(HomeSnapshot),
    Ble(BleDeviceList),
    Garage(GarageState),
    Heaters(HeaterState),
    Alarm(AlarmState),
    Device(DeviceSnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewModel {
    Home(HomeView),
    Ble(BleListView),
    Garage(GarageView),
    Heaters(HeatersView),
    Alarm(AlarmView),
    Device(DeviceDetailView),
}

impl ViewSnapshot {
    pub fn render(&self, ctx: &ViewContext<'_>) -> ViewModel {
        match self {
            ViewSnapshot::Home(s) => ViewModel::Home(HomeView::build(s, ctx)),
            ViewSnapshot::Ble(s) => ViewModel::Ble(BleListView::build(s, ctx)),
            ViewSnapshot::Garage(s) => ViewModel::Garage(GarageView::build(s, ctx)),
            ViewSnapshot::Heaters(s) => ViewModel::Heaters(HeatersView::build(s, ctx)),
            ViewSnapshot::Alarm(s) => ViewModel::Alarm(AlarmView::build(s, ctx)),
            ViewSnapshot::Device(s) => ViewModel::Device(DeviceDetailView::build(s, ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertKind, Severity};
    use time::macros::datetime;

    fn ctx(policy: &LivenessPolicy) -> ViewContext<'_> {
        ViewContext { policy, season_adjusted: false, debug_mode: false, now_offset_seconds: 0 }
    }

    fn empty_ble() -> BleDevice {
        BleDevice {
            mac: "a4:c1:38:00:00:01".into(),
            name: "chambre".into(),
            last_seen_at: None,
            last_seen_from_now: None,
            alert: None,
            temperature: None,
            humidity: None,
            battery_level: None,
            battery_voltage: None,
            rssi: None,
            rx_packets: None,
        }
    }

    fn caniot_device(age: u64, alert: Option<AlertRecord>) -> DeviceState {
        DeviceState {
            name: "garage".into(),
            did: None,
            ui_view_name: Some("garage".into()),
            last_seen_at: Some(datetime!(2024-06-01 12:00:00 UTC)),
            last_seen_from_now: Some(age),
            alert,
            readings: vec![Measurement {
                label: "board".into(),
                kind: MeasurementKind::Temperature { domain: Domain::Indoor },
                value: Some(21.26),
            }],
        }
    }

    #[test]
    fn test_empty_ble_device_is_unknown_everywhere() {
        let policy = LivenessPolicy::default();
        let vm = DeviceViewModel::ble(&empty_ble(), &ctx(&policy));
        assert!(!vm.liveness.online);
        assert_eq!(vm.liveness.label, "never");
        assert!(vm.alert.is_none());
        assert!(vm.readings.iter().all(|r| !r.is_available()));
        assert!(vm.readings.iter().all(|r| r.text().starts_with("N/A")));
        for r in &vm.readings {
            if let ReadingView::Unavailable { color, .. } = r {
                assert_eq!(*color, NEUTRAL_GRAY);
            }
        }
    }

    #[test]
    fn test_caniot_device_online_45s() {
        let policy = LivenessPolicy::default();
        let vm = DeviceViewModel::caniot(&caniot_device(45, None), &ctx(&policy));
        assert!(vm.liveness.online);
        assert_eq!(vm.liveness.label, "45s");
        assert_eq!(vm.liveness.badge, "2024-06-01 12:00:00 (active 45s ago)");
        assert_eq!(vm.readings[0].text(), "21.3 °C");
        assert_eq!(vm.navigate_to.as_deref(), Some("devices/garage"));
    }

    #[test]
    fn test_ble_uses_ble_threshold() {
        let policy = LivenessPolicy::default();
        let mut dev = empty_ble();
        dev.last_seen_at = Some(datetime!(2024-06-01 12:00:00 UTC));
        dev.last_seen_from_now = Some(120);
        assert!(DeviceViewModel::ble(&dev, &ctx(&policy)).liveness.online);
        let caniot = DeviceViewModel::caniot(&caniot_device(120, None), &ctx(&policy));
        assert!(!caniot.liveness.online);
    }

    #[test]
    fn test_device_alert_badge_is_closable() {
        let policy = LivenessPolicy::default();
        let alert = AlertRecord { kind: AlertKind::Inhibited, message: "porte inhibée".into(), description: None };
        let vm = DeviceViewModel::caniot(&caniot_device(5, Some(alert)), &ctx(&policy));
        let badge = vm.alert.unwrap();
        assert!(badge.closable);
        assert_eq!(badge.tier, Severity::Warning);
    }

    #[test]
    fn test_home_panel_applies_display_policy() {
        let policy = LivenessPolicy::default();
        let ok = AlertRecord { kind: AlertKind::Ok, message: "copro ok".into(), description: None };
        let err = AlertRecord { kind: AlertKind::Error, message: "capteur HS".into(), description: None };
        let snap = HomeSnapshot {
            devices_with_alert: Some(vec![caniot_device(5, Some(err))]),
            ble: Some(BleDeviceList { devices: vec![], copro_alert: Some(ok) }),
            ..Default::default()
        };

        let view = HomeView::build(&snap, &ctx(&policy));
        assert_eq!(view.active_alerts.alerts.len(), 1);
        assert_eq!(view.active_alerts.alerts[0].navigate_to.as_deref(), Some("devices/garage"));
        assert!(view.heaters.is_none());

        let debug = ViewContext { debug_mode: true, ..ctx(&policy) };
        let view = HomeView::build(&snap, &debug);
        assert_eq!(view.active_alerts.alerts.len(), 2);
        assert_eq!(view.active_alerts.alerts[0].navigate_to.as_deref(), Some("ble"));
    }

    #[test]
    fn test_ble_list_panel() {
        let policy = LivenessPolicy::default();
        let mut warn = empty_ble();
        warn.alert = Some(AlertRecord { kind: AlertKind::Warning, message: "batterie faible".into(), description: None });
        let list = BleDeviceList {
            devices: vec![empty_ble(), warn],
            copro_alert: Some(AlertRecord { kind: AlertKind::Notification, message: "scan".into(), description: None }),
        };
        let view = BleListView::build(&list, &ctx(&policy));
        assert_eq!(view.devices.len(), 2);
        assert_eq!(view.active_alerts.alerts.len(), 1);
        assert_eq!(view.active_alerts.alerts[0].message, "batterie faible");
    }

    #[test]
    fn test_readings_format() {
        assert_eq!(ReadingView::humidity("h", Some(45.2)).text(), "45 %");
        assert_eq!(ReadingView::signal("s", Some(-70), Some(12)).text(), "-70 dBm / 12p");
        assert_eq!(ReadingView::signal("s", None, Some(12)).text(), "N/A dBm / 12p");
        assert_eq!(ReadingView::temperature("t", None, Domain::Outdoor, false).text(), "N/A °C");
    }
}
