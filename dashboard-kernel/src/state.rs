use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::models::DeviceRef;
use crate::view_model::ViewSnapshot;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Identifiant d'une instance de vue montée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Home,
    BleDevices,
    Garage,
    Heaters,
    Alarm,
    Device(DeviceRef),
}

impl ViewKind {
    /// Nom de route ("home", "ble", "devices/24", ...)
    pub fn route(&self) -> String {
        match self {
            ViewKind::Home => "home".into(),
            ViewKind::BleDevices => "ble".into(),
            ViewKind::Garage => "garage".into(),
            ViewKind::Heaters => "heaters".into(),
            ViewKind::Alarm => "alarm".into(),
            ViewKind::Device(did) => format!("devices/{did}"),
        }
    }

    pub fn from_route(name: &str) -> Option<Self> {
        match name {
            "home" => Some(ViewKind::Home),
            "ble" => Some(ViewKind::BleDevices),
            "garage" => Some(ViewKind::Garage),
            "heaters" => Some(ViewKind::Heaters),
            "alarm" | "alarms" => Some(ViewKind::Alarm),
            other => other
                .strip_prefix("devices/")
                .and_then(|did| did.parse::<u8>().ok())
                .map(|did| ViewKind::Device(DeviceRef(did))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewSlot {
    pub kind: ViewKind,
    /// Dernier snapshot commité, absent tant qu'aucun poll n'a réussi
    pub snapshot: Option<ViewSnapshot>,
    /// Secondes locales écoulées depuis le dernier commit
    pub offset: u64,
    pub polled_at: Option<OffsetDateTime>,
}

impl ViewSlot {
    pub fn new(kind: ViewKind) -> Self {
        Self { kind, snapshot: None, offset: 0, polled_at: None }
    }
}

pub type ViewStore = Shared<HashMap<ViewId, ViewSlot>>;

pub fn new_view_store() -> ViewStore {
    new_state(HashMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        for kind in [
            ViewKind::Home,
            ViewKind::BleDevices,
            ViewKind::Garage,
            ViewKind::Heaters,
            ViewKind::Alarm,
            ViewKind::Device(DeviceRef(24)),
        ] {
            assert_eq!(ViewKind::from_route(&kind.route()), Some(kind));
        }
        assert_eq!(ViewKind::from_route("alarms"), Some(ViewKind::Alarm));
        assert_eq!(ViewKind::from_route("devices/999"), None);
        assert_eq!(ViewKind::from_route("nope"), None);
    }
}
