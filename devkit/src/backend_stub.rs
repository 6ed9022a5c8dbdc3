/*!
Backend contrôleur factice pour développement sans contrôleur

Implémente `ControllerBackend` à partir de réponses scriptées.
Enregistre tous les appels, permet d'injecter des erreurs et des latences
par endpoint (utile pour tester l'annulation d'une requête en vol).
*/

use async_trait::async_trait;
use caniot_dashboard::backend::{ControllerBackend, RpcCode, RpcError};
use caniot_dashboard::models::{
    AlarmState, BleDeviceList, Command, DeviceRef, DeviceState, GarageState, HeaterState,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    DeviceState,
    DevicesWithAlert,
    Alarm,
    Garage,
    Heaters,
    BleList,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DeviceState(DeviceRef),
    DevicesWithAlert,
    Alarm,
    Garage,
    Heaters,
    BleList,
    Command(DeviceRef, Command),
}

impl Call {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Call::DeviceState(_) => Endpoint::DeviceState,
            Call::DevicesWithAlert => Endpoint::DevicesWithAlert,
            Call::Alarm => Endpoint::Alarm,
            Call::Garage => Endpoint::Garage,
            Call::Heaters => Endpoint::Heaters,
            Call::BleList => Endpoint::BleList,
            Call::Command(..) => Endpoint::Command,
        }
    }
}

#[derive(Default)]
struct Script {
    devices: HashMap<DeviceRef, DeviceState>,
    devices_with_alert: Vec<DeviceState>,
    alarm: Option<AlarmState>,
    garage: Option<GarageState>,
    heaters: Option<HeaterState>,
    ble: Option<BleDeviceList>,
    failures: HashMap<Endpoint, RpcError>,
    delays: HashMap<Endpoint, Duration>,
    calls: Vec<Call>,
    completed: Vec<Endpoint>,
}

/// Backend factice partagé (clonable, état commun entre clones)
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<Script>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device(&self, did: DeviceRef, state: DeviceState) -> &Self {
        self.inner.lock().devices.insert(did, state);
        self
    }

    pub fn set_devices_with_alert(&self, devices: Vec<DeviceState>) -> &Self {
        self.inner.lock().devices_with_alert = devices;
        self
    }

    pub fn set_alarm(&self, alarm: AlarmState) -> &Self {
        self.inner.lock().alarm = Some(alarm);
        self
    }

    pub fn set_garage(&self, garage: GarageState) -> &Self {
        self.inner.lock().garage = Some(garage);
        self
    }

    pub fn set_heaters(&self, heaters: HeaterState) -> &Self {
        self.inner.lock().heaters = Some(heaters);
        self
    }

    pub fn set_ble(&self, ble: BleDeviceList) -> &Self {
        self.inner.lock().ble = Some(ble);
        self
    }

    /// Toutes les requêtes sur cet endpoint échouent jusqu'à recover()
    pub fn fail(&self, endpoint: Endpoint, code: RpcCode, message: &str) -> &Self {
        self.inner.lock().failures.insert(endpoint, RpcError::new(code, message));
        self
    }

    pub fn recover(&self, endpoint: Endpoint) -> &Self {
        self.inner.lock().failures.remove(&endpoint);
        self
    }

    pub fn set_delay(&self, endpoint: Endpoint, delay: Duration) -> &Self {
        self.inner.lock().delays.insert(endpoint, delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.inner.lock().calls.iter().filter(|c| c.endpoint() == endpoint).count()
    }

    /// Requêtes arrivées au bout (non abandonnées en vol)
    pub fn completed_count(&self, endpoint: Endpoint) -> usize {
        self.inner.lock().completed.iter().filter(|e| **e == endpoint).count()
    }

    pub fn clear_calls(&self) {
        let mut script = self.inner.lock();
        script.calls.clear();
        script.completed.clear();
    }

    async fn serve<T, F>(&self, call: Call, pick: F) -> Result<T, RpcError>
    where
        F: FnOnce(&Script) -> Option<T> + Send,
        T: Send,
    {
        let endpoint = call.endpoint();
        let delay = {
            let mut script = self.inner.lock();
            script.calls.push(call);
            script.delays.get(&endpoint).copied()
        };
        log::debug!("[FAKE] {:?} (delay {:?})", endpoint, delay);

        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let mut script = self.inner.lock();
        script.completed.push(endpoint);
        if let Some(err) = script.failures.get(&endpoint) {
            return Err(err.clone());
        }
        pick(&*script).ok_or_else(|| RpcError::new(RpcCode::NotFound, format!("{endpoint:?} not scripted")))
    }
}

#[async_trait]
impl ControllerBackend for FakeBackend {
    async fn get_device_state(&self, device: DeviceRef) -> Result<DeviceState, RpcError> {
        self.serve(Call::DeviceState(device), |s| s.devices.get(&device).cloned()).await
    }

    async fn get_devices_with_alert(&self) -> Result<Vec<DeviceState>, RpcError> {
        self.serve(Call::DevicesWithAlert, |s| Some(s.devices_with_alert.clone())).await
    }

    async fn get_alarm_state(&self) -> Result<AlarmState, RpcError> {
        self.serve(Call::Alarm, |s| s.alarm.clone()).await
    }

    async fn get_garage_state(&self) -> Result<GarageState, RpcError> {
        self.serve(Call::Garage, |s| s.garage.clone()).await
    }

    async fn get_heater_state(&self) -> Result<HeaterState, RpcError> {
        self.serve(Call::Heaters, |s| s.heaters.clone()).await
    }

    async fn get_ble_device_list(&self) -> Result<BleDeviceList, RpcError> {
        self.serve(Call::BleList, |s| s.ble.clone()).await
    }

    async fn send_command(&self, device: DeviceRef, command: &Command) -> Result<DeviceState, RpcError> {
        self.serve(Call::Command(device, command.clone()), |s| s.devices.get(&device).cloned()).await
    }
}
