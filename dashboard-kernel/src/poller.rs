/**
 * POLLER - Une boucle de rafraîchissement par vue montée
 *
 * RÔLE : Interroge le backend périodiquement pour une vue et commit le
 * snapshot dans le ViewStore. Entre deux polls, un tick local fait avancer
 * le compteur de liveness sans appel réseau.
 *
 * CYCLE DE VIE :
 * - mount() crée le slot, démarre la tâche, renvoie un ViewHandle
 * - drop / unmount() annule le token : la requête en vol est abandonnée,
 *   rien n'est commité après l'annulation, le slot est retiré
 *
 * ERREURS : notifiées (Notifier), tracées, comptées. Le dernier snapshot
 * connu reste affiché, le cycle suivant retente.
 */

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{RpcError, SharedBackend};
use crate::config::DashboardConfig;
use crate::health::PollerHealth;
use crate::models::DeviceRef;
use crate::notifications::Notifier;
use crate::state::{ViewId, ViewKind, ViewSlot, ViewStore};
use crate::view_model::{ControllerState, DeviceSnapshot, HomeSnapshot, ViewSnapshot};

type Fetch<'a> = Pin<Box<dyn Future<Output = Option<ViewSnapshot>> + Send + 'a>>;

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub poll: Duration,
    pub tick: Duration,
}

impl PollIntervals {
    pub fn from_config(cfg: &DashboardConfig) -> Self {
        Self { poll: cfg.poll_interval(), tick: cfg.tick_interval() }
    }
}

#[derive(Clone)]
pub struct ViewPoller {
    backend: SharedBackend,
    notifier: Notifier,
    health: PollerHealth,
    store: ViewStore,
    intervals: PollIntervals,
    next_id: Arc<AtomicU64>,
}

/// Poignée d'une vue montée. Le drop annule la boucle.
pub struct ViewHandle {
    id: ViewId,
    kind: ViewKind,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ViewHandle {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Annule et attend la fin de la tâche (slot retiré au retour)
    pub async fn unmount(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(view = %self.kind.route(), error = %e, "view task ended abnormally");
            }
        }
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl ViewPoller {
    pub fn new(
        backend: SharedBackend,
        notifier: Notifier,
        health: PollerHealth,
        store: ViewStore,
        intervals: PollIntervals,
    ) -> Self {
        Self { backend, notifier, health, store, intervals, next_id: Arc::new(AtomicU64::new(1)) }
    }

    pub fn mount(&self, kind: ViewKind) -> ViewHandle {
        let id = ViewId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();

        self.store.lock().insert(id, ViewSlot::new(kind));
        self.health.view_mounted();
        info!(view = %kind.route(), id = id.0, "view mounted");

        let task = tokio::spawn(self.clone().run_view(id, kind, token.clone()));
        ViewHandle { id, kind, token, task: Some(task) }
    }

    async fn run_view(self, id: ViewId, kind: ViewKind, token: CancellationToken) {
        let mut poll = interval(self.intervals.poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick = interval_at(Instant::now() + self.intervals.tick, self.intervals.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // le fetch vit dans la boucle : les ticks continuent pendant un poll lent
        let mut inflight: Option<Fetch<'_>> = None;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                fetched = async { inflight.as_mut()?.await }, if inflight.is_some() => {
                    inflight = None;
                    // annulé pendant le fetch : aucun commit
                    if token.is_cancelled() {
                        break;
                    }
                    if let Some(snapshot) = fetched {
                        self.commit(id, snapshot);
                    }
                }
                _ = poll.tick(), if inflight.is_none() => {
                    let previous = self.snapshot_of(id);
                    inflight = Some(Box::pin(self.fetch(kind, previous)));
                }
                _ = tick.tick() => {
                    if let Some(slot) = self.store.lock().get_mut(&id) {
                        slot.offset = slot.offset.saturating_add(1);
                    }
                }
            }
        }

        // requête en vol abandonnée sans avoir été menée à terme
        drop(inflight);
        self.store.lock().remove(&id);
        self.health.view_unmounted();
        info!(view = %kind.route(), id = id.0, "view unmounted");
    }

    fn snapshot_of(&self, id: ViewId) -> Option<ViewSnapshot> {
        self.store.lock().get(&id).and_then(|slot| slot.snapshot.clone())
    }

    fn commit(&self, id: ViewId, snapshot: ViewSnapshot) {
        if let Some(slot) = self.store.lock().get_mut(&id) {
            slot.snapshot = Some(snapshot);
            slot.offset = 0;
            slot.polled_at = Some(OffsetDateTime::now_utc());
        }
    }

    fn report(&self, kind: ViewKind, err: &RpcError) {
        warn!(view = %kind.route(), code = ?err.code, error = %err.message, "poll failed");
        self.health.poll_failed(err.to_string());
        self.notifier.report_error(err);
    }

    fn settle<T>(&self, kind: ViewKind, result: Result<T, RpcError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.health.poll_ok();
                Some(v)
            }
            Err(e) => {
                self.report(kind, &e);
                None
            }
        }
    }

    /// Un cycle de poll. None => rien de neuf à commiter.
    async fn fetch(&self, kind: ViewKind, previous: Option<ViewSnapshot>) -> Option<ViewSnapshot> {
        debug!(view = %kind.route(), "polling");
        let backend = &self.backend;
        match kind {
            ViewKind::Home => {
                let mut home = match previous {
                    Some(ViewSnapshot::Home(h)) => h,
                    _ => HomeSnapshot::default(),
                };
                // sections indépendantes : une erreur n'efface pas les autres
                let (heaters, alarm, alerts, ble) = tokio::join!(
                    backend.get_heater_state(),
                    backend.get_alarm_state(),
                    backend.get_devices_with_alert(),
                    backend.get_ble_device_list(),
                );
                let mut fresh = false;
                if let Some(v) = self.settle(kind, heaters) {
                    home.heaters = Some(v);
                    fresh = true;
                }
                if let Some(v) = self.settle(kind, alarm) {
                    home.alarm = Some(v);
                    fresh = true;
                }
                if let Some(v) = self.settle(kind, alerts) {
                    home.devices_with_alert = Some(v);
                    fresh = true;
                }
                if let Some(v) = self.settle(kind, ble) {
                    home.ble = Some(v);
                    fresh = true;
                }
                fresh.then_some(ViewSnapshot::Home(home))
            }
            ViewKind::BleDevices => self.settle(kind, backend.get_ble_device_list().await).map(ViewSnapshot::Ble),
            ViewKind::Garage => self.settle(kind, backend.get_garage_state().await).map(ViewSnapshot::Garage),
            ViewKind::Heaters => self.settle(kind, backend.get_heater_state().await).map(ViewSnapshot::Heaters),
            ViewKind::Alarm => self.settle(kind, backend.get_alarm_state().await).map(ViewSnapshot::Alarm),
            ViewKind::Device(did) => self.fetch_device(kind, did).await.map(ViewSnapshot::Device),
        }
    }

    /// Équipement puis état live de son contrôleur, dans cet ordre.
    /// Le snapshot n'est commité que si les deux appels réussissent.
    async fn fetch_device(&self, kind: ViewKind, did: DeviceRef) -> Option<DeviceSnapshot> {
        let state = self.settle(kind, self.backend.get_device_state(did).await)?;

        let live = match state.ui_view_name.as_deref() {
            Some("garage") => Some(ControllerState::Garage(self.settle(kind, self.backend.get_garage_state().await)?)),
            Some("heaters") => Some(ControllerState::Heaters(self.settle(kind, self.backend.get_heater_state().await)?)),
            Some("alarms") | Some("alarm") => {
                Some(ControllerState::Alarm(self.settle(kind, self.backend.get_alarm_state().await)?))
            }
            _ => None,
        };

        Some(DeviceSnapshot { state, live })
    }
}
