use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::state::ViewStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardHealth {
    pub uptime_seconds: u64,
    pub views_mounted: u32,
    pub views_with_data: u32,
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub last_error: Option<String>,
}

/// Compteurs partagés par toutes les boucles de polling
#[derive(Clone)]
pub struct PollerHealth {
    start_time: Instant,
    views_mounted: Arc<AtomicU32>,
    polls_ok: Arc<AtomicU64>,
    polls_failed: Arc<AtomicU64>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Default for PollerHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerHealth {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            views_mounted: Arc::new(AtomicU32::new(0)),
            polls_ok: Arc::new(AtomicU64::new(0)),
            polls_failed: Arc::new(AtomicU64::new(0)),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn view_mounted(&self) {
        self.views_mounted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn view_unmounted(&self) {
        // jamais en dessous de zéro
        let _ = self.views_mounted.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn poll_ok(&self) {
        self.polls_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn poll_failed(&self, error: String) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(error);
    }

    pub fn polls_ok(&self) -> u64 {
        self.polls_ok.load(Ordering::Relaxed)
    }

    pub fn polls_failed(&self) -> u64 {
        self.polls_failed.load(Ordering::Relaxed)
    }

    pub fn get_health(&self, views: &ViewStore) -> DashboardHealth {
        let views_with_data = views.lock().values().filter(|slot| slot.snapshot.is_some()).count() as u32;
        DashboardHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            views_mounted: self.views_mounted.load(Ordering::Relaxed),
            views_with_data,
            polls_ok: self.polls_ok(),
            polls_failed: self.polls_failed(),
            last_error: self.last_error.lock().clone(),
        }
    }
}
