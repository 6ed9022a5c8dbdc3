/**
 * NOTIFICATIONS - Toasts éphémères côté utilisateur
 *
 * RÔLE : File bornée de messages courts (erreurs backend, confirmations).
 * Chaque toast expire après une durée fixe, le plus ancien est évincé
 * quand la capacité est atteinte.
 *
 * RÈGLE : une erreur RPC de code Unknown n'est jamais montrée (bruit des
 * annulations / erreurs transport sans statut), seulement tracée en debug.
 */

use serde::Serialize;
use std::collections::VecDeque;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::backend::{RpcCode, RpcError};
use crate::config::NotificationsConf;
use crate::state::{new_state, Shared};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub level: ToastLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct Notifier {
    toasts: Shared<VecDeque<Toast>>,
    capacity: usize,
    duration: Duration,
}

impl Notifier {
    pub fn new(conf: &NotificationsConf) -> Self {
        Self {
            toasts: new_state(VecDeque::new()),
            capacity: conf.capacity.max(1),
            duration: Duration::seconds(conf.duration_secs as i64),
        }
    }

    /// Renvoie true si un toast a effectivement été affiché
    pub fn report_error(&self, err: &RpcError) -> bool {
        if err.code == RpcCode::Unknown {
            debug!(error = %err, "suppressed unknown rpc error");
            return false;
        }
        self.push(ToastLevel::Error, format!("{:?}", err.code), Some(err.message.clone()));
        true
    }

    /// Succès : trace debug uniquement, pas de toast
    pub fn report_success(&self, what: &str) {
        debug!(what, "command succeeded");
    }

    pub fn push(&self, level: ToastLevel, message: String, description: Option<String>) -> Uuid {
        self.push_at(level, message, description, OffsetDateTime::now_utc())
    }

    pub fn push_at(&self, level: ToastLevel, message: String, description: Option<String>, now: OffsetDateTime) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            level,
            message,
            description,
            created_at: now,
            expires_at: now + self.duration,
        };
        let id = toast.id;

        let mut toasts = self.toasts.lock();
        while toasts.len() >= self.capacity {
            toasts.pop_front();
        }
        toasts.push_back(toast);
        id
    }

    pub fn visible(&self) -> Vec<Toast> {
        self.visible_at(OffsetDateTime::now_utc())
    }

    pub fn visible_at(&self, now: OffsetDateTime) -> Vec<Toast> {
        let mut toasts = self.toasts.lock();
        toasts.retain(|t| t.expires_at > now);
        toasts.iter().cloned().collect()
    }

    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut toasts = self.toasts.lock();
        let before = toasts.len();
        toasts.retain(|t| t.id != id);
        toasts.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::code_for_status;
    use reqwest::StatusCode;
    use time::macros::datetime;

    fn notifier(capacity: usize) -> Notifier {
        Notifier::new(&NotificationsConf { capacity, duration_secs: 3 })
    }

    #[test]
    fn test_unknown_errors_are_suppressed() {
        let n = notifier(5);
        assert!(!n.report_error(&RpcError::new(RpcCode::Unknown, "cancelled")));
        assert!(n.visible().is_empty());

        assert!(n.report_error(&RpcError::new(RpcCode::Unavailable, "controller down")));
        let shown = n.visible();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].level, ToastLevel::Error);
        assert_eq!(shown[0].description.as_deref(), Some("controller down"));
    }

    #[test]
    fn test_controller_rejections_are_shown() {
        let n = notifier(5);
        let rejections = [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::NOT_IMPLEMENTED,
        ];
        for status in rejections {
            let err = RpcError::new(code_for_status(status), status.to_string());
            assert!(n.report_error(&err), "{status} was suppressed");
        }
        let shown = n.visible();
        assert_eq!(shown.len(), 4);
        assert_eq!(shown[0].message, "Unauthenticated");
    }

    #[test]
    fn test_success_is_not_a_toast() {
        let n = notifier(5);
        n.report_success("garage door toggled");
        assert!(n.visible().is_empty());
    }

    #[test]
    fn test_toasts_expire() {
        let n = notifier(5);
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        n.push_at(ToastLevel::Success, "ok".into(), None, t0);
        assert_eq!(n.visible_at(t0 + Duration::seconds(2)).len(), 1);
        assert!(n.visible_at(t0 + Duration::seconds(3)).is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let n = notifier(2);
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        for msg in ["a", "b", "c"] {
            n.push_at(ToastLevel::Success, msg.into(), None, t0);
        }
        let shown: Vec<_> = n.visible_at(t0).into_iter().map(|t| t.message).collect();
        assert_eq!(shown, vec!["b", "c"]);
    }

    #[test]
    fn test_dismiss() {
        let n = notifier(5);
        let id = n.push(ToastLevel::Success, "done".into(), None);
        assert!(n.dismiss(id));
        assert!(!n.dismiss(id));
        assert!(n.visible().is_empty());
    }
}
