/**
 * LIVENESS - Statut online/offline et libellé "vu il y a ..."
 *
 * RÔLE : Décide si un équipement est joignable d'après l'ancienneté de son
 * dernier rapport, avec un seuil propre à sa classe (CANIOT ou BLE).
 *
 * FONCTIONNEMENT :
 * - Fonction pure : evaluate(sample, offset) ne garde aucun état
 * - L'offset local (secondes écoulées depuis la mesure) anime le compteur
 *   entre deux polls sans interroger le backend
 * - Dernier passage absent => toujours offline, libellé "never"
 */

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

pub const NEVER_LABEL: &str = "never";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Caniot,
    Ble,
}

/// Seuils online par classe, en secondes. Section `liveness` de la configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessPolicy {
    pub caniot_online_threshold_secs: u64,
    pub ble_online_threshold_secs: u64,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self { caniot_online_threshold_secs: 60, ble_online_threshold_secs: 300 }
    }
}

impl LivenessPolicy {
    pub fn threshold_for(&self, class: DeviceClass) -> u64 {
        match class {
            DeviceClass::Caniot => self.caniot_online_threshold_secs,
            DeviceClass::Ble => self.ble_online_threshold_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessSample {
    pub last_seen_at: Option<OffsetDateTime>,
    pub age_seconds: u64,
    pub online_threshold_seconds: u64,
}

impl LivenessSample {
    pub fn new(last_seen_at: Option<OffsetDateTime>, age_seconds: u64, online_threshold_seconds: u64) -> Self {
        Self { last_seen_at, age_seconds, online_threshold_seconds }
    }

    /// Construit un échantillon depuis un rapport backend (âge absent => 0)
    pub fn from_report(
        last_seen_at: Option<OffsetDateTime>,
        age_seconds: Option<u64>,
        class: DeviceClass,
        policy: &LivenessPolicy,
    ) -> Self {
        Self::new(last_seen_at, age_seconds.unwrap_or(0), policy.threshold_for(class))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStyle {
    /// Durée compacte seule, ex: "45s"
    Minimal,
    /// Durée entourée, ex: "(active 45s ago)"
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Liveness {
    pub online: bool,
    pub label: String,
    pub effective_age_seconds: Option<u64>,
}

pub fn evaluate(sample: &LivenessSample, now_offset_seconds: u64, style: LabelStyle) -> Liveness {
    if sample.last_seen_at.is_none() {
        return Liveness { online: false, label: NEVER_LABEL.to_string(), effective_age_seconds: None };
    }

    let age = sample.age_seconds.saturating_add(now_offset_seconds);
    let compact = humanize(age);
    let label = match style {
        LabelStyle::Minimal => compact,
        LabelStyle::Full => format!("(active {compact} ago)"),
    };

    Liveness {
        online: age < sample.online_threshold_seconds,
        label,
        effective_age_seconds: Some(age),
    }
}

/// Décompose une durée en jours/heures/minutes/secondes.
/// Les unités nulles en tête sont omises, les secondes sont toujours affichées.
/// 20 -> "20s", 125 -> "2m 5s", 3665 -> "1h 1m 5s", 86400 -> "1j 0h 0m 0s"
pub fn humanize(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut out = String::new();
    let mut leading = false;
    for (value, unit) in [(days, "j"), (hours, "h"), (minutes, "m")] {
        if value > 0 || leading {
            leading = true;
            out.push_str(&format!("{value}{unit} "));
        }
    }
    out.push_str(&format!("{secs}s"));
    out
}

/// Badge complet : horodatage absolu suivi du libellé "(active ... ago)"
pub fn badge_text(sample: &LivenessSample, now_offset_seconds: u64) -> String {
    let Some(ts) = sample.last_seen_at else {
        return NEVER_LABEL.to_string();
    };
    let full = evaluate(sample, now_offset_seconds, LabelStyle::Full);
    format!("{} {}", format_timestamp(ts), full.label)
}

pub fn format_timestamp(ts: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    ts.format(&fmt).unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

/// Compteur local entre deux polls : tick() toutes les secondes,
/// rebase() quand un nouvel échantillon arrive.
#[derive(Debug, Clone)]
pub struct LivenessTicker {
    sample: LivenessSample,
    offset: u64,
}

impl LivenessTicker {
    pub fn new(sample: LivenessSample) -> Self {
        Self { sample, offset: 0 }
    }

    pub fn tick(&mut self) {
        self.offset = self.offset.saturating_add(1);
    }

    pub fn rebase(&mut self, sample: LivenessSample) {
        self.sample = sample;
        self.offset = 0;
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn current(&self, style: LabelStyle) -> Liveness {
        evaluate(&self.sample, self.offset, style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn seen(age: u64, threshold: u64) -> LivenessSample {
        LivenessSample::new(Some(datetime!(2024-06-01 12:00:00 UTC)), age, threshold)
    }

    #[test]
    fn test_never_seen_is_offline() {
        for age in [0, 10, 10_000] {
            let sample = LivenessSample::new(None, age, 60);
            for style in [LabelStyle::Minimal, LabelStyle::Full] {
                let l = evaluate(&sample, 5, style);
                assert!(!l.online);
                assert_eq!(l.label, "never");
                assert_eq!(l.effective_age_seconds, None);
            }
        }
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(evaluate(&seen(59, 60), 0, LabelStyle::Minimal).online);
        assert!(!evaluate(&seen(60, 60), 0, LabelStyle::Minimal).online);
        assert!(!evaluate(&seen(61, 60), 0, LabelStyle::Minimal).online);
        // l'offset local compte dans l'âge effectif
        assert!(!evaluate(&seen(55, 60), 5, LabelStyle::Minimal).online);
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(0), "0s");
        assert_eq!(humanize(20), "20s");
        assert_eq!(humanize(125), "2m 5s");
        assert_eq!(humanize(3665), "1h 1m 5s");
        assert_eq!(humanize(3605), "1h 0m 5s");
        assert_eq!(humanize(86400), "1j 0h 0m 0s");
        assert_eq!(humanize(90061), "1j 1h 1m 1s");
    }

    #[test]
    fn test_labels_for_seen_device() {
        let sample = seen(45, 60);
        let minimal = evaluate(&sample, 0, LabelStyle::Minimal);
        assert!(minimal.online);
        assert_eq!(minimal.label, "45s");
        assert_eq!(evaluate(&sample, 0, LabelStyle::Full).label, "(active 45s ago)");
    }

    #[test]
    fn test_badge_text() {
        assert_eq!(badge_text(&seen(45, 60), 0), "2024-06-01 12:00:00 (active 45s ago)");
        assert_eq!(badge_text(&LivenessSample::new(None, 3, 60), 0), "never");
    }

    #[test]
    fn test_policy_thresholds() {
        let policy = LivenessPolicy::default();
        let caniot = LivenessSample::from_report(None, Some(12), DeviceClass::Caniot, &policy);
        let ble = LivenessSample::from_report(None, None, DeviceClass::Ble, &policy);
        assert_eq!(caniot.online_threshold_seconds, 60);
        assert_eq!(caniot.age_seconds, 12);
        assert_eq!(ble.online_threshold_seconds, 300);
        assert_eq!(ble.age_seconds, 0);
    }

    #[test]
    fn test_ticker() {
        let mut ticker = LivenessTicker::new(seen(58, 60));
        assert!(ticker.current(LabelStyle::Minimal).online);
        ticker.tick();
        assert_eq!(ticker.current(LabelStyle::Minimal).label, "59s");
        ticker.tick();
        assert!(!ticker.current(LabelStyle::Minimal).online);

        ticker.rebase(seen(1, 60));
        assert_eq!(ticker.offset(), 0);
        assert_eq!(ticker.current(LabelStyle::Minimal).label, "1s");
    }
}
