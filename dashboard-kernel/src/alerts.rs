/**
 * ALERTES - Classification et politique d'affichage
 *
 * RÔLE : Associe chaque type d'alerte remonté par le contrôleur à un niveau
 * de sévérité, et décide quelles alertes apparaissent dans les panneaux
 * "alertes actives".
 *
 * RÈGLE UNIQUE : OK et NOTIFICATION ne sont agrégés qu'en mode debug,
 * WARNING / INHIBITED / ERROR toujours. Toutes les vues passent par
 * ActiveAlertsPanel::collect, aucune ne réimplémente le filtre.
 */

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    Ok,
    Notification,
    Warning,
    #[serde(alias = "INHIBITTED")]
    Inhibited,
    #[serde(alias = "INERROR")]
    Error,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Ok,
        AlertKind::Notification,
        AlertKind::Warning,
        AlertKind::Inhibited,
        AlertKind::Error,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertIcon {
    Inhibited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertClass {
    pub tier: Severity,
    pub icon: Option<AlertIcon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub kind: AlertKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn classify(kind: AlertKind) -> AlertClass {
    match kind {
        AlertKind::Ok => AlertClass { tier: Severity::Success, icon: None },
        AlertKind::Notification => AlertClass { tier: Severity::Info, icon: None },
        AlertKind::Warning => AlertClass { tier: Severity::Warning, icon: None },
        AlertKind::Inhibited => AlertClass { tier: Severity::Warning, icon: Some(AlertIcon::Inhibited) },
        AlertKind::Error => AlertClass { tier: Severity::Error, icon: None },
    }
}

pub fn should_display(kind: AlertKind, debug_mode: bool) -> bool {
    match kind {
        AlertKind::Ok | AlertKind::Notification => debug_mode,
        AlertKind::Warning | AlertKind::Inhibited | AlertKind::Error => true,
    }
}

/// Alerte prête à être rendue (badge d'un équipement ou ligne de panneau)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertBadge {
    pub tier: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<AlertIcon>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub closable: bool,
    /// Vue du contrôleur propriétaire ("Intervenir")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
}

impl AlertBadge {
    pub fn from_record(record: &AlertRecord, closable: bool, navigate_to: Option<String>) -> Self {
        let class = classify(record.kind);
        Self {
            tier: class.tier,
            icon: class.icon,
            message: record.message.clone(),
            description: record.description.clone(),
            closable,
            navigate_to,
        }
    }
}

/// Entrée candidate à l'agrégation : une alerte et son contrôleur
#[derive(Debug, Clone)]
pub struct AlertEntry<'a> {
    pub record: &'a AlertRecord,
    pub navigate_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveAlertsPanel {
    pub alerts: Vec<AlertBadge>,
}

impl ActiveAlertsPanel {
    pub fn collect<'a, I>(entries: I, debug_mode: bool) -> Self
    where
        I: IntoIterator<Item = AlertEntry<'a>>,
    {
        let alerts = entries
            .into_iter()
            .filter(|e| should_display(e.record.kind, debug_mode))
            .map(|e| AlertBadge::from_record(e.record, false, e.navigate_to))
            .collect();
        Self { alerts }
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
