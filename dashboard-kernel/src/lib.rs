/**
 * CANIOT DASHBOARD - Noyau du tableau de bord domotique
 *
 * RÔLE : Modèle d'affichage des équipements CANIOT et BLE (liveness,
 * alertes, échelles de confort), client du contrôleur, polling par vue,
 * notifications et API HTTP des vues.
 */

pub mod alerts;
pub mod backend;
pub mod comfort;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod liveness;
pub mod models;
pub mod notifications;
pub mod poller;
pub mod state;
pub mod view_model;

pub use backend::{ControllerBackend, HttpBackend, RpcCode, RpcError, SharedBackend};
pub use config::DashboardConfig;
pub use error::DashboardError;
