/*!
# CANIOT Dashboard DevKit - Fakes et utilitaires de test

Bibliothèque facilitant le développement du dashboard sans contrôleur:
- Backend contrôleur scripté (réponses, erreurs, latences)
- Builders de payloads équipements CANIOT et BLE
- Harness de test branché sur un AppState complet
*/

pub mod backend_stub;
pub mod fixtures;
pub mod test_utils;

pub use backend_stub::{Call, Endpoint, FakeBackend};
pub use fixtures::{BleDeviceBuilder, DeviceStateBuilder};
pub use test_utils::TestHarness;
