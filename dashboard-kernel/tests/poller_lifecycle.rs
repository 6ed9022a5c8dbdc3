use caniot_dashboard::alerts::AlertKind;
use caniot_dashboard::backend::RpcCode;
use caniot_dashboard::models::{DeviceRef, DoorState, HeaterMode};
use caniot_dashboard::state::ViewKind;
use caniot_dashboard::view_model::{ControllerState, ViewSnapshot};
use caniot_dashboard_devkit::fixtures::{alarm_state, ble_list, garage_state, heater_state};
use caniot_dashboard_devkit::{Call, DeviceStateBuilder, Endpoint, TestHarness};
use std::time::Duration;

#[tokio::test]
async fn test_device_view_fetches_device_then_live_state() {
    let harness = TestHarness::new();
    let device = DeviceStateBuilder::new("outdoor alarm").did(24).view("alarms").seen(4).build();
    harness.backend.set_device(DeviceRef(24), device.clone());
    harness.backend.set_alarm(alarm_state(device, true));

    let handle = harness.poller().mount(ViewKind::Device(DeviceRef(24)));
    let snap = harness.wait_for_snapshot(handle.id(), 2000).await.unwrap();

    let ViewSnapshot::Device(detail) = snap else { panic!("expected a device snapshot") };
    assert_eq!(detail.state.name, "outdoor alarm");
    assert!(matches!(detail.live, Some(ControllerState::Alarm(ref a)) if a.enabled));

    let calls = harness.backend.calls();
    assert_eq!(calls[0], Call::DeviceState(DeviceRef(24)));
    assert_eq!(calls[1], Call::Alarm);
    handle.unmount().await;
}

#[tokio::test]
async fn test_device_view_commits_only_when_both_calls_succeed() {
    let harness = TestHarness::new();
    harness
        .backend
        .set_device(DeviceRef(1), DeviceStateBuilder::new("garage").did(1).view("garage").seen(2).build());
    harness.backend.fail(Endpoint::Garage, RpcCode::Unavailable, "garage controller offline");

    let handle = harness.poller().mount(ViewKind::Device(DeviceRef(1)));
    harness
        .wait_until(2000, |h| h.backend.completed_count(Endpoint::Garage) >= 1)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(harness.snapshot(handle.id()).is_none());
    let toasts = harness.app.notifier.visible();
    assert!(!toasts.is_empty());
    assert_eq!(toasts[0].description.as_deref(), Some("garage controller offline"));

    // le contrôleur revient : le cycle suivant commit les deux
    harness.backend.recover(Endpoint::Garage);
    harness.backend.set_garage(garage_state(
        DeviceStateBuilder::new("garage").seen(2).build(),
        DoorState::Open,
        DoorState::Closed,
    ));
    let snap = harness.wait_for_snapshot(handle.id(), 2000).await.unwrap();
    assert!(matches!(snap, ViewSnapshot::Device(d) if matches!(d.live, Some(ControllerState::Garage(_)))));
    handle.unmount().await;
}

#[tokio::test]
async fn test_errors_keep_last_known_snapshot() {
    let harness = TestHarness::new();
    harness.backend.set_heaters(heater_state(
        DeviceStateBuilder::new("heaters").seen(1).build(),
        vec![HeaterMode::Comfort, HeaterMode::FrostFree],
    ));

    let handle = harness.poller().mount(ViewKind::Heaters);
    let first = harness.wait_for_snapshot(handle.id(), 2000).await.unwrap();

    harness.backend.fail(Endpoint::Heaters, RpcCode::DeadlineExceeded, "timeout");
    harness
        .wait_until(2000, |h| h.app.health.polls_failed() >= 2)
        .await
        .unwrap();

    assert_eq!(harness.snapshot(handle.id()), Some(first));
    handle.unmount().await;
}

#[tokio::test]
async fn test_unknown_errors_are_counted_but_not_shown() {
    let harness = TestHarness::new();
    harness.backend.fail(Endpoint::BleList, RpcCode::Unknown, "stream reset");

    let handle = harness.poller().mount(ViewKind::BleDevices);
    harness
        .wait_until(2000, |h| h.app.health.polls_failed() >= 1)
        .await
        .unwrap();

    assert!(harness.app.notifier.visible().is_empty());
    assert!(harness.snapshot(handle.id()).is_none());
    let health = harness.app.health.get_health(&harness.app.store);
    assert!(health.last_error.unwrap().contains("stream reset"));
    handle.unmount().await;
}

#[tokio::test]
async fn test_cancelled_view_never_commits_inflight_result() {
    let harness = TestHarness::new();
    harness.backend.set_alarm(alarm_state(DeviceStateBuilder::new("outdoor alarm").seen(1).build(), false));
    harness.backend.set_delay(Endpoint::Alarm, Duration::from_millis(300));

    let handle = harness.poller().mount(ViewKind::Alarm);
    let id = handle.id();
    harness
        .wait_until(2000, |h| h.backend.call_count(Endpoint::Alarm) == 1)
        .await
        .unwrap();

    drop(handle);
    harness.wait_for_removal(id, 2000).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    // la requête en vol a été abandonnée, rien n'a été commité
    assert_eq!(harness.backend.completed_count(Endpoint::Alarm), 0);
    assert!(harness.slot(id).is_none());
    let health = harness.app.health.get_health(&harness.app.store);
    assert_eq!(health.views_mounted, 0);
    assert_eq!(health.polls_ok, 0);
}

#[tokio::test]
async fn test_polls_never_overlap() {
    let harness = TestHarness::new();
    harness.backend.set_garage(garage_state(
        DeviceStateBuilder::new("garage").seen(1).build(),
        DoorState::Closed,
        DoorState::Closed,
    ));
    harness.backend.set_delay(Endpoint::Garage, Duration::from_millis(500));

    let handle = harness.poller().mount(ViewKind::Garage);
    tokio::time::sleep(Duration::from_millis(1200)).await;

    // poll toutes les 200 ms mais chaque requête dure 500 ms
    let calls = harness.backend.call_count(Endpoint::Garage);
    assert!((1..=3).contains(&calls), "got {calls} calls");
    assert!(harness.backend.completed_count(Endpoint::Garage) >= calls - 1);
    handle.unmount().await;
}

#[tokio::test]
async fn test_tick_advances_offset_and_poll_rebases_it() {
    let harness = TestHarness::new();
    harness.backend.set_alarm(alarm_state(DeviceStateBuilder::new("outdoor alarm").seen(1).build(), true));

    let handle = harness.poller().mount(ViewKind::Alarm);
    let id = handle.id();
    harness.wait_for_snapshot(id, 2000).await.unwrap();
    harness
        .wait_until(2000, |h| h.slot(id).map(|s| s.offset >= 2).unwrap_or(false))
        .await
        .unwrap();

    let polled_at = harness.slot(id).and_then(|s| s.polled_at);
    harness
        .wait_until(2000, |h| h.slot(id).map(|s| s.polled_at != polled_at).unwrap_or(false))
        .await
        .unwrap();
    let offset = harness.slot(id).map(|s| s.offset).unwrap_or(u64::MAX);
    assert!(offset <= 2, "offset {offset} not rebased");
    handle.unmount().await;
}

#[tokio::test]
async fn test_offset_keeps_ticking_while_polls_are_slow_and_failing() {
    let harness = TestHarness::new();
    harness.backend.set_alarm(alarm_state(DeviceStateBuilder::new("outdoor alarm").seen(1).build(), true));

    let handle = harness.poller().mount(ViewKind::Alarm);
    let id = handle.id();
    let first = harness.wait_for_snapshot(id, 2000).await.unwrap();

    // chaque requête dure plus qu'un intervalle de poll et échoue
    harness.backend.set_delay(Endpoint::Alarm, Duration::from_millis(250));
    harness.backend.fail(Endpoint::Alarm, RpcCode::DeadlineExceeded, "controller timeout");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // tick de 50 ms : ~30 attendus, jamais gelé par le poll en vol
    let offset = harness.slot(id).map(|s| s.offset).unwrap_or(0);
    assert!(offset >= 15, "offset stuck at {offset}");
    assert_eq!(harness.snapshot(id), Some(first));
    assert!(harness.app.health.polls_failed() >= 1);
    handle.unmount().await;
}

#[tokio::test]
async fn test_home_sections_refresh_independently() {
    let harness = TestHarness::new();
    harness.backend.set_alarm(alarm_state(DeviceStateBuilder::new("outdoor alarm").seen(1).build(), true));
    harness.backend.set_devices_with_alert(vec![DeviceStateBuilder::new("garage")
        .view("garage")
        .alert(AlertKind::Warning, "porte ouverte")
        .build()]);
    harness.backend.set_ble(ble_list(vec![], None));
    harness.backend.fail(Endpoint::Heaters, RpcCode::Unavailable, "heaters offline");

    let handle = harness.poller().mount(ViewKind::Home);
    let snap = harness.wait_for_snapshot(handle.id(), 2000).await.unwrap();

    let ViewSnapshot::Home(home) = snap else { panic!("expected a home snapshot") };
    assert!(home.heaters.is_none());
    assert!(home.alarm.is_some());
    assert_eq!(home.devices_with_alert.map(|d| d.len()), Some(1));
    assert!(home.ble.is_some());
    handle.unmount().await;
}
