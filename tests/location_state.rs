mod common;

use common::*;
use physio_locator::models::{
    AddressComponents, Coordinates, LocationData, LocationStatus,
};
use physio_locator::platform::{Accuracy, DevicePlace};
use physio_locator::state::{CycleOutcome, LocationStateMachine};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn manual_pick() -> LocationData {
    LocationData::new(
        PUNE,
        AddressComponents {
            primary_text: "Koregaon Park".to_string(),
            secondary_text: "Pune".to_string(),
            ..AddressComponents::default()
        },
    )
}

#[tokio::test]
async fn granted_permission_ends_in_success_with_resolved_address() {
    let harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    let machine = harness.machine();

    let outcome = machine.refresh_location().await;

    assert_eq!(outcome, CycleOutcome::Applied(LocationStatus::Success));
    let state = machine.snapshot();
    assert_eq!(state.status, LocationStatus::Success);
    assert!(state.error.is_none());

    let data = state.data.unwrap();
    assert_eq!(data.coords, MUMBAI);
    assert_eq!(data.address.area, "Vashi");
    assert_eq!(data.address.city, "Navi Mumbai");
    assert_eq!(data.address.postal_code, "400703");
    assert_eq!(data.address.secondary_text, "Vashi, Navi Mumbai");
    assert!(data.timestamp > 0);
}

#[tokio::test]
async fn every_permission_outcome_reaches_one_terminal_status() {
    let cases = [
        (Ok(true), Ok(true), LocationStatus::Success),
        (Ok(false), Ok(true), LocationStatus::Success),
        (Err(()), Ok(true), LocationStatus::Success),
        (Ok(false), Ok(false), LocationStatus::PermissionDenied),
        (Ok(false), Err(()), LocationStatus::PermissionDenied),
        (Err(()), Err(()), LocationStatus::PermissionDenied),
    ];

    for (check, request, expected) in cases {
        let mut harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
        harness.permissions = FakePermissions::new(check, request);
        let machine = harness.machine();

        let outcome = machine.refresh_location().await;
        let state = machine.snapshot();

        assert_eq!(outcome, CycleOutcome::Applied(expected), "{check:?}/{request:?}");
        assert_eq!(state.status, expected);
        assert!(!state.status.is_loading());
    }
}

#[tokio::test]
async fn denied_permission_never_touches_positioning() {
    let mut harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    harness.permissions = FakePermissions::new(Ok(false), Ok(false));
    let machine = harness.machine();

    machine.refresh_location().await;

    let state = machine.snapshot();
    assert_eq!(state.status, LocationStatus::PermissionDenied);
    assert_eq!(state.error.as_deref(), Some("Location permission is required"));
    assert!(state.data.is_none());
    assert_eq!(harness.positions.call_count(), 0);
    assert_eq!(harness.permissions.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_fix_at_either_accuracy_is_an_error() {
    let harness = Harness::new(FakePositions::answering(None));
    let machine = harness.machine();

    let outcome = machine.refresh_location().await;

    assert_eq!(outcome, CycleOutcome::Applied(LocationStatus::Error));
    let state = machine.snapshot();
    assert!(state.data.is_none());
    assert!(state.error.unwrap().contains("no satellites"));
    assert_eq!(
        *harness.positions.calls.lock().unwrap(),
        vec![Accuracy::High, Accuracy::Balanced]
    );
}

#[tokio::test]
async fn primary_zero_results_falls_back_to_device_geocoder() {
    let mut harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    *harness.maps.geocode.lock().unwrap() = json!({ "status": "ZERO_RESULTS", "results": [] });
    harness.device = FakeDevice::new(Some(DevicePlace {
        district: Some("Colaba".to_string()),
        city: Some("Mumbai".to_string()),
        region: Some("Maharashtra".to_string()),
        ..DevicePlace::default()
    }));
    let machine = harness.machine();

    let outcome = machine.refresh_location().await;

    assert_eq!(outcome, CycleOutcome::Applied(LocationStatus::Success));
    let address = machine.snapshot().data.unwrap().address;
    assert_eq!(address.primary_text, "Colaba");
    assert_eq!(address.secondary_text, "Colaba, Mumbai");
    assert_eq!(address.place_id, "");
    assert_eq!(harness.device.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn both_geocoders_failing_keeps_coordinates_with_blank_address() {
    let harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    *harness.maps.geocode.lock().unwrap() = json!({ "status": "REQUEST_DENIED" });
    let machine = harness.machine();

    let outcome = machine.refresh_location().await;

    assert_eq!(outcome, CycleOutcome::Applied(LocationStatus::Error));
    let state = machine.snapshot();
    assert!(state.error.unwrap().starts_with("Unable to fetch address"));
    let data = state.data.unwrap();
    assert_eq!(data.coords, MUMBAI);
    assert_eq!(data.address, AddressComponents::default());
}

#[tokio::test]
async fn clearing_twice_is_the_same_as_once() {
    let harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    let machine = harness.machine();
    machine.refresh_location().await;

    machine.clear_location();
    let once = machine.snapshot();
    machine.clear_location();
    let twice = machine.snapshot();

    for state in [once, twice] {
        assert_eq!(state.status, LocationStatus::Idle);
        assert!(state.data.is_none());
        assert!(state.error.is_none());
    }
}

#[tokio::test]
async fn injected_data_reads_back_as_success() {
    let harness = Harness::new(FakePositions::answering(None));
    let machine = harness.machine();
    machine.refresh_location().await;
    assert_eq!(machine.snapshot().status, LocationStatus::Error);

    let pick = manual_pick();
    machine.set_location_data(pick.clone());

    let state = machine.snapshot();
    assert_eq!(state.data, Some(pick));
    assert_eq!(state.status, LocationStatus::Success);
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn status_walks_through_each_stage() {
    let mut harness = Harness::new(FakePositions::scripted(
        vec![Fix {
            delay: Duration::from_secs(1),
            coords: Some(MUMBAI),
        }],
        None,
    ));
    harness.maps = Arc::new(FakeMaps {
        geocode_delay: Duration::from_secs(1),
        ..FakeMaps::default()
    });
    let machine = harness.machine();

    let cycle = tokio::spawn({
        let machine = machine.clone();
        async move { machine.refresh_location().await }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(machine.snapshot().status, LocationStatus::FetchingLocation);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(machine.snapshot().status, LocationStatus::FetchingAddress);

    assert_eq!(
        cycle.await.unwrap(),
        CycleOutcome::Applied(LocationStatus::Success)
    );
}

#[tokio::test(start_paused = true)]
async fn slow_older_cycle_cannot_overwrite_newer_result() {
    let harness = Harness::new(FakePositions::scripted(
        vec![
            Fix {
                delay: Duration::from_secs(5),
                coords: Some(PUNE),
            },
            Fix {
                delay: Duration::from_millis(10),
                coords: Some(MUMBAI),
            },
        ],
        None,
    ));
    let machine = harness.machine();

    let stale = tokio::spawn({
        let machine = machine.clone();
        async move { machine.refresh_location().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fresh = machine.refresh_location().await;
    assert_eq!(fresh, CycleOutcome::Applied(LocationStatus::Success));

    assert_eq!(stale.await.unwrap(), CycleOutcome::Superseded);
    let state = machine.snapshot();
    assert_eq!(state.status, LocationStatus::Success);
    assert_eq!(state.data.unwrap().coords, MUMBAI);
}

#[tokio::test(start_paused = true)]
async fn clear_during_cycle_wins() {
    let harness = Harness::new(FakePositions::scripted(
        vec![Fix {
            delay: Duration::from_secs(2),
            coords: Some(MUMBAI),
        }],
        None,
    ));
    let machine = harness.machine();

    let cycle = tokio::spawn({
        let machine = machine.clone();
        async move { machine.refresh_location().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    machine.clear_location();

    assert_eq!(cycle.await.unwrap(), CycleOutcome::Superseded);
    let state = machine.snapshot();
    assert_eq!(state.status, LocationStatus::Idle);
    assert!(state.data.is_none());
}

#[tokio::test(start_paused = true)]
async fn manual_pick_during_cycle_is_not_overwritten_by_gps() {
    let harness = Harness::new(FakePositions::scripted(
        vec![Fix {
            delay: Duration::from_secs(2),
            coords: Some(MUMBAI),
        }],
        None,
    ));
    let machine = harness.machine();

    let cycle = tokio::spawn({
        let machine = machine.clone();
        async move { machine.refresh_location().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let pick = manual_pick();
    machine.set_location_data(pick.clone());

    assert_eq!(cycle.await.unwrap(), CycleOutcome::Superseded);
    assert_eq!(machine.snapshot().data, Some(pick));
}

#[tokio::test]
async fn subscribers_see_the_final_state() {
    let harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    let machine = harness.machine();
    let mut rx = machine.subscribe();

    machine.refresh_location().await;

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    assert_eq!(seen.status, LocationStatus::Success);
    assert_eq!(seen.data.map(|d| d.coords), Some(MUMBAI));
}

#[tokio::test]
async fn launch_with_auto_fetch_runs_exactly_one_cycle() {
    let harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    let machine = LocationStateMachine::launch(harness.pipeline(), true);
    let mut rx = machine.subscribe();

    let state = rx
        .wait_for(|s| s.status == LocationStatus::Success)
        .await
        .unwrap()
        .clone();
    assert_eq!(state.data.unwrap().coords, MUMBAI);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.positions.call_count(), 1);
}

#[tokio::test]
async fn launch_without_auto_fetch_stays_idle() {
    let harness = Harness::new(FakePositions::answering(Some(MUMBAI)));
    let machine = LocationStateMachine::launch(harness.pipeline(), false);

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(machine.snapshot().status, LocationStatus::Idle);
    assert_eq!(harness.positions.call_count(), 0);
}

#[tokio::test]
async fn retry_after_error_starts_from_permission_again() {
    let harness = Harness::new(FakePositions::scripted(
        vec![
            Fix {
                delay: Duration::ZERO,
                coords: None,
            },
            Fix {
                delay: Duration::ZERO,
                coords: None,
            },
        ],
        Some(Coordinates::new(19.0771, 72.9986)),
    ));
    let machine = harness.machine();

    assert_eq!(
        machine.refresh_location().await,
        CycleOutcome::Applied(LocationStatus::Error)
    );
    assert_eq!(
        machine.refresh_location().await,
        CycleOutcome::Applied(LocationStatus::Success)
    );
    assert!(machine.snapshot().error.is_none());
}
