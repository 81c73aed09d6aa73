//! Restart recovery of an event left active by a previous process.

mod common;

use chrono::{DateTime, TimeDelta, Utc};
use common::{
    Harness, HarnessOptions, THREE_STATION_ROUTES, advance_millis, advance_secs, base_time,
    minute_stations,
};
use stationcast_core::event::Event;
use stationcast_core::outcome::DeliveryStatus;
use stationcast_scheduler::{RecoveryOutcome, RecoveryPolicy, SchedulerConfig};
use stationcast_store::InMemoryEventStore;
use uuid::Uuid;

const FIVE_STATION_ROUTES: &str = "participant_number,station_1,station_2,station_3,station_4,station_5\n\
1,A,B,C,D,E\n2,B,C,D,E,A\n";

fn persisted_event(start_time: DateTime<Utc>, total_stations: u32, current_station: u32) -> Event {
    Event {
        id: Uuid::new_v4(),
        start_time,
        total_stations,
        station_duration_secs: 60,
        active: true,
        current_station,
        route_fingerprint: None,
        created_at: start_time,
        ended_at: None,
    }
}

fn harness_with(event: &Event, recovery: RecoveryPolicy) -> Harness {
    let three_stations = event.total_stations == 3;
    Harness::build(HarnessOptions {
        config: SchedulerConfig {
            recovery,
            ..minute_stations(event.total_stations)
        },
        routes: if three_stations {
            THREE_STATION_ROUTES
        } else {
            FIVE_STATION_ROUTES
        },
        events: InMemoryEventStore::with_event(event.clone()),
        ..HarnessOptions::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_recover_without_active_event_is_idle() {
    let h = Harness::new();

    let outcome = h.scheduler.recover().await.unwrap();

    assert_eq!(outcome, RecoveryOutcome::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_catch_up_fires_every_overdue_station() {
    // Arrange
    let event = persisted_event(base_time() - TimeDelta::seconds(150), 3, 0);
    let h = harness_with(&event, RecoveryPolicy::CatchUp);
    let participants = h.register_all(3).await;

    // Act
    let outcome = h.scheduler.recover().await.unwrap();
    advance_millis(10).await;

    // Assert
    assert_eq!(
        outcome,
        RecoveryOutcome::Resumed {
            event_id: event.id,
            current_station: 0,
            due_station: 2,
            skipped: 0,
        }
    );
    assert_eq!(h.channel.messages_to("r1"), vec!["Station 1/3: A", "Station 2/3: B"]);
    assert_eq!(h.event(event.id).current_station, 2);
    for participant in &participants {
        assert_eq!(h.participant(participant.id).await.current_station, 2);
    }

    advance_secs(31).await;

    assert_eq!(h.channel.messages_to("r1").len(), 3);
    assert!(!h.event(event.id).active);
}

#[tokio::test(start_paused = true)]
async fn test_jump_to_latest_skips_all_but_latest_overdue_station() {
    // Arrange
    let event = persisted_event(base_time() - TimeDelta::seconds(150), 3, 0);
    let h = harness_with(&event, RecoveryPolicy::JumpToLatest);
    let participants = h.register_all(3).await;

    // Act
    let outcome = h.scheduler.recover().await.unwrap();
    advance_millis(10).await;

    // Assert
    assert!(matches!(
        outcome,
        RecoveryOutcome::Resumed {
            due_station: 2,
            skipped: 1,
            ..
        }
    ));
    assert_eq!(h.channel.messages_to("r1"), vec!["Station 2/3: B"]);
    let skipped = h
        .records_with(event.id, DeliveryStatus::SkippedRecovery)
        .await;
    assert_eq!(skipped.len(), 3);
    assert!(skipped.iter().all(|r| r.station == 1));
    assert_eq!(h.event(event.id).current_station, 2);
    for participant in &participants {
        assert_eq!(h.participant(participant.id).await.current_station, 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_jump_to_latest_with_single_overdue_station_fires_it() {
    let event = persisted_event(base_time() - TimeDelta::seconds(70), 3, 0);
    let h = harness_with(&event, RecoveryPolicy::JumpToLatest);
    h.register_all(3).await;

    let outcome = h.scheduler.recover().await.unwrap();
    advance_millis(10).await;

    assert!(matches!(outcome, RecoveryOutcome::Resumed { skipped: 0, .. }));
    assert_eq!(h.channel.messages_to("r1"), vec!["Station 1/3: A"]);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_station_ahead_of_clock_is_never_refired() {
    // Arrange
    let event = persisted_event(base_time() - TimeDelta::seconds(90), 5, 3);
    let h = harness_with(&event, RecoveryPolicy::CatchUp);
    h.register_all(2).await;

    // Act
    let outcome = h.scheduler.recover().await.unwrap();
    advance_secs(149).await;
    let before_fourth = h.channel.sent().len();
    advance_secs(2).await;

    // Assert
    assert_eq!(
        outcome,
        RecoveryOutcome::Resumed {
            event_id: event.id,
            current_station: 3,
            due_station: 1,
            skipped: 0,
        }
    );
    assert_eq!(before_fourth, 0);
    assert_eq!(h.channel.messages_to("r1"), vec!["Station 4/5: D"]);
    assert_eq!(h.event(event.id).current_station, 4);
}

#[tokio::test(start_paused = true)]
async fn test_recovered_event_can_be_stopped() {
    let event = persisted_event(base_time() - TimeDelta::seconds(30), 3, 0);
    let h = harness_with(&event, RecoveryPolicy::CatchUp);
    h.scheduler.recover().await.unwrap();

    let stopped = h.scheduler.stop().await.unwrap();

    assert_eq!(stopped.id, event.id);
    assert!(!h.event(event.id).active);
}
