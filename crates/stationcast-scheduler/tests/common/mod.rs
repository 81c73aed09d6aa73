//! Shared helpers for scheduler integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use stationcast_core::event::Event;
use stationcast_core::outcome::{DeliveryRecord, DeliveryStatus};
use stationcast_core::participant::{NewParticipant, Participant};
use stationcast_core::repository::{EventStateStore, OutcomeLog, ParticipantStore};
use stationcast_dispatch::{BatchDispatcher, DispatchConfig, RetryPolicy};
use stationcast_routes::RouteTable;
use stationcast_scheduler::{Collaborators, EventScheduler, PlainComposer, SchedulerConfig};
use stationcast_store::{InMemoryEventStore, InMemoryOutcomeLog, InMemoryParticipantStore};
use stationcast_test_support::{FlakyEventStore, PausedClock, RecordingChannel};
use uuid::Uuid;

/// Wall-clock anchor of every test.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Routes for three participants over two stations.
pub const TWO_STATION_ROUTES: &str = "participant_number,station_1,station_2\n1,A,B\n2,B,C\n3,C,A\n";

/// Routes for five participants over three stations.
pub const THREE_STATION_ROUTES: &str = "participant_number,station_1,station_2,station_3\n\
1,A,B,C\n2,B,C,A\n3,C,A,B\n4,A,C,B\n5,B,A,C\n";

/// A scheduler config of `total_stations` one-minute stations, without
/// start and completion notices.
pub fn minute_stations(total_stations: u32) -> SchedulerConfig {
    SchedulerConfig {
        total_stations,
        station_duration: chrono::TimeDelta::minutes(1),
        participant_notices: false,
        ..SchedulerConfig::default()
    }
}

/// Dispatch settings that keep firings short.
pub fn quick_dispatch() -> DispatchConfig {
    DispatchConfig {
        batch_size: 25,
        inter_batch_delay: Duration::from_millis(100),
        retry: RetryPolicy::fixed(2, Duration::from_millis(100)),
    }
}

/// Knobs for [`Harness::build`].
pub struct HarnessOptions {
    pub config: SchedulerConfig,
    pub routes: &'static str,
    pub channel: RecordingChannel,
    pub events: InMemoryEventStore,
    /// Station commits that fail before the event store recovers.
    pub station_commit_failures: u32,
    pub dispatch: DispatchConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            config: minute_stations(2),
            routes: TWO_STATION_ROUTES,
            channel: RecordingChannel::new(),
            events: InMemoryEventStore::new(),
            station_commit_failures: 0,
            dispatch: quick_dispatch(),
        }
    }
}

/// A scheduler over in-memory stores, a recording channel and a clock
/// driven by tokio's paused timer.
pub struct Harness {
    pub scheduler: EventScheduler,
    pub channel: Arc<RecordingChannel>,
    pub participants: Arc<InMemoryParticipantStore>,
    pub events: Arc<InMemoryEventStore>,
    pub outcomes: Arc<InMemoryOutcomeLog>,
}

impl Harness {
    /// Builds a harness. Must be called inside a paused tokio runtime.
    pub fn build(options: HarnessOptions) -> Self {
        let channel = Arc::new(options.channel);
        let participants = Arc::new(InMemoryParticipantStore::new());
        let events = Arc::new(options.events);
        let outcomes = Arc::new(InMemoryOutcomeLog::new());
        let event_store: Arc<dyn EventStateStore> = if options.station_commit_failures > 0 {
            Arc::new(FlakyEventStore::new(
                events.clone(),
                options.station_commit_failures,
            ))
        } else {
            events.clone()
        };
        let routes = RouteTable::load(
            options.routes,
            options.config.total_stations,
            150,
        )
        .unwrap();
        let scheduler = EventScheduler::new(
            options.config,
            Collaborators {
                clock: Arc::new(PausedClock::new(base_time())),
                participants: participants.clone(),
                events: event_store,
                outcomes: outcomes.clone(),
                dispatcher: BatchDispatcher::new(channel.clone(), options.dispatch),
                composer: Arc::new(PlainComposer),
            },
            routes,
        );
        Self {
            scheduler,
            channel,
            participants,
            events,
            outcomes,
        }
    }

    /// Harness with default options.
    pub fn new() -> Self {
        Self::build(HarnessOptions::default())
    }

    /// Registers participant `number` with recipient `r{number}`.
    pub async fn register(&self, number: u32) -> Participant {
        self.participants
            .register(
                NewParticipant {
                    number: Some(number),
                    recipient: format!("r{number}"),
                    display_name: format!("Participant {number}"),
                },
                base_time(),
            )
            .await
            .unwrap()
    }

    /// Registers participants `1..=count`.
    pub async fn register_all(&self, count: u32) -> Vec<Participant> {
        let mut registered = Vec::new();
        for number in 1..=count {
            registered.push(self.register(number).await);
        }
        registered
    }

    /// Current state of a participant.
    pub async fn participant(&self, id: Uuid) -> Participant {
        self.participants.get(id).await.unwrap()
    }

    /// Current state of an event, active or not.
    pub fn event(&self, id: Uuid) -> Event {
        self.events.get(id).unwrap()
    }

    /// Outcome records of an event.
    pub async fn records(&self, event_id: Uuid) -> Vec<DeliveryRecord> {
        self.outcomes.for_event(event_id).await.unwrap()
    }

    /// Outcome records of an event with `status`.
    pub async fn records_with(&self, event_id: Uuid, status: DeliveryStatus) -> Vec<DeliveryRecord> {
        self.records(event_id)
            .await
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }
}

/// Advances paused tokio time by `secs` seconds.
pub async fn advance_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Advances paused tokio time by `millis` milliseconds.
pub async fn advance_millis(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
