//! The event scheduler.
//!
//! One timeline task per running event sleeps until the next station's
//! firing time, always recomputed from the persisted start time, duration
//! and last fired station, then fires it. Firings, Stop and manual
//! broadcasts are serialized by a single firing lock, so a Stop that arrives
//! mid-firing waits for the firing to commit.
//!
//! A station whose messages went out but whose event state could not be
//! saved is held as a pending commit. The next attempt only retries the
//! commit, so no participant is messaged twice for one station.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use stationcast_core::clock::Clock;
use stationcast_core::error::DomainError;
use stationcast_core::event::{Event, NewEvent};
use stationcast_core::outcome::{DeliveryRecord, DeliveryStatus};
use stationcast_core::participant::{NewParticipant, Participant};
use stationcast_core::repository::{EventStateStore, OutcomeLog, ParticipantStore};
use stationcast_dispatch::{BatchDispatcher, DispatchItem};
use stationcast_routes::RouteTable;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::compose::MessageComposer;
use crate::domain::config::{PermanentFailurePolicy, SchedulerConfig, StopPolicy};
use crate::domain::status::{BroadcastReport, StationReport};
use crate::domain::timetable::Timetable;

/// Pause before the timeline retries after a store failure.
const STORE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// External collaborators of the scheduler.
#[derive(Clone)]
pub struct Collaborators {
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
    /// Participant persistence.
    pub participants: Arc<dyn ParticipantStore>,
    /// Event persistence.
    pub events: Arc<dyn EventStateStore>,
    /// Delivery outcome log.
    pub outcomes: Arc<dyn OutcomeLog>,
    /// Fan-out through the delivery channel.
    pub dispatcher: BatchDispatcher,
    /// Station message rendering.
    pub composer: Arc<dyn MessageComposer>,
}

/// A dispatched station whose event state is not yet saved.
struct PendingCommit {
    event_id: Uuid,
    station: u32,
    report: StationReport,
    to_deactivate: Vec<Uuid>,
}

struct Timeline {
    event_id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub(crate) struct Inner {
    pub(crate) config: SchedulerConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) participants: Arc<dyn ParticipantStore>,
    pub(crate) events: Arc<dyn EventStateStore>,
    pub(crate) outcomes: Arc<dyn OutcomeLog>,
    dispatcher: BatchDispatcher,
    composer: Arc<dyn MessageComposer>,
    routes: RwLock<Arc<RouteTable>>,
    pub(crate) firing: tokio::sync::Mutex<()>,
    pending: Mutex<Option<PendingCommit>>,
    timeline: Mutex<Option<Timeline>>,
}

/// Drives an event through its stations. Cheap to clone.
#[derive(Clone)]
pub struct EventScheduler {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for EventScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScheduler")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Participants of one station, sorted into what happens to them.
pub(crate) struct StationPlan {
    /// Active participants with content, and their rendered message.
    pub(crate) sends: Vec<(Participant, String)>,
    /// Inactive participants; advanced without a message.
    pub(crate) inactive: Vec<Participant>,
    /// Active participants without content; not advanced.
    pub(crate) missing: Vec<Participant>,
}

pub(crate) fn delivery_record(
    event_id: Uuid,
    station: u32,
    participant_id: Uuid,
    status: DeliveryStatus,
    recorded_at: DateTime<Utc>,
) -> DeliveryRecord {
    DeliveryRecord {
        event_id,
        station,
        participant_id,
        status,
        attempts: 0,
        last_error: None,
        recorded_at,
    }
}

impl EventScheduler {
    /// Creates an idle scheduler over `routes`.
    #[must_use]
    pub fn new(config: SchedulerConfig, collaborators: Collaborators, routes: RouteTable) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                clock: collaborators.clock,
                participants: collaborators.participants,
                events: collaborators.events,
                outcomes: collaborators.outcomes,
                dispatcher: collaborators.dispatcher,
                composer: collaborators.composer,
                routes: RwLock::new(Arc::new(routes)),
                firing: tokio::sync::Mutex::new(()),
                pending: Mutex::new(None),
                timeline: Mutex::new(None),
            }),
        }
    }

    /// The scheduler's configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// The loaded route table.
    #[must_use]
    pub fn routes(&self) -> Arc<RouteTable> {
        self.inner.routes()
    }

    /// Participant persistence, for registration and reports.
    #[must_use]
    pub fn participants(&self) -> Arc<dyn ParticipantStore> {
        Arc::clone(&self.inner.participants)
    }

    /// Registers a participant, stamped with the scheduler clock.
    ///
    /// Runs under the firing lock so a station never sees a half-registered
    /// participant.
    ///
    /// # Errors
    ///
    /// Returns whatever the participant store rejects the registration with.
    #[instrument(skip(self, participant), fields(number = ?participant.number))]
    pub async fn register_participant(
        &self,
        participant: NewParticipant,
    ) -> Result<Participant, DomainError> {
        let inner = &self.inner;
        let _guard = inner.firing.lock().await;
        let registered = inner
            .participants
            .register(participant, inner.clock.now())
            .await?;
        info!(
            participant_id = %registered.id,
            number = registered.number,
            "participant registered"
        );
        Ok(registered)
    }

    /// Activates or deactivates a participant between firings.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown participant and
    /// `DomainError::Infrastructure` on store failure.
    #[instrument(skip(self))]
    pub async fn set_participant_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<Participant, DomainError> {
        let inner = &self.inner;
        let _guard = inner.firing.lock().await;
        inner.participants.set_active(id, active).await?;
        inner.participants.get(id).await
    }

    /// Starts a new event and arms its timeline.
    ///
    /// `start_time` defaults to now and may lie at most the configured
    /// tolerance in the past. With participant notices enabled, every active
    /// participant is told the event started before the first station.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StateConflict` if an event is already running,
    /// `DomainError::Validation` if the start time is too far in the past or
    /// the event shape is invalid, and `DomainError::Infrastructure` on store
    /// failure.
    #[instrument(skip(self))]
    pub async fn start(&self, start_time: Option<DateTime<Utc>>) -> Result<Timetable, DomainError> {
        let inner = &self.inner;
        inner.config.validate()?;
        let _guard = inner.firing.lock().await;
        let now = inner.clock.now();
        let start_time = start_time.unwrap_or(now);
        if start_time < now - inner.config.start_tolerance {
            return Err(DomainError::Validation(format!(
                "start time {start_time} is in the past"
            )));
        }
        if let Some(active) = inner.events.get_active().await? {
            return Err(DomainError::StateConflict(format!(
                "event {} is already running",
                active.id
            )));
        }

        let routes = inner.routes();
        if routes.is_empty() {
            warn!("starting an event with an empty route table");
        }
        for participant in inner.participants.get_active().await? {
            if !routes.contains(participant.number) {
                warn!(
                    participant_id = %participant.id,
                    number = participant.number,
                    "active participant has no route"
                );
            }
        }

        let event = inner
            .events
            .create(
                NewEvent {
                    start_time,
                    total_stations: inner.config.total_stations,
                    station_duration_secs: inner.config.station_duration.num_seconds(),
                    route_fingerprint: Some(routes.fingerprint().to_owned()),
                },
                now,
            )
            .await?;
        let timetable = Timetable::for_event(&event);
        self.arm_timeline(event.id, true);

        info!(
            event_id = %event.id,
            start_time = %event.start_time,
            total_stations = event.total_stations,
            station_duration_secs = event.station_duration_secs,
            "event started"
        );
        Ok(timetable)
    }

    /// Stops the running event.
    ///
    /// Cancels the timeline, waits for an in-flight firing (which drains or
    /// aborts per the stop policy), then deactivates the event and leaves
    /// its current station as reached.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StateConflict` if no event is running and
    /// `DomainError::Infrastructure` on store failure.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<Event, DomainError> {
        let inner = &self.inner;
        let Some(event) = inner.events.get_active().await? else {
            return Err(DomainError::StateConflict("no event is running".into()));
        };

        let timeline = inner.take_timeline();
        if let Some(timeline) = &timeline {
            timeline.cancel.cancel();
        }

        let guard = inner.firing.lock().await;
        let mut event = match inner.events.get_active().await? {
            Some(current) if current.id == event.id => current,
            _ => {
                return Err(DomainError::StateConflict(
                    "event finished before it could be stopped".into(),
                ));
            }
        };
        if let Some(pending) = inner.take_pending(event.id) {
            match inner.events.update_station(event.id, pending.station).await {
                Ok(()) => event.current_station = pending.station,
                Err(err) => {
                    error!(
                        event_id = %event.id,
                        station = pending.station,
                        error = %err,
                        "failed to save dispatched station on stop"
                    );
                }
            }
        }
        let ended_at = inner.clock.now();
        inner.events.deactivate(event.id, ended_at).await?;
        drop(guard);

        if let Some(timeline) = timeline
            && let Err(err) = timeline.handle.await
        {
            error!(event_id = %timeline.event_id, error = %err, "timeline task failed");
        }

        info!(
            event_id = %event.id,
            current_station = event.current_station,
            total_stations = event.total_stations,
            "event stopped"
        );
        Ok(Event {
            active: false,
            ended_at: Some(ended_at),
            ..event
        })
    }

    /// Sends one free-form message to every active participant.
    ///
    /// Runs under the firing lock so it never interleaves with a station,
    /// and changes no participant or event state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty message and
    /// `DomainError::Infrastructure` on store failure.
    #[instrument(skip(self, message), fields(chars = message.chars().count()))]
    pub async fn broadcast(&self, message: &str) -> Result<BroadcastReport, DomainError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::Validation("broadcast message is empty".into()));
        }
        let inner = &self.inner;
        let _guard = inner.firing.lock().await;
        let participants = inner.participants.get_active().await?;
        let items: Vec<DispatchItem<Uuid>> = participants
            .into_iter()
            .map(|p| DispatchItem {
                key: p.id,
                recipient: p.recipient,
                message: message.to_owned(),
            })
            .collect();
        let recipients = items.len();
        let report = inner
            .dispatcher
            .dispatch(items, &CancellationToken::new())
            .await;
        let summary = BroadcastReport {
            recipients,
            delivered: report.count(DeliveryStatus::Delivered),
            failed: report.failed(),
        };
        info!(
            recipients,
            delivered = summary.delivered,
            failed = summary.failed,
            "broadcast sent"
        );
        Ok(summary)
    }

    /// Replaces the route table.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StateConflict` while an event is running and
    /// `DomainError::Validation` if the table's station count differs from
    /// the configured one.
    #[instrument(skip(self, table), fields(routes = table.len()))]
    pub async fn reload_routes(&self, table: RouteTable) -> Result<(), DomainError> {
        let inner = &self.inner;
        if table.total_stations() != inner.config.total_stations {
            return Err(DomainError::Validation(format!(
                "route table has {} stations, expected {}",
                table.total_stations(),
                inner.config.total_stations
            )));
        }
        let _guard = inner.firing.lock().await;
        if let Some(active) = inner.events.get_active().await? {
            return Err(DomainError::StateConflict(format!(
                "cannot reload routes while event {} is running",
                active.id
            )));
        }
        let fingerprint = table.fingerprint().to_owned();
        *inner.routes.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
        info!(%fingerprint, "route table reloaded");
        Ok(())
    }

    /// Arms the timeline task of `event_id`, replacing any previous one.
    /// With `announce`, the task first sends the start notice.
    pub(crate) fn arm_timeline(&self, event_id: Uuid, announce: bool) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_timeline(
            Arc::clone(&self.inner),
            event_id,
            cancel.clone(),
            announce,
        ));
        let previous = self
            .inner
            .timeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Timeline {
                event_id,
                cancel,
                handle,
            });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
    }
}

impl Inner {
    pub(crate) fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn take_timeline(&self) -> Option<Timeline> {
        self.timeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Sorts `participants` for `station` and renders the messages.
    pub(crate) fn plan_station(
        &self,
        participants: Vec<Participant>,
        station: u32,
        total_stations: u32,
    ) -> StationPlan {
        let routes = self.routes();
        let mut plan = StationPlan {
            sends: Vec::new(),
            inactive: Vec::new(),
            missing: Vec::new(),
        };
        for participant in participants {
            if !participant.active {
                plan.inactive.push(participant);
                continue;
            }
            match routes.resolve(participant.number, station) {
                Ok(content) => {
                    let message = self.composer.station_message(
                        &participant,
                        station,
                        total_stations,
                        content,
                    );
                    plan.sends.push((participant, message));
                }
                Err(err) => {
                    warn!(
                        participant_id = %participant.id,
                        number = participant.number,
                        station,
                        error = %err,
                        "no route content for participant"
                    );
                    plan.missing.push(participant);
                }
            }
        }
        plan
    }

    /// Advances every participant in `ids` to `station`. Failures are logged
    /// and do not stop the others.
    pub(crate) async fn advance_participants(&self, ids: &[Uuid], station: u32) {
        for id in ids {
            if let Err(err) = self.participants.update_station(*id, station).await {
                error!(participant_id = %id, station, error = %err, "failed to advance participant");
            }
        }
    }

    pub(crate) async fn record_outcomes(&self, records: &[DeliveryRecord]) {
        if records.is_empty() {
            return;
        }
        if let Err(err) = self.outcomes.record(records).await {
            error!(records = records.len(), error = %err, "failed to record delivery outcomes");
        }
    }

    fn take_pending(&self, event_id: Uuid) -> Option<PendingCommit> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.take_if(|p| p.event_id == event_id)
    }

    fn pending_station(&self, event_id: Uuid) -> Option<u32> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|p| p.event_id == event_id)
            .map(|p| p.station)
    }

    /// Token the fan-out of a firing honors, per the stop policy.
    fn dispatch_token(&self, cancel: &CancellationToken) -> CancellationToken {
        match self.config.stop {
            StopPolicy::Abort => cancel.clone(),
            StopPolicy::Drain => CancellationToken::new(),
        }
    }

    /// Sends every active participant the message `render` builds for them.
    /// Returns the number delivered.
    async fn notify_participants(
        &self,
        render: impl Fn(&Participant) -> String,
        cancel: &CancellationToken,
    ) -> Result<usize, DomainError> {
        let items: Vec<DispatchItem<Uuid>> = self
            .participants
            .get_active()
            .await?
            .into_iter()
            .map(|participant| {
                let message = render(&participant);
                DispatchItem {
                    key: participant.id,
                    recipient: participant.recipient,
                    message,
                }
            })
            .collect();
        if items.is_empty() {
            return Ok(0);
        }
        let report = self.dispatcher.dispatch(items, cancel).await;
        if report.failed() > 0 {
            warn!(failed = report.failed(), "some participant notices were not delivered");
        }
        Ok(report.count(DeliveryStatus::Delivered))
    }

    /// Sends `message` to every configured administrator.
    async fn notify_admins(&self, message: &str) {
        let items: Vec<DispatchItem<usize>> = self
            .config
            .admin_recipients
            .iter()
            .enumerate()
            .map(|(key, recipient)| DispatchItem {
                key,
                recipient: recipient.clone(),
                message: message.to_owned(),
            })
            .collect();
        if items.is_empty() {
            return;
        }
        let report = self
            .dispatcher
            .dispatch(items, &CancellationToken::new())
            .await;
        for outcome in report
            .outcomes
            .iter()
            .filter(|o| o.status != DeliveryStatus::Delivered)
        {
            warn!(
                recipient = %outcome.recipient,
                status = ?outcome.status,
                "admin notice not delivered"
            );
        }
    }

    /// Tells every active participant that `event_id` started.
    async fn announce_start(&self, event_id: Uuid, cancel: &CancellationToken) {
        if !self.config.participant_notices {
            return;
        }
        let _guard = self.firing.lock().await;
        if cancel.is_cancelled() {
            return;
        }
        let event = match self.events.get_active().await {
            Ok(Some(event)) if event.id == event_id => event,
            Ok(_) => return,
            Err(err) => {
                error!(%event_id, error = %err, "failed to load event for start notice");
                return;
            }
        };
        let timetable = Timetable::for_event(&event);
        let render = |participant: &Participant| self.composer.event_started(participant, &timetable);
        match self
            .notify_participants(render, &self.dispatch_token(cancel))
            .await
        {
            Ok(notified) => info!(%event_id, notified, "start notice sent"),
            Err(err) => error!(%event_id, error = %err, "failed to send start notice"),
        }
    }

    /// Fans `station` out and records its outcomes. Returns what is left to
    /// commit.
    async fn send_station(
        &self,
        event: &Event,
        station: u32,
        cancel: &CancellationToken,
    ) -> Result<PendingCommit, DomainError> {
        let event_id = event.id;
        let all = self.participants.list().await?;
        let plan = self.plan_station(all, station, event.total_stations);
        let now = self.clock.now();
        let mut records = Vec::with_capacity(plan.sends.len() + plan.inactive.len());
        let mut advance = Vec::with_capacity(plan.sends.len() + plan.inactive.len());
        let mut report = StationReport {
            station,
            missing_route: plan.missing.len(),
            skipped_inactive: plan.inactive.len(),
            ..StationReport::default()
        };

        for participant in &plan.missing {
            records.push(delivery_record(
                event_id,
                station,
                participant.id,
                DeliveryStatus::MissingRoute,
                now,
            ));
        }
        for participant in &plan.inactive {
            records.push(delivery_record(
                event_id,
                station,
                participant.id,
                DeliveryStatus::SkippedInactive,
                now,
            ));
            advance.push(participant.id);
        }

        let items: Vec<DispatchItem<Uuid>> = plan
            .sends
            .into_iter()
            .map(|(participant, message)| DispatchItem {
                key: participant.id,
                recipient: participant.recipient,
                message,
            })
            .collect();
        let dispatched = self
            .dispatcher
            .dispatch(items, &self.dispatch_token(cancel))
            .await;
        report.chunks = dispatched.chunks;
        report.delivered = dispatched.count(DeliveryStatus::Delivered);
        report.failed = dispatched.failed();
        report.aborted = dispatched.count(DeliveryStatus::Aborted);

        let recorded_at = self.clock.now();
        let mut to_deactivate = Vec::new();
        for outcome in &dispatched.outcomes {
            records.push(DeliveryRecord {
                event_id,
                station,
                participant_id: outcome.key,
                status: outcome.status,
                attempts: outcome.attempts,
                last_error: outcome.last_error,
                recorded_at,
            });
            advance.push(outcome.key);
            if outcome.status == DeliveryStatus::PermanentlyFailed
                && self.config.on_permanent_failure == PermanentFailurePolicy::Deactivate
            {
                to_deactivate.push(outcome.key);
            }
        }

        self.advance_participants(&advance, station).await;
        self.record_outcomes(&records).await;
        Ok(PendingCommit {
            event_id,
            station,
            report,
            to_deactivate,
        })
    }

    /// Saves the event state of a dispatched station.
    async fn commit_station(&self, event: &Event, station: u32) -> Result<(), DomainError> {
        self.events.update_station(event.id, station).await?;
        if station == event.total_stations {
            self.events.deactivate(event.id, self.clock.now()).await?;
        }
        Ok(())
    }

    /// Fires `station` of `event_id`.
    ///
    /// Returns `Ok(None)` if the timeline was cancelled while waiting for
    /// the lock, the event is no longer active, or the station was already
    /// fired. If the station was dispatched but its commit failed, only the
    /// commit is retried.
    #[instrument(skip(self, cancel))]
    async fn fire(
        &self,
        event_id: Uuid,
        station: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<StationReport>, DomainError> {
        let _guard = self.firing.lock().await;
        if cancel.is_cancelled() {
            debug!("timeline cancelled before firing");
            return Ok(None);
        }
        let event = match self.events.get_active().await? {
            Some(event) if event.id == event_id => event,
            _ => {
                debug!("event no longer active");
                return Ok(None);
            }
        };

        let staged = match self.take_pending(event_id) {
            Some(pending) if pending.station == station => {
                info!("retrying commit of a dispatched station");
                pending
            }
            _ => {
                if station <= event.current_station || station > event.total_stations {
                    warn!(
                        current_station = event.current_station,
                        "station already fired or out of range; skipping"
                    );
                    return Ok(None);
                }
                self.send_station(&event, station, cancel).await?
            }
        };

        if let Err(err) = self.commit_station(&event, station).await {
            *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(staged);
            return Err(err);
        }
        let PendingCommit {
            mut report,
            to_deactivate,
            ..
        } = staged;

        for id in &to_deactivate {
            match self.participants.set_active(*id, false).await {
                Ok(()) => {
                    report.deactivated += 1;
                    warn!(participant_id = %id, station, "participant deactivated after permanent failure");
                }
                Err(err) => {
                    error!(participant_id = %id, error = %err, "failed to deactivate participant");
                }
            }
        }

        if station == event.total_stations {
            cancel.cancel();
            report.completed = true;
        }

        info!(
            station,
            total_stations = event.total_stations,
            delivered = report.delivered,
            failed = report.failed,
            aborted = report.aborted,
            missing_route = report.missing_route,
            skipped_inactive = report.skipped_inactive,
            chunks = report.chunks,
            "station fired"
        );
        self.notify_admins(&self.composer.station_summary(&report, event.total_stations))
            .await;

        if report.completed {
            info!(%event_id, "event completed");
            self.finish_event(&event).await;
        }
        Ok(Some(report))
    }

    /// Sends the completion notices of a finished event.
    async fn finish_event(&self, event: &Event) {
        let mut notified = 0;
        if self.config.participant_notices {
            let render =
                |participant: &Participant| self.composer.event_completed(participant, event.total_stations);
            match self
                .notify_participants(render, &CancellationToken::new())
                .await
            {
                Ok(count) => notified = count,
                Err(err) => {
                    error!(event_id = %event.id, error = %err, "failed to send completion notice");
                }
            }
        }
        self.notify_admins(&self.composer.completion_summary(notified))
            .await;
    }
}

/// Sleeps for `duration`; returns `false` if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// The timeline of one event: wait for the next station, fire it, repeat.
async fn run_timeline(
    inner: Arc<Inner>,
    event_id: Uuid,
    cancel: CancellationToken,
    announce: bool,
) {
    debug!(%event_id, "timeline armed");
    if announce {
        inner.announce_start(event_id, &cancel).await;
    }
    while !cancel.is_cancelled() {
        let event = match inner.events.get_active().await {
            Ok(Some(event)) if event.id == event_id => event,
            Ok(_) => break,
            Err(err) => {
                error!(%event_id, error = %err, "failed to load event state");
                if !sleep_or_cancel(STORE_RETRY_DELAY, &cancel).await {
                    break;
                }
                continue;
            }
        };
        let station = match inner.pending_station(event_id) {
            Some(station) => station,
            None if event.has_finished() => break,
            None => event.current_station + 1,
        };
        let fires_at = event.fires_at(station);
        let now = inner.clock.now();
        if fires_at > now {
            let wait = (fires_at - now).to_std().unwrap_or_default();
            debug!(station, %fires_at, wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "waiting for station");
            if !sleep_or_cancel(wait, &cancel).await {
                break;
            }
            // Re-read state and re-check the clock before firing.
            continue;
        }

        if let Err(err) = inner.fire(event_id, station, &cancel).await {
            error!(%event_id, station, error = %err, "station firing failed");
            if !sleep_or_cancel(STORE_RETRY_DELAY, &cancel).await {
                break;
            }
        }
    }
    debug!(%event_id, "timeline finished");
}
