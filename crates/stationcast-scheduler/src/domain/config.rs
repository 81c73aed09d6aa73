//! Scheduler configuration and policies.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::Serialize;
use stationcast_core::error::DomainError;

/// What to do with stations that fell due while the process was down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryPolicy {
    /// Fire every overdue station in order, immediately, then resume.
    #[default]
    CatchUp,
    /// Mark overdue stations as skipped and fire only the latest due one.
    JumpToLatest,
}

/// What happens to a participant whose delivery failed permanently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermanentFailurePolicy {
    /// Keep sending later stations.
    #[default]
    KeepActive,
    /// Deactivate the participant once the station is committed.
    Deactivate,
}

/// How Stop treats a firing that is already sending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopPolicy {
    /// Let the firing send all of its chunks.
    #[default]
    Drain,
    /// Skip the firing's remaining chunks; unsent items are recorded as
    /// aborted and still advanced.
    Abort,
}

impl RecoveryPolicy {
    /// All policies.
    pub const ALL: [Self; 2] = [Self::CatchUp, Self::JumpToLatest];

    /// Stable textual form, as accepted by `FromStr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CatchUp => "catch-up",
            Self::JumpToLatest => "jump-to-latest",
        }
    }
}

impl PermanentFailurePolicy {
    /// All policies.
    pub const ALL: [Self; 2] = [Self::KeepActive, Self::Deactivate];

    /// Stable textual form, as accepted by `FromStr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepActive => "keep-active",
            Self::Deactivate => "deactivate",
        }
    }
}

impl StopPolicy {
    /// All policies.
    pub const ALL: [Self; 2] = [Self::Drain, Self::Abort];

    /// Stable textual form, as accepted by `FromStr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drain => "drain",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for RecoveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PermanentFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

impl FromStr for RecoveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == wanted)
            .ok_or_else(|| format!("unknown recovery policy: {s}"))
    }
}

impl FromStr for PermanentFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == wanted)
            .ok_or_else(|| format!("unknown permanent failure policy: {s}"))
    }
}

impl FromStr for StopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == wanted)
            .ok_or_else(|| format!("unknown stop policy: {s}"))
    }
}

/// Event shape and policies.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Stations every participant passes through.
    pub total_stations: u32,
    /// Length of one station window.
    pub station_duration: TimeDelta,
    /// How far in the past a requested start time may lie.
    pub start_tolerance: TimeDelta,
    /// Restart recovery policy.
    pub recovery: RecoveryPolicy,
    /// Permanent delivery failure policy.
    pub on_permanent_failure: PermanentFailurePolicy,
    /// Stop policy for in-flight firings.
    pub stop: StopPolicy,
    /// Send participants a notice when the event starts and completes.
    pub participant_notices: bool,
    /// Recipients of station summaries and the completion notice.
    pub admin_recipients: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            total_stations: 9,
            station_duration: TimeDelta::minutes(8),
            start_tolerance: TimeDelta::seconds(5),
            recovery: RecoveryPolicy::default(),
            on_permanent_failure: PermanentFailurePolicy::default(),
            stop: StopPolicy::default(),
            participant_notices: true,
            admin_recipients: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Checks that an event with this shape can run.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there are no stations or the
    /// station duration is not positive.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.total_stations == 0 {
            return Err(DomainError::Validation(
                "total_stations must be at least 1".into(),
            ));
        }
        if self.station_duration <= TimeDelta::zero() {
            return Err(DomainError::Validation(
                "station duration must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Total event length, `total_stations * station_duration`.
    #[must_use]
    pub fn event_duration(&self) -> TimeDelta {
        self.station_duration * i32::try_from(self.total_stations).unwrap_or(i32::MAX)
    }
}
