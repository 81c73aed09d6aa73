//! Per-participant delivery outcome records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final status of one participant's delivery for one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The channel accepted the message.
    Delivered,
    /// Every attempt failed transiently and the retry budget ran out.
    RetriedThenFailed,
    /// The channel reported the recipient unreachable or blocked.
    PermanentlyFailed,
    /// The participant was inactive when the station fired.
    SkippedInactive,
    /// The route table had no content for the participant at this station.
    MissingRoute,
    /// The dispatch was cancelled before this item was sent.
    Aborted,
    /// The station was passed over during restart recovery.
    SkippedRecovery,
}

impl DeliveryStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Delivered,
        Self::RetriedThenFailed,
        Self::PermanentlyFailed,
        Self::SkippedInactive,
        Self::MissingRoute,
        Self::Aborted,
        Self::SkippedRecovery,
    ];

    /// Stable textual form, used in storage and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::RetriedThenFailed => "retried_then_failed",
            Self::PermanentlyFailed => "permanently_failed",
            Self::SkippedInactive => "skipped_inactive",
            Self::MissingRoute => "missing_route",
            Self::Aborted => "aborted",
            Self::SkippedRecovery => "skipped_recovery",
        }
    }

    /// Whether this outcome needs administrative follow-up.
    #[must_use]
    pub fn needs_follow_up(self) -> bool {
        matches!(
            self,
            Self::RetriedThenFailed | Self::PermanentlyFailed | Self::MissingRoute | Self::Aborted
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown delivery status: {s}"))
    }
}

/// Classification of a delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The channel asked us to slow down.
    RateLimited,
    /// The request timed out.
    Timeout,
    /// Connection-level failure or a 5xx from the channel.
    Network,
    /// The recipient does not exist or cannot be reached.
    Unreachable,
    /// The recipient blocked the sender.
    Blocked,
    /// The channel rejected the request itself.
    Rejected,
}

impl ErrorClass {
    /// All classes, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::RateLimited,
        Self::Timeout,
        Self::Network,
        Self::Unreachable,
        Self::Blocked,
        Self::Rejected,
    ];

    /// Stable textual form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Unreachable => "unreachable",
            Self::Blocked => "blocked",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| format!("unknown error class: {s}"))
    }
}

/// Outcome of one (event, station, participant) delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// The event run.
    pub event_id: Uuid,
    /// The station that fired.
    pub station: u32,
    /// The participant concerned.
    pub participant_id: Uuid,
    /// Final status.
    pub status: DeliveryStatus,
    /// Number of channel calls made (0 for skipped items).
    pub attempts: u32,
    /// Class of the last failure, if any.
    pub last_error: Option<ErrorClass>,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

/// Participants whose latest record for an event needs follow-up.
#[must_use]
pub fn stuck_participants(records: &[DeliveryRecord]) -> Vec<&DeliveryRecord> {
    let mut latest: Vec<&DeliveryRecord> = Vec::new();
    for record in records {
        match latest
            .iter_mut()
            .find(|r| r.participant_id == record.participant_id)
        {
            Some(existing) if existing.station <= record.station => *existing = record,
            Some(_) => {}
            None => latest.push(record),
        }
    }
    latest.retain(|r| r.status.needs_follow_up());
    latest
}
