//! Registered participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered participant of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque stable identifier.
    pub id: Uuid,
    /// Participant number; the key into the route table.
    pub number: u32,
    /// Delivery channel address (for Telegram, the chat id).
    pub recipient: String,
    /// Name shown to administrators.
    pub display_name: String,
    /// Last station this participant was advanced to (0 = not started).
    pub current_station: u32,
    /// Whether the participant still receives broadcasts.
    pub active: bool,
    /// When the participant first made contact.
    pub registered_at: DateTime<Utc>,
}

impl Participant {
    /// Participant number padded to three digits, as printed on badges.
    #[must_use]
    pub fn formatted_number(&self) -> String {
        format!("{:03}", self.number)
    }

    /// Progress as `current/total`.
    #[must_use]
    pub fn progress(&self, total_stations: u32) -> String {
        format!("{}/{}", self.current_station, total_stations)
    }
}

/// Input for registering a participant on first contact.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    /// Requested participant number; `None` assigns the next free number.
    pub number: Option<u32>,
    /// Delivery channel address.
    pub recipient: String,
    /// Name shown to administrators.
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::Participant;

    #[test]
    fn test_formatted_number_pads_to_three_digits() {
        let participant = Participant {
            id: Uuid::new_v4(),
            number: 7,
            recipient: "1001".to_owned(),
            display_name: "Anna".to_owned(),
            current_station: 3,
            active: true,
            registered_at: Utc::now(),
        };

        assert_eq!(participant.formatted_number(), "007");
        assert_eq!(participant.progress(9), "3/9");
    }
}
