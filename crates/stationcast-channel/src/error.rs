//! Telegram client errors and their delivery classification.

use std::time::Duration;

use stationcast_core::channel::DeliveryError;
use stationcast_core::outcome::ErrorClass;
use thiserror::Error;

/// Failure talking to the Telegram Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The HTTP client could not be built.
    #[error("client setup failed: {0}")]
    Setup(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with an error.
    #[error("API error (status {status}): {description}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Telegram's error description.
        description: String,
        /// Seconds to wait before retrying, from `parameters.retry_after`.
        retry_after: Option<u64>,
    },
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl TelegramError {
    /// Maps the failure onto the transient/permanent split the dispatcher
    /// retries on.
    #[must_use]
    pub fn classify(&self) -> DeliveryError {
        match self {
            Self::Timeout => DeliveryError::transient(ErrorClass::Timeout),
            Self::Network(_) => DeliveryError::transient(ErrorClass::Network),
            Self::Setup(_) => DeliveryError::permanent(ErrorClass::Rejected),
            Self::Api {
                status,
                description,
                retry_after,
            } => match *status {
                429 => DeliveryError::Transient {
                    class: ErrorClass::RateLimited,
                    retry_after: retry_after.map(Duration::from_secs),
                },
                500..=599 => DeliveryError::transient(ErrorClass::Network),
                403 => DeliveryError::permanent(ErrorClass::Blocked),
                400 if is_unreachable(description) => {
                    DeliveryError::permanent(ErrorClass::Unreachable)
                }
                _ => DeliveryError::permanent(ErrorClass::Rejected),
            },
        }
    }
}

fn is_unreachable(description: &str) -> bool {
    let description = description.to_ascii_lowercase();
    ["chat not found", "user not found", "user is deactivated", "peer_id_invalid"]
        .iter()
        .any(|needle| description.contains(needle))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stationcast_core::channel::DeliveryError;
    use stationcast_core::outcome::ErrorClass;

    use super::TelegramError;

    fn api(status: u16, description: &str, retry_after: Option<u64>) -> TelegramError {
        TelegramError::Api {
            status,
            description: description.to_owned(),
            retry_after,
        }
    }

    #[test]
    fn test_rate_limit_is_transient_with_hint() {
        let error = api(429, "Too Many Requests: retry after 7", Some(7));

        assert_eq!(
            error.classify(),
            DeliveryError::Transient {
                class: ErrorClass::RateLimited,
                retry_after: Some(Duration::from_secs(7)),
            }
        );
    }

    #[test]
    fn test_server_errors_and_timeouts_are_transient() {
        assert!(api(502, "Bad Gateway", None).classify().is_transient());
        assert_eq!(TelegramError::Timeout.classify().class(), ErrorClass::Timeout);
        assert_eq!(
            TelegramError::Network("connection reset".into()).classify().class(),
            ErrorClass::Network
        );
    }

    #[test]
    fn test_blocked_and_unknown_chats_are_permanent() {
        let blocked = api(403, "Forbidden: bot was blocked by the user", None).classify();
        let unknown = api(400, "Bad Request: chat not found", None).classify();

        assert_eq!(blocked, DeliveryError::permanent(ErrorClass::Blocked));
        assert_eq!(unknown, DeliveryError::permanent(ErrorClass::Unreachable));
    }

    #[test]
    fn test_other_client_errors_are_rejected() {
        let error = api(400, "Bad Request: message text is empty", None).classify();

        assert_eq!(error, DeliveryError::permanent(ErrorClass::Rejected));
    }
}
