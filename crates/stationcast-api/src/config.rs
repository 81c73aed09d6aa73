//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use stationcast_channel::telegram::DEFAULT_API_URL;
use stationcast_dispatch::{DispatchConfig, RetryPolicy};
use stationcast_scheduler::{PermanentFailurePolicy, RecoveryPolicy, SchedulerConfig, StopPolicy};

use crate::error::AppError;

/// Everything the server needs to start.
#[derive(Clone)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// `PostgreSQL` URL; in-memory stores when absent.
    pub database_url: Option<String>,
    /// Telegram bot token; log-only delivery when absent.
    pub telegram_bot_token: Option<String>,
    /// Telegram Bot API base URL.
    pub telegram_api_url: String,
    /// Route table CSV.
    pub routes_path: PathBuf,
    /// Optional YAML station catalog.
    pub stations_path: Option<PathBuf>,
    /// Stations every participant passes through.
    pub total_stations: u32,
    /// Minutes per station.
    pub station_duration_minutes: u32,
    /// Participant cap.
    pub max_participants: u32,
    /// Messages per dispatch chunk.
    pub batch_size: usize,
    /// Pause between dispatch chunks.
    pub batch_delay: Duration,
    /// Retries after a transient delivery failure.
    pub retry_attempts: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
    /// Restart recovery policy.
    pub recovery: RecoveryPolicy,
    /// Permanent delivery failure policy.
    pub on_permanent_failure: PermanentFailurePolicy,
    /// Stop policy for in-flight firings.
    pub stop: StopPolicy,
    /// Send participants start and completion notices.
    pub participant_notices: bool,
    /// Recipients of station summaries and the completion notice.
    pub admin_recipients: Vec<String>,
    /// OTLP collector endpoint; span export is off when absent.
    pub otlp_endpoint: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database_url.is_some())
            .field("telegram", &self.telegram_bot_token.is_some())
            .field("routes_path", &self.routes_path)
            .field("stations_path", &self.stations_path)
            .field("total_stations", &self.total_stations)
            .field("station_duration_minutes", &self.station_duration_minutes)
            .field("max_participants", &self.max_participants)
            .field("recovery", &self.recovery)
            .field("on_permanent_failure", &self.on_permanent_failure)
            .field("stop", &self.stop)
            .field("participant_notices", &self.participant_notices)
            .field("admin_recipients", &self.admin_recipients.len())
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            database_url: get("DATABASE_URL"),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            routes_path: get("ROUTES_PATH")
                .map_or_else(|| PathBuf::from("data/routes.csv"), PathBuf::from),
            stations_path: get("STATIONS_PATH").map(PathBuf::from),
            total_stations: parse_or(&get, "TOTAL_STATIONS", 9)?,
            station_duration_minutes: parse_or(&get, "STATION_DURATION_MINUTES", 8)?,
            max_participants: parse_or(&get, "MAX_PARTICIPANTS", 150)?,
            batch_size: parse_or(&get, "BATCH_SIZE", 25)?,
            batch_delay: Duration::from_millis(parse_or(&get, "BATCH_DELAY_MS", 1000)?),
            retry_attempts: parse_or(&get, "RETRY_ATTEMPTS", 3)?,
            retry_delay: Duration::from_millis(parse_or(&get, "RETRY_DELAY_MS", 1000)?),
            recovery: parse_or(&get, "RECOVERY_POLICY", RecoveryPolicy::default())?,
            on_permanent_failure: parse_or(
                &get,
                "ON_PERMANENT_FAILURE",
                PermanentFailurePolicy::default(),
            )?,
            stop: parse_or(&get, "STOP_POLICY", StopPolicy::default())?,
            participant_notices: parse_or(&get, "PARTICIPANT_NOTICES", true)?,
            admin_recipients: get("ADMIN_RECIPIENTS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|recipient| !recipient.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        };

        if config.total_stations == 0 {
            return Err(AppError::Config("TOTAL_STATIONS must be at least 1".into()));
        }
        if config.station_duration_minutes == 0 {
            return Err(AppError::Config(
                "STATION_DURATION_MINUTES must be at least 1".into(),
            ));
        }
        if config.max_participants == 0 {
            return Err(AppError::Config("MAX_PARTICIPANTS must be at least 1".into()));
        }
        if config.batch_size == 0 {
            return Err(AppError::Config("BATCH_SIZE must be at least 1".into()));
        }
        Ok(config)
    }

    /// Address to bind the HTTP listener to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Scheduler shape and policies.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            total_stations: self.total_stations,
            station_duration: TimeDelta::minutes(i64::from(self.station_duration_minutes)),
            recovery: self.recovery,
            on_permanent_failure: self.on_permanent_failure,
            stop: self.stop,
            participant_notices: self.participant_notices,
            admin_recipients: self.admin_recipients.clone(),
            ..SchedulerConfig::default()
        }
    }

    /// Batch dispatch settings.
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            batch_size: self.batch_size,
            inter_batch_delay: self.batch_delay,
            retry: RetryPolicy::fixed(self.retry_attempts, self.retry_delay),
        }
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_environment_is_empty() {
        // Act
        let config = config_from(&[]).unwrap();

        // Assert
        assert_eq!(config.port, 3000);
        assert_eq!(config.total_stations, 9);
        assert_eq!(config.station_duration_minutes, 8);
        assert_eq!(config.max_participants, 150);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.routes_path, PathBuf::from("data/routes.csv"));
        assert!(config.database_url.is_none());
        assert!(config.telegram_bot_token.is_none());
        assert_eq!(config.recovery, RecoveryPolicy::CatchUp);
        assert_eq!(config.stop, StopPolicy::Drain);
        assert!(config.participant_notices);
        assert!(config.admin_recipients.is_empty());
    }

    #[test]
    fn test_policies_and_numbers_are_parsed() {
        let config = config_from(&[
            ("TOTAL_STATIONS", "4"),
            ("STATION_DURATION_MINUTES", "2"),
            ("RECOVERY_POLICY", "jump-to-latest"),
            ("ON_PERMANENT_FAILURE", "deactivate"),
            ("STOP_POLICY", "abort"),
            ("RETRY_ATTEMPTS", "5"),
        ])
        .unwrap();

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.total_stations, 4);
        assert_eq!(scheduler.station_duration, TimeDelta::minutes(2));
        assert_eq!(scheduler.recovery, RecoveryPolicy::JumpToLatest);
        assert_eq!(
            scheduler.on_permanent_failure,
            PermanentFailurePolicy::Deactivate
        );
        assert_eq!(scheduler.stop, StopPolicy::Abort);
        assert_eq!(config.dispatch_config().retry.max_retries, 5);
    }

    #[test]
    fn test_notice_settings_are_parsed() {
        let config = config_from(&[
            ("PARTICIPANT_NOTICES", "false"),
            ("ADMIN_RECIPIENTS", " 1001, ,2002 "),
        ])
        .unwrap();

        let scheduler = config.scheduler_config();
        assert!(!scheduler.participant_notices);
        assert_eq!(scheduler.admin_recipients, vec!["1001", "2002"]);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let result = config_from(&[("PORT", "eighty")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_policy_is_config_error() {
        let result = config_from(&[("STOP_POLICY", "later")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_stations_is_config_error() {
        let result = config_from(&[("TOTAL_STATIONS", "0")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_blank_variable_counts_as_unset() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();

        assert!(config.database_url.is_none());
    }
}
