//! Store database schema.

use sqlx::PgPool;

/// SQL to create the participants table.
pub const CREATE_PARTICIPANTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS participants (
    id              UUID PRIMARY KEY,
    number          INTEGER NOT NULL UNIQUE CHECK (number > 0),
    recipient       VARCHAR(255) NOT NULL UNIQUE,
    display_name    VARCHAR(255) NOT NULL,
    current_station INTEGER NOT NULL DEFAULT 0 CHECK (current_station >= 0),
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    registered_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_participants_active
    ON participants (active, number);
";

/// SQL to create the events table. The partial unique index allows at most
/// one active event.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id                    UUID PRIMARY KEY,
    start_time            TIMESTAMPTZ NOT NULL,
    total_stations        INTEGER NOT NULL CHECK (total_stations > 0),
    station_duration_secs BIGINT NOT NULL CHECK (station_duration_secs > 0),
    active                BOOLEAN NOT NULL DEFAULT TRUE,
    current_station       INTEGER NOT NULL DEFAULT 0,
    route_fingerprint     VARCHAR(64),
    created_at            TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ended_at              TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_events_single_active
    ON events (active) WHERE active;
";

/// SQL to create the delivery outcome table.
pub const CREATE_DELIVERY_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS delivery_records (
    id             BIGSERIAL PRIMARY KEY,
    event_id       UUID NOT NULL REFERENCES events (id),
    station        INTEGER NOT NULL,
    participant_id UUID NOT NULL,
    status         VARCHAR(32) NOT NULL,
    attempts       INTEGER NOT NULL,
    last_error     VARCHAR(32),
    recorded_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_delivery_records_event
    ON delivery_records (event_id, station);
";

/// Creates every table and index if missing.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` if a statement fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in [
        CREATE_PARTICIPANTS_TABLE,
        CREATE_EVENTS_TABLE,
        CREATE_DELIVERY_RECORDS_TABLE,
    ] {
        sqlx::raw_sql(statement).execute(pool).await?;
    }
    Ok(())
}
