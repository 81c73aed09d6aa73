//! Stationcast API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use stationcast_api::config::AppConfig;
use stationcast_api::error::AppError;
use stationcast_api::state::AppState;
use stationcast_api::{app, telemetry};
use stationcast_channel::{LogChannel, TelegramChannel, TelegramConfig};
use stationcast_core::channel::DeliveryChannel;
use stationcast_core::clock::SystemClock;
use stationcast_dispatch::BatchDispatcher;
use stationcast_routes::{RouteLoadError, RouteTable, StationCatalog};
use stationcast_scheduler::{
    CatalogComposer, Collaborators, EventScheduler, MessageComposer, PlainComposer,
    RecoveryOutcome,
};
use stationcast_store::{
    InMemoryEventStore, InMemoryOutcomeLog, InMemoryParticipantStore, PgEventStore,
    PgOutcomeLog, PgParticipantStore, schema,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!(?config, "Starting stationcast API server");

    let scheduler = build_scheduler(&config).await?;
    match scheduler.recover().await? {
        RecoveryOutcome::Idle => info!("no event to resume"),
        RecoveryOutcome::Resumed {
            event_id,
            current_station,
            due_station,
            skipped,
        } => info!(%event_id, current_station, due_station, skipped, "resumed running event"),
    }

    let app_state = AppState::new(scheduler, config.routes_path.clone(), config.max_participants);

    // TODO: restrict CORS to the admin console origin once it is deployed.
    let router = app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Leave an unfinished event active so the next process resumes it.
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Wires stores, channel, routes and composer into a scheduler.
async fn build_scheduler(config: &AppConfig) -> Result<EventScheduler, AppError> {
    let routes = match RouteTable::load_file(
        &config.routes_path,
        config.total_stations,
        config.max_participants,
    ) {
        Ok(table) => table,
        Err(RouteLoadError::Io { path, source }) => {
            warn!(
                path = %path.display(),
                error = %source,
                "route file not readable; starting with an empty table"
            );
            RouteTable::empty(config.total_stations)
        }
        Err(err) => {
            for issue in err.issues() {
                warn!(%issue, "route table issue");
            }
            return Err(err.into());
        }
    };
    info!(
        participants = routes.len(),
        fingerprint = routes.fingerprint(),
        "route table loaded"
    );

    let composer: Arc<dyn MessageComposer> = match &config.stations_path {
        Some(path) => {
            let catalog = StationCatalog::load_file(path)?;
            for missing in catalog.missing_from(&routes) {
                warn!(content = %missing, "station not described in catalog");
            }
            Arc::new(CatalogComposer::new(catalog))
        }
        None => Arc::new(PlainComposer),
    };

    let channel: Arc<dyn DeliveryChannel> = match &config.telegram_bot_token {
        Some(token) => {
            let telegram = TelegramChannel::new(TelegramConfig {
                api_url: config.telegram_api_url.clone(),
                ..TelegramConfig::new(token.clone())
            })
            .map_err(|e| AppError::Config(format!("telegram channel: {e}")))?;
            Arc::new(telegram)
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set; messages are only logged");
            Arc::new(LogChannel)
        }
    };

    let mut collaborators = Collaborators {
        clock: Arc::new(SystemClock),
        participants: Arc::new(InMemoryParticipantStore::with_limit(config.max_participants)),
        events: Arc::new(InMemoryEventStore::new()),
        outcomes: Arc::new(InMemoryOutcomeLog::new()),
        dispatcher: BatchDispatcher::new(channel, config.dispatch_config()),
        composer,
    };
    match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            schema::migrate(&pool).await?;
            collaborators.participants = Arc::new(
                PgParticipantStore::new(pool.clone()).with_limit(config.max_participants),
            );
            collaborators.events = Arc::new(PgEventStore::new(pool.clone()));
            collaborators.outcomes = Arc::new(PgOutcomeLog::new(pool));
            info!("using PostgreSQL stores");
        }
        None => warn!("DATABASE_URL not set; state is kept in memory and lost on restart"),
    }

    Ok(EventScheduler::new(
        config.scheduler_config(),
        collaborators,
        routes,
    ))
}
