use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use transit_monitor::config::Settings;
use transit_monitor::coordinator::{Coordinator, CoordinatorState, Listener, spawn_poller};
use transit_monitor::fetch::{ReqwestTransport, StationFetcher};
use transit_monitor::sensors::SensorBoard;
use transit_monitor::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let transport = match ReqwestTransport::new() {
        Ok(t) => t,
        Err(e) => {
            error!("failed to create HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let fetcher = StationFetcher::new(transport, settings.fetcher.clone());
    let coordinator = Arc::new(Coordinator::new(
        fetcher,
        settings.coordinate,
        settings.radius,
    ));

    // Sensors subscribe before the first refresh so they see it
    let sensors = Arc::new(SensorBoard::attach(&coordinator));

    let log_updates: Listener = Arc::new(|state: &CoordinatorState| {
        info!(
            stations = state.station_count(),
            last_success = state.last_success,
            stale = state.is_stale(),
            "published update"
        );
    });
    coordinator.add_listener(&log_updates);

    // The poller retries on schedule
    if let Err(e) = coordinator.first_refresh().await {
        debug!(error = %e, "starting without station data");
    }

    let poller = spawn_poller(Arc::clone(&coordinator), settings.poll_interval);

    let app = create_router(AppState::new(Arc::clone(&sensors)));
    let listener = match tokio::net::TcpListener::bind(settings.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {}: {e}", settings.listen_addr);
            poller.shutdown().await;
            return ExitCode::FAILURE;
        }
    };

    info!(
        addr = %settings.listen_addr,
        coordinate = %settings.coordinate,
        radius = %settings.radius,
        "transit monitor listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    poller.shutdown().await;
    sensors.detach(&coordinator);
    coordinator.remove_listener(&log_updates);

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}
