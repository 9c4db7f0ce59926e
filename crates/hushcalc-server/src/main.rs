//! Hushcalc server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use hushcalc_core::clock::SystemClock;
use hushcalc_core::rng::{DeterministicRng, StdDeterministicRng};
use hushcalc_engine::application::session::{Session, SessionPorts};
use hushcalc_server::actor::SessionHandle;
use hushcalc_server::config::AppConfig;
use hushcalc_server::error::AppError;
use hushcalc_server::ports::{HeadlessCapabilities, TracingPresenter};
use hushcalc_server::state::AppState;
use hushcalc_store::SqliteKeyValueStore;
use hushcalc_story::StepGraph;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting hushcalc server");

    let config = AppConfig::from_env()?;

    let store = SqliteKeyValueStore::connect(&config.store_url).await?;
    let rng: Box<dyn DeterministicRng> = match config.rng_seed {
        Some(seed) => Box::new(StdDeterministicRng::seeded(seed)),
        None => Box::new(StdDeterministicRng::from_entropy()),
    };
    let ports = SessionPorts {
        presenter: Arc::new(TracingPresenter),
        capabilities: Arc::new(HeadlessCapabilities),
        clock: Arc::new(SystemClock),
        store: Arc::new(store),
    };
    let session = Session::new(Arc::new(StepGraph::embedded().clone()), ports, rng)
        .with_typing_speed(config.typing_ms_per_char);
    let app_state = AppState::new(SessionHandle::spawn(session, config.tick));

    // TODO: Replace CorsLayer::permissive() with the UI's origin once it is hosted.
    let app = hushcalc_server::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
