use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use elevo_api::ai_gateway::AiGateway;
use elevo_api::config::Config;
use elevo_api::db::{create_pool, run_migrations};
use elevo_api::interview::Orchestrator;
use elevo_api::resume::ResumeAnalyzer;
use elevo_api::routes::build_router;
use elevo_api::state::AppState;
use elevo_api::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Elevo API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(config.require_database_url()?).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize the AI provider chain
    let gateway = AiGateway::from_config(&config.ai);
    info!(
        "AI gateway initialized (providers: {:?}, timeout: {:?})",
        gateway.provider_names(),
        config.ai.request_timeout
    );

    let orchestrator = Arc::new(Orchestrator::new(
        gateway.clone(),
        store.clone(),
        config.interview,
    ));
    let analyzer = Arc::new(ResumeAnalyzer::new(gateway, store, config.resume_min_chars));
    info!(
        "Mock interviews: {} questions, finish allowed after {}",
        config.interview.turn_budget, config.interview.min_answers_to_finish
    );

    // Build app state
    let state = AppState {
        orchestrator,
        analyzer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
