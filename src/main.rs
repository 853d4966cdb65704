use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foi_tracker::config::Config;
use foi_tracker::db::Database;
use foi_tracker::handlers::AppState;
use foi_tracker::routes;

/// Main entry point for the application.
///
/// Sets up logging, loads configuration, connects to the database and
/// bootstraps the schema, then serves the screens behind a per-IP rate limiter.
/// The health check stays outside the limiter.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foi_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url, config.db_max_connections).await?;
    db.ensure_schema().await?;

    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
    });

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limit configuration"))?,
    );
    tracing::info!(
        "Rate limiting: {} req/s per IP, burst {}",
        config.rate_limit_per_second,
        config.rate_limit_burst
    );

    let screens = routes::screen_routes().layer(GovernorLayer {
        config: governor_conf,
    });
    let app = routes::build_router_with(app_state, screens);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
