use anyhow::Result;
use std::net::SocketAddr;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use auth::{
    AppState,
    debug::DiagnosticsSink,
    jwt::{JwtConfig, JwtService},
    repositories::{SessionRepository, UserRepository},
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env();
    let jwt_service = JwtService::new(jwt_config);

    let diagnostics = DiagnosticsSink::enabled_from_env().then(DiagnosticsSink::new);
    if diagnostics.is_some() {
        warn!("debug endpoints enabled; not for production use");
    }

    let app_state = AppState {
        db_pool: pool.clone(),
        jwt_service,
        user_repository: UserRepository::new(pool.clone()),
        session_repository: SessionRepository::new(pool),
        diagnostics,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Authentication service listening on 0.0.0.0:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
