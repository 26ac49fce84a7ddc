use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;

use auth::{
    jwt::{JwtConfig, JwtService},
    repositories::SessionRepository,
};

use crate::{
    repositories::{DeviceRepository, ReadingRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // The same shared secret as the authentication service, so tokens it
    // issues verify here
    let jwt_service = JwtService::new(JwtConfig::from_env());

    let app_state = AppState {
        db_pool: pool.clone(),
        jwt_service,
        session_repository: SessionRepository::new(pool.clone()),
        device_repository: DeviceRepository::new(pool.clone()),
        reading_repository: ReadingRepository::new(pool),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    info!("API service listening on 0.0.0.0:3001");

    axum::serve(listener, app).await?;

    Ok(())
}
