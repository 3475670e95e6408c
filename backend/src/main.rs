//! Inventory Ledger - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inventory_ledger::config::{Config, LogFormat};
use inventory_ledger::external::{PgSiteDirectory, SiteDirectory, StaticSiteDirectory};
use inventory_ledger::repository::{InMemoryRepository, LedgerRepository, PgLedgerRepository};
use inventory_ledger::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "ledger_server=debug,inventory_ledger=debug,tower_http=debug,sqlx=warn".into()
    });
    match config.log.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!("Starting Inventory Ledger Server");
    tracing::info!("Environment: {}", config.environment);

    // Sites and ledger state live in Postgres when a database is configured
    let (db, sites, repository): (
        Option<sqlx::PgPool>,
        Arc<dyn SiteDirectory>,
        Arc<dyn LedgerRepository>,
    ) = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&database.url)
                .await?;
            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Migrations completed");
            }

            let directory: Arc<dyn SiteDirectory> = Arc::new(PgSiteDirectory::new(pool.clone()));
            let repository: Arc<dyn LedgerRepository> =
                Arc::new(PgLedgerRepository::new(pool.clone()));
            (Some(pool), directory, repository)
        }
        None => {
            let directory = StaticSiteDirectory::from_entries(&config.sites);
            tracing::info!(sites = directory.len(), "Using static site directory");
            let directory: Arc<dyn SiteDirectory> = Arc::new(directory);
            tracing::warn!("No database configured; ledger state will not survive a restart");
            let repository: Arc<dyn LedgerRepository> = Arc::new(InMemoryRepository);
            (None, directory, repository)
        }
    };

    let ledger = repository.load().await?;

    // Create application state
    let state = AppState {
        ledger: ledger.shared(),
        sites,
        repository,
        db,
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
