// src/main.rs
use dotenvy::dotenv;
use tracing::info;

use budget_tracker::{backend, config::Config, database, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init();

    let config = Config::load()?;

    info!("Connecting to {}", config.database_url);
    let pool =
        database::db::connection::get_db_pool(&config.database_url, config.db_max_connections).await?;

    backend::prepare_database(&pool, &config).await?;

    info!("Starting backend server...");
    backend::run_server(pool, config).await
}
