use fulfillment_pipeline::{config, db};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("Starting database migration");
    let pool = db::establish_connection_from_app_config(&cfg).await?;

    db::run_migrations(&pool).await.map_err(|e| {
        error!("Migration failed: {}", e);
        e
    })?;

    info!("Migration completed successfully");
    Ok(())
}
