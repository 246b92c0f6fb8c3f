use anyhow::Result;
use armory_database::init_databases;

init_databases!(
    default: [
        armory_runtime::Character,
        armory_runtime::MagicItem
    ]
);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    armory_service_api::setup_tracing();

    let db = connect(true, true).await?;
    db.close().await;

    tracing::info!("Database reset successfully");
    Ok(())
}
