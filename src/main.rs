use std::sync::Arc;

use anyhow::Context;
use katari_forms::app::{build, get_db_pool, run_migrations};
use katari_forms::config::get_configuration;
use katari_forms::store::PostgresStore;
use katari_forms::telemetry::setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing("katari-forms", "info", std::io::stdout);

    let config = get_configuration().context("Failed to read configuration.")?;
    let db_pool = get_db_pool(&config.database);
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations.")?;

    let server = build(&config, Arc::new(PostgresStore::new(db_pool)))?;
    tracing::info!(address = %server.local_addr(), "Accepting submissions");
    server.await?;
    Ok(())
}
