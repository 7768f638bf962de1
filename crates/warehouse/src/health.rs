//! Warehouse health checks and schema bootstrap.

use crate::client::Warehouse;
use pipeline_core::{Error, Result};
use tracing::{debug, error};

/// Check warehouse connection health.
pub async fn check_connection(warehouse: &Warehouse) -> bool {
    match warehouse.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("Warehouse connection healthy");
            true
        }
        Err(e) => {
            error!("Warehouse health check failed: {}", e);
            false
        }
    }
}

/// Initialize database schema (idempotent).
pub async fn init_schema(warehouse: &Warehouse) -> Result<()> {
    use crate::schema::all_tables;

    for ddl in all_tables() {
        warehouse
            .inner()
            .query(ddl)
            .execute()
            .await
            .map_err(|e| Error::warehouse(format!("Failed to execute DDL: {}", e)))?;
    }

    debug!("Warehouse schema initialized");
    Ok(())
}
