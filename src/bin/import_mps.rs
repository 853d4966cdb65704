//! Script to bulk import MPs from a JSON file.
//!
//! Usage: `import_mps <file.json>`
//!
//! The file holds an array of objects with `title`, `name`, `party`,
//! `constituency`, `address` and `postcode`. Each entry goes through the same
//! cleaning as the new-MP screen; invalid entries are reported and skipped.

use anyhow::{Context, Result};
use std::fs;

use foi_tracker::config::Config;
use foi_tracker::db::Database;
use foi_tracker::db_storage::MpStorage;
use foi_tracker::forms::{MpForm, ScreenForm};
use foi_tracker::models::MpFields;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .context("Usage: import_mps <file.json>")?;

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let entries: Vec<MpForm> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of MP objects", path))?;

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url, config.db_max_connections).await?;
    db.ensure_schema().await?;
    let storage = MpStorage::new(db.pool.clone());

    let total = entries.len();
    tracing::info!("Importing {} MPs from {}", total, path);

    let mut success_count = 0;
    let mut fail_count = 0;

    for (idx, entry) in entries.iter().enumerate() {
        let label = entry.name.as_deref().unwrap_or("<unnamed>");

        let fields = match entry.clean(MpFields::default()) {
            Ok(fields) => fields,
            Err(errors) => {
                tracing::warn!(
                    "[{}/{}] {} rejected: {:?}",
                    idx + 1,
                    total,
                    label,
                    errors
                );
                fail_count += 1;
                continue;
            }
        };

        match storage.create_mp(&fields).await {
            Ok(mp) => {
                tracing::info!("[{}/{}] Imported {} ({})", idx + 1, total, label, mp.id);
                success_count += 1;
            }
            Err(e) => {
                tracing::error!("[{}/{}] Failed to store {}: {}", idx + 1, total, label, e);
                fail_count += 1;
            }
        }
    }

    tracing::info!(
        "Import complete: {} imported, {} failed (of {})",
        success_count,
        fail_count,
        total
    );

    Ok(())
}
