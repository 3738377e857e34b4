use anyhow::{Context, Result};
use log::{info, warn};
use std::env;

use receipt_ingredients::confirmation::{project_analysis, reconcile};
use receipt_ingredients::inventory::{InventoryStore, MemoryInventory};
use receipt_ingredients::ocr::ImageHandle;
use receipt_ingredients::pipeline::ReceiptPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting receipt ingredient extraction");

    let image = match env::args().nth(1) {
        Some(path) => ImageHandle::from_path(path),
        None => ImageHandle::detached(),
    };

    let pipeline = ReceiptPipeline::from_env().context("Invalid OCR configuration")?;

    let analysis = pipeline
        .analyze_cancellable(&image, async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler available: never cancel
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Receipt analysis failed")?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);

    if analysis.is_empty() {
        warn!("No ingredients detected; nothing to store");
        return Ok(());
    }

    let confirmed = reconcile(&project_analysis(&analysis), &[])?;
    let mut inventory = MemoryInventory::new();
    let stored = inventory.store(&confirmed)?;

    info!("Stored {} confirmed ingredients", stored);
    for entry in inventory.entries() {
        println!("{:>6} {:<6} {}", entry.quantity, entry.unit.as_str(), entry.name);
    }

    Ok(())
}
