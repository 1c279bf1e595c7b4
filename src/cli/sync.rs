use super::ui;
use crate::core::{BackgroundSynchronizer, SyncReport};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

impl SyncReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Fetched"),
            ui::header_cell("Cached"),
            ui::header_cell("Stored"),
            ui::header_cell("Failed"),
        ]);
        table.add_row(vec![
            ui::count_cell(self.fetched, false),
            ui::count_cell(self.cached, false),
            ui::count_cell(self.stored, false),
            ui::count_cell(self.failed, true),
        ]);

        format!(
            "{}\n\n{table}",
            ui::style_text("Rate sync", ui::StyleType::Title)
        )
    }
}

/// Runs a single sync cycle behind a spinner and prints the report.
pub async fn run_once(synchronizer: &BackgroundSynchronizer) -> Result<()> {
    let spinner = ui::new_spinner("Fetching latest rates...");
    let result = synchronizer.sync_once().await;
    spinner.finish_and_clear();

    let report = result.context("Rate sync failed")?;
    println!("{}", report.display_as_table());
    Ok(())
}

/// Syncs on `interval` until Ctrl-C, then stops the loop.
pub async fn watch(synchronizer: &Arc<BackgroundSynchronizer>, interval: Duration) -> Result<()> {
    let handle = synchronizer.start(interval);
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Syncing every {} minute(s), press Ctrl-C to stop",
                interval.as_secs() / 60
            ),
            ui::StyleType::Subtle
        )
    );

    let signal = tokio::signal::ctrl_c().await;
    info!("Stopping background sync");
    handle.shutdown().await;
    signal.context("Failed to listen for Ctrl-C")
}
