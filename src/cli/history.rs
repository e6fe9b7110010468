use std::sync::Arc;

use tabled::Table;

use crate::{
    info,
    management::{CatalogManager, HistoryManager},
    types::HistoryTableRow,
    warning,
};

/// Prints all recorded plays, newest first.
pub async fn history() {
    let catalog = Arc::new(CatalogManager::new());
    let manager = HistoryManager::new(catalog);

    match manager.load().await {
        Ok(mut plays) => {
            if plays.is_empty() {
                info!("No plays recorded yet.");
                return;
            }
            plays.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));

            let rows: Vec<HistoryTableRow> = plays
                .into_iter()
                .map(|p| HistoryTableRow {
                    finished: p.finished_at.format("%Y-%m-%d %H:%M").to_string(),
                    track: p.track_name,
                    artists: p
                        .artists
                        .iter()
                        .map(|a| a.name.clone())
                        .collect::<Vec<_>>()
                        .join(", "),
                    device: p.device_name.unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let table = Table::new(rows);
            println!("{}", table);
        }
        Err(e) => warning!("Failed to load history. Err: {}", e),
    }
}
