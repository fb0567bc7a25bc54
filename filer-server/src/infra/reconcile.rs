//! The only writer of the catalog.
//!
//! Periodic reconciliation and single-file updates share one task so the
//! snapshot is never patched by two writers at once. All filesystem work
//! runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use filer_core::{Catalog, PathTranslator, ReloadSummary, UpdateOutcome};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Bound of the queue between `POST /api/v1/update` and the writer.
pub const UPDATE_QUEUE_CAPACITY: usize = 1024;

pub async fn run_reconcile_loop(
    catalog: Arc<Catalog>,
    translator: PathTranslator,
    every: Duration,
    mut updates: mpsc::Receiver<String>,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately; startup already loaded the catalog
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let catalog = Arc::clone(&catalog);
                if let Err(err) = tokio::task::spawn_blocking(move || reload_if_modified(&catalog)).await {
                    warn!(error = %err, "reload task panicked");
                }
            }
            update = updates.recv() => {
                let Some(raw) = update else {
                    break;
                };
                let catalog = Arc::clone(&catalog);
                let translator = translator.clone();
                if let Err(err) = tokio::task::spawn_blocking(move || apply_raw_update(&catalog, &translator, &raw)).await {
                    warn!(error = %err, "update task panicked");
                }
            }
        }
    }

    info!("reconcile loop stopped");
}

/// Runs a full reload only when an index file was added, removed or
/// touched.
pub fn reload_if_modified(catalog: &Catalog) -> Option<ReloadSummary> {
    if !catalog.is_modified() {
        return None;
    }
    let summary = catalog.reload();
    info!(
        sources = summary.sources,
        parsed = summary.parsed,
        reused = summary.reused,
        failed = summary.failed,
        records = summary.records,
        "catalog reloaded"
    );
    Some(summary)
}

/// Translates an update notification and applies it. Failures stay here.
pub fn apply_raw_update(
    catalog: &Catalog,
    translator: &PathTranslator,
    raw: &str,
) -> Option<UpdateOutcome> {
    let Some(path) = translator.resolve(raw) else {
        info!(
            path = raw,
            base = %translator.base_dir().display(),
            "update outside base directory ignored"
        );
        return None;
    };

    match catalog.apply_update(&path) {
        Ok(outcome) => {
            if matches!(outcome, UpdateOutcome::Unchanged) {
                debug!(path = %path.display(), "update: file unchanged");
            }
            Some(outcome)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "update dropped");
            None
        }
    }
}
