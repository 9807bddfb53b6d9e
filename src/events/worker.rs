use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::handlers::action::{ActionEngine, ActionEvent, ActionStore};

/// Runs events one at a time so turns never interleave.
pub async fn run_event_worker(mut rx: mpsc::Receiver<ActionEvent>, engine: Arc<ActionEngine>) {
    while let Some(event) = rx.recv().await {
        engine.handle_event(event).await;
    }
    info!("event bus closed, worker exiting");
}

/// Periodically drops settled actions and expired confirmations.
pub async fn run_confirmation_sweeper(store: Arc<Mutex<ActionStore>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let mut store = store.lock().await;
        let before = store.len();
        store.prune(Utc::now());
        let dropped = before - store.len();
        if dropped > 0 {
            debug!(dropped, "pruned pending confirmations");
        }
    }
}
