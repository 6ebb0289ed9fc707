//! Run-now-then-every-N-minutes timer around the pipeline.
//!
//! Runs are awaited inline on this task, so two runs can never overlap.
//! A tick that comes due while a run is still in flight is skipped, not
//! queued; the operator picks an interval longer than a typical run.

use std::sync::Arc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::info;

use crate::pipeline::Pipeline;

pub async fn run(pipeline: Arc<Pipeline>, interval_minutes: u64) {
    // Run immediately on startup
    info!("scheduler starting — initial run");
    pipeline.run_once().await;

    // Then run every `interval_minutes`
    let mut interval = time::interval(Duration::from_secs(interval_minutes * 60));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // Skip the immediate tick (we already ran)

    loop {
        interval.tick().await;
        info!("scheduled run starting");
        pipeline.run_once().await;
    }
}
