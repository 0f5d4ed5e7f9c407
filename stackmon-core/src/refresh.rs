//! The refresh loop: periodic snapshot builds published to a
//! renderer-agnostic sink.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::backend::StackBackend;
use crate::context::MonitorConfig;
use crate::model::TableModel;
use crate::snapshot::SnapshotBuilder;

/// Where finished snapshots go. Renderers implement this; the loop
/// knows nothing about how a model is drawn.
pub trait ModelSink: Send {
    fn publish(&mut self, model: TableModel);
}

/// Control messages into the refresh loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshSignal {
    /// Rebuild now, without waiting for the next tick.
    Refresh,
    Shutdown,
}

/// Run until shutdown. At most one build is ever in flight; ticks and
/// manual refreshes that arrive during a build are coalesced into the
/// next cycle rather than queued. The first build happens immediately.
pub async fn run_refresh_loop(
    config: Arc<MonitorConfig>,
    backend: Arc<dyn StackBackend>,
    mut sink: Box<dyn ModelSink>,
    mut control_rx: mpsc::Receiver<RefreshSignal>,
) {
    let epoch = Instant::now();
    let mut builder = SnapshotBuilder::new();
    let mut ticker = interval(Duration::from_secs_f64(config.refresh_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = control_rx.recv() => match signal {
                Some(RefreshSignal::Refresh) => {}
                Some(RefreshSignal::Shutdown) | None => return,
            },
        }

        let now = epoch.elapsed().as_secs_f64();
        let model = builder.build(&config, backend.as_ref(), now).await;
        sink.publish(model);

        // Signals that arrived during the build collapse into one
        // pass; an extra Refresh must not queue a second build.
        loop {
            match control_rx.try_recv() {
                Ok(RefreshSignal::Refresh) => continue,
                Ok(RefreshSignal::Shutdown) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    return;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
            }
        }
    }
}
