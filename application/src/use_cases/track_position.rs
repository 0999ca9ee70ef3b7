//! Post-execution position tracker
//!
//! Planner-free and deterministic: a spawned task applies the domain exit
//! rules to every price tick and reports exit events over a channel. The
//! orchestrator owns the session; the tracker never touches it.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tradegate_domain::{ExecutablePlan, TrackedPosition, TrackingEvent};

const EVENT_BUFFER: usize = 16;

pub struct PositionTracker;

impl PositionTracker {
    /// Start tracking `plan` against `prices`.
    ///
    /// The task ends when the position closes, the feed ends (emitting
    /// `feed_lost` if still open) or `token` is cancelled.
    pub fn spawn(
        plan: &ExecutablePlan,
        mut prices: mpsc::Receiver<f64>,
        token: CancellationToken,
    ) -> TrackerHandle {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let mut position = TrackedPosition::from_plan(plan);
        let instrument = plan.instrument().to_string();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            info!(instrument = %instrument, quantity = position.open_quantity(), "Tracking position");
            loop {
                let tick = tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        debug!(instrument = %instrument, "Tracker cancelled");
                        break;
                    }
                    tick = prices.recv() => tick,
                };

                let Some(price) = tick else {
                    if let Some(event) = position.on_feed_lost() {
                        warn!(instrument = %instrument, "Price feed ended with position open");
                        if let Err(mpsc::error::SendError(event)) = tx.send(event).await {
                            warn!(
                                instrument = %instrument,
                                event = event.name(),
                                "Event receiver gone; exit event dropped"
                            );
                        }
                    }
                    break;
                };

                for event in position.on_price(price) {
                    info!(instrument = %instrument, event = event.name(), pnl = event.pnl(), "Exit rule fired");
                    if let Err(mpsc::error::SendError(event)) = tx.send(event).await {
                        warn!(
                            instrument = %instrument,
                            event = event.name(),
                            "Event receiver gone; exit event dropped"
                        );
                        return position;
                    }
                }
                if !position.is_open() {
                    break;
                }
            }
            position
        });

        TrackerHandle {
            events,
            task,
            token,
        }
    }
}

/// Handle to a running tracker task.
pub struct TrackerHandle {
    events: mpsc::Receiver<TrackingEvent>,
    task: JoinHandle<TrackedPosition>,
    token: CancellationToken,
}

impl TrackerHandle {
    /// Next exit event; `None` once the task has finished.
    pub async fn next_event(&mut self) -> Option<TrackingEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the task and return the final position state.
    ///
    /// Unread events are discarded so a task blocked on a full channel
    /// can finish.
    pub async fn join(self) -> Result<TrackedPosition, tokio::task::JoinError> {
        let TrackerHandle { events, task, .. } = self;
        drop(events);
        task.await
    }
}
