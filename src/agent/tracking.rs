use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::common::ScreenPoint;
use crate::input::{smooth_move, InputInjector};

const TRACK_STEPS: u32 = 3;
const TRACK_STEP_DELAY: Duration = Duration::from_millis(1);

struct TrackingSession {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps the pointer on the live target from a separate task.
///
/// The main loop is the only writer of the target position and publishes it through
/// a watch channel. The task only ever sees snapshots; `None` means the target is
/// gone and makes the task exit on its next tick.
pub struct PointerTracker {
    injector: Arc<dyn InputInjector>,
    interval: Duration,
    position: watch::Sender<Option<ScreenPoint>>,
    parent: CancellationToken,
    session: Option<TrackingSession>,
}

impl PointerTracker {
    pub fn new(
        injector: Arc<dyn InputInjector>,
        interval: Duration,
        parent: CancellationToken,
    ) -> Self {
        let (position, _) = watch::channel(None);
        Self {
            injector,
            interval,
            position,
            parent,
            session: None,
        }
    }

    /// Publishes the latest target position to a running session.
    pub fn publish(&self, point: ScreenPoint) {
        self.position.send_replace(Some(point));
    }

    /// Withdraws the target without stopping the task; it exits by itself.
    pub fn clear_target(&self) {
        self.position.send_replace(None);
    }

    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| !s.handle.is_finished())
    }

    /// Starts a session on `point` unless one is already running, in which case the
    /// position is just refreshed.
    pub fn start(&mut self, point: ScreenPoint) {
        self.publish(point);
        if self.is_active() {
            return;
        }

        let cancel = self.parent.child_token();
        let handle = tokio::spawn(Self::track(
            self.injector.clone(),
            self.interval,
            self.position.subscribe(),
            cancel.clone(),
        ));
        self.session = Some(TrackingSession { cancel, handle });
        debug!("Pointer tracking started");
    }

    /// Stops the session and waits for the task to finish before clearing the target.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            if let Err(e) = session.handle.await {
                warn!("Pointer tracking task ended abnormally: {}", e);
            }
            debug!("Pointer tracking stopped");
        }
        self.clear_target();
    }

    async fn track(
        injector: Arc<dyn InputInjector>,
        interval: Duration,
        mut position: watch::Receiver<Option<ScreenPoint>>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = *position.borrow_and_update();
            let Some(point) = snapshot else {
                debug!("Target cleared, pointer tracking exits");
                break;
            };
            let step = smooth_move(injector.as_ref(), point, TRACK_STEPS, TRACK_STEP_DELAY);
            if let Err(e) = step.await {
                warn!("Pointer tracking move failed: {}", e);
            }
        }
    }
}

impl Drop for PointerTracker {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}
