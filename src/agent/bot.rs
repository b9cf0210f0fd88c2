use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::engagement::{AttackOutcome, EngagementController, EngagementState, ReleaseReason};
use super::explorer::Explorer;
use super::selector::{Rebind, TargetSelector};
use super::target::Target;
use super::tracking::PointerTracker;
use super::zone_memory::ZoneMemory;
use crate::common::{CaptureRegion, Detection};
use crate::config::{Settings, TimingConfig};
use crate::input::InputInjector;
use crate::perception::cursor::CursorProbe;
use crate::perception::obstacle::Heading;
use crate::perception::{Detector, FrameSource};

/// What one iteration of the control loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    CaptureFailed,
    /// Waiting out the post-click delay.
    Cooldown,
    Engaged,
    /// Target class absent, still inside the grace period.
    Held,
    /// Target released this cycle and nothing new to select.
    Released(ReleaseReason),
    Acquired,
    /// Idle but still inside the reacquire window.
    Searching,
    Explored(Heading),
}

/// Collaborators the control loop drives.
pub struct BotParts {
    pub source: Arc<dyn FrameSource>,
    pub detector: Arc<dyn Detector>,
    pub injector: Arc<dyn InputInjector>,
    pub probe: Arc<dyn CursorProbe>,
}

/// The main control loop: one frame per iteration through capture, detection,
/// selection and engagement, exploring when there is nothing to engage.
pub struct BotLoop {
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn Detector>,
    selector: TargetSelector,
    zones: ZoneMemory,
    controller: EngagementController,
    explorer: Explorer,
    state: EngagementState,
    region: CaptureRegion,
    timing: TimingConfig,
    absent_grace: Duration,
    last_release: Option<Instant>,
}

impl BotLoop {
    pub fn new(settings: &Settings, parts: BotParts, cancel: &CancellationToken) -> Self {
        let region = settings.capture;
        let tracker = PointerTracker::new(
            parts.injector.clone(),
            settings.timing.cursor_update_interval(),
            cancel.child_token(),
        );
        let controller = EngagementController::new(
            parts.injector.clone(),
            parts.probe,
            tracker,
            region,
            settings.timing.clone(),
            settings.targeting.cursor_samples,
        );
        let explorer = Explorer::new(
            parts.injector,
            parts.source.clone(),
            region,
            settings.exploration.clone(),
        );

        Self {
            source: parts.source,
            detector: parts.detector,
            selector: TargetSelector::new(
                settings.classes.clone(),
                region,
                settings.targeting.rebind_threshold_sq,
            ),
            zones: ZoneMemory::new(&settings.zones),
            controller,
            explorer,
            state: EngagementState::Idle,
            region,
            timing: settings.timing.clone(),
            absent_grace: settings.absent_grace(),
            last_release: None,
        }
    }

    pub fn state(&self) -> &EngagementState {
        &self.state
    }

    pub fn target(&self) -> Option<&Target> {
        self.state.target()
    }

    pub fn zones(&mut self) -> &mut ZoneMemory {
        &mut self.zones
    }

    pub fn is_tracking(&self) -> bool {
        self.controller.is_tracking()
    }

    /// Runs until `cancel` fires, then tears down the tracking session.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Bot loop started with {} on {:?}",
            self.detector.name(),
            self.region
        );
        while !cancel.is_cancelled() {
            let tick = self.step().await;
            debug!("Tick: {:?} [{}]", tick, self.state.name());
        }
        self.shutdown().await;
        info!("Bot loop stopped");
    }

    /// Stops tracking and drops the current target.
    pub async fn shutdown(&mut self) {
        self.controller.stop_tracking().await;
        self.state = EngagementState::Idle;
    }

    pub async fn step(&mut self) -> Tick {
        let frame = match self.source.grab(&self.region) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                tokio::time::sleep(self.timing.idle_poll()).await;
                return Tick::CaptureFailed;
            }
        };
        let detections = match self.detector.detect(&frame).await {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Detector {} failed: {}", self.detector.name(), e);
                Vec::new()
            }
        };

        let released = if self.state.target().is_some() {
            match self.pursue(&detections).await {
                Ok(tick) => return tick,
                Err(reason) => Some(reason),
            }
        } else {
            None
        };
        self.acquire(&detections, released).await
    }

    /// Advances the committed target. Returns the release reason when the engagement ended.
    async fn pursue(&mut self, detections: &[Detection]) -> Result<Tick, ReleaseReason> {
        let now = Instant::now();
        let Some(target) = self.state.target_mut() else {
            return Ok(Tick::Searching);
        };

        if target.since_last_attack(now) < self.timing.post_click_delay() {
            tokio::time::sleep(self.timing.idle_poll()).await;
            return Ok(Tick::Cooldown);
        }

        match self.selector.rebind(target, detections, now) {
            Rebind::Missing => {
                let absent = target
                    .missing_since
                    .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
                if absent < self.absent_grace {
                    tokio::time::sleep(self.timing.absent_poll()).await;
                    return Ok(Tick::Held);
                }
                info!(
                    "Lost {} after {:.1}s out of sight",
                    target.class_name,
                    absent.as_secs_f64()
                );
                self.release().await;
                Err(ReleaseReason::Lost)
            }
            rebind => {
                if rebind == Rebind::Moved {
                    self.controller.track(target);
                }
                self.state = std::mem::take(&mut self.state).engage();
                let Some(target) = self.state.target_mut() else {
                    return Ok(Tick::Searching);
                };
                match self.controller.attack_target(target, &mut self.zones).await {
                    AttackOutcome::Viable => {
                        tokio::time::sleep(self.timing.click_interval()).await;
                        Ok(Tick::Engaged)
                    }
                    AttackOutcome::NotViable(reason) => {
                        self.release().await;
                        Err(reason)
                    }
                }
            }
        }
    }

    async fn acquire(&mut self, detections: &[Detection], released: Option<ReleaseReason>) -> Tick {
        let now = Instant::now();
        if let Some(detection) = self.selector.select(detections, &mut self.zones, now) {
            let target = Target::commit(detection, now, self.timing.post_click_delay());
            info!(
                "New target: {} at ({}, {}) score {:.2}",
                target.class_name, target.cx, target.cy, detection.score
            );
            self.controller.track(&target);
            self.state = std::mem::take(&mut self.state).acquire(target);
            return Tick::Acquired;
        }

        if let Some(reason) = released {
            tokio::time::sleep(self.timing.idle_poll()).await;
            return Tick::Released(reason);
        }

        let recently_released = self
            .last_release
            .map_or(false, |t| now.saturating_duration_since(t) < self.timing.reacquire_window());
        if recently_released {
            tokio::time::sleep(self.timing.idle_poll()).await;
            return Tick::Searching;
        }

        match self.explorer.explore().await {
            Ok(heading) => Tick::Explored(heading),
            Err(e) => {
                warn!("Exploration failed: {}", e);
                tokio::time::sleep(self.timing.idle_poll()).await;
                Tick::Searching
            }
        }
    }

    /// Tracking is stopped before the target is dropped.
    async fn release(&mut self) {
        self.controller.stop_tracking().await;
        let (state, target) = std::mem::take(&mut self.state).release();
        self.state = state;
        if let Some(target) = target {
            debug!("Released {} after {} hits", target.class_name, target.attack_count);
        }
        self.last_release = Some(Instant::now());
    }
}
