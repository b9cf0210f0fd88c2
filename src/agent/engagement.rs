use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::target::Target;
use super::tracking::PointerTracker;
use super::zone_memory::ZoneMemory;
use crate::common::CaptureRegion;
use crate::config::TimingConfig;
use crate::input::{smooth_move, InputInjector, MouseButton};
use crate::perception::cursor::{majority, CursorProbe, CursorState};

const APPROACH_STEPS: u32 = 5;
const APPROACH_STEP_DELAY: Duration = Duration::from_millis(2);

/// Why an engagement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Looted,
    Prohibited,
    /// Target coordinates fell outside the capture region.
    InvalidPosition,
    /// Target class stayed absent past the grace period.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Viable,
    NotViable(ReleaseReason),
}

impl AttackOutcome {
    pub fn is_viable(&self) -> bool {
        matches!(self, AttackOutcome::Viable)
    }
}

/// Engagement lifecycle of the committed target.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EngagementState {
    #[default]
    Idle,
    /// Just committed, tracking started, no attack yet.
    Acquired(Target),
    Engaging(Target),
}

impl EngagementState {
    pub fn name(&self) -> &'static str {
        match self {
            EngagementState::Idle => "IDLE",
            EngagementState::Acquired(_) => "ACQUIRED",
            EngagementState::Engaging(_) => "ENGAGING",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, EngagementState::Idle)
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            EngagementState::Idle => None,
            EngagementState::Acquired(t) | EngagementState::Engaging(t) => Some(t),
        }
    }

    pub fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            EngagementState::Idle => None,
            EngagementState::Acquired(t) | EngagementState::Engaging(t) => Some(t),
        }
    }

    /// IDLE -> ACQUIRED. Any other state is returned unchanged; the previous
    /// engagement has to be released first.
    pub fn acquire(self, target: Target) -> Self {
        match self {
            EngagementState::Idle => EngagementState::Acquired(target),
            other => other,
        }
    }

    /// ACQUIRED -> ENGAGING. ENGAGING and IDLE are unchanged.
    pub fn engage(self) -> Self {
        match self {
            EngagementState::Acquired(t) => EngagementState::Engaging(t),
            other => other,
        }
    }

    /// Back to IDLE, handing out the released target.
    pub fn release(self) -> (Self, Option<Target>) {
        match self {
            EngagementState::Idle => (EngagementState::Idle, None),
            EngagementState::Acquired(t) | EngagementState::Engaging(t) => {
                (EngagementState::Idle, Some(t))
            }
        }
    }
}

/// Runs the attack protocol against a committed target and owns its tracking session.
pub struct EngagementController {
    injector: Arc<dyn InputInjector>,
    probe: Arc<dyn CursorProbe>,
    tracker: PointerTracker,
    region: CaptureRegion,
    timing: TimingConfig,
    samples: usize,
}

impl EngagementController {
    pub fn new(
        injector: Arc<dyn InputInjector>,
        probe: Arc<dyn CursorProbe>,
        tracker: PointerTracker,
        region: CaptureRegion,
        timing: TimingConfig,
        samples: usize,
    ) -> Self {
        Self {
            injector,
            probe,
            tracker,
            region,
            timing,
            samples: samples.max(1),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_active()
    }

    /// Starts tracking the target, or refreshes the tracked position.
    pub fn track(&mut self, target: &Target) {
        let point = target.position();
        if self.region.contains(point) {
            self.tracker.start(self.region.to_screen(point));
        }
    }

    pub async fn stop_tracking(&mut self) {
        self.tracker.stop().await;
    }

    /// One engage step: approach, majority-vote the cursor, then click, loot or abandon.
    pub async fn attack_target(
        &mut self,
        target: &mut Target,
        zones: &mut ZoneMemory,
    ) -> AttackOutcome {
        let point = target.position();
        if !self.region.contains(point) {
            warn!(
                "Invalid target coordinates ({}, {}) outside {}x{} capture region",
                point.x, point.y, self.region.width, self.region.height
            );
            return AttackOutcome::NotViable(ReleaseReason::InvalidPosition);
        }

        let screen = self.region.to_screen(point);
        self.tracker.start(screen);
        let approach = smooth_move(
            self.injector.as_ref(),
            screen,
            APPROACH_STEPS,
            APPROACH_STEP_DELAY,
        );
        if let Err(e) = approach.await {
            warn!("Failed to move onto target: {}", e);
        }

        let mut samples = Vec::with_capacity(self.samples);
        for _ in 0..self.samples {
            samples.push(self.probe.sample(point).await);
            tokio::time::sleep(self.timing.sample_pause()).await;
        }
        let (state, votes) = majority(&samples);
        debug!(
            "Cursor state at ({}, {}): {} ({}/{} samples)",
            point.x,
            point.y,
            state,
            votes,
            samples.len()
        );

        match state {
            CursorState::Prohibited => self.abandon(target, zones).await,
            CursorState::Hand => self.loot(target, zones).await,
            CursorState::RedSword => {
                self.strike(target).await;
                AttackOutcome::Viable
            }
            CursorState::None => {
                self.strike(target).await;
                let recheck = self.probe.sample(point).await;
                debug!("Cursor state after attack: {}", recheck);
                match recheck {
                    CursorState::Hand => self.loot(target, zones).await,
                    CursorState::Prohibited => self.abandon(target, zones).await,
                    // unknown reads keep the target
                    CursorState::RedSword | CursorState::None => AttackOutcome::Viable,
                }
            }
        }
    }

    fn click(&self) {
        if let Err(e) = self.injector.click(MouseButton::Left) {
            warn!("Click failed: {}", e);
        }
    }

    async fn strike(&self, target: &mut Target) {
        self.click();
        target.register_attack(Instant::now());
        debug!("Attacked {} ({} hits)", target.class_name, target.attack_count);
        tokio::time::sleep(self.timing.attack_settle()).await;
    }

    async fn loot(&mut self, target: &Target, zones: &mut ZoneMemory) -> AttackOutcome {
        self.click();
        tokio::time::sleep(self.timing.loot_settle()).await;
        zones.record_dead(target.position());
        info!(
            "Looted {} at ({}, {}) after {} hits",
            target.class_name, target.cx, target.cy, target.attack_count
        );
        self.tracker.stop().await;
        AttackOutcome::NotViable(ReleaseReason::Looted)
    }

    async fn abandon(&mut self, target: &Target, zones: &mut ZoneMemory) -> AttackOutcome {
        zones.record_prohibited(target.position());
        info!(
            "Target {} at ({}, {}) is prohibited",
            target.class_name, target.cx, target.cy
        );
        self.tracker.stop().await;
        AttackOutcome::NotViable(ReleaseReason::Prohibited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::zone_memory::ZoneKind;
    use crate::common::{Detection, FramePoint};
    use crate::config::ZoneConfig;
    use crate::input::{InputEvent, RecordingInjector};
    use crate::perception::cursor::ScriptedProbe;
    use tokio_util::sync::CancellationToken;

    struct Rig {
        injector: Arc<RecordingInjector>,
        probe: Arc<ScriptedProbe>,
        controller: EngagementController,
        zones: ZoneMemory,
    }

    fn rig(states: Vec<CursorState>) -> Rig {
        let injector = Arc::new(RecordingInjector::new());
        let probe = Arc::new(ScriptedProbe::new(states));
        let timing = TimingConfig::default();
        let tracker = PointerTracker::new(
            injector.clone(),
            timing.cursor_update_interval(),
            CancellationToken::new(),
        );
        let controller = EngagementController::new(
            injector.clone(),
            probe.clone(),
            tracker,
            CaptureRegion::new(50, 20, 200, 200),
            timing,
            3,
        );
        Rig {
            injector,
            probe,
            controller,
            zones: ZoneMemory::new(&ZoneConfig::default()),
        }
    }

    fn rat_at(x: i32, y: i32) -> Target {
        Target::commit(
            &Detection::new("rat", x, y, 0.9),
            Instant::now(),
            Duration::from_millis(1100),
        )
    }

    #[test]
    fn state_transitions() {
        let target = rat_at(1, 1);
        let state = EngagementState::Idle.acquire(target.clone());
        assert_eq!(state.name(), "ACQUIRED");
        let state = state.engage();
        assert_eq!(state, EngagementState::Engaging(target.clone()));
        // a second acquire does not replace a live engagement
        let state = state.acquire(rat_at(9, 9));
        assert_eq!(state.target(), Some(&target));
        let (state, released) = state.release();
        assert!(state.is_idle());
        assert_eq!(released, Some(target));
        assert_eq!(EngagementState::Idle.engage(), EngagementState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_position_has_no_side_effects() {
        let mut rig = rig(vec![CursorState::RedSword; 3]);
        let mut target = rat_at(200, 10);

        let outcome = rig.controller.attack_target(&mut target, &mut rig.zones).await;
        assert_eq!(outcome, AttackOutcome::NotViable(ReleaseReason::InvalidPosition));
        assert_eq!(rig.probe.sample_count(), 0);
        assert!(rig.injector.events().is_empty());
        assert!(rig.zones.is_empty());
        assert!(!rig.controller.is_tracking());
        assert_eq!(target.attack_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sword_majority_attacks_once() {
        let mut rig = rig(vec![CursorState::RedSword, CursorState::None, CursorState::RedSword]);
        let mut target = rat_at(100, 100);

        let outcome = rig.controller.attack_target(&mut target, &mut rig.zones).await;
        assert!(outcome.is_viable());
        assert_eq!(rig.injector.clicks(MouseButton::Left), 1);
        assert_eq!(target.attack_count, 1);
        assert_eq!(rig.probe.sample_count(), 3);
        assert!(rig.controller.is_tracking());
        // approach lands on the offset screen position
        assert!(rig
            .injector
            .events()
            .contains(&InputEvent::MoveAbs(crate::common::ScreenPoint::new(150, 120))));
        rig.controller.stop_tracking().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hand_majority_loots_and_marks_dead_zone() {
        let mut rig = rig(vec![CursorState::Hand, CursorState::RedSword, CursorState::Hand]);
        let mut target = rat_at(100, 100);

        let outcome = rig.controller.attack_target(&mut target, &mut rig.zones).await;
        assert_eq!(outcome, AttackOutcome::NotViable(ReleaseReason::Looted));
        assert_eq!(rig.injector.clicks(MouseButton::Left), 1);
        assert_eq!(rig.zones.len(ZoneKind::Dead), 1);
        assert!(rig.zones.is_excluded(FramePoint::new(102, 101)));
        assert!(!rig.controller.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn prohibited_majority_abandons_without_clicking() {
        let mut rig = rig(vec![CursorState::Prohibited; 3]);
        let mut target = rat_at(100, 100);

        let outcome = rig.controller.attack_target(&mut target, &mut rig.zones).await;
        assert_eq!(outcome, AttackOutcome::NotViable(ReleaseReason::Prohibited));
        assert_eq!(rig.injector.clicks(MouseButton::Left), 0);
        assert_eq!(rig.zones.len(ZoneKind::Prohibited), 1);
        assert!(!rig.controller.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_majority_clicks_then_follows_recheck() {
        let mut rig = rig(vec![
            CursorState::None,
            CursorState::None,
            CursorState::RedSword,
            CursorState::Hand,
        ]);
        let mut target = rat_at(100, 100);

        let outcome = rig.controller.attack_target(&mut target, &mut rig.zones).await;
        assert_eq!(outcome, AttackOutcome::NotViable(ReleaseReason::Looted));
        // speculative attack plus loot pickup
        assert_eq!(rig.injector.clicks(MouseButton::Left), 2);
        assert_eq!(target.attack_count, 1);
        assert_eq!(rig.probe.sample_count(), 4);
        assert_eq!(rig.zones.len(ZoneKind::Dead), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_recheck_stays_optimistic() {
        let mut rig = rig(vec![CursorState::None; 4]);
        let mut target = rat_at(100, 100);

        let outcome = rig.controller.attack_target(&mut target, &mut rig.zones).await;
        assert!(outcome.is_viable());
        assert_eq!(target.attack_count, 1);
        assert!(rig.zones.is_empty());
        rig.controller.stop_tracking().await;
    }
}
