use tokio::time::Instant;
use tracing::debug;

use super::target::Target;
use super::zone_memory::ZoneMemory;
use crate::common::{CaptureRegion, Detection};

/// Result of matching the committed target against a new set of detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebind {
    /// No detection of the target's class.
    Missing,
    /// Nearest match is within the jitter threshold; position kept.
    Held,
    /// Target position moved to the nearest match.
    Moved,
}

pub struct TargetSelector {
    classes: Vec<String>,
    region: CaptureRegion,
    rebind_threshold_sq: i64,
}

impl TargetSelector {
    pub fn new(classes: Vec<String>, region: CaptureRegion, rebind_threshold_sq: i64) -> Self {
        Self {
            classes,
            region,
            rebind_threshold_sq,
        }
    }

    pub fn is_allowed(&self, class_name: &str) -> bool {
        self.classes.iter().any(|c| c == class_name)
    }

    /// First allowed detection, in detector order, inside the capture region and
    /// outside every live zone.
    pub fn select<'a>(
        &self,
        detections: &'a [Detection],
        zones: &mut ZoneMemory,
        now: Instant,
    ) -> Option<&'a Detection> {
        detections.iter().find(|d| {
            self.is_allowed(&d.class_name)
                && self.region.contains(d.center())
                && !zones.is_excluded_at(d.center(), now)
        })
    }

    /// Same-class detection closest to the target's last known position.
    pub fn nearest<'a>(
        &self,
        target: &Target,
        detections: &'a [Detection],
    ) -> Option<&'a Detection> {
        let position = target.position();
        detections
            .iter()
            .filter(|d| d.class_name == target.class_name)
            .min_by_key(|d| d.center().distance_sq(position))
    }

    /// Follows the target to its nearest match, ignoring displacement up to the threshold.
    /// Tracks how long the class has been absent.
    pub fn rebind(&self, target: &mut Target, detections: &[Detection], now: Instant) -> Rebind {
        let Some(nearest) = self.nearest(target, detections) else {
            target.missing_since.get_or_insert(now);
            return Rebind::Missing;
        };
        target.missing_since = None;

        let old = target.position();
        if nearest.center().distance_sq(old) > self.rebind_threshold_sq {
            debug!(
                "Target moved: ({},{}) -> ({},{})",
                old.x, old.y, nearest.cx, nearest.cy
            );
            target.move_to(nearest.center());
            Rebind::Moved
        } else {
            Rebind::Held
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::zone_memory::ZoneKind;
    use crate::common::FramePoint;
    use crate::config::ZoneConfig;
    use std::time::Duration;

    fn selector() -> TargetSelector {
        TargetSelector::new(
            vec!["rat".to_string(), "wolf".to_string()],
            CaptureRegion::new(0, 0, 640, 480),
            25,
        )
    }

    fn target_at(x: i32, y: i32) -> Target {
        Target::commit(&Detection::new("rat", x, y, 0.9), Instant::now(), Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn selection_keeps_detector_order() {
        let mut zones = ZoneMemory::new(&ZoneConfig::default());
        let detections = vec![
            Detection::new("tree", 10, 10, 0.99),
            Detection::new("wolf", 400, 300, 0.2),
            Detection::new("rat", 100, 100, 0.95),
        ];
        let picked = selector().select(&detections, &mut zones, Instant::now());
        assert_eq!(picked.map(|d| d.class_name.as_str()), Some("wolf"));
    }

    #[tokio::test(start_paused = true)]
    async fn selection_skips_excluded_positions() {
        let now = Instant::now();
        let mut zones = ZoneMemory::new(&ZoneConfig::default());
        zones.record(ZoneKind::Dead, FramePoint::new(100, 100), now);
        let detections = vec![
            Detection::new("rat", 102, 101, 0.9),
            Detection::new("rat", 300, 100, 0.4),
        ];
        let picked = selector().select(&detections, &mut zones, now).expect("pick");
        assert_eq!(picked.cx, 300);

        let only_excluded = vec![Detection::new("rat", 102, 101, 0.9)];
        assert!(selector().select(&only_excluded, &mut zones, now).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn selection_skips_detections_outside_the_region() {
        let mut zones = ZoneMemory::new(&ZoneConfig::default());
        let detections = vec![
            Detection::new("rat", 700, 100, 0.9),
            Detection::new("rat", -5, 100, 0.9),
            Detection::new("rat", 639, 479, 0.3),
        ];
        let picked = selector().select(&detections, &mut zones, Instant::now());
        assert_eq!(picked.map(|d| (d.cx, d.cy)), Some((639, 479)));

        let outside = vec![Detection::new("rat", 640, 100, 0.9)];
        assert!(selector().select(&outside, &mut zones, Instant::now()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn small_displacement_is_ignored() {
        let mut target = target_at(100, 100);
        let detections = vec![Detection::new("rat", 103, 104, 0.9)];
        assert_eq!(
            selector().rebind(&mut target, &detections, Instant::now()),
            Rebind::Held
        );
        assert_eq!(target.position(), FramePoint::new(100, 100));
    }

    #[tokio::test(start_paused = true)]
    async fn larger_displacement_is_applied_exactly() {
        let mut target = target_at(100, 100);
        let detections = vec![Detection::new("rat", 103, 105, 0.9)];
        assert_eq!(
            selector().rebind(&mut target, &detections, Instant::now()),
            Rebind::Moved
        );
        assert_eq!(target.position(), FramePoint::new(103, 105));
    }

    #[tokio::test(start_paused = true)]
    async fn rebind_uses_nearest_same_class() {
        let mut target = target_at(100, 100);
        let detections = vec![
            Detection::new("wolf", 101, 101, 0.9),
            Detection::new("rat", 200, 200, 0.9),
            Detection::new("rat", 120, 90, 0.1),
        ];
        selector().rebind(&mut target, &detections, Instant::now());
        assert_eq!(target.position(), FramePoint::new(120, 90));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_class_starts_absence_clock_once() {
        let mut target = target_at(100, 100);
        let first = Instant::now();
        let detections = vec![Detection::new("wolf", 100, 100, 0.9)];
        assert_eq!(selector().rebind(&mut target, &detections, first), Rebind::Missing);
        tokio::time::advance(Duration::from_millis(500)).await;
        selector().rebind(&mut target, &detections, Instant::now());
        assert_eq!(target.missing_since, Some(first));

        let back = vec![Detection::new("rat", 100, 100, 0.9)];
        selector().rebind(&mut target, &back, Instant::now());
        assert_eq!(target.missing_since, None);
    }
}
