use std::time::Duration;
use tokio::time::Instant;

use crate::common::{Detection, FramePoint};

/// The detection currently committed to for engagement.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub class_name: String,
    pub cx: i32,
    pub cy: i32,
    pub attack_count: u32,
    pub last_attack_time: Instant,
    /// Set while the class is absent from detections.
    pub missing_since: Option<Instant>,
}

impl Target {
    /// Commits a detection. The last attack is backdated by `post_click_delay` so the
    /// first attack is not held back.
    pub fn commit(detection: &Detection, now: Instant, post_click_delay: Duration) -> Self {
        Self {
            class_name: detection.class_name.clone(),
            cx: detection.cx,
            cy: detection.cy,
            attack_count: 0,
            last_attack_time: now.checked_sub(post_click_delay).unwrap_or(now),
            missing_since: None,
        }
    }

    pub fn position(&self) -> FramePoint {
        FramePoint::new(self.cx, self.cy)
    }

    pub fn move_to(&mut self, point: FramePoint) {
        self.cx = point.x;
        self.cy = point.y;
    }

    pub fn since_last_attack(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_attack_time)
    }

    pub fn register_attack(&mut self, now: Instant) {
        self.last_attack_time = now;
        self.attack_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn committed_target_is_immediately_ready() {
        tokio::time::advance(Duration::from_secs(10)).await;
        let now = Instant::now();
        let delay = Duration::from_millis(1100);
        let target = Target::commit(&Detection::new("rat", 100, 100, 0.9), now, delay);

        assert_eq!(target.attack_count, 0);
        assert_eq!(target.position(), FramePoint::new(100, 100));
        assert!(target.since_last_attack(now) >= delay);
    }

    #[tokio::test(start_paused = true)]
    async fn attacks_update_count_and_time() {
        let now = Instant::now();
        let mut target = Target::commit(&Detection::new("rat", 1, 2, 0.5), now, Duration::ZERO);
        tokio::time::advance(Duration::from_millis(300)).await;
        let later = Instant::now();
        target.register_attack(later);
        assert_eq!(target.attack_count, 1);
        assert_eq!(target.since_last_attack(later), Duration::ZERO);
    }
}
