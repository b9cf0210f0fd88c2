use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::common::FramePoint;
use crate::config::ZoneConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Looted remains.
    Dead,
    /// Forbidden or unreachable.
    Prohibited,
}

#[derive(Debug, Clone, Copy)]
struct ZoneRecord {
    x: i32,
    y: i32,
    recorded_at: Instant,
}

/// Recently resolved locations, excluded from selection until they expire.
///
/// Expired records are only dropped when a lookup happens. Repeated records at the
/// same spot are kept separately and expire independently.
#[derive(Debug, Clone)]
pub struct ZoneMemory {
    dead: Vec<ZoneRecord>,
    prohibited: Vec<ZoneRecord>,
    dead_timeout: Duration,
    prohibited_timeout: Duration,
    tolerance_x: i32,
    tolerance_y: i32,
}

impl ZoneMemory {
    pub fn new(config: &ZoneConfig) -> Self {
        Self {
            dead: Vec::new(),
            prohibited: Vec::new(),
            dead_timeout: config.dead_timeout(),
            prohibited_timeout: config.prohibited_timeout(),
            tolerance_x: config.tolerance_x,
            tolerance_y: config.tolerance_y,
        }
    }

    pub fn record(&mut self, kind: ZoneKind, point: FramePoint, now: Instant) {
        let record = ZoneRecord {
            x: point.x,
            y: point.y,
            recorded_at: now,
        };
        debug!("Recording {:?} zone at ({}, {})", kind, point.x, point.y);
        match kind {
            ZoneKind::Dead => self.dead.push(record),
            ZoneKind::Prohibited => self.prohibited.push(record),
        }
    }

    pub fn record_dead(&mut self, point: FramePoint) {
        self.record(ZoneKind::Dead, point, Instant::now());
    }

    pub fn record_prohibited(&mut self, point: FramePoint) {
        self.record(ZoneKind::Prohibited, point, Instant::now());
    }

    pub fn is_excluded(&mut self, point: FramePoint) -> bool {
        self.is_excluded_at(point, Instant::now())
    }

    /// Purges expired records of both kinds, then tests the point against the rest.
    pub fn is_excluded_at(&mut self, point: FramePoint, now: Instant) -> bool {
        let dead_timeout = self.dead_timeout;
        let prohibited_timeout = self.prohibited_timeout;
        self.dead
            .retain(|r| now.saturating_duration_since(r.recorded_at) < dead_timeout);
        self.prohibited
            .retain(|r| now.saturating_duration_since(r.recorded_at) < prohibited_timeout);

        let (tx, ty) = (self.tolerance_x, self.tolerance_y);
        self.dead
            .iter()
            .chain(self.prohibited.iter())
            .any(|r| (point.x - r.x).abs() < tx && (point.y - r.y).abs() < ty)
    }

    /// Number of stored records, expired ones included until the next lookup.
    pub fn len(&self, kind: ZoneKind) -> usize {
        match kind {
            ZoneKind::Dead => self.dead.len(),
            ZoneKind::Prohibited => self.prohibited.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dead.is_empty() && self.prohibited.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> ZoneMemory {
        ZoneMemory::new(&ZoneConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn tolerance_is_a_strict_rectangle() {
        let now = Instant::now();
        let mut zones = memory();
        zones.record(ZoneKind::Dead, FramePoint::new(100, 100), now);

        assert!(zones.is_excluded_at(FramePoint::new(102, 101), now));
        assert!(zones.is_excluded_at(FramePoint::new(149, 129), now));
        assert!(zones.is_excluded_at(FramePoint::new(51, 71), now));
        assert!(!zones.is_excluded_at(FramePoint::new(150, 100), now));
        assert!(!zones.is_excluded_at(FramePoint::new(100, 130), now));
        assert!(!zones.is_excluded_at(FramePoint::new(100, 70), now));
    }

    #[tokio::test(start_paused = true)]
    async fn dead_zones_expire_after_timeout() {
        let start = Instant::now();
        let mut zones = memory();
        zones.record(ZoneKind::Dead, FramePoint::new(10, 10), start);

        let p = FramePoint::new(10, 10);
        assert!(zones.is_excluded_at(p, start + Duration::from_millis(4999)));
        assert!(!zones.is_excluded_at(p, start + Duration::from_secs(5)));
        assert_eq!(zones.len(ZoneKind::Dead), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn prohibited_zones_use_their_own_window() {
        let start = Instant::now();
        let mut zones = memory();
        zones.record(ZoneKind::Prohibited, FramePoint::new(10, 10), start);
        zones.record(ZoneKind::Dead, FramePoint::new(300, 300), start);

        let p = FramePoint::new(10, 10);
        assert!(zones.is_excluded_at(p, start + Duration::from_secs(6)));
        assert_eq!(zones.len(ZoneKind::Dead), 0);
        assert!(zones.is_excluded_at(p, start + Duration::from_millis(8999)));
        assert!(!zones.is_excluded_at(p, start + Duration::from_secs(9)));
        assert!(zones.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typed_recorders_use_the_current_clock() {
        let mut zones = memory();
        zones.record_dead(FramePoint::new(100, 100));
        zones.record_prohibited(FramePoint::new(400, 300));
        zones.record_dead(FramePoint::new(100, 100));
        assert_eq!(zones.len(ZoneKind::Dead), 2);
        assert_eq!(zones.len(ZoneKind::Prohibited), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!zones.is_excluded(FramePoint::new(100, 100)));
        assert!(zones.is_excluded(FramePoint::new(420, 310)));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!zones.is_excluded(FramePoint::new(420, 310)));
        assert!(zones.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_happens_only_on_lookup() {
        let start = Instant::now();
        let mut zones = memory();
        zones.record(ZoneKind::Dead, FramePoint::new(0, 0), start);
        zones.record(ZoneKind::Dead, FramePoint::new(0, 0), start + Duration::from_secs(3));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(zones.len(ZoneKind::Dead), 2);

        assert!(zones.is_excluded_at(FramePoint::new(0, 0), start + Duration::from_secs(6)));
        assert_eq!(zones.len(ZoneKind::Dead), 1);
    }
}
