use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::classifier::{CursorClassifier, CursorMasks};
use super::debug::CursorDebugDump;
use super::state::CursorState;
use crate::common::{CaptureRegion, FramePoint};
use crate::perception::frame_source::FrameSource;

/// Reads the cursor glyph at a frame position. Never fails; problems read as NONE.
#[async_trait]
pub trait CursorProbe: Send + Sync {
    async fn sample(&self, point: FramePoint) -> CursorState;
}

/// Captures a fresh frame per sample and classifies the area around the point.
pub struct FrameProbe {
    source: Arc<dyn FrameSource>,
    region: CaptureRegion,
    classifier: Arc<CursorClassifier>,
    radius: u32,
    dump: Option<CursorDebugDump>,
}

impl FrameProbe {
    pub fn new(
        source: Arc<dyn FrameSource>,
        region: CaptureRegion,
        classifier: Arc<CursorClassifier>,
    ) -> Self {
        let radius = classifier.config().sample_radius;
        Self {
            source,
            region,
            classifier,
            radius,
            dump: None,
        }
    }

    pub fn with_debug_dump(mut self, dump: CursorDebugDump) -> Self {
        self.dump = Some(dump);
        self
    }

    fn sample_with_dump(
        &self,
        dump: &CursorDebugDump,
        image: &image::RgbImage,
        point: FramePoint,
    ) -> CursorState {
        let Some(region) = CursorClassifier::region_of(image, point.x, point.y, self.radius) else {
            return CursorState::None;
        };
        let masks = CursorMasks::from_region(&region);
        let reading = self.classifier.analyze_region(&region, &masks);
        if let Err(e) = dump.write(&region, &masks, reading.state) {
            warn!("Failed to write cursor debug dump: {}", e);
        }
        reading.state
    }
}

#[async_trait]
impl CursorProbe for FrameProbe {
    async fn sample(&self, point: FramePoint) -> CursorState {
        let frame = match self.source.grab(&self.region) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Cursor sample capture failed: {}", e);
                return CursorState::None;
            }
        };

        let state = match &self.dump {
            Some(dump) => self.sample_with_dump(dump, frame.image(), point),
            None => self
                .classifier
                .classify(frame.image(), point.x, point.y, self.radius),
        };
        debug!("Cursor at ({}, {}) reads {}", point.x, point.y, state);
        state
    }
}

/// Answers samples from a queue, reading NONE once it runs dry.
#[derive(Default)]
pub struct ScriptedProbe {
    states: Mutex<VecDeque<CursorState>>,
    samples: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(states: Vec<CursorState>) -> Self {
        Self {
            states: Mutex::new(states.into()),
            samples: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, states: impl IntoIterator<Item = CursorState>) {
        if let Ok(mut queue) = self.states.lock() {
            queue.extend(states);
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CursorProbe for ScriptedProbe {
    async fn sample(&self, _point: FramePoint) -> CursorState {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.states
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(CursorState::None)
    }
}
