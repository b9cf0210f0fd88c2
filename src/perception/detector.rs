use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::common::{Detection, Frame};
use crate::error::AppError;

/// Object detector seam. Output order is whatever the model produced; callers
/// must not assume it is sorted by score.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, AppError>;
    fn name(&self) -> &'static str;
}

/// Returns queued detection batches one per call, then empty batches once exhausted.
#[derive(Default)]
pub struct ScriptedDetector {
    batches: Mutex<VecDeque<Vec<Detection>>>,
}

impl ScriptedDetector {
    pub fn new(batches: Vec<Vec<Detection>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }

    /// Reads a JSON array of batches, each an array of detections.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let batches: Vec<Vec<Detection>> = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} scripted detection batches from {}",
            batches.len(),
            path.display()
        );
        Ok(Self::new(batches))
    }

    pub fn push(&self, batch: Vec<Detection>) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(batch);
        }
    }

    pub fn remaining(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, AppError> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| AppError::Detector("Detection script lock poisoned".to_string()))?;
        Ok(batches.pop_front().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
