use chrono::Utc;
use image::RgbImage;
use std::path::{Path, PathBuf};

use super::classifier::CursorMasks;
use super::state::CursorState;
use crate::error::AppError;

/// Writes each sampled region and its masks as PNGs for offline inspection.
#[derive(Debug, Clone)]
pub struct CursorDebugDump {
    dir: PathBuf,
}

impl CursorDebugDump {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the region image.
    pub fn write(
        &self,
        region: &RgbImage,
        masks: &CursorMasks,
        state: CursorState,
    ) -> Result<PathBuf, AppError> {
        let stem = format!("{}_{}", state.as_str(), Utc::now().timestamp_millis());
        let roi = self.dir.join(format!("{stem}_roi.png"));
        region.save(&roi)?;
        masks
            .prohibited
            .as_image()
            .save(self.dir.join(format!("{stem}_prohibited.png")))?;
        masks
            .sword
            .as_image()
            .save(self.dir.join(format!("{stem}_sword.png")))?;
        masks
            .hand
            .as_image()
            .save(self.dir.join(format!("{stem}_hand.png")))?;
        Ok(roi)
    }
}
