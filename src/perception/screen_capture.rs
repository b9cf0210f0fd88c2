use image::{imageops, DynamicImage, RgbaImage};
use xcap::Monitor;

use super::frame_source::FrameSource;
use crate::common::{CaptureRegion, Frame};
use crate::error::AppError;

/// Captures the capture region from the first monitor.
pub struct ScreenCaptureSource;

impl ScreenCaptureSource {
    pub fn new() -> Result<Self, AppError> {
        let monitors = Monitor::all()
            .map_err(|e| AppError::Setup(format!("Failed to list monitors: {e}")))?;
        if monitors.is_empty() {
            return Err(AppError::Setup("No monitors found".to_string()));
        }
        Ok(Self)
    }
}

impl FrameSource for ScreenCaptureSource {
    fn grab(&self, region: &CaptureRegion) -> Result<Frame, AppError> {
        let monitors =
            Monitor::all().map_err(|e| AppError::Capture(format!("Failed to list monitors: {e}")))?;
        let monitor = monitors
            .first()
            .ok_or_else(|| AppError::Capture("No monitors found".to_string()))?;
        let shot = monitor
            .capture_image()
            .map_err(|e| AppError::Capture(format!("Screen capture failed: {e}")))?;

        let (width, height) = (shot.width(), shot.height());
        let screen = RgbaImage::from_raw(width, height, shot.into_raw())
            .ok_or_else(|| AppError::Capture("Screen buffer has unexpected size".to_string()))?;

        let left = region.left.max(0) as u32;
        let top = region.top.max(0) as u32;
        if left >= width || top >= height {
            return Err(AppError::Capture(format!(
                "Capture region {region:?} lies outside the {width}x{height} screen"
            )));
        }
        let crop = imageops::crop_imm(
            &screen,
            left,
            top,
            region.width.min(width - left),
            region.height.min(height - top),
        )
        .to_image();
        Ok(Frame::captured(DynamicImage::ImageRgba8(crop).to_rgb8()))
    }

    fn name(&self) -> &'static str {
        "screen"
    }
}
