use image::{imageops, RgbImage};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::common::{CaptureRegion, Frame};
use crate::error::AppError;

/// Synchronous source of bitmaps for a fixed capture region.
pub trait FrameSource: Send + Sync {
    fn grab(&self, region: &CaptureRegion) -> Result<Frame, AppError>;
    fn name(&self) -> &'static str;
}

/// Crops `image` to `region` when it is a larger screenshot, clipping at the edges.
fn fit_to_region(image: &Arc<RgbImage>, region: &CaptureRegion) -> Arc<RgbImage> {
    let (width, height) = image.dimensions();
    if width <= region.width && height <= region.height {
        return image.clone();
    }
    let fits_at_origin = region.left >= 0
        && region.top >= 0
        && region.left as i64 + region.width as i64 <= width as i64
        && region.top as i64 + region.height as i64 <= height as i64;
    let (x, y) = if fits_at_origin {
        (region.left as u32, region.top as u32)
    } else {
        (0, 0)
    };
    let w = region.width.min(width - x);
    let h = region.height.min(height - y);
    Arc::new(imageops::crop_imm(&**image, x, y, w, h).to_image())
}

/// Hands out the same bitmap on every grab until it is replaced.
pub struct StaticFrameSource {
    image: Mutex<Arc<RgbImage>>,
}

impl StaticFrameSource {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Mutex::new(Arc::new(image)),
        }
    }

    pub fn replace(&self, image: RgbImage) {
        match self.image.lock() {
            Ok(mut current) => *current = Arc::new(image),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(image),
        }
    }
}

impl FrameSource for StaticFrameSource {
    fn grab(&self, region: &CaptureRegion) -> Result<Frame, AppError> {
        let image = self
            .image
            .lock()
            .map_err(|_| AppError::Capture("Frame lock poisoned".to_string()))?
            .clone();
        Ok(Frame::from_shared(fit_to_region(&image, region)))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Replays a fixed list of frames in order, wrapping around at the end.
pub struct ImageSequenceSource {
    frames: Vec<Arc<RgbImage>>,
    cursor: AtomicUsize,
}

impl ImageSequenceSource {
    pub fn new(frames: Vec<RgbImage>) -> Result<Self, AppError> {
        if frames.is_empty() {
            return Err(AppError::Setup("Image sequence is empty".to_string()));
        }
        Ok(Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Loads every PNG or JPEG in `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, AppError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match image::open(path) {
                Ok(img) => frames.push(img.to_rgb8()),
                Err(e) => warn!("Skipping frame {}: {}", path.display(), e),
            }
        }
        info!("Loaded {} frames from {}", frames.len(), dir.display());
        Self::new(frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn grab(&self, region: &CaptureRegion) -> Result<Frame, AppError> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        Ok(Frame::from_shared(fit_to_region(&self.frames[index], region)))
    }

    fn name(&self) -> &'static str {
        "image-sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn static_source_crops_screenshots_to_region() {
        let mut screen = RgbImage::from_pixel(300, 200, Rgb([0, 0, 0]));
        screen.put_pixel(110, 60, Rgb([255, 0, 0]));
        let source = StaticFrameSource::new(screen);

        let frame = source
            .grab(&CaptureRegion::new(100, 50, 100, 80))
            .expect("grab");
        assert_eq!(frame.dimensions(), (100, 80));
        assert_eq!(*frame.image().get_pixel(10, 10), Rgb([255, 0, 0]));
    }

    #[test]
    fn static_source_passes_region_sized_frames_through() {
        let source = StaticFrameSource::new(RgbImage::new(64, 48));
        let frame = source.grab(&CaptureRegion::new(500, 500, 64, 48)).expect("grab");
        assert_eq!(frame.dimensions(), (64, 48));

        source.replace(RgbImage::new(32, 32));
        let frame = source.grab(&CaptureRegion::new(500, 500, 64, 48)).expect("grab");
        assert_eq!(frame.dimensions(), (32, 32));
    }

    #[test]
    fn sequence_replays_in_name_order_and_wraps() {
        let dir = tempfile::tempdir().expect("tempdir");
        RgbImage::from_pixel(8, 8, Rgb([2, 2, 2]))
            .save(dir.path().join("b.png"))
            .expect("write");
        RgbImage::from_pixel(8, 8, Rgb([1, 1, 1]))
            .save(dir.path().join("a.png"))
            .expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let source = ImageSequenceSource::from_dir(dir.path()).expect("load");
        assert_eq!(source.len(), 2);

        let region = CaptureRegion::new(0, 0, 8, 8);
        let shades: Vec<u8> = (0..3)
            .map(|_| source.grab(&region).expect("grab").image().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![1, 2, 1]);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            ImageSequenceSource::from_dir(dir.path()),
            Err(AppError::Setup(_))
        ));
    }
}
