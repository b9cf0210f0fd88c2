use image::{imageops, RgbImage};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::contour::external_contours;
use super::mask::{Mask, HAND_BANDS, PROHIBITED_BANDS, SWORD_BANDS};
use super::state::{majority, CursorState};
use super::template::TemplateSet;
use crate::common::{CaptureRegion, FramePoint};
use crate::config::{ClassifierConfig, ProhibitedSignConfig};
use crate::perception::frame_source::FrameSource;

/// Which stage of the classifier produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierTier {
    /// The sampled square fell entirely outside the frame.
    Empty,
    Template,
    Color,
}

/// Detailed result of one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorReading {
    pub state: CursorState,
    pub tier: ClassifierTier,
    pub sword_pixels: usize,
    pub hand_pixels: usize,
    pub prohibited_sign: bool,
    pub template: Option<(CursorState, f32)>,
}

impl CursorReading {
    fn empty() -> Self {
        Self {
            state: CursorState::None,
            tier: ClassifierTier::Empty,
            sword_pixels: 0,
            hand_pixels: 0,
            prohibited_sign: false,
            template: None,
        }
    }
}

/// The three denoised color masks of a region.
#[derive(Debug, Clone)]
pub struct CursorMasks {
    pub prohibited: Mask,
    pub sword: Mask,
    pub hand: Mask,
}

impl CursorMasks {
    pub fn from_region(region: &RgbImage) -> Self {
        Self {
            prohibited: Mask::from_bands(region, &PROHIBITED_BANDS).denoise(3),
            sword: Mask::from_bands(region, &SWORD_BANDS).denoise(2),
            hand: Mask::from_bands(region, &HAND_BANDS).denoise(2),
        }
    }
}

/// Maps the pixels around a point to a [`CursorState`].
///
/// Template matching runs first when templates are loaded; the color tier is the
/// fallback and never needs external assets.
#[derive(Debug, Clone)]
pub struct CursorClassifier {
    config: ClassifierConfig,
    templates: Arc<TemplateSet>,
}

impl CursorClassifier {
    pub fn new(config: ClassifierConfig, templates: Arc<TemplateSet>) -> Self {
        Self { config, templates }
    }

    pub fn color_only(config: ClassifierConfig) -> Self {
        Self::new(config, Arc::new(TemplateSet::empty()))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Square of side `2 * radius` centered on the point, clipped to the image.
    pub fn region_of(image: &RgbImage, x: i32, y: i32, radius: u32) -> Option<RgbImage> {
        let (width, height) = image.dimensions();
        let radius = radius as i64;
        let (x, y) = (x as i64, y as i64);
        let x0 = (x - radius).max(0);
        let y0 = (y - radius).max(0);
        let x1 = (x + radius).min(width as i64);
        let y1 = (y + radius).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(
            imageops::crop_imm(
                image,
                x0 as u32,
                y0 as u32,
                (x1 - x0) as u32,
                (y1 - y0) as u32,
            )
            .to_image(),
        )
    }

    pub fn classify(&self, image: &RgbImage, x: i32, y: i32, radius: u32) -> CursorState {
        self.analyze(image, x, y, radius).state
    }

    pub fn analyze(&self, image: &RgbImage, x: i32, y: i32, radius: u32) -> CursorReading {
        match Self::region_of(image, x, y, radius) {
            Some(region) => {
                let masks = CursorMasks::from_region(&region);
                self.analyze_region(&region, &masks)
            }
            None => CursorReading::empty(),
        }
    }

    pub fn analyze_region(&self, region: &RgbImage, masks: &CursorMasks) -> CursorReading {
        let template = if self.templates.is_empty() {
            None
        } else {
            let gray = imageops::grayscale(region);
            self.templates.best_match(&gray)
        };

        let sword_pixels = masks.sword.count();
        let hand_pixels = masks.hand.count();
        let prohibited_sign = self.has_prohibited_sign(&masks.prohibited);

        if let Some((state, score)) = template {
            if score > self.config.template_threshold {
                return CursorReading {
                    state,
                    tier: ClassifierTier::Template,
                    sword_pixels,
                    hand_pixels,
                    prohibited_sign,
                    template,
                };
            }
        }

        let state = if prohibited_sign {
            CursorState::Prohibited
        } else {
            self.decide(sword_pixels, hand_pixels)
        };
        CursorReading {
            state,
            tier: ClassifierTier::Color,
            sword_pixels,
            hand_pixels,
            prohibited_sign,
            template,
        }
    }

    /// Sword/hand arbitration on denoised pixel counts.
    pub fn decide(&self, sword: usize, hand: usize) -> CursorState {
        let sword_seen = sword > self.config.sword_threshold as usize;
        let hand_seen = hand > self.config.hand_threshold as usize;
        match (sword_seen, hand_seen) {
            (true, true) => {
                if sword as f64 > self.config.sword_hand_ratio * hand as f64 {
                    CursorState::RedSword
                } else {
                    CursorState::Hand
                }
            }
            (true, false) => CursorState::RedSword,
            (false, true) => CursorState::Hand,
            (false, false) => CursorState::None,
        }
    }

    pub fn has_prohibited_sign(&self, mask: &Mask) -> bool {
        let criteria: &ProhibitedSignConfig = &self.config.prohibited;
        external_contours(mask).iter().any(|contour| {
            let area = contour.area();
            if area <= criteria.min_area {
                return false;
            }
            let bbox = contour.bounding_box();
            let aspect = bbox.aspect_ratio();
            contour.circularity() > criteria.min_circularity
                && aspect >= criteria.min_aspect
                && aspect <= criteria.max_aspect
                && bbox.width > criteria.min_side
                && bbox.height > criteria.min_side
        })
    }

    /// Majority over `samples` fresh captures, with the winning share as confidence.
    pub async fn classify_with_confidence(
        &self,
        source: &dyn FrameSource,
        region: &CaptureRegion,
        point: FramePoint,
        radius: u32,
        samples: usize,
        pause: Duration,
    ) -> (CursorState, f32) {
        let samples = samples.max(1);
        let mut states = Vec::with_capacity(samples);
        for i in 0..samples {
            let state = match source.grab(region) {
                Ok(frame) => self.classify(frame.image(), point.x, point.y, radius),
                Err(e) => {
                    debug!("Cursor sample capture failed: {}", e);
                    CursorState::None
                }
            };
            states.push(state);
            if i + 1 < samples {
                tokio::time::sleep(pause).await;
            }
        }
        let (state, count) = majority(&states);
        (state, count as f32 / samples as f32)
    }

    /// Grid-samples the whole image and keeps every non-NONE reading.
    pub fn scan_frame(
        &self,
        image: &RgbImage,
        step: u32,
        radius: u32,
    ) -> Vec<(FramePoint, CursorReading)> {
        let step = step.max(1) as usize;
        let (width, height) = image.dimensions();
        let mut hits = Vec::new();
        for y in (0..height).step_by(step) {
            for x in (0..width).step_by(step) {
                let reading = self.analyze(image, x as i32, y as i32, radius);
                if reading.state != CursorState::None {
                    hits.push((FramePoint::new(x as i32, y as i32), reading));
                }
            }
        }
        hits
    }
}
