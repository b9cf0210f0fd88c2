use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::template_matching::{match_template_with_mask, MatchTemplateMethod};
use std::path::Path;
use tracing::{info, warn};

use super::state::CursorState;
use crate::error::AppError;

/// Grayscale reference glyph with an optional opacity mask taken from its alpha channel.
#[derive(Debug, Clone)]
pub struct Template {
    gray: GrayImage,
    mask: Option<GrayImage>,
}

impl Template {
    pub fn new(gray: GrayImage, mask: Option<GrayImage>) -> Self {
        Self { gray, mask }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let gray = image.to_luma8();
        let mask = image.color().has_alpha().then(|| {
            let rgba = image.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                image::Luma([rgba.get_pixel(x, y)[3]])
            })
        });
        Self { gray, mask }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }

    /// Shrinks the template, keeping its aspect ratio, until it fits inside `width` x `height`.
    fn fitted(&self, width: u32, height: u32) -> Option<Template> {
        let (tw, th) = self.gray.dimensions();
        if tw == 0 || th == 0 || width == 0 || height == 0 {
            return None;
        }
        if tw <= width && th <= height {
            return Some(self.clone());
        }
        let scale = (width as f64 / tw as f64).min(height as f64 / th as f64);
        let nw = ((tw as f64 * scale).floor() as u32).clamp(1, width);
        let nh = ((th as f64 * scale).floor() as u32).clamp(1, height);
        Some(Template {
            gray: imageops::resize(&self.gray, nw, nh, FilterType::Triangle),
            mask: self
                .mask
                .as_ref()
                .map(|m| imageops::resize(m, nw, nh, FilterType::Nearest)),
        })
    }

    /// Best zero-mean normalized cross-correlation over every placement inside `region`,
    /// counting only opaque template pixels.
    pub fn best_score(&self, region: &GrayImage) -> f32 {
        let (rw, rh) = region.dimensions();
        let Some(template) = self.fitted(rw, rh) else {
            return 0.0;
        };
        let (tw, th) = template.gray.dimensions();

        // 0/1 weights, so every masked sum below is a plain sum over opaque pixels
        let weights = GrayImage::from_fn(tw, th, |x, y| {
            let opaque = template
                .mask
                .as_ref()
                .map_or(true, |m| m.get_pixel(x, y)[0] > 0);
            Luma([u8::from(opaque)])
        });
        let opaque: Vec<f64> = template
            .gray
            .pixels()
            .zip(weights.pixels())
            .filter(|(_, w)| w[0] > 0)
            .map(|(p, _)| p[0] as f64)
            .collect();
        if opaque.is_empty() {
            return 0.0;
        }

        let n = opaque.len() as f64;
        let t_mean = opaque.iter().sum::<f64>() / n;
        let t_var: f64 = opaque.iter().map(|t| (t - t_mean).powi(2)).sum();
        if t_var <= f64::EPSILON {
            return 0.0;
        }

        let cross = match_template_with_mask(
            region,
            &template.gray,
            MatchTemplateMethod::CrossCorrelation,
            &weights,
        );
        let sums = match_template_with_mask(
            region,
            &GrayImage::from_pixel(tw, th, Luma([1])),
            MatchTemplateMethod::CrossCorrelation,
            &weights,
        );
        let squares = match_template_with_mask(
            region,
            &GrayImage::new(tw, th),
            MatchTemplateMethod::SumOfSquaredErrors,
            &weights,
        );

        let mut best = 0.0f64;
        for ((c, s), q) in cross.pixels().zip(sums.pixels()).zip(squares.pixels()) {
            let (c, s, q) = (c[0] as f64, s[0] as f64, q[0] as f64);
            let r_var = q - s * s / n;
            // flat windows carry no signal
            if r_var <= 1e-6 * q.max(1.0) {
                continue;
            }
            best = best.max((c - t_mean * s) / (r_var * t_var).sqrt());
        }
        best.min(1.0) as f32
    }
}

/// Reference glyphs keyed by cursor state, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<(CursorState, Template)>,
}

impl TemplateSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, state: CursorState, template: Template) -> Self {
        self.templates.retain(|(s, _)| *s != state);
        self.templates.push((state, template));
        self
    }

    /// Loads `red_sword.png`, `hand.png` and `prohibited.png` from `dir`.
    /// A missing directory or file only disables that label.
    pub fn load(dir: &Path) -> Self {
        let mut set = Self::empty();
        if !dir.is_dir() {
            warn!(
                "Template directory {} not found, using color classification only",
                dir.display()
            );
            return set;
        }

        for state in CursorState::GLYPHS {
            let Some(stem) = state.template_stem() else {
                continue;
            };
            let path = dir.join(format!("{stem}.png"));
            if !path.is_file() {
                warn!("Template {} missing", path.display());
                continue;
            }
            match Self::decode(&path) {
                Ok(template) => set = set.with_template(state, template),
                Err(e) => warn!("{}", e),
            }
        }
        info!("Loaded {} cursor templates", set.len());
        set
    }

    fn decode(path: &Path) -> Result<Template, AppError> {
        let image = image::open(path).map_err(|e| AppError::Image(e, path.to_path_buf()))?;
        Ok(Template::from_image(&image))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, state: CursorState) -> Option<&Template> {
        self.templates
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, t)| t)
    }

    /// Highest scoring label for the region, in glyph order on ties.
    pub fn best_match(&self, region: &GrayImage) -> Option<(CursorState, f32)> {
        let mut best: Option<(CursorState, f32)> = None;
        for (state, template) in &self.templates {
            let score = template.best_score(region);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((*state, score));
            }
        }
        best
    }
}
