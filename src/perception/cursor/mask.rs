//! Binary pixel masks built from hue/saturation/value bands.
use image::{GrayImage, Luma, RgbImage};
use imageproc::morphology::{grayscale_close, grayscale_open, Mask as Kernel};

/// Hue in `0..=180`, saturation and value in `0..=255` (the usual 8-bit HSV layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (rf, gf, bf) = (r as f32, g as f32, b as f32);
        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let delta = max - min;

        let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

        let mut h = if delta == 0.0 {
            0.0
        } else if max == rf {
            60.0 * (gf - bf) / delta
        } else if max == gf {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        if h < 0.0 {
            h += 360.0;
        }

        Self {
            h: (h / 2.0).round().min(180.0) as u8,
            s: s.round() as u8,
            v: max as u8,
        }
    }
}

/// Inclusive HSV range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvBand {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower[0]..=self.upper[0]).contains(&hsv.h)
            && (self.lower[1]..=self.upper[1]).contains(&hsv.s)
            && (self.lower[2]..=self.upper[2]).contains(&hsv.v)
    }
}

/// Red of the prohibition sign.
pub const PROHIBITED_BANDS: [HsvBand; 2] = [
    HsvBand::new([0, 100, 100], [10, 255, 255]),
    HsvBand::new([160, 100, 100], [180, 255, 255]),
];

/// Brighter, more saturated red of the attack sword.
pub const SWORD_BANDS: [HsvBand; 2] = [
    HsvBand::new([0, 140, 160], [10, 255, 255]),
    HsvBand::new([170, 140, 160], [180, 255, 255]),
];

/// Orange and yellowish skin tones of the loot hand.
pub const HAND_BANDS: [HsvBand; 2] = [
    HsvBand::new([10, 30, 80], [25, 140, 220]),
    HsvBand::new([20, 25, 100], [30, 130, 230]),
];

/// Binary mask stored as a grayscale image, 255 where set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

const ON: Luma<u8> = Luma([255]);
const OFF: Luma<u8> = Luma([0]);

/// Square structuring element of side `size`, anchored at `size / 2` like the
/// usual 8-bit morphology convention.
fn square_kernel(size: u32) -> Kernel {
    let size = size.clamp(1, 255);
    let anchor = (size / 2) as u8;
    Kernel::from_image(&GrayImage::from_pixel(size, size, ON), anchor, anchor)
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Union of every band over the region.
    pub fn from_bands(region: &RgbImage, bands: &[HsvBand]) -> Self {
        let image = GrayImage::from_fn(region.width(), region.height(), |x, y| {
            let p = region.get_pixel(x, y);
            let hsv = Hsv::from_rgb(p[0], p[1], p[2]);
            if bands.iter().any(|band| band.contains(hsv)) {
                ON
            } else {
                OFF
            }
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return false;
        }
        self.image.get_pixel(x as u32, y as u32)[0] > 0
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, if value { ON } else { OFF });
        }
    }

    pub fn count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] > 0).count()
    }

    /// Close then open with a square kernel, which fills pinholes and drops
    /// isolated speckle.
    pub fn denoise(&self, kernel: u32) -> Mask {
        let kernel = square_kernel(kernel);
        let closed = grayscale_close(&self.image, &kernel);
        Mask {
            image: grayscale_open(&closed, &kernel),
        }
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}
