use image::RgbImage;

/// Where exploration should head after looking at the ground ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Forward,
    SteerLeft,
    SteerRight,
}

/// Mean brightness of the left, middle and right thirds of the bottom `strip` rows.
pub fn strip_brightness(image: &RgbImage, strip: u32) -> Option<[f32; 3]> {
    let (width, height) = image.dimensions();
    let strip = strip.min(height);
    let third = width / 3;
    if strip == 0 || third == 0 {
        return None;
    }

    let mut means = [0.0f32; 3];
    for (i, mean) in means.iter_mut().enumerate() {
        let x0 = i as u32 * third;
        let mut sum = 0u64;
        for y in height - strip..height {
            for x in x0..x0 + third {
                let p = image.get_pixel(x, y);
                sum += p[0] as u64 + p[1] as u64 + p[2] as u64;
            }
        }
        *mean = sum as f32 / (3 * third * strip) as f32;
    }
    Some(means)
}

/// A dark middle third means something blocks the way; steer to the brighter side.
pub fn choose_heading(image: &RgbImage, strip: u32, threshold: f32) -> Heading {
    let Some([left, middle, right]) = strip_brightness(image, strip) else {
        return Heading::Forward;
    };
    if middle >= threshold {
        Heading::Forward
    } else if left > right {
        Heading::SteerLeft
    } else {
        Heading::SteerRight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn ground(left: u8, middle: u8, right: u8) -> RgbImage {
        RgbImage::from_fn(90, 40, |x, y| {
            if y < 30 {
                Rgb([255, 255, 255])
            } else if x < 30 {
                Rgb([left; 3])
            } else if x < 60 {
                Rgb([middle; 3])
            } else {
                Rgb([right; 3])
            }
        })
    }

    #[test]
    fn thirds_are_averaged_over_the_bottom_strip() {
        let means = strip_brightness(&ground(10, 20, 30), 10).expect("strip");
        assert_eq!(means, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn bright_middle_goes_forward() {
        assert_eq!(choose_heading(&ground(0, 120, 0), 10, 40.0), Heading::Forward);
    }

    #[test]
    fn dark_middle_steers_toward_light() {
        assert_eq!(choose_heading(&ground(200, 5, 90), 10, 40.0), Heading::SteerLeft);
        assert_eq!(choose_heading(&ground(90, 5, 200), 10, 40.0), Heading::SteerRight);
    }

    #[test]
    fn degenerate_frames_go_forward() {
        assert_eq!(choose_heading(&RgbImage::new(2, 2), 10, 40.0), Heading::Forward);
    }
}
