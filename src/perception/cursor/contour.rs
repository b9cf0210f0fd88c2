//! Outer boundaries of 8-connected blobs in a mask.
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;

use super::mask::Mask;

#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point<i32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

impl Contour {
    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    /// Polygon area enclosed by the boundary pixel centres.
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        contour_area(&self.points).abs()
    }

    /// Closed boundary length.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        arc_length(&self.points, true)
    }

    pub fn circularity(&self) -> f64 {
        let perimeter = self.perimeter();
        if perimeter <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (perimeter * perimeter)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let min_x = self.points.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = self.points.iter().map(|p| p.x).max().unwrap_or(0);
        let min_y = self.points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = self.points.iter().map(|p| p.y).max().unwrap_or(0);
        BoundingBox {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }
}

/// Outer contour of every top-level blob. Holes and blobs nested inside holes are
/// skipped.
pub fn external_contours(mask: &Mask) -> Vec<Contour> {
    find_contours::<i32>(mask.as_image())
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour { points: c.points })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut mask = Mask::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                mask.set(x as u32, y as u32, c == '#');
            }
        }
        mask
    }

    #[test]
    fn solid_square_boundary() {
        let mask = mask_from(&[
            "......", //
            ".####.", //
            ".####.", //
            ".####.", //
            ".####.", //
            "......",
        ]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let contour = &contours[0];
        assert_eq!(contour.area(), 9.0);
        assert_eq!(contour.perimeter(), 12.0);
        assert_eq!(
            contour.bounding_box(),
            BoundingBox {
                x: 1,
                y: 1,
                width: 4,
                height: 4
            }
        );
    }

    #[test]
    fn separate_blobs_give_separate_contours() {
        let mask = mask_from(&[
            "##....", //
            "##....", //
            "......", //
            "....##", //
            "....##",
        ]);
        assert_eq!(external_contours(&mask).len(), 2);
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let mask = mask_from(&[
            "#...", //
            ".#..", //
            "..#.", //
        ]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area(), 0.0);
        assert_eq!(contours[0].bounding_box().width, 3);
    }

    #[test]
    fn blobs_inside_holes_are_not_external() {
        let mask = mask_from(&[
            "#######", //
            "#.....#", //
            "#.###.#", //
            "#.###.#", //
            "#.###.#", //
            "#.....#", //
            "#######",
        ]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bounding_box().width, 7);
        assert_eq!(contours[0].area(), 36.0);
    }

    #[test]
    fn single_pixel_has_no_area() {
        let mask = mask_from(&["...", ".#.", "..."]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[Point::new(1, 1)]);
        assert_eq!(contours[0].circularity(), 0.0);
    }
}
