use serde::{Deserialize, Serialize};

use super::geometry::FramePoint;

/// One object instance reported by the detector for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub cx: i32,
    pub cy: i32,
    pub score: f32,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, cx: i32, cy: i32, score: f32) -> Self {
        Self {
            class_name: class_name.into(),
            cx,
            cy,
            score,
        }
    }

    pub fn center(&self) -> FramePoint {
        FramePoint::new(self.cx, self.cy)
    }
}
