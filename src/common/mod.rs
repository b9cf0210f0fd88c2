pub mod detection;
pub mod frame;
pub mod geometry;

pub use detection::Detection;
pub use frame::Frame;
pub use geometry::{CaptureRegion, FramePoint, ScreenPoint};
