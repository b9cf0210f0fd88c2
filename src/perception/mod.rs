pub mod cursor;
pub mod detector;
pub mod frame_source;
pub mod obstacle;
#[cfg(feature = "desktop")]
pub mod screen_capture;

pub use detector::{Detector, ScriptedDetector};
pub use frame_source::{FrameSource, ImageSequenceSource, StaticFrameSource};
pub use obstacle::Heading;
#[cfg(feature = "desktop")]
pub use screen_capture::ScreenCaptureSource;
