//! Cursor-state classification: what the pointer glyph under a location means.
pub mod classifier;
pub mod contour;
pub mod debug;
pub mod mask;
pub mod probe;
pub mod state;
pub mod template;

pub use classifier::{ClassifierTier, CursorClassifier, CursorMasks, CursorReading};
pub use debug::CursorDebugDump;
pub use probe::{CursorProbe, FrameProbe, ScriptedProbe};
pub use state::{majority, CursorState};
pub use template::{Template, TemplateSet};
