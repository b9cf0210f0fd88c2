#[cfg(feature = "desktop")]
pub mod enigo_injector;
pub mod injector;
pub mod motion;
pub mod recording;

#[cfg(feature = "desktop")]
pub use enigo_injector::EnigoInjector;
pub use injector::{InputInjector, MouseButton, CLICK_HOLD};
pub use motion::{key_pulse, rotate_camera, smooth_move, steer};
pub use recording::{InputEvent, RecordingInjector};
