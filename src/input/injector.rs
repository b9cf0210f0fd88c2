use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::ScreenPoint;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
}

/// How long `click` holds the button down. Games that poll button state miss
/// zero-length clicks.
pub const CLICK_HOLD: Duration = Duration::from_millis(20);

/// Synthetic input primitives in absolute screen coordinates.
pub trait InputInjector: Send + Sync {
    fn move_abs(&self, point: ScreenPoint) -> Result<(), AppError>;
    fn move_rel(&self, dx: i32, dy: i32) -> Result<(), AppError>;
    fn press_button(&self, button: MouseButton) -> Result<(), AppError>;
    fn release_button(&self, button: MouseButton) -> Result<(), AppError>;
    /// Press, hold for [`CLICK_HOLD`], release. The pause blocks the calling thread.
    fn click(&self, button: MouseButton) -> Result<(), AppError> {
        self.press_button(button)?;
        std::thread::sleep(CLICK_HOLD);
        self.release_button(button)
    }
    fn press_key(&self, key: char) -> Result<(), AppError>;
    fn release_key(&self, key: char) -> Result<(), AppError>;
    /// Current pointer location.
    fn position(&self) -> Result<ScreenPoint, AppError>;
    fn name(&self) -> &'static str;
}
