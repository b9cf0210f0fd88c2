use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::sync::{Mutex, MutexGuard};

use super::injector::{InputInjector, MouseButton};
use crate::common::ScreenPoint;
use crate::error::AppError;

/// Sends real OS input events.
pub struct EnigoInjector {
    enigo: Mutex<Enigo>,
}

impl EnigoInjector {
    pub fn new() -> Result<Self, AppError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| AppError::Setup(format!("Failed to initialize input: {e:?}")))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Enigo>, AppError> {
        self.enigo
            .lock()
            .map_err(|_| AppError::Input("Input lock poisoned".to_string()))
    }

    fn map_button(button: MouseButton) -> Button {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        }
    }

    fn button(&self, button: MouseButton, direction: Direction) -> Result<(), AppError> {
        self.lock()?
            .button(Self::map_button(button), direction)
            .map_err(|e| AppError::Input(format!("{e:?}")))
    }

    fn key(&self, key: char, direction: Direction) -> Result<(), AppError> {
        self.lock()?
            .key(Key::Unicode(key), direction)
            .map_err(|e| AppError::Input(format!("{e:?}")))
    }
}

impl InputInjector for EnigoInjector {
    fn move_abs(&self, point: ScreenPoint) -> Result<(), AppError> {
        self.lock()?
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(|e| AppError::Input(format!("{e:?}")))
    }

    fn move_rel(&self, dx: i32, dy: i32) -> Result<(), AppError> {
        self.lock()?
            .move_mouse(dx, dy, Coordinate::Rel)
            .map_err(|e| AppError::Input(format!("{e:?}")))
    }

    fn press_button(&self, button: MouseButton) -> Result<(), AppError> {
        self.button(button, Direction::Press)
    }

    fn release_button(&self, button: MouseButton) -> Result<(), AppError> {
        self.button(button, Direction::Release)
    }

    fn press_key(&self, key: char) -> Result<(), AppError> {
        self.key(key, Direction::Press)
    }

    fn release_key(&self, key: char) -> Result<(), AppError> {
        self.key(key, Direction::Release)
    }

    fn position(&self) -> Result<ScreenPoint, AppError> {
        let (x, y) = self
            .lock()?
            .location()
            .map_err(|e| AppError::Input(format!("{e:?}")))?;
        Ok(ScreenPoint::new(x, y))
    }

    fn name(&self) -> &'static str {
        "enigo"
    }
}
