use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::injector::{InputInjector, MouseButton};
use crate::common::ScreenPoint;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    MoveAbs(ScreenPoint),
    MoveRel { dx: i32, dy: i32 },
    Press(MouseButton),
    Release(MouseButton),
    Click(MouseButton),
    KeyDown(char),
    KeyUp(char),
}

struct Recorder {
    events: Vec<InputEvent>,
    position: ScreenPoint,
}

/// Records input instead of sending it, keeping track of where the pointer would be.
pub struct RecordingInjector {
    inner: Mutex<Recorder>,
}

impl Default for RecordingInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::with_position(ScreenPoint::new(0, 0))
    }

    pub fn with_position(position: ScreenPoint) -> Self {
        Self {
            inner: Mutex::new(Recorder {
                events: Vec::new(),
                position,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Recorder>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Input("Recorder lock poisoned".to_string()))
    }

    fn record(&self, event: InputEvent) -> Result<(), AppError> {
        debug!("Input: {:?}", event);
        let mut recorder = self.lock()?;
        match event {
            InputEvent::MoveAbs(point) => recorder.position = point,
            InputEvent::MoveRel { dx, dy } => {
                recorder.position =
                    ScreenPoint::new(recorder.position.x + dx, recorder.position.y + dy)
            }
            _ => {}
        }
        recorder.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.lock().map(|r| r.events.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&InputEvent) -> bool) -> usize {
        self.lock()
            .map(|r| r.events.iter().filter(|e| predicate(e)).count())
            .unwrap_or(0)
    }

    pub fn clicks(&self, button: MouseButton) -> usize {
        self.count(|e| *e == InputEvent::Click(button))
    }

    pub fn clear(&self) {
        if let Ok(mut recorder) = self.lock() {
            recorder.events.clear();
        }
    }
}

impl InputInjector for RecordingInjector {
    fn move_abs(&self, point: ScreenPoint) -> Result<(), AppError> {
        self.record(InputEvent::MoveAbs(point))
    }

    fn move_rel(&self, dx: i32, dy: i32) -> Result<(), AppError> {
        self.record(InputEvent::MoveRel { dx, dy })
    }

    fn press_button(&self, button: MouseButton) -> Result<(), AppError> {
        self.record(InputEvent::Press(button))
    }

    fn release_button(&self, button: MouseButton) -> Result<(), AppError> {
        self.record(InputEvent::Release(button))
    }

    fn click(&self, button: MouseButton) -> Result<(), AppError> {
        self.record(InputEvent::Click(button))
    }

    fn press_key(&self, key: char) -> Result<(), AppError> {
        self.record(InputEvent::KeyDown(key))
    }

    fn release_key(&self, key: char) -> Result<(), AppError> {
        self.record(InputEvent::KeyUp(key))
    }

    fn position(&self) -> Result<ScreenPoint, AppError> {
        Ok(self.lock()?.position)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_position_follows_moves() {
        let injector = RecordingInjector::with_position(ScreenPoint::new(10, 10));
        injector.move_rel(5, -3).unwrap();
        assert_eq!(injector.position().unwrap(), ScreenPoint::new(15, 7));
        injector.move_abs(ScreenPoint::new(100, 200)).unwrap();
        assert_eq!(injector.position().unwrap(), ScreenPoint::new(100, 200));
    }

    #[test]
    fn events_are_kept_in_order() {
        let injector = RecordingInjector::new();
        injector.press_key('w').unwrap();
        injector.click(MouseButton::Left).unwrap();
        injector.release_key('w').unwrap();
        assert_eq!(
            injector.events(),
            vec![
                InputEvent::KeyDown('w'),
                InputEvent::Click(MouseButton::Left),
                InputEvent::KeyUp('w'),
            ]
        );
        assert_eq!(injector.clicks(MouseButton::Left), 1);
        assert_eq!(injector.clicks(MouseButton::Right), 0);

        injector.clear();
        assert!(injector.events().is_empty());
    }
}
