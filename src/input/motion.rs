use std::time::Duration;
use tracing::warn;

use super::injector::{InputInjector, MouseButton};
use crate::common::ScreenPoint;
use crate::error::AppError;

/// Moves the pointer to `target` in `steps` equal increments, landing exactly on it.
/// Does nothing when the pointer is already there.
pub async fn smooth_move(
    injector: &dyn InputInjector,
    target: ScreenPoint,
    steps: u32,
    delay: Duration,
) -> Result<(), AppError> {
    let start = match injector.position() {
        Ok(start) => start,
        Err(e) => {
            warn!("Pointer position unavailable, jumping: {}", e);
            return injector.move_abs(target);
        }
    };
    if start == target {
        return Ok(());
    }

    let steps = steps.max(1);
    let (dx, dy) = ((target.x - start.x) as f64, (target.y - start.y) as f64);
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let point = ScreenPoint::new(
            start.x + (dx * t).round() as i32,
            start.y + (dy * t).round() as i32,
        );
        injector.move_abs(point)?;
        if i < steps && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(())
}

/// Drags with the right button held, turning the camera by `total_dx` over `steps` moves.
/// The button is released even when a move fails.
pub async fn rotate_camera(
    injector: &dyn InputInjector,
    total_dx: i32,
    steps: u32,
    step_delay: Duration,
) -> Result<(), AppError> {
    let steps = steps.max(1);
    let per_step = total_dx / steps as i32;

    injector.press_button(MouseButton::Right)?;
    let mut result = Ok(());
    for _ in 0..steps {
        if let Err(e) = injector.move_rel(per_step, 0) {
            result = Err(e);
            break;
        }
        tokio::time::sleep(step_delay).await;
    }
    injector.release_button(MouseButton::Right)?;
    result
}

/// Single right-drag of `dx` pixels; negative turns left.
pub fn steer(injector: &dyn InputInjector, dx: i32) -> Result<(), AppError> {
    injector.press_button(MouseButton::Right)?;
    let moved = injector.move_rel(dx, 0);
    injector.release_button(MouseButton::Right)?;
    moved
}

/// Holds `key` for `duration`.
pub async fn key_pulse(
    injector: &dyn InputInjector,
    key: char,
    duration: Duration,
) -> Result<(), AppError> {
    injector.press_key(key)?;
    tokio::time::sleep(duration).await;
    injector.release_key(key)
}
