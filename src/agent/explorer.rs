use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::CaptureRegion;
use crate::config::ExplorationConfig;
use crate::error::AppError;
use crate::input::{key_pulse, rotate_camera, steer, InputInjector};
use crate::perception::obstacle::{choose_heading, Heading};
use crate::perception::FrameSource;

/// Wanders when there is nothing to engage: turn the camera, then move or steer
/// around whatever darkens the ground ahead.
pub struct Explorer {
    injector: Arc<dyn InputInjector>,
    source: Arc<dyn FrameSource>,
    region: CaptureRegion,
    config: ExplorationConfig,
}

impl Explorer {
    pub fn new(
        injector: Arc<dyn InputInjector>,
        source: Arc<dyn FrameSource>,
        region: CaptureRegion,
        config: ExplorationConfig,
    ) -> Self {
        Self {
            injector,
            source,
            region,
            config,
        }
    }

    pub async fn explore(&self) -> Result<Heading, AppError> {
        let injector = self.injector.as_ref();
        rotate_camera(
            injector,
            self.config.rotate_dx,
            self.config.rotate_steps,
            self.config.rotate_step_delay(),
        )
        .await?;
        tokio::time::sleep(self.config.rotate_settle()).await;

        let heading = match self.source.grab(&self.region) {
            Ok(frame) => choose_heading(
                frame.image(),
                self.config.obstacle_strip,
                self.config.obstacle_threshold,
            ),
            Err(e) => {
                warn!("Obstacle check capture failed, heading forward: {}", e);
                Heading::Forward
            }
        };
        debug!("Exploring: {:?}", heading);

        match heading {
            Heading::SteerLeft => steer(injector, -self.config.steer_dx)?,
            Heading::SteerRight => steer(injector, self.config.steer_dx)?,
            Heading::Forward => {
                key_pulse(
                    injector,
                    self.config.forward_key,
                    self.config.forward_duration(),
                )
                .await?
            }
        }
        tokio::time::sleep(self.config.settle()).await;
        Ok(heading)
    }
}
