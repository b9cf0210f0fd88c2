use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{BotLoop, BotParts};
use crate::common::CaptureRegion;
use crate::config::Settings;
use crate::error::AppError;
use crate::input::InputInjector;
use crate::perception::cursor::{
    CursorClassifier, CursorDebugDump, CursorProbe, FrameProbe, TemplateSet,
};
use crate::perception::{Detector, FrameSource};

/// Owns the running bot task. Stopping is cooperative: the loop notices at its next
/// iteration and tears down pointer tracking before it exits.
pub struct Coordinator {
    bot_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(bot: BotLoop, cancel_token: CancellationToken) -> Self {
        let bot_task = tokio::spawn(bot.run(cancel_token.clone()));
        Self {
            bot_task: Some(bot_task),
            cancel_token,
        }
    }

    pub fn builder(settings: Settings) -> CoordinatorBuilder {
        CoordinatorBuilder::new(settings)
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.bot_task
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Stops the bot and waits for it to finish.
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        self.stop();
        if let Some(task) = self.bot_task.take() {
            task.await
                .map_err(|e| AppError::Setup(format!("Bot task failed: {e}")))?;
        }
        info!("Coordinator shut down");
        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    detector: Option<Arc<dyn Detector>>,
    frame_source: Option<Arc<dyn FrameSource>>,
    injector: Option<Arc<dyn InputInjector>>,
    probe: Option<Arc<dyn CursorProbe>>,
    templates: Option<Arc<TemplateSet>>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            detector: None,
            frame_source: None,
            injector: None,
            probe: None,
            templates: None,
        }
    }

    // Sets the capture region, this will override the configured one.
    pub fn capture_region(mut self, region: CaptureRegion) -> Self {
        self.settings.capture = region;
        self
    }

    // Sets the allow-listed classes, this will override the configured ones.
    pub fn classes(mut self, classes: Vec<String>) -> Self {
        self.settings.classes = classes;
        self
    }

    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn frame_source(mut self, frame_source: Arc<dyn FrameSource>) -> Self {
        self.frame_source = Some(frame_source);
        self
    }

    pub fn injector(mut self, injector: Arc<dyn InputInjector>) -> Self {
        self.injector = Some(injector);
        self
    }

    // Replaces the frame-based cursor probe.
    pub fn probe(mut self, probe: Arc<dyn CursorProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    // Uses an already loaded template set instead of the configured directory.
    pub fn templates(mut self, templates: Arc<TemplateSet>) -> Self {
        self.templates = Some(templates);
        self
    }

    fn build_probe(
        &self,
        frame_source: &Arc<dyn FrameSource>,
    ) -> Result<Arc<dyn CursorProbe>, AppError> {
        if let Some(probe) = &self.probe {
            return Ok(probe.clone());
        }

        let templates = match (&self.templates, &self.settings.template_dir) {
            (Some(templates), _) => templates.clone(),
            (None, Some(dir)) => Arc::new(TemplateSet::load(dir)),
            (None, None) => Arc::new(TemplateSet::empty()),
        };
        let classifier = Arc::new(CursorClassifier::new(
            self.settings.classifier.clone(),
            templates,
        ));
        let mut probe = FrameProbe::new(frame_source.clone(), self.settings.capture, classifier);
        if self.settings.debug {
            if let Some(dir) = &self.settings.debug_dir {
                probe = probe.with_debug_dump(CursorDebugDump::new(dir)?);
            }
        }
        Ok(Arc::new(probe))
    }

    /// Spawns the bot task; must be called from inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.settings.validate().map_err(AppError::InvalidConfig)?;
        let detector = self
            .detector
            .clone()
            .ok_or(AppError::Setup("Detector not set".to_string()))?;
        let frame_source = self
            .frame_source
            .clone()
            .ok_or(AppError::Setup("Frame source not set".to_string()))?;
        let injector = self
            .injector
            .clone()
            .ok_or(AppError::Setup("Input injector not set".to_string()))?;
        let probe = self.build_probe(&frame_source)?;

        if self.settings.classes.is_empty() {
            warn!("No target classes configured, the bot will only explore");
        }
        info!(
            "Starting bot: detector={} frames={} input={} classes={:?}",
            detector.name(),
            frame_source.name(),
            injector.name(),
            self.settings.classes
        );

        let cancel_token = CancellationToken::new();
        let bot = BotLoop::new(
            &self.settings,
            BotParts {
                source: frame_source,
                detector,
                injector,
                probe,
            },
            &cancel_token,
        );
        Ok(Coordinator::new(bot, cancel_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Detection;
    use crate::input::{MouseButton, RecordingInjector};
    use crate::perception::cursor::classifier::tests::{paint_rect, BACKDROP, SWORD_RED};
    use crate::perception::{ScriptedDetector, StaticFrameSource};
    use image::RgbImage;
    use std::time::Duration;

    fn sword_frame() -> RgbImage {
        let mut image = RgbImage::from_pixel(200, 200, BACKDROP);
        paint_rect(&mut image, 80, 99, 40, 3, SWORD_RED);
        image
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator() {
        let injector = Arc::new(RecordingInjector::new());
        let coordinator = Coordinator::builder(Settings::default())
            .capture_region(CaptureRegion::new(0, 0, 200, 200))
            .classes(vec!["rat".to_string()])
            .detector(Arc::new(ScriptedDetector::new(vec![
                vec![Detection::new("rat", 100, 100, 0.9)];
                40
            ])))
            .frame_source(Arc::new(StaticFrameSource::new(sword_frame())))
            .injector(injector.clone())
            .build()
            .expect("Failed to build coordinator");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(coordinator.is_running());
        coordinator.shutdown().await.expect("shutdown");
        assert!(injector.clicks(MouseButton::Left) >= 2);
    }

    #[tokio::test]
    async fn missing_parts_are_reported() {
        let result = Coordinator::builder(Settings::default())
            .frame_source(Arc::new(StaticFrameSource::new(RgbImage::new(8, 8))))
            .injector(Arc::new(RecordingInjector::new()))
            .build();
        assert!(matches!(result, Err(AppError::Setup(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_safe_at_any_time() {
        let coordinator = Coordinator::builder(Settings::default())
            .detector(Arc::new(ScriptedDetector::default()))
            .frame_source(Arc::new(StaticFrameSource::new(RgbImage::new(1280, 720))))
            .injector(Arc::new(RecordingInjector::new()))
            .build()
            .expect("build");
        coordinator.stop();
        coordinator.stop();
        coordinator.shutdown().await.expect("shutdown");
    }
}
