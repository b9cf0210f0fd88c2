use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::CaptureRegion;
use crate::error::AppError;

const ENV_PREFIX: &str = "LOOTBOT";

/// Top-level runtime settings. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    /// Where per-sample cursor dumps are written when `debug` is on.
    pub debug_dir: Option<PathBuf>,
    /// Class labels the bot is allowed to engage.
    pub classes: Vec<String>,
    pub capture: CaptureRegion,
    /// Directory holding `red_sword.png`, `hand.png` and `prohibited.png`.
    pub template_dir: Option<PathBuf>,
    pub timing: TimingConfig,
    pub zones: ZoneConfig,
    pub targeting: TargetingConfig,
    pub classifier: ClassifierConfig,
    pub exploration: ExplorationConfig,
}

/// Pauses of the control loop, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub post_click_delay: f64,
    pub click_interval: f64,
    pub cursor_update_interval: f64,
    /// How long to poll for a fresh target after one was released before exploring.
    pub reacquire_window: f64,
    pub idle_poll: f64,
    pub absent_poll: f64,
    pub sample_pause: f64,
    pub attack_settle: f64,
    pub loot_settle: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub dead_timeout: f64,
    pub prohibited_timeout: f64,
    pub tolerance_x: i32,
    pub tolerance_y: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Squared pixel displacement a detection must exceed to move the target.
    pub rebind_threshold_sq: i64,
    /// Grace period for a vanished class, as a multiple of `post_click_delay`.
    pub absent_grace_factor: f64,
    pub cursor_samples: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub sample_radius: u32,
    pub sword_threshold: u32,
    pub hand_threshold: u32,
    pub sword_hand_ratio: f64,
    pub template_threshold: f32,
    pub prohibited: ProhibitedSignConfig,
}

/// Shape criteria for the red prohibition sign.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProhibitedSignConfig {
    pub min_area: f64,
    pub min_circularity: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub min_side: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub rotate_dx: i32,
    pub rotate_steps: u32,
    pub rotate_step_delay: f64,
    pub rotate_settle: f64,
    pub steer_dx: i32,
    pub forward_key: char,
    pub forward_duration: f64,
    pub obstacle_threshold: f32,
    pub obstacle_strip: u32,
    pub settle: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            debug_dir: None,
            classes: Vec::new(),
            capture: CaptureRegion::default(),
            template_dir: None,
            timing: TimingConfig::default(),
            zones: ZoneConfig::default(),
            targeting: TargetingConfig::default(),
            classifier: ClassifierConfig::default(),
            exploration: ExplorationConfig::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            post_click_delay: 1.1,
            click_interval: 0.4,
            cursor_update_interval: 0.05,
            reacquire_window: 1.0,
            idle_poll: 0.05,
            absent_poll: 0.1,
            sample_pause: 0.02,
            attack_settle: 0.1,
            loot_settle: 0.2,
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            dead_timeout: 5.0,
            prohibited_timeout: 9.0,
            tolerance_x: 50,
            tolerance_y: 30,
        }
    }
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            rebind_threshold_sq: 25,
            absent_grace_factor: 3.0,
            cursor_samples: 3,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_radius: 50,
            sword_threshold: 35,
            hand_threshold: 25,
            sword_hand_ratio: 0.6,
            template_threshold: 0.6,
            prohibited: ProhibitedSignConfig::default(),
        }
    }
}

impl Default for ProhibitedSignConfig {
    fn default() -> Self {
        Self {
            min_area: 80.0,
            min_circularity: 0.6,
            min_aspect: 0.7,
            max_aspect: 1.3,
            min_side: 10,
        }
    }
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            rotate_dx: 200,
            rotate_steps: 5,
            rotate_step_delay: 0.03,
            rotate_settle: 0.1,
            steer_dx: 200,
            forward_key: 'w',
            forward_duration: 0.2,
            obstacle_threshold: 40.0,
            obstacle_strip: 10,
            settle: 0.05,
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

impl TimingConfig {
    pub fn post_click_delay(&self) -> Duration {
        secs(self.post_click_delay)
    }

    pub fn click_interval(&self) -> Duration {
        secs(self.click_interval)
    }

    pub fn cursor_update_interval(&self) -> Duration {
        secs(self.cursor_update_interval)
    }

    pub fn reacquire_window(&self) -> Duration {
        secs(self.reacquire_window)
    }

    pub fn idle_poll(&self) -> Duration {
        secs(self.idle_poll)
    }

    pub fn absent_poll(&self) -> Duration {
        secs(self.absent_poll)
    }

    pub fn sample_pause(&self) -> Duration {
        secs(self.sample_pause)
    }

    pub fn attack_settle(&self) -> Duration {
        secs(self.attack_settle)
    }

    pub fn loot_settle(&self) -> Duration {
        secs(self.loot_settle)
    }
}

impl ZoneConfig {
    pub fn dead_timeout(&self) -> Duration {
        secs(self.dead_timeout)
    }

    pub fn prohibited_timeout(&self) -> Duration {
        secs(self.prohibited_timeout)
    }
}

impl ExplorationConfig {
    pub fn rotate_step_delay(&self) -> Duration {
        secs(self.rotate_step_delay)
    }

    pub fn rotate_settle(&self) -> Duration {
        secs(self.rotate_settle)
    }

    pub fn forward_duration(&self) -> Duration {
        secs(self.forward_duration)
    }

    pub fn settle(&self) -> Duration {
        secs(self.settle)
    }
}

impl Settings {
    /// Load settings from an optional file, then apply `LOOTBOT_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("classes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate().map_err(AppError::InvalidConfig)?;
        Ok(settings)
    }

    /// Parse settings from an in-memory TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate().map_err(AppError::InvalidConfig)?;
        Ok(settings)
    }

    /// Grace period a vanished target class is tolerated for.
    pub fn absent_grace(&self) -> Duration {
        self.timing
            .post_click_delay()
            .mul_f64(self.targeting.absent_grace_factor.max(0.0))
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err("Capture region must have a non-zero size".to_string());
        }

        if self.targeting.cursor_samples == 0 {
            return Err("At least one cursor sample is required".to_string());
        }

        if self.targeting.rebind_threshold_sq < 0 {
            return Err("Rebind threshold must not be negative".to_string());
        }

        if self.zones.tolerance_x < 0 || self.zones.tolerance_y < 0 {
            return Err("Zone tolerances must not be negative".to_string());
        }

        if !(0.0..=1.0).contains(&self.classifier.template_threshold) {
            return Err("Template threshold must be between 0.0 and 1.0".to_string());
        }

        let prohibited = &self.classifier.prohibited;
        if prohibited.min_aspect > prohibited.max_aspect {
            return Err("Prohibited sign aspect range is empty".to_string());
        }

        if self.exploration.rotate_steps == 0 {
            return Err("Camera rotation needs at least one step".to_string());
        }

        let timings = [
            self.timing.post_click_delay,
            self.timing.click_interval,
            self.timing.cursor_update_interval,
            self.zones.dead_timeout,
            self.zones.prohibited_timeout,
        ];
        if timings.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err("Timings must be finite and non-negative".to_string());
        }

        if self.timing.cursor_update_interval == 0.0 {
            return Err("Cursor update interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_constants() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.zones.dead_timeout(), Duration::from_secs(5));
        assert_eq!(settings.zones.prohibited_timeout(), Duration::from_secs(9));
        assert_eq!(settings.targeting.rebind_threshold_sq, 25);
        assert_eq!(settings.classifier.sword_threshold, 35);
        assert_eq!(settings.classifier.hand_threshold, 25);
        let grace = settings.absent_grace().as_secs_f64();
        assert!((grace - 3.3).abs() < 1e-6);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            classes = ["rat", "wolf"]
            debug = true

            [capture]
            left = 100
            top = 50
            width = 800
            height = 600

            [timing]
            post_click_delay = 0.5
            "#,
        )
        .expect("settings should parse");

        assert_eq!(settings.classes, vec!["rat".to_string(), "wolf".to_string()]);
        assert!(settings.debug);
        assert_eq!(settings.capture, CaptureRegion::new(100, 50, 800, 600));
        assert_eq!(settings.timing.post_click_delay(), Duration::from_millis(500));
        assert_eq!(settings.timing.click_interval(), Duration::from_millis(400));
        assert_eq!(settings.zones.tolerance_x, 50);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = Settings::from_toml(
            r#"
            [targeting]
            cursor_samples = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot.toml");
        std::fs::write(&path, "classes = [\"boar\"]\n[zones]\ndead_timeout = 2.5\n")
            .expect("write config");

        let settings = Settings::load(Some(&path)).expect("settings should load");
        assert_eq!(settings.classes, vec!["boar".to_string()]);
        assert_eq!(settings.zones.dead_timeout(), Duration::from_secs_f64(2.5));
    }
}
