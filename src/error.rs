use std::path::PathBuf;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Setup Error: {0}")]
    Setup(String),
    #[error("Capture Error: {0}")]
    Capture(String),
    #[error("Detector Error: {0}")]
    Detector(String),
    #[error("Input Error: {0}")]
    Input(String),
    #[error("Failed to decode image {1}: {0}")]
    Image(image::ImageError, PathBuf),
    #[error("Image Error: {0}")]
    ImageEncoding(#[from] image::ImageError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Replay file Error: {0}")]
    Replay(#[from] serde_json::Error),
}
