pub mod agent;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod input;
pub mod perception;

pub use config::Settings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::AppError;
