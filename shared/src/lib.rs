//! Shared components for the dome trajectory modules.
//!
//! - [`trajectory_config`]: JSON configuration format and validation
//! - [`config_storage`]: named configuration sets on disk

pub mod config_storage;
pub mod trajectory_config;

pub use config_storage::{ConfigStorage, DEFAULT_CONFIG_NAME};
pub use trajectory_config::{ConfigLoadError, TrajectoryConfig};
