//! Configuration loading for SkillScore.
//!
//! Values are layered defaults ← TOML file ← environment (including a `.env`
//! file picked up through `dotenvy`). The server binary applies its CLI
//! overrides on top of the resulting [`Config`].

#![allow(missing_docs)]

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    BrokerConfig, Config, ConfigMetadata, DispatchConfig, FixtureConfig,
    ServerConfig, WorkerSettings,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
