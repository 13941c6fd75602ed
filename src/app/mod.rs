//! Application layer: configuration and process orchestration.

pub mod config;
pub mod orchestrator;

pub use config::{BotConfig, Config};
pub use orchestrator::{App, ConfigBotFactory, Connector};
