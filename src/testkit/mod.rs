//! Scripted capability doubles for driving bots without network I/O.
//!
//! - [`platform::scripted_platform`]: records imperative operations and
//!   replays externally fed callbacks.
//! - [`web::FakeWebClient`]: serves canned badge and per-game pages.
//! - [`prompter::ScriptedPrompter`]: answers credential prompts from
//!   preloaded queues.
//! - [`StaticConnector`]: hands prepared capabilities to the bootstrap.

pub mod platform;
pub mod prompter;
pub mod web;

use std::collections::HashMap;
use std::sync::Arc;

use crate::app::{BotConfig, Connector};
use crate::error::{Error, Result};
use crate::platform::PlatformClient;
use crate::web::WebClient;

pub use platform::{scripted_platform, PlatformHandle, PlatformOp, ScriptedPlatformClient};
pub use prompter::ScriptedPrompter;
pub use web::FakeWebClient;

/// [`Connector`] serving pre-registered capabilities by bot name.
#[derive(Default)]
pub struct StaticConnector {
    clients: parking_lot::Mutex<HashMap<String, Arc<dyn PlatformClient>>>,
    webs: parking_lot::Mutex<HashMap<String, Arc<dyn WebClient>>>,
}

impl StaticConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        client: Arc<dyn PlatformClient>,
        web: Arc<dyn WebClient>,
    ) {
        let name = name.into();
        self.clients.lock().insert(name.clone(), client);
        self.webs.lock().insert(name, web);
    }
}

impl Connector for StaticConnector {
    fn platform_client(&self, config: &BotConfig) -> Result<Arc<dyn PlatformClient>> {
        self.clients
            .lock()
            .get(&config.name)
            .cloned()
            .ok_or_else(|| Error::Config(format!("no client registered for {}", config.name)))
    }

    fn web_client(&self, config: &BotConfig) -> Result<Arc<dyn WebClient>> {
        self.webs
            .lock()
            .get(&config.name)
            .cloned()
            .ok_or_else(|| Error::Config(format!("no web client registered for {}", config.name)))
    }
}
