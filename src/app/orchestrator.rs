//! Process bootstrap and lifecycle.
//!
//! Scans the bot-configuration directory, registers and starts every
//! enabled bot, and runs until interrupted. The concrete wire transport is
//! supplied through a [`Connector`]; this crate ships none.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use crate::app::config::{self, BotConfig, Config};
use crate::bot::{Bot, BotFactory, BotRegistry};
use crate::error::{Error, Result};
use crate::platform::{CredentialsPrompter, PlatformClient};
use crate::web::WebClient;

/// Builds the per-bot capabilities a session needs.
pub trait Connector: Send + Sync {
    fn platform_client(&self, config: &BotConfig) -> Result<Arc<dyn PlatformClient>>;
    fn web_client(&self, config: &BotConfig) -> Result<Arc<dyn WebClient>>;
}

/// [`BotFactory`] reading `<name>.xml` from the configuration directory.
pub struct ConfigBotFactory {
    bots_dir: PathBuf,
    connector: Arc<dyn Connector>,
    prompter: Arc<dyn CredentialsPrompter>,
    registry: Arc<BotRegistry>,
}

impl ConfigBotFactory {
    pub fn new(
        bots_dir: PathBuf,
        connector: Arc<dyn Connector>,
        prompter: Arc<dyn CredentialsPrompter>,
        registry: Arc<BotRegistry>,
    ) -> Self {
        Self {
            bots_dir,
            connector,
            prompter,
            registry,
        }
    }

    fn build(&self, config: BotConfig) -> Result<Arc<Bot>> {
        let client = self.connector.platform_client(&config)?;
        let web = self.connector.web_client(&config)?;
        Ok(Bot::new(
            config,
            client,
            web,
            Arc::clone(&self.prompter),
            Arc::clone(&self.registry),
            self.bots_dir.clone(),
        ))
    }
}

impl BotFactory for ConfigBotFactory {
    fn create(&self, name: &str) -> Result<Arc<Bot>> {
        let config = BotConfig::load(&self.bots_dir, name)?;
        if !config.enabled {
            return Err(Error::Config(format!("bot {name} is disabled")));
        }
        self.build(config)
    }
}

/// Main application entry points.
pub struct App;

impl App {
    /// Boots every enabled bot and runs until a shutdown signal arrives.
    pub async fn run(
        config: Config,
        connector: Arc<dyn Connector>,
        prompter: Arc<dyn CredentialsPrompter>,
    ) -> Result<()> {
        let registry = Arc::new(BotRegistry::new());
        Self::bootstrap(&config, &registry, connector, prompter).await?;

        signal::ctrl_c().await?;
        info!("shutdown signal received");
        registry.shutdown_all().await;
        Ok(())
    }

    /// Registers and starts every enabled bot from the configuration
    /// directory. Returns how many were started. A bot whose configuration
    /// is missing or unparseable is not registered; one error is logged.
    pub async fn bootstrap(
        config: &Config,
        registry: &Arc<BotRegistry>,
        connector: Arc<dyn Connector>,
        prompter: Arc<dyn CredentialsPrompter>,
    ) -> Result<usize> {
        let factory = Arc::new(ConfigBotFactory::new(
            config.bots_dir.clone(),
            connector,
            prompter,
            Arc::clone(registry),
        ));
        registry.install_factory(factory.clone());

        let mut started = 0;
        for name in config::scan_bot_names(&config.bots_dir)? {
            let bot_config = match BotConfig::load(&config.bots_dir, &name) {
                Ok(bot_config) => bot_config,
                Err(e) => {
                    error!(bot = %name, error = %e, "invalid configuration, bot not registered");
                    continue;
                }
            };
            if !bot_config.enabled {
                info!(bot = %name, "disabled, skipping");
                continue;
            }
            match factory.build(bot_config) {
                Ok(bot) => {
                    if registry.insert_if_absent(Arc::clone(&bot)) {
                        bot.start().await;
                        started += 1;
                    }
                }
                Err(e) => {
                    warn!(bot = %name, error = %e, "failed to build bot");
                }
            }
        }

        info!(bots = started, "bootstrap complete");
        Ok(started)
    }
}
