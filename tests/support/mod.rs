#![allow(dead_code)]

pub mod pages;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use droplord::app::BotConfig;
use droplord::bot::{Bot, BotRegistry};
use droplord::domain::SteamId;
use droplord::platform::{Callback, ConnectResult, LogonResult};
use droplord::testkit::{scripted_platform, FakeWebClient, PlatformHandle, PlatformOp, ScriptedPrompter};

/// The master account used by test configurations.
pub const MASTER: SteamId = SteamId::new(76_561_198_000_000_001);

/// The account id bots log on as.
pub const ACCOUNT: SteamId = SteamId::new(76_561_198_000_000_002);

/// A bot with scripted capabilities and its control surfaces.
pub struct Rig {
    pub bot: Arc<Bot>,
    pub platform: PlatformHandle,
    pub web: Arc<FakeWebClient>,
    pub prompter: Arc<ScriptedPrompter>,
    pub registry: Arc<BotRegistry>,
}

/// An enabled config with static credentials and the test master.
pub fn test_config(name: &str) -> BotConfig {
    BotConfig {
        name: name.to_string(),
        enabled: true,
        steam_login: Some(format!("{name}-login")),
        steam_password: Some("secret".to_string()),
        master_id: MASTER,
        ..BotConfig::default()
    }
}

pub fn make_bot(registry: &Arc<BotRegistry>, config: BotConfig) -> Rig {
    make_bot_in(registry, config, std::env::temp_dir())
}

pub fn make_bot_in(registry: &Arc<BotRegistry>, config: BotConfig, data_dir: PathBuf) -> Rig {
    make_bot_with_prompter(registry, config, Arc::new(ScriptedPrompter::new()), data_dir)
}

pub fn make_bot_with_prompter(
    registry: &Arc<BotRegistry>,
    config: BotConfig,
    prompter: Arc<ScriptedPrompter>,
    data_dir: PathBuf,
) -> Rig {
    let (client, platform) = scripted_platform();
    let web = Arc::new(FakeWebClient::new());
    let bot = Bot::new(
        config,
        client,
        Arc::clone(&web) as Arc<dyn droplord::web::WebClient>,
        Arc::clone(&prompter) as Arc<dyn droplord::platform::CredentialsPrompter>,
        Arc::clone(registry),
        data_dir,
    );
    Rig {
        bot,
        platform,
        web,
        prompter,
        registry: Arc::clone(registry),
    }
}

/// Polls until `condition` holds; panics after the wait budget.
///
/// Tests run with the clock paused, so the 1 s poll interval is what the
/// auto-advancing clock steps by: coarse enough to traverse the farming
/// wait windows within the budget, instant in real time.
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    panic!("condition not met in time: {what}");
}

/// Starts the bot and walks it through connect + logon.
pub async fn drive_logon(rig: &Rig) {
    rig.bot.start().await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    wait_for("logon issued", || {
        rig.platform
            .ops()
            .iter()
            .any(|op| matches!(op, PlatformOp::LogOn { .. }))
    })
    .await;
    rig.platform.send(Callback::LoggedOn {
        result: LogonResult::Ok,
        steam_id: ACCOUNT,
    });
    wait_for("web session initialized", || rig.web.init_count() > 0).await;
}
