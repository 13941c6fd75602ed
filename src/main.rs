use droplord::app::config::{scan_bot_names, BotConfig, Config};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("droplord starting");

    // No wire transport is bundled with this crate; validate the bot
    // configurations and report. A deployment links its transport and calls
    // `App::run` with the matching connector.
    match scan_bot_names(&config.bots_dir) {
        Ok(names) => {
            for name in names {
                match BotConfig::load(&config.bots_dir, &name) {
                    Ok(bot) => {
                        info!(bot = %bot.name, enabled = bot.enabled, "configuration ok");
                    }
                    Err(e) => warn!(bot = %name, error = %e, "configuration invalid"),
                }
            }
        }
        Err(e) => warn!(error = %e, "cannot scan bot configurations"),
    }

    info!("no platform transport enabled - exiting");
}
