//! Master chat command parsing and dispatch.
//!
//! Three message shapes are recognised: a bare product key (redeemed
//! silently), a pasted list of `-`-prefixed keys (fanned out one key per
//! bot in registry order), and `!`-prefixed commands.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::CdKey;

use super::redeem;
use super::registry::BotRegistry;
use super::Bot;

/// A parsed `!` command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Farm { bot: Option<String> },
    Restart,
    Status { all: bool, bot: Option<String> },
    Start { bot: String },
    Stop { bot: Option<String> },
    Redeem { bot: Option<String>, key: CdKey },
    Unknown(String),
}

/// Classification of an incoming master chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    /// The whole message is a product key.
    SingleKey(CdKey),
    /// Newline-separated `-`-prefixed keys.
    KeyList(Vec<CdKey>),
    Command(Command),
    /// Not addressed to us; dropped without a reply.
    Ignored,
}

/// Classifies a chat message from the master.
#[must_use]
pub fn parse_message(message: &str) -> ParsedMessage {
    let trimmed = message.trim();
    if let Ok(key) = CdKey::parse(trimmed) {
        return ParsedMessage::SingleKey(key);
    }

    if trimmed.contains('\n')
        && trimmed
            .lines()
            .next()
            .is_some_and(|line| line.trim_start().starts_with('-'))
    {
        let keys: Vec<CdKey> = trimmed
            .lines()
            .filter_map(|line| {
                let candidate = line.trim().trim_start_matches('-').trim();
                CdKey::parse(candidate).ok()
            })
            .collect();
        if !keys.is_empty() {
            return ParsedMessage::KeyList(keys);
        }
    }

    if !trimmed.starts_with('!') {
        return ParsedMessage::Ignored;
    }
    ParsedMessage::Command(parse_command(trimmed))
}

fn parse_command(text: &str) -> Command {
    let mut parts = text.split_whitespace();
    let head = parts.next().unwrap_or_default();

    match head {
        "!exit" => Command::Exit,
        "!farm" => Command::Farm {
            bot: parts.next().map(String::from),
        },
        "!restart" => Command::Restart,
        "!status" => match parts.next() {
            None => Command::Status { all: false, bot: None },
            Some("all") => Command::Status { all: true, bot: None },
            Some(name) => Command::Status {
                all: false,
                bot: Some(name.to_string()),
            },
        },
        "!start" => match parts.next() {
            Some(name) => Command::Start {
                bot: name.to_string(),
            },
            None => Command::Unknown(text.to_string()),
        },
        "!stop" => Command::Stop {
            bot: parts.next().map(String::from),
        },
        "!redeem" => match (parts.next(), parts.next()) {
            (Some(key), None) => match CdKey::parse(key) {
                Ok(key) => Command::Redeem { bot: None, key },
                Err(_) => Command::Unknown(text.to_string()),
            },
            (Some(name), Some(key)) => match CdKey::parse(key) {
                Ok(key) => Command::Redeem {
                    bot: Some(name.to_string()),
                    key,
                },
                Err(_) => Command::Unknown(text.to_string()),
            },
            _ => Command::Unknown(text.to_string()),
        },
        _ => Command::Unknown(text.to_string()),
    }
}

/// Handles one master chat message against `bot` and its registry.
/// Returns the chat reply, if the command produces one.
pub async fn dispatch(bot: &Arc<Bot>, message: &str) -> Option<String> {
    let registry = Arc::clone(bot.registry());
    match parse_message(message) {
        ParsedMessage::Ignored => None,
        ParsedMessage::SingleKey(key) => {
            if let Err(e) = bot.client().redeem_key(&key).await {
                warn!(bot = %bot.name(), error = %e, "silent redeem failed");
            }
            None
        }
        ParsedMessage::KeyList(keys) => Some(redeem_across_bots(&registry, keys).await),
        ParsedMessage::Command(command) => execute(bot, &registry, command).await,
    }
}

async fn execute(
    bot: &Arc<Bot>,
    registry: &Arc<BotRegistry>,
    command: Command,
) -> Option<String> {
    match command {
        Command::Exit => {
            info!("exiting on master command");
            registry.shutdown_all().await;
            std::process::exit(0);
        }
        Command::Restart => {
            info!("restarting on master command");
            registry.shutdown_all().await;
            restart_process()
        }
        Command::Farm { bot: None } => {
            bot.farmer().start_farming().await;
            Some("Done!".to_string())
        }
        Command::Farm { bot: Some(name) } => match registry.get(&name) {
            Some(target) => {
                target.farmer().start_farming().await;
                Some("Done!".to_string())
            }
            None => Some(unknown_bot(&name)),
        },
        Command::Status { all: true, .. } => {
            let lines: Vec<String> = registry
                .snapshot()
                .iter()
                .map(|entry| entry.status_summary())
                .collect();
            if lines.is_empty() {
                Some("No bots are running.".to_string())
            } else {
                Some(lines.join("\n"))
            }
        }
        Command::Status { bot: None, .. } => Some(bot.status_summary()),
        Command::Status { bot: Some(name), .. } => match registry.get(&name) {
            Some(target) => Some(target.status_summary()),
            None => Some(unknown_bot(&name)),
        },
        Command::Start { bot: name } => Some(start_bot(registry, &name).await),
        Command::Stop { bot: target } => {
            let target_bot = match target {
                None => Arc::clone(bot),
                Some(name) => match registry.get(&name) {
                    Some(found) => found,
                    None => return Some(unknown_bot(&name)),
                },
            };
            // Reply first: stopping ourselves tears the session down.
            bot.reply_to_master("Done!").await;
            target_bot.shutdown().await;
            None
        }
        Command::Redeem { bot: None, key } => {
            if let Err(e) = bot.client().redeem_key(&key).await {
                warn!(bot = %bot.name(), error = %e, "silent redeem failed");
            }
            None
        }
        Command::Redeem {
            bot: Some(name),
            key,
        } => match registry.get(&name) {
            Some(target) => {
                let summary = redeem::redeem_with_reply(&target, &key).await;
                Some(format!("{name} answer: {summary}"))
            }
            None => Some(unknown_bot(&name)),
        },
        Command::Unknown(text) => Some(format!("Unrecognized command: {text}")),
    }
}

/// Distributes keys across bots in registry order, one key per bot,
/// stopping when either side runs out.
async fn redeem_across_bots(registry: &Arc<BotRegistry>, keys: Vec<CdKey>) -> String {
    let bots = registry.snapshot();
    let mut keys = keys.into_iter();
    let mut replies = Vec::new();

    for target in bots {
        let Some(key) = keys.next() else { break };
        let summary = redeem::redeem_with_reply(&target, &key).await;
        replies.push(format!("{} answer: {}", target.name(), summary));
    }

    if replies.is_empty() {
        "No bots available to redeem keys.".to_string()
    } else {
        replies.join("\n")
    }
}

async fn start_bot(registry: &Arc<BotRegistry>, name: &str) -> String {
    if registry.get(name).is_some() {
        return format!("Bot {name} is already running!");
    }
    let Some(factory) = registry.factory() else {
        return failed_to_start();
    };
    match factory.create(name) {
        Ok(new_bot) => {
            if !registry.insert_if_absent(Arc::clone(&new_bot)) {
                return format!("Bot {name} is already running!");
            }
            new_bot.start().await;
            "Done!".to_string()
        }
        Err(e) => {
            warn!(bot = name, error = %e, "failed to start bot");
            failed_to_start()
        }
    }
}

fn unknown_bot(name: &str) -> String {
    format!("Couldn't find any bot named {name}!")
}

fn failed_to_start() -> String {
    "That bot instance failed to start, make sure that XML config exists and bot is active!"
        .to_string()
}

/// Re-executes the current binary and exits the running process.
fn restart_process() -> Option<String> {
    match std::env::current_exe() {
        Ok(exe) => match std::process::Command::new(exe).spawn() {
            Ok(_) => std::process::exit(0),
            Err(e) => Some(format!("Restart failed: {e}")),
        },
        Err(e) => Some(format!("Restart failed: {e}")),
    }
}
