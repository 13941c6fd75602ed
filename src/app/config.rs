//! Process and per-bot configuration loading.
//!
//! The process configuration is a TOML file. Each bot is described by a
//! `<botName>.xml` next to it, element-per-key with a `value` attribute:
//!
//! ```xml
//! <configuration>
//!   <Enabled value="true"/>
//!   <SteamLogin value="account"/>
//!   <SteamMasterID value="76561198006963719"/>
//! </configuration>
//! ```
//!
//! Unknown keys are logged and ignored. Passwords may be supplied through
//! the environment (`DROPLORD_PASSWORD_<BOTNAME>`) instead of the file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{AppId, FarmingOrder, SteamId};
use crate::error::{Error, Result};

/// Sentinel config value that requests an interactive prompt.
const NULL_VALUE: &str = "null";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    /// Directory scanned for `<botName>.xml` files.
    #[serde(default = "default_bots_dir")]
    pub bots_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_bots_dir() -> PathBuf {
    PathBuf::from("bots")
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.logging.level.is_empty() {
            return Err(Error::Config("logging.level must not be empty".into()));
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".into(),
                format: "pretty".into(),
            },
            bots_dir: default_bots_dir(),
        }
    }
}

/// One bot's configuration snapshot.
///
/// `None` credentials mean the file held the `"null"` sentinel and the value
/// is captured interactively at first use.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub name: String,
    pub enabled: bool,
    pub steam_login: Option<String>,
    pub steam_password: Option<String>,
    pub steam_nickname: Option<String>,
    pub steam_api_key: Option<String>,
    /// `None` requests an interactive prompt after login; `"0"` disables
    /// the parental unlock.
    pub steam_parental_pin: Option<String>,
    /// Sole authorised command issuer.
    pub master_id: SteamId,
    /// Clan chat joined after login when set.
    pub master_clan_id: SteamId,
    pub card_drops_restricted: bool,
    pub shutdown_on_farming_finished: bool,
    pub blacklist: HashSet<AppId>,
    pub statistics: bool,
    pub farming_order: FarmingOrder,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: false,
            steam_login: None,
            steam_password: None,
            steam_nickname: None,
            steam_api_key: None,
            steam_parental_pin: Some("0".into()),
            master_id: SteamId::NONE,
            master_clan_id: SteamId::NONE,
            card_drops_restricted: false,
            shutdown_on_farming_finished: false,
            blacklist: HashSet::new(),
            statistics: true,
            farming_order: FarmingOrder::Unordered,
        }
    }
}

impl BotConfig {
    /// Loads `<name>.xml` from `dir`, applying environment overrides.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{name}.xml"));
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::parse(name, &content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses the element-per-key XML document.
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let mut config = Self {
            name: name.to_string(),
            ..Self::default()
        };

        let mut reader = Reader::from_str(content);

        loop {
            match reader.read_event()? {
                Event::Start(element) | Event::Empty(element) => {
                    let key = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                    let Some(value) = attribute_value(&element)? else {
                        continue;
                    };
                    config.apply_key(&key, &value);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(config)
    }

    fn apply_key(&mut self, key: &str, value: &str) {
        match key {
            "configuration" => {}
            "Enabled" => self.enabled = parse_bool(key, value),
            "SteamLogin" => self.steam_login = non_null(value),
            "SteamPassword" => self.steam_password = non_null(value),
            "SteamNickname" => self.steam_nickname = non_null(value),
            "SteamApiKey" => self.steam_api_key = non_null(value),
            "SteamParentalPIN" => self.steam_parental_pin = non_null(value),
            "SteamMasterID" => self.master_id = SteamId::new(parse_number(key, value)),
            "SteamMasterClanID" => self.master_clan_id = SteamId::new(parse_number(key, value)),
            "CardDropsRestricted" => self.card_drops_restricted = parse_bool(key, value),
            "ShutdownOnFarmingFinished" => {
                self.shutdown_on_farming_finished = parse_bool(key, value);
            }
            "Blacklist" => self.blacklist = parse_blacklist(value),
            "Statistics" => self.statistics = parse_bool(key, value),
            "FarmingOrder" => {
                self.farming_order = FarmingOrder::parse(value).unwrap_or_else(|| {
                    warn!(key, value, "unknown farming order, using unordered");
                    FarmingOrder::Unordered
                });
            }
            unknown => {
                warn!(key = unknown, "unknown configuration key ignored");
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        let var = format!(
            "DROPLORD_PASSWORD_{}",
            self.name.to_uppercase().replace('-', "_")
        );
        if let Ok(password) = std::env::var(&var) {
            self.steam_password = Some(password);
        }
    }
}

fn attribute_value(element: &quick_xml::events::BytesStart<'_>) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| Error::Config(e.to_string()))?;
        if attribute.key.as_ref() == b"value" {
            let value = attribute
                .unescape_value()
                .map_err(|e| Error::Config(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn non_null(value: &str) -> Option<String> {
    if value == NULL_VALUE {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_bool(key: &str, value: &str) -> bool {
    value.parse().unwrap_or_else(|_| {
        warn!(key, value, "invalid boolean, using false");
        false
    })
}

fn parse_number(key: &str, value: &str) -> u64 {
    value.parse().unwrap_or_else(|_| {
        warn!(key, value, "invalid number, using 0");
        0
    })
}

fn parse_blacklist(value: &str) -> HashSet<AppId> {
    value
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            match entry.parse::<u32>() {
                Ok(id) => Some(AppId::new(id)),
                Err(_) => {
                    warn!(entry, "invalid blacklist app id ignored");
                    None
                }
            }
        })
        .collect()
}

/// Scans a directory for bot configuration files, returning their names.
pub fn scan_bot_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "xml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
