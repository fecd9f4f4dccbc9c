use crate::clap::CLAP_ARGS;
use crate::ledger_scope::LedgerScope;
use crate::log_level_wrapper::*;
use crate::rolling_appender_rotation::*;
use crate::secret_string::Secret;
use anyhow::anyhow;
use lazy_static::lazy_static;
use schematic::{Config, ConfigLoader};
use std::path::{Path, PathBuf};

const CONFIG_PATH_ENV_VAR: &str = "CONFIG_PATH";
const DEFAULT_CONFIG_FILEPATH: &str = "./config/config.yml";
const DEFAULT_LEDGER_FILEPATH: &str = "./config/first_interactions.json";
/// Anything below this turns the flush cycle into a busy loop for the renderer.
const MIN_FLUSH_INTERVAL_MS: u64 = 16;

lazy_static! {
  static ref APP_CONFIG: AppConfig =
    AppConfig::new().unwrap_or_else(|error| panic!("Failed to load the app config: {error}"));
}

#[derive(Debug, Config, serde::Serialize, serde::Deserialize)]
pub struct AppConfig {
  log_level: Option<LoggingConfigLevel>,
  logging_dir: Option<PathBuf>,
  #[setting(default = "duochat")]
  logging_filename_prefix: String,
  #[setting(default = "daily")]
  logging_roll_appender: RollingAppenderRotation,

  #[setting(env = "TWITCH_CHANNEL")]
  twitch_channel: Option<String>,
  /// The name used for `NICK` when a token is present.
  #[setting(env = "TWITCH_DISPLAY_NAME")]
  twitch_display_name: Option<String>,
  #[setting(env = "TWITCH_ACCESS_TOKEN")]
  twitch_access_token: Option<Secret>,

  #[setting(env = "KICK_CHANNEL")]
  kick_channel: Option<String>,
  #[setting(env = "KICK_ACCESS_TOKEN")]
  kick_access_token: Option<Secret>,

  ledger_path: Option<PathBuf>,
  #[setting(default = "persistent")]
  ledger_scope: LedgerScope,

  #[setting(default = 300)]
  flush_interval_ms: u64,
  #[setting(default = 500)]
  max_displayed_messages: usize,
  #[setting(default = 60)]
  keep_alive_seconds: u64,

  /// Language of synthesized subscription text. `en` or `pt`.
  #[setting(default = "en")]
  locale: String,
}

impl AppConfig {
  fn new() -> anyhow::Result<Self> {
    let mut loader = ConfigLoader::<AppConfig>::new();

    if !cfg!(feature = "__test_hook") {
      loader.file_optional(get_config_path())?;
    }

    let config = loader.load()?.config;

    if config.flush_interval_ms < MIN_FLUSH_INTERVAL_MS {
      return Err(anyhow!(
        "flush_interval_ms must be at least {MIN_FLUSH_INTERVAL_MS}. Got {}",
        config.flush_interval_ms
      ));
    }

    if config.max_displayed_messages == 0 {
      return Err(anyhow!("max_displayed_messages must be larger than 0."));
    }

    if let RollingAppenderRotation::Unknown(value) = &config.logging_roll_appender {
      return Err(anyhow!(
        "Unknown rolling file appender configuration: {:?}",
        value
      ));
    }

    Ok(config)
  }

  /// None if logging is disabled.
  pub fn log_level() -> Option<&'static LoggingConfigLevel> {
    APP_CONFIG.log_level.as_ref()
  }

  pub fn logging_dir() -> Option<&'static Path> {
    APP_CONFIG.logging_dir.as_deref()
  }

  pub fn logging_filename_prefix() -> &'static str {
    &APP_CONFIG.logging_filename_prefix
  }

  pub fn logging_file_roll_appender() -> &'static RollingAppenderRotation {
    &APP_CONFIG.logging_roll_appender
  }

  /// The Twitch channel login, lowercased and without the leading `#`.
  ///
  /// The `--twitch` flag takes priority over the config file.
  pub fn twitch_channel() -> Option<String> {
    CLAP_ARGS
      .twitch_channel()
      .or(APP_CONFIG.twitch_channel.as_deref())
      .and_then(normalize_channel_name)
  }

  pub fn twitch_display_name() -> Option<&'static str> {
    APP_CONFIG.twitch_display_name.as_deref()
  }

  pub fn twitch_access_token() -> Option<&'static Secret> {
    APP_CONFIG.twitch_access_token.as_ref()
  }

  /// The Kick channel slug, lowercased.
  ///
  /// The `--kick` flag takes priority over the config file.
  pub fn kick_channel() -> Option<String> {
    CLAP_ARGS
      .kick_channel()
      .or(APP_CONFIG.kick_channel.as_deref())
      .and_then(normalize_channel_name)
  }

  pub fn kick_access_token() -> Option<&'static Secret> {
    APP_CONFIG.kick_access_token.as_ref()
  }

  pub fn ledger_path() -> PathBuf {
    APP_CONFIG
      .ledger_path
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_FILEPATH))
  }

  pub fn ledger_scope() -> LedgerScope {
    APP_CONFIG.ledger_scope
  }

  pub fn flush_interval_ms() -> u64 {
    APP_CONFIG.flush_interval_ms
  }

  pub fn max_displayed_messages() -> usize {
    APP_CONFIG.max_displayed_messages
  }

  pub fn keep_alive_seconds() -> u64 {
    APP_CONFIG.keep_alive_seconds
  }

  pub fn locale() -> &'static str {
    &APP_CONFIG.locale
  }
}

fn normalize_channel_name(channel_name: &str) -> Option<String> {
  let channel_name = channel_name.trim().trim_start_matches('#').to_lowercase();

  if channel_name.is_empty() {
    return None;
  }

  Some(channel_name)
}

fn get_config_path() -> PathBuf {
  if let Some(config_path) = CLAP_ARGS.config_path() {
    return PathBuf::from(config_path);
  }

  let Some((_, config_path)) = std::env::vars().find(|(key, _)| key == CONFIG_PATH_ENV_VAR) else {
    return PathBuf::from(DEFAULT_CONFIG_FILEPATH);
  };

  PathBuf::from(config_path)
}
