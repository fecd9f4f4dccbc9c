use clap::{Arg, Command};
use lazy_static::lazy_static;

lazy_static! {
  pub static ref CLAP_ARGS: ClapArgs = ClapArgs::new();
}

pub struct ClapArgs {
  args: clap::ArgMatches,
}

impl ClapArgs {
  const TWITCH_CHANNEL: &'static str = "twitch_channel";
  const KICK_CHANNEL: &'static str = "kick_channel";
  const CONFIG_PATH: &'static str = "config_path";

  pub fn new() -> Self {
    let args = Self::setup_args();

    Self { args }
  }

  pub fn twitch_channel(&self) -> Option<&str> {
    self
      .args
      .get_one::<String>(Self::TWITCH_CHANNEL)
      .map(String::as_str)
  }

  pub fn kick_channel(&self) -> Option<&str> {
    self
      .args
      .get_one::<String>(Self::KICK_CHANNEL)
      .map(String::as_str)
  }

  pub fn config_path(&self) -> Option<&str> {
    self
      .args
      .get_one::<String>(Self::CONFIG_PATH)
      .map(String::as_str)
  }

  fn command() -> Command {
    Command::new("duochat")
      .about("Merges Twitch and Kick chat into one timeline.")
      .arg(
        Arg::new(Self::TWITCH_CHANNEL)
          .short('t')
          .long("twitch")
          .action(clap::ArgAction::Set)
          .help("The Twitch channel to join. Overrides the config file."),
      )
      .arg(
        Arg::new(Self::KICK_CHANNEL)
          .short('k')
          .long("kick")
          .action(clap::ArgAction::Set)
          .help("The Kick channel slug to join. Overrides the config file."),
      )
      .arg(
        Arg::new(Self::CONFIG_PATH)
          .short('c')
          .long("config")
          .action(clap::ArgAction::Set)
          .help("Path to the YAML config file. Defaults to ./config/config.yml"),
      )
  }

  /// Test binaries get their own arguments from the harness, so they're never parsed there.
  fn setup_args() -> clap::ArgMatches {
    if cfg!(feature = "__test_hook") {
      return Self::command().get_matches_from(["duochat"]);
    }

    Self::command().get_matches()
  }
}

impl Default for ClapArgs {
  fn default() -> Self {
    Self::new()
  }
}
