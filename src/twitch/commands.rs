use app_config::secret_string::Secret;
use irc::proto::{CapSubCommand, Command, Message as IrcMessage};
use rand::Rng;

pub const REQUESTED_CAPABILITIES: &str = "twitch.tv/tags twitch.tv/commands";
/// Twitch accepts any password for `justinfan` logins.
pub const ANONYMOUS_PASSWORD: &str = "SCHMOOPIIE";
pub const ANONYMOUS_NICK_PREFIX: &str = "justinfan";
pub const KEEP_ALIVE_SERVER: &str = "tmi.twitch.tv";

/// The lines sent right after the socket opens, in order.
///
/// Without a token the login is anonymous and read only.
pub fn handshake(channel: &str, display_name: Option<&str>, token: Option<&Secret>) -> Vec<String> {
  let (password, nickname) = match (token, display_name) {
    (Some(token), Some(display_name)) if !token.is_blank() => (
      format!("oauth:{}", token.expose()),
      display_name.trim().to_lowercase(),
    ),
    _ => (ANONYMOUS_PASSWORD.to_string(), anonymous_nickname()),
  };

  vec![
    to_line(Command::CAP(
      None,
      CapSubCommand::REQ,
      Some(REQUESTED_CAPABILITIES.to_string()),
      None,
    )),
    to_line(Command::PASS(password)),
    to_line(Command::NICK(nickname)),
    join(channel),
  ]
}

pub fn anonymous_nickname() -> String {
  let number: u32 = rand::rng().random_range(10_000..100_000);

  format!("{ANONYMOUS_NICK_PREFIX}{number}")
}

pub fn join(channel: &str) -> String {
  to_line(Command::JOIN(channel_target(channel), None, None))
}

pub fn pong(server: &str) -> String {
  to_line(Command::PONG(server.to_string(), None))
}

pub fn keep_alive_ping() -> String {
  to_line(Command::PING(KEEP_ALIVE_SERVER.to_string(), None))
}

/// A chat line for the channel. Line breaks are flattened since they'd end the IRC line.
pub fn privmsg(channel: &str, text: &str) -> String {
  let text = text.replace(['\r', '\n'], " ");

  to_line(Command::PRIVMSG(channel_target(channel), text.trim().to_string()))
}

fn channel_target(channel: &str) -> String {
  format!("#{}", channel.trim_start_matches('#'))
}

fn to_line(command: Command) -> String {
  IrcMessage::from(command).to_string()
}
