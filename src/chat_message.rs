use crate::connection_state::ConnectionState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Emote id to the list of `"start-end"` UTF-16 ranges it covers in the content.
pub type EmoteRanges = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  Twitch,
  Kick,
  System,
}

impl Platform {
  /// The lowercase name used in ledger and cache keys.
  pub fn as_key(&self) -> &'static str {
    match self {
      Self::Twitch => "twitch",
      Self::Kick => "kick",
      Self::System => "system",
    }
  }
}

impl std::fmt::Display for Platform {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(formatter, "{:?}", self)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
  #[serde(rename = "type")]
  pub badge_type: String,
  pub version: String,
}

impl Badge {
  pub const DEFAULT_VERSION: &str = "1";

  pub fn new(badge_type: impl Into<String>, version: Option<&str>) -> Self {
    let version = version
      .map(str::trim)
      .filter(|version| !version.is_empty())
      .unwrap_or(Self::DEFAULT_VERSION);

    Self {
      badge_type: badge_type.into(),
      version: version.to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  /// Display name with its casing intact.
  pub username: String,
  pub id: Option<String>,
  pub color: Option<String>,
  pub badges: Vec<Badge>,
  pub avatar_url: Option<String>,
}

impl User {
  pub fn new(username: impl Into<String>) -> Self {
    Self {
      username: username.into(),
      ..Default::default()
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
  pub id: String,
  pub username: String,
  pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
  pub id: String,
  pub platform: Platform,
  pub user: User,
  pub content: String,
  /// Epoch milliseconds.
  pub timestamp: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub emotes: Option<EmoteRanges>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reply_to: Option<ReplyTo>,
  #[serde(default)]
  pub is_deleted: bool,
  #[serde(default)]
  pub is_first_message: bool,
  /// The first message flag exactly as the platform sent it, if it sent one.
  #[serde(skip)]
  pub native_first_message: Option<bool>,
  #[serde(default)]
  pub is_subscription: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub_months: Option<u32>,
}

impl ChatMessage {
  /// A message with a freshly generated id, stamped with the current time.
  pub fn new(platform: Platform, user: User, content: impl Into<String>) -> Self {
    Self {
      id: generate_message_id(),
      platform,
      user,
      content: content.into(),
      timestamp: now_millis(),
      emotes: None,
      reply_to: None,
      is_deleted: false,
      is_first_message: false,
      native_first_message: None,
      is_subscription: false,
      sub_months: None,
    }
  }

  pub fn system(content: impl Into<String>) -> Self {
    Self::new(Platform::System, User::new("System"), content)
  }

  /// The case-folded identity of the sender, `"{platform}-{username}"`.
  pub fn identity_key(&self) -> String {
    identity_key(self.platform, &self.user.username)
  }

  /// True when (platform, id) matches this message.
  pub fn is(&self, platform: Platform, message_id: &str) -> bool {
    self.platform == platform && self.id == message_id
  }
}

/// Everything a platform connection can hand to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
  Message(ChatMessage),
  MessageDeleted {
    platform: Platform,
    message_id: String,
  },
  /// A moderator cleared every message from one user.
  UserMessagesCleared {
    platform: Platform,
    user_id: String,
  },
  /// Emote set ids the logged in Twitch user may use.
  EmoteSets(Vec<String>),
  ConnectionState {
    platform: Platform,
    state: ConnectionState,
  },
}

pub fn identity_key(platform: Platform, username: &str) -> String {
  format!("{}-{}", platform.as_key(), username.trim().to_lowercase())
}

pub fn generate_message_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

pub fn now_millis() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn badge_version_defaults_to_one() {
    assert_eq!(Badge::new("vip", None).version, "1");
    assert_eq!(Badge::new("vip", Some(" ")).version, "1");
    assert_eq!(Badge::new("subscriber", Some("12")).version, "12");
  }

  #[test]
  fn identity_key_ignores_case() {
    let message = ChatMessage::new(Platform::Kick, User::new("Alice"), "hi");

    assert_eq!(message.identity_key(), "kick-alice");
    assert_eq!(identity_key(Platform::Kick, "ALICE"), message.identity_key());
  }

  #[test]
  fn generated_ids_are_unique() {
    let first = ChatMessage::system("one");
    let second = ChatMessage::system("two");

    assert_ne!(first.id, second.id);
    assert_eq!(first.platform, Platform::System);
  }

  #[test]
  fn serialized_message_uses_camel_case() {
    let mut message = ChatMessage::new(Platform::Twitch, User::new("Gabe"), "hello");
    message.is_first_message = true;

    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(value["platform"], "twitch");
    assert_eq!(value["isFirstMessage"], true);
    assert!(value.get("nativeFirstMessage").is_none());
    assert!(value.get("emotes").is_none());
  }
}
