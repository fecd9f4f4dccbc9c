use crate::errors::AppError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Event names used on the Pusher socket.
pub struct KickEvent;

impl KickEvent {
  pub const CHAT_MESSAGE: &str = "App\\Events\\ChatMessageEvent";
  pub const MESSAGE_DELETED: &str = "App\\Events\\MessageDeletedEvent";
  pub const SUBSCRIPTION: &str = "App\\Events\\SubscriptionEvent";
  pub const CHANNEL_SUBSCRIPTION: &str = "App\\Events\\ChannelSubscriptionEvent";
  pub const GIFTED_SUBSCRIPTIONS: &str = "App\\Events\\GiftedSubscriptionsEvent";
  pub const PUSHER_PING: &str = "pusher:ping";
  pub const PUSHER_PONG: &str = "pusher:pong";
  pub const PUSHER_SUBSCRIBE: &str = "pusher:subscribe";
  pub const PUSHER_ERROR: &str = "pusher:error";
  pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
}

/// The outer frame of everything sent over the Pusher socket.
#[derive(Debug, Deserialize)]
pub struct PusherEnvelope {
  pub event: String,
  /// Usually a JSON encoded string, but Pusher's own events send plain objects.
  #[serde(default)]
  pub data: Value,
  #[serde(default)]
  pub channel: Option<String>,
}

impl PusherEnvelope {
  /// Decodes `data`, unwrapping the inner JSON string if there is one.
  pub fn payload<T>(&self) -> Result<T, AppError>
  where
    T: DeserializeOwned,
  {
    match &self.data {
      Value::String(encoded_payload) => Ok(serde_json::from_str(encoded_payload)?),
      payload => Ok(serde_json::from_value(payload.clone())?),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickChatMessage {
  pub id: String,
  #[serde(default)]
  pub content: String,
  /// RFC 3339.
  #[serde(default)]
  pub created_at: Option<String>,
  pub sender: KickSender,
  #[serde(default)]
  pub metadata: Option<KickMessageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickSender {
  pub id: u64,
  pub username: String,
  #[serde(default)]
  pub slug: Option<String>,
  #[serde(default)]
  pub identity: Option<KickIdentity>,
  /// Kick sends a literal `"null"` for users without a picture.
  #[serde(default, alias = "profilepic")]
  pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KickIdentity {
  #[serde(default)]
  pub color: Option<String>,
  #[serde(default)]
  pub badges: Vec<KickBadge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickBadge {
  #[serde(rename = "type")]
  pub badge_type: String,
  #[serde(default)]
  pub text: Option<String>,
  /// Months for subscriber badges, gift totals for gifter badges.
  #[serde(default)]
  pub count: Option<u32>,
}

/// Present when the message is a reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KickMessageMetadata {
  #[serde(default)]
  pub original_sender: Option<KickOriginalSender>,
  #[serde(default)]
  pub original_message: Option<KickOriginalMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickOriginalSender {
  pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickOriginalMessage {
  pub id: String,
  #[serde(default)]
  pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickDeletedMessage {
  pub message: KickMessageReference,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickMessageReference {
  pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickSubscription {
  pub username: String,
  #[serde(default)]
  pub months: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickGiftedSubscriptions {
  pub gifter_username: String,
  #[serde(default)]
  pub gifted_usernames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KickChannelMetadata {
  /// The channel id used for `channel.{id}` subscriptions.
  pub id: u64,
  pub chatroom: KickChatroom,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KickChatroom {
  pub id: u64,
}

/// The chat history endpoint has been seen returning the messages wrapped in
/// `data.messages`, directly in `data`, or as a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KickHistoryResponse {
  Wrapped { data: KickHistoryData },
  List(Vec<Value>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KickHistoryData {
  Messages { messages: Vec<Value> },
  List(Vec<Value>),
}

impl KickHistoryResponse {
  /// Every message that could be read, newest first as Kick sends them.
  ///
  /// Entries that don't look like chat messages are skipped.
  pub fn into_messages(self) -> Vec<KickChatMessage> {
    let values = match self {
      Self::Wrapped {
        data: KickHistoryData::Messages { messages },
      } => messages,
      Self::Wrapped {
        data: KickHistoryData::List(messages),
      } => messages,
      Self::List(messages) => messages,
    };

    values
      .into_iter()
      .filter_map(|value| match serde_json::from_value(value) {
        Ok(message) => Some(message),
        Err(error) => {
          tracing::trace!("Skipping an unreadable Kick history entry: {}", error);

          None
        }
      })
      .collect()
  }
}
