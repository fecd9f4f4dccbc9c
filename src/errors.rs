use crate::chat_message::Platform;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{0}")]
  UrlParseError(#[from] url::ParseError),

  #[error("{0}")]
  ReqwestError(#[from] reqwest::Error),

  #[error("{0}")]
  SerdeError(#[from] serde_json::Error),

  #[error("{0}")]
  TungsteniteError(#[from] tungstenite::error::Error),

  #[error("Encountered a Tokio IO error: `{:?}`", .0)]
  TokioIOError(#[from] tokio::io::Error),

  #[error("Not connected to {} chat.", .0)]
  NotConnected(Platform),

  #[error("Sending messages to {} chat requires logging in first.", .0)]
  MissingAccessToken(Platform),

  #[error("No {} channel is configured.", .0)]
  PlatformNotConfigured(Platform),

  #[error("The Kick chatroom for this channel hasn't been resolved, so messages can't be sent.")]
  MissingChatroomId,

  #[error("Could not find the Kick channel `{}` through any of the metadata sources.", channel)]
  KickChannelUnresolved { channel: String },

  #[error("Refusing to send an empty chat message.")]
  EmptyMessage,

  #[error(
    "Received a failed response from {}. Code: {}. Body: {:?}",
    location,
    code,
    body
  )]
  FailedResponse {
    location: &'static str,
    code: u16,
    body: String,
  },

  #[error("Failed to hand a message to the socket task: {}", error)]
  MpscConnectionClosed { error: String },
}

impl AppError {
  /// The text shown to the user when a message they typed couldn't be sent.
  pub fn user_facing_reason(&self) -> String {
    match self {
      Self::FailedResponse { code: 401, .. } => {
        "Your login has expired. Log in again to keep chatting.".to_string()
      }
      Self::FailedResponse { code: 403, .. } => {
        "The platform refused the message. You may be banned, timed out, or in a followers-only chat."
          .to_string()
      }
      Self::FailedResponse { code: 429, .. } => {
        "You're sending messages too quickly. Wait a moment and try again.".to_string()
      }
      Self::ReqwestError(error) if error.is_connect() || error.is_timeout() => {
        "The chat service couldn't be reached. Check your connection.".to_string()
      }
      _ => self.to_string(),
    }
  }
}
