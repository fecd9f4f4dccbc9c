use crate::chat_message::{ChatEvent, Platform};
use crate::connection_state::{ConnectionState, StateReporter};
use crate::errors::AppError;
use crate::locale::Locale;
use crate::socket_session::{FrameHandler, SocketSession};
use crate::twitch::commands;
use crate::twitch::line_parser::{parse_line, split_frame, TwitchLine};
use app_config::secret_string::Secret;
use std::time::Duration;
use tokio::sync::mpsc;

pub const TWITCH_WEBSOCKET_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct TwitchSettings {
  /// Channel login without the leading `#`.
  pub channel: String,
  pub websocket_url: String,
  pub keep_alive: Duration,
  pub locale: Locale,
}

impl TwitchSettings {
  pub fn new(channel: impl Into<String>) -> Self {
    Self {
      channel: channel.into(),
      websocket_url: TWITCH_WEBSOCKET_URL.to_string(),
      keep_alive: DEFAULT_KEEP_ALIVE,
      locale: Locale::default(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct TwitchCredentials {
  pub display_name: Option<String>,
  pub access_token: Option<Secret>,
}

impl TwitchCredentials {
  pub fn new(display_name: Option<String>, access_token: Option<Secret>) -> Self {
    Self {
      display_name,
      access_token,
    }
  }

  /// The token, if there's a usable one.
  pub fn token(&self) -> Option<&Secret> {
    self.access_token.as_ref().filter(|token| !token.is_blank())
  }

  /// Sending requires a real login, which needs both the token and the name it belongs to.
  pub fn can_send(&self) -> bool {
    self.token().is_some() && self.display_name.is_some()
  }
}

/// One IRC over websocket connection to a single Twitch channel.
pub struct TwitchConnection {
  settings: TwitchSettings,
  credentials: TwitchCredentials,
  events: mpsc::UnboundedSender<ChatEvent>,
  state: StateReporter,
  session: Option<SocketSession>,
}

impl TwitchConnection {
  pub fn new(
    settings: TwitchSettings,
    credentials: TwitchCredentials,
    events: mpsc::UnboundedSender<ChatEvent>,
  ) -> Self {
    let state = StateReporter::new(Platform::Twitch, events.clone());

    Self {
      settings,
      credentials,
      events,
      state,
      session: None,
    }
  }

  /// Opens the socket, requests capabilities, logs in, and joins the channel.
  ///
  /// Calling this while a session is already open does nothing.
  pub async fn connect(&mut self) -> Result<(), AppError> {
    if self.session.as_ref().is_some_and(SocketSession::is_open) {
      tracing::debug!("Twitch is already connected to #{}.", self.settings.channel);

      return Ok(());
    }

    // A session whose socket died on its own still has a finished task to reap.
    self.disconnect().await;

    tracing::info!("Connecting to Twitch chat for #{}.", self.settings.channel);
    self.state.set(ConnectionState::Connecting);

    let handshake = commands::handshake(
      &self.settings.channel,
      self.credentials.display_name.as_deref(),
      self.credentials.token(),
    );
    let handler = TwitchFrameHandler {
      events: self.events.clone(),
      locale: self.settings.locale,
    };

    match SocketSession::open(
      &self.settings.websocket_url,
      handshake,
      self.settings.keep_alive,
      handler,
      self.state.clone(),
    )
    .await
    {
      Ok(session) => {
        self.session = Some(session);

        Ok(())
      }
      Err(error) => {
        self.state.set(ConnectionState::Disconnected);

        Err(error)
      }
    }
  }

  /// Closes the socket and stops the keep alive timer.
  ///
  /// Safe to call from any state, any number of times.
  pub async fn disconnect(&mut self) {
    let Some(mut session) = self.session.take() else {
      return;
    };

    self.state.set(ConnectionState::Closing);
    session.close().await;
    self.state.set(ConnectionState::Disconnected);
  }

  /// Sends a chat line to the channel.
  ///
  /// Fails without a token, or when the socket isn't open.
  pub async fn send_message(&self, text: &str) -> Result<(), AppError> {
    if !self.credentials.can_send() {
      return Err(AppError::MissingAccessToken(Platform::Twitch));
    }

    let Some(session) = self.session.as_ref().filter(|session| session.is_open()) else {
      return Err(AppError::NotConnected(Platform::Twitch));
    };

    if self.state.current() != ConnectionState::Connected {
      return Err(AppError::NotConnected(Platform::Twitch));
    }

    if text.trim().is_empty() {
      return Err(AppError::EmptyMessage);
    }

    session.send(commands::privmsg(&self.settings.channel, text))
  }

  pub fn state(&self) -> ConnectionState {
    self.state.current()
  }

  pub fn state_reporter(&self) -> &StateReporter {
    &self.state
  }

  pub fn channel(&self) -> &str {
    &self.settings.channel
  }

  pub fn credentials(&self) -> &TwitchCredentials {
    &self.credentials
  }
}

struct TwitchFrameHandler {
  events: mpsc::UnboundedSender<ChatEvent>,
  locale: Locale,
}

impl TwitchFrameHandler {
  fn emit(&self, event: ChatEvent) {
    if self.events.send(event).is_err() {
      tracing::debug!("Dropping a Twitch event because nothing is listening.");
    }
  }
}

impl FrameHandler for TwitchFrameHandler {
  fn handle_frame(&mut self, frame: &str) -> Vec<String> {
    let mut replies = vec![];

    for line in split_frame(frame) {
      match parse_line(line, self.locale) {
        Some(TwitchLine::Ping(server)) => replies.push(commands::pong(&server)),
        Some(TwitchLine::Message(message)) => self.emit(ChatEvent::Message(message)),
        Some(TwitchLine::Delete(message_id)) => self.emit(ChatEvent::MessageDeleted {
          platform: Platform::Twitch,
          message_id,
        }),
        Some(TwitchLine::ClearUser(user_id)) => self.emit(ChatEvent::UserMessagesCleared {
          platform: Platform::Twitch,
          user_id,
        }),
        Some(TwitchLine::EmoteSets(emote_sets)) => {
          if !emote_sets.is_empty() {
            self.emit(ChatEvent::EmoteSets(emote_sets));
          }
        }
        Some(TwitchLine::Notice(notice)) => {
          tracing::warn!("Twitch sent a notice: {}", notice);
        }
        Some(TwitchLine::Ignored) | None => {}
      }
    }

    replies
  }

  fn keep_alive_frame(&self) -> String {
    commands::keep_alive_ping()
  }
}
