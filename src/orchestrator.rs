use crate::avatar::AvatarCache;
use crate::chat_message::{ChatEvent, ChatMessage, Platform, User};
use crate::connection_state::ConnectionState;
use crate::errors::AppError;
use crate::ingestion::{FirstInteractionLedger, FlushReport, IngestionBuffer};
use crate::kick::{KickConnection, KickSettings};
use crate::locale::Locale;
use crate::twitch::{TwitchConnection, TwitchCredentials, TwitchSettings};
use app_config::secret_string::Secret;
use app_config::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(300);

/// What every platform connection exposes to the orchestrator.
pub trait PlatformConnection {
  fn platform(&self) -> Platform;
  fn state(&self) -> ConnectionState;
  async fn connect(&mut self) -> Result<(), AppError>;
  async fn disconnect(&mut self);
  async fn send_message(&self, text: &str) -> Result<(), AppError>;
}

impl PlatformConnection for TwitchConnection {
  fn platform(&self) -> Platform {
    Platform::Twitch
  }

  fn state(&self) -> ConnectionState {
    TwitchConnection::state(self)
  }

  async fn connect(&mut self) -> Result<(), AppError> {
    TwitchConnection::connect(self).await
  }

  async fn disconnect(&mut self) {
    TwitchConnection::disconnect(self).await
  }

  async fn send_message(&self, text: &str) -> Result<(), AppError> {
    TwitchConnection::send_message(self, text).await
  }
}

impl PlatformConnection for KickConnection {
  fn platform(&self) -> Platform {
    Platform::Kick
  }

  fn state(&self) -> ConnectionState {
    KickConnection::state(self)
  }

  async fn connect(&mut self) -> Result<(), AppError> {
    KickConnection::connect(self).await
  }

  async fn disconnect(&mut self) {
    KickConnection::disconnect(self).await
  }

  async fn send_message(&self, text: &str) -> Result<(), AppError> {
    KickConnection::send_message(self, text).await
  }
}

/// Receives everything the orchestrator wants shown.
pub trait ChatRenderer {
  /// Called after each flush that moved messages, with the newly displayed messages in order.
  fn render(&mut self, new_messages: &[ChatMessage], report: FlushReport);

  fn connection_changed(&mut self, _platform: Platform, _state: ConnectionState) {}

  fn send_failed(&mut self, _platform: Option<Platform>, _reason: &str) {}
}

/// Requests coming from the user.
#[derive(Debug)]
pub enum UserCommand {
  /// Without a platform the message goes to the default one.
  Send {
    platform: Option<Platform>,
    text: String,
  },
  Pause,
  Resume,
  ApplyCredentials(Credentials),
  Shutdown,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
  pub twitch: TwitchCredentials,
  pub kick_access_token: Option<Secret>,
}

impl Credentials {
  pub fn from_app_config() -> Self {
    Self {
      twitch: TwitchCredentials::new(
        AppConfig::twitch_display_name().map(str::to_string),
        AppConfig::twitch_access_token().cloned(),
      ),
      kick_access_token: AppConfig::kick_access_token().cloned(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
  pub twitch: Option<TwitchSettings>,
  pub kick: Option<KickSettings>,
  pub flush_interval: Duration,
  pub max_displayed_messages: usize,
}

impl Default for OrchestratorSettings {
  fn default() -> Self {
    Self {
      twitch: None,
      kick: None,
      flush_interval: DEFAULT_FLUSH_INTERVAL,
      max_displayed_messages: crate::ingestion::buffer::DEFAULT_MAX_DISPLAYED_MESSAGES,
    }
  }
}

impl OrchestratorSettings {
  pub fn from_app_config() -> Self {
    let keep_alive = Duration::from_secs(AppConfig::keep_alive_seconds());
    let locale = Locale::from(AppConfig::locale());

    Self {
      twitch: AppConfig::twitch_channel().map(|channel| TwitchSettings {
        keep_alive,
        locale,
        ..TwitchSettings::new(channel)
      }),
      kick: AppConfig::kick_channel().map(|channel| KickSettings {
        keep_alive,
        locale,
        ..KickSettings::new(channel)
      }),
      flush_interval: Duration::from_millis(AppConfig::flush_interval_ms()),
      max_displayed_messages: AppConfig::max_displayed_messages(),
    }
  }
}

/// Owns both platform connections and the state fed by them.
///
/// This is the only writer of the buffer, the ledger, and the avatar cache.
pub struct ChatOrchestrator {
  settings: OrchestratorSettings,
  credentials: Credentials,
  twitch: Option<TwitchConnection>,
  kick: Option<KickConnection>,
  events: mpsc::UnboundedSender<ChatEvent>,
  event_receiver: mpsc::UnboundedReceiver<ChatEvent>,
  buffer: IngestionBuffer,
  ledger: FirstInteractionLedger,
  avatars: Arc<AvatarCache>,
  emote_sets: Vec<String>,
}

impl ChatOrchestrator {
  pub fn new(
    settings: OrchestratorSettings,
    credentials: Credentials,
    ledger: FirstInteractionLedger,
    avatars: Arc<AvatarCache>,
  ) -> Self {
    let (events, event_receiver) = mpsc::unbounded_channel();
    let buffer = IngestionBuffer::new(settings.max_displayed_messages);

    Self {
      settings,
      credentials,
      twitch: None,
      kick: None,
      events,
      event_receiver,
      buffer,
      ledger,
      avatars,
      emote_sets: vec![],
    }
  }

  /// Connects every configured platform with the current credentials.
  pub async fn start(&mut self) {
    self.restart_connections().await;
  }

  /// Replaces the credentials and reconnects.
  ///
  /// The previous connections are fully disconnected before the new ones are created.
  pub async fn apply_credentials(&mut self, credentials: Credentials) {
    tracing::info!("Credentials changed. Reconnecting chat.");

    self.credentials = credentials;
    self.restart_connections().await;
  }

  async fn restart_connections(&mut self) {
    teardown(&mut self.twitch).await;
    teardown(&mut self.kick).await;

    // Whatever the old connections queued is ingested here, so their state changes never
    // reach the renderer after the new connections start.
    let stale_events = self.ingest_pending();
    tracing::trace!("Ingested {} events left by the old connections.", stale_events);

    let mut twitch = self.settings.twitch.clone().map(|settings| {
      TwitchConnection::new(settings, self.credentials.twitch.clone(), self.events.clone())
    });
    let mut kick = self.settings.kick.clone().map(|settings| {
      KickConnection::new(
        settings,
        self.credentials.kick_access_token.clone(),
        self.events.clone(),
      )
    });

    tokio::join!(connect(twitch.as_mut()), connect(kick.as_mut()));

    self.twitch = twitch;
    self.kick = kick;
  }

  /// Runs the ledger, then queues the message or applies the moderation signal.
  pub fn ingest(&mut self, event: ChatEvent) {
    match event {
      ChatEvent::Message(mut message) => {
        self.ledger.observe(&mut message);
        self.buffer.push(message);
      }
      ChatEvent::MessageDeleted {
        platform,
        message_id,
      } => {
        if !self.buffer.mark_deleted(platform, &message_id) {
          tracing::trace!("Deleted {} message {} was never shown.", platform, message_id);
        }
      }
      ChatEvent::UserMessagesCleared { platform, user_id } => {
        let cleared = self.buffer.mark_user_cleared(platform, &user_id);

        tracing::debug!("Cleared {} {} messages from user {}.", cleared, platform, user_id);
      }
      ChatEvent::EmoteSets(emote_sets) => self.emote_sets = emote_sets,
      ChatEvent::ConnectionState { .. } => {}
    }
  }

  /// Handles every event waiting in the channel without blocking.
  pub fn ingest_pending(&mut self) -> usize {
    let mut ingested = 0;

    while let Ok(event) = self.event_receiver.try_recv() {
      self.ingest(event);
      ingested += 1;
    }

    ingested
  }

  /// Waits for the next event from either connection.
  pub async fn next_event(&mut self) -> Option<ChatEvent> {
    self.event_receiver.recv().await
  }

  /// Moves pending messages to the displayed list.
  ///
  /// Newly displayed messages without an avatar get one from the cache, or start a lookup.
  pub fn flush(&mut self) -> (FlushReport, Vec<ChatMessage>) {
    let report = self.buffer.flush();
    let new_count = report.drained.min(self.buffer.displayed_len());
    let mut new_messages: Vec<ChatMessage> = self
      .buffer
      .displayed()
      .skip(self.buffer.displayed_len() - new_count)
      .cloned()
      .collect();

    for message in &mut new_messages {
      if message.user.avatar_url.is_none() {
        message.user.avatar_url = self.avatar_for(message.platform, &message.user.username);
      }
    }

    (report, new_messages)
  }

  /// The cached avatar for the user, starting a background lookup on a miss.
  pub fn avatar_for(&self, platform: Platform, username: &str) -> Option<String> {
    if platform == Platform::System {
      return None;
    }

    if let Some(avatar_url) = self.avatars.cached(platform, username) {
      return Some(avatar_url);
    }

    if !self.avatars.is_in_flight(platform, username) {
      let avatars = self.avatars.clone();
      let username = username.to_string();

      tokio::spawn(async move {
        avatars.resolve(platform, &username).await;
      });
    }

    None
  }

  /// Sends through the chosen platform, or the default one.
  ///
  /// Twitch doesn't echo a user's own messages, so a successful Twitch send is queued locally.
  pub async fn send_message(&mut self, platform: Option<Platform>, text: &str) -> Result<(), AppError> {
    let platform = platform.unwrap_or_else(|| self.default_platform());

    match platform {
      Platform::Twitch => {
        let Some(twitch) = &self.twitch else {
          return Err(AppError::PlatformNotConfigured(Platform::Twitch));
        };

        twitch.send_message(text).await?;

        let echo = self.local_echo(text);
        self.ingest(ChatEvent::Message(echo));
      }
      Platform::Kick => {
        let Some(kick) = &self.kick else {
          return Err(AppError::PlatformNotConfigured(Platform::Kick));
        };

        kick.send_message(text).await?;
      }
      Platform::System => return Err(AppError::PlatformNotConfigured(Platform::System)),
    }

    Ok(())
  }

  /// Twitch when it's connected, otherwise Kick when it's configured.
  pub fn default_platform(&self) -> Platform {
    let twitch_connected = self
      .twitch
      .as_ref()
      .is_some_and(|twitch| twitch.state() == ConnectionState::Connected);

    if !twitch_connected && self.kick.is_some() {
      Platform::Kick
    } else {
      Platform::Twitch
    }
  }

  fn local_echo(&self, text: &str) -> ChatMessage {
    let username = self
      .credentials
      .twitch
      .display_name
      .clone()
      .unwrap_or_else(|| "me".to_string());

    ChatMessage::new(Platform::Twitch, User::new(username), text.trim())
  }

  /// Runs until a `Shutdown` command arrives or the command channel closes.
  pub async fn run<R>(&mut self, renderer: &mut R, mut commands: mpsc::UnboundedReceiver<UserCommand>)
  where
    R: ChatRenderer,
  {
    let mut flush_timer = interval(self.settings.flush_interval);
    flush_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        biased;

        command = commands.recv() => match command {
          None | Some(UserCommand::Shutdown) => break,
          Some(UserCommand::Send { platform, text }) => {
            if let Err(error) = self.send_message(platform, &text).await {
              tracing::warn!("Failed to send a chat message: {}", error);
              renderer.send_failed(platform, &error.user_facing_reason());
            }
          }
          Some(UserCommand::Pause) => self.buffer.pause(),
          Some(UserCommand::Resume) => self.buffer.resume(),
          Some(UserCommand::ApplyCredentials(credentials)) => {
            self.apply_credentials(credentials).await;
          }
        },

        Some(event) = self.event_receiver.recv() => {
          if let ChatEvent::ConnectionState { platform, state } = &event {
            renderer.connection_changed(*platform, *state);
          }

          self.ingest(event);
        }

        _ = flush_timer.tick() => {
          let (report, new_messages) = self.flush();

          if report.drained > 0 {
            renderer.render(&new_messages, report);
          }
        }
      }
    }

    self.shutdown().await;
  }

  /// Disconnects everything and writes the ledger out.
  pub async fn shutdown(&mut self) {
    teardown(&mut self.twitch).await;
    teardown(&mut self.kick).await;
    self.ledger.persist();
  }

  pub fn connection_state(&self, platform: Platform) -> ConnectionState {
    match platform {
      Platform::Twitch => self.twitch.as_ref().map(PlatformConnection::state),
      Platform::Kick => self.kick.as_ref().map(PlatformConnection::state),
      Platform::System => None,
    }
    .unwrap_or_default()
  }

  pub fn buffer(&self) -> &IngestionBuffer {
    &self.buffer
  }

  pub fn buffer_mut(&mut self) -> &mut IngestionBuffer {
    &mut self.buffer
  }

  pub fn ledger(&self) -> &FirstInteractionLedger {
    &self.ledger
  }

  pub fn emote_sets(&self) -> &[String] {
    &self.emote_sets
  }

  pub fn twitch(&self) -> Option<&TwitchConnection> {
    self.twitch.as_ref()
  }

  pub fn kick(&self) -> Option<&KickConnection> {
    self.kick.as_ref()
  }
}

async fn connect<C>(connection: Option<&mut C>)
where
  C: PlatformConnection,
{
  let Some(connection) = connection else {
    return;
  };

  if let Err(error) = connection.connect().await {
    tracing::error!("Failed to connect to {} chat: {}", connection.platform(), error);
  }
}

/// Disconnects and drops the connection, waiting until it's fully closed.
async fn teardown<C>(slot: &mut Option<C>)
where
  C: PlatformConnection,
{
  if let Some(mut connection) = slot.take() {
    connection.disconnect().await;

    debug_assert_eq!(connection.state(), ConnectionState::Disconnected);
  }
}
