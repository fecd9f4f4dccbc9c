use crate::chat_message::{ChatEvent, Platform};
use crate::connection_state::{ConnectionState, StateReporter};
use crate::errors::AppError;
use crate::kick::api::{KickApi, KickEndpoints};
use crate::kick::event_parser::{normalize_chat_message, parse_frame, KickFrame};
use crate::kick::payloads::{KickChannelMetadata, KickEvent};
use crate::locale::Locale;
use crate::socket_session::{FrameHandler, SocketSession};
use app_config::secret_string::Secret;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct KickSettings {
  /// The channel slug.
  pub channel: String,
  pub endpoints: KickEndpoints,
  pub keep_alive: Duration,
  pub locale: Locale,
}

impl KickSettings {
  pub fn new(channel: impl Into<String>) -> Self {
    Self {
      channel: channel.into(),
      endpoints: KickEndpoints::default(),
      keep_alive: DEFAULT_KEEP_ALIVE,
      locale: Locale::default(),
    }
  }
}

/// A Pusher socket subscribed to one Kick channel, plus the REST calls around it.
pub struct KickConnection {
  settings: KickSettings,
  api: KickApi,
  access_token: Option<Secret>,
  events: mpsc::UnboundedSender<ChatEvent>,
  state: StateReporter,
  channel_metadata: Option<KickChannelMetadata>,
  session: Option<SocketSession>,
}

impl KickConnection {
  pub fn new(
    settings: KickSettings,
    access_token: Option<Secret>,
    events: mpsc::UnboundedSender<ChatEvent>,
  ) -> Self {
    let state = StateReporter::new(Platform::Kick, events.clone());
    let api = KickApi::new(settings.endpoints.clone());

    Self {
      settings,
      api,
      access_token,
      events,
      state,
      channel_metadata: None,
      session: None,
    }
  }

  /// Resolves the chatroom, replays recent history, then subscribes to the live events.
  ///
  /// If the chatroom can't be resolved this logs and returns without an error,
  /// leaving the connection `Disconnected`.
  pub async fn connect(&mut self) -> Result<(), AppError> {
    if self.session.as_ref().is_some_and(SocketSession::is_open) {
      tracing::debug!("Kick is already connected to {}.", self.settings.channel);

      return Ok(());
    }

    self.disconnect().await;

    tracing::info!("Connecting to Kick chat for {}.", self.settings.channel);
    self.state.set(ConnectionState::Connecting);

    let channel_metadata = match self.api.resolve_channel(&self.settings.channel).await {
      Ok(channel_metadata) => channel_metadata,
      Err(error) => {
        tracing::error!("Kick chat won't start. Reason: {}", error);
        self.state.set(ConnectionState::Disconnected);

        return Ok(());
      }
    };
    let chatroom_id = channel_metadata.chatroom.id;
    let channel_id = channel_metadata.id;
    self.channel_metadata = Some(channel_metadata);

    self.replay_history(chatroom_id).await;

    let opening_frames = vec![
      subscribe_frame(&format!("chatrooms.{chatroom_id}.v2")),
      subscribe_frame(&format!("channel.{channel_id}")),
    ];
    let handler = KickFrameHandler {
      events: self.events.clone(),
      locale: self.settings.locale,
    };

    match SocketSession::open(
      &self.settings.endpoints.pusher_url,
      opening_frames,
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

  /// History is optional. Failing to fetch it only loses the backlog.
  async fn replay_history(&self, chatroom_id: u64) {
    let messages = match self
      .api
      .recent_messages(chatroom_id, self.access_token.as_ref())
      .await
    {
      Ok(messages) => messages,
      Err(error) => {
        tracing::warn!("Failed to fetch the Kick chat history: {}", error);

        return;
      }
    };

    tracing::debug!("Replaying {} Kick history messages.", messages.len());

    for message in messages.into_iter().rev() {
      if self
        .events
        .send(ChatEvent::Message(normalize_chat_message(message)))
        .is_err()
      {
        return;
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

  /// Posts a chat message through the public API.
  ///
  /// Fails before any network call without a token or a resolved chatroom.
  pub async fn send_message(&self, text: &str) -> Result<(), AppError> {
    let chatroom_id = self
      .channel_metadata
      .as_ref()
      .map(|channel_metadata| channel_metadata.chatroom.id);

    self
      .api
      .send_message(chatroom_id, self.access_token.as_ref(), text)
      .await
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

  pub fn chatroom_id(&self) -> Option<u64> {
    self
      .channel_metadata
      .as_ref()
      .map(|channel_metadata| channel_metadata.chatroom.id)
  }

  pub fn can_send(&self) -> bool {
    self
      .access_token
      .as_ref()
      .is_some_and(|token| !token.is_blank())
  }
}

fn subscribe_frame(channel: &str) -> String {
  json!({
    "event": KickEvent::PUSHER_SUBSCRIBE,
    "data": { "auth": "", "channel": channel },
  })
  .to_string()
}

fn pusher_frame(event: &str) -> String {
  json!({ "event": event, "data": {} }).to_string()
}

struct KickFrameHandler {
  events: mpsc::UnboundedSender<ChatEvent>,
  locale: Locale,
}

impl KickFrameHandler {
  fn emit(&self, event: ChatEvent) {
    if self.events.send(event).is_err() {
      tracing::debug!("Dropping a Kick event because nothing is listening.");
    }
  }
}

impl FrameHandler for KickFrameHandler {
  fn handle_frame(&mut self, frame: &str) -> Vec<String> {
    match parse_frame(frame, self.locale) {
      Some(KickFrame::Message(message)) => self.emit(ChatEvent::Message(message)),
      Some(KickFrame::Delete(message_id)) => self.emit(ChatEvent::MessageDeleted {
        platform: Platform::Kick,
        message_id,
      }),
      Some(KickFrame::Ping) => return vec![pusher_frame(KickEvent::PUSHER_PONG)],
      Some(KickFrame::Ignored) | None => {}
    }

    vec![]
  }

  fn keep_alive_frame(&self) -> String {
    pusher_frame(KickEvent::PUSHER_PING)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing_helper_methods::{next_chat_event, serve_http, FakeSocketServer};
  use axum::extract::{Query, State};
  use axum::http::{HeaderMap, StatusCode};
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::Value;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  #[test]
  fn subscribe_frame_matches_pusher() {
    let frame: serde_json::Value = serde_json::from_str(&subscribe_frame("chatrooms.5.v2")).unwrap();

    assert_eq!(
      frame,
      json!({
        "event": "pusher:subscribe",
        "data": { "auth": "", "channel": "chatrooms.5.v2" }
      })
    );
  }

  #[test]
  fn pusher_ping_is_answered() {
    let (events, mut receiver) = mpsc::unbounded_channel();
    let mut handler = KickFrameHandler {
      events,
      locale: Locale::English,
    };

    let replies = handler.handle_frame(r#"{"event":"pusher:ping","data":{}}"#);

    assert_eq!(replies, vec![pusher_frame(KickEvent::PUSHER_PONG)]);
    assert!(receiver.try_recv().is_err());
  }

  #[test]
  fn bad_frames_are_swallowed() {
    let (events, mut receiver) = mpsc::unbounded_channel();
    let mut handler = KickFrameHandler {
      events,
      locale: Locale::English,
    };

    assert!(handler.handle_frame("{{{").is_empty());
    assert!(receiver.try_recv().is_err());
  }

  #[tokio::test]
  async fn sending_without_a_token_fails() {
    let (events, _receiver) = mpsc::unbounded_channel();
    let connection = KickConnection::new(KickSettings::new("xqc"), None, events);

    let result = connection.send_message("hello").await;

    assert!(matches!(
      result,
      Err(AppError::MissingAccessToken(Platform::Kick))
    ));
  }

  #[derive(Clone, Default)]
  struct FakeKick {
    direct_metadata_hits: Arc<AtomicUsize>,
    /// Authorization header and body of every posted message.
    posted: Arc<Mutex<Vec<(Option<String>, Value)>>>,
  }

  fn history_entry(id: &str, username: &str, content: &str) -> Value {
    json!({
      "id": id,
      "content": content,
      "created_at": "2024-01-01T00:00:00+00:00",
      "sender": { "id": 5, "username": username, "profile_pic": "null" }
    })
  }

  async fn broken_proxy() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
  }

  async fn working_proxy(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    assert!(params["url"].ends_with("/api/v1/channels/xqc"));

    Json(json!({ "id": 668, "slug": "xqc", "chatroom": { "id": 4321 } }))
  }

  async fn direct_metadata(State(fake_kick): State<FakeKick>) -> StatusCode {
    fake_kick.direct_metadata_hits.fetch_add(1, Ordering::SeqCst);

    StatusCode::NOT_FOUND
  }

  async fn history() -> Json<Value> {
    Json(json!({
      "data": {
        "messages": [
          history_entry("h-2", "Bob", "newest"),
          { "unexpected": true },
          history_entry("h-1", "Alice", "oldest"),
        ]
      }
    }))
  }

  async fn post_message(
    State(fake_kick): State<FakeKick>,
    headers: HeaderMap,
    Json(body): Json<Value>,
  ) -> (StatusCode, &'static str) {
    let authorization = headers
      .get("authorization")
      .and_then(|value| value.to_str().ok())
      .map(str::to_string);
    fake_kick.posted.lock().unwrap().push((authorization, body));

    (StatusCode::FORBIDDEN, "banned")
  }

  async fn fake_kick_endpoints(
    fake_kick: FakeKick,
    pusher: &FakeSocketServer,
  ) -> KickEndpoints {
    let router = Router::new()
      .route("/broken", get(broken_proxy))
      .route("/proxy", get(working_proxy))
      .route("/api/v1/channels/{channel}", get(direct_metadata))
      .route(
        "/public/v1/chatrooms/{chatroom_id}/messages",
        get(history).post(post_message),
      )
      .with_state(fake_kick);
    let base_url = serve_http(router).await;

    KickEndpoints {
      site_url: base_url.clone(),
      public_api_url: base_url.clone(),
      pusher_url: pusher.url.clone(),
      cors_proxies: vec![format!("{base_url}broken?url="), format!("{base_url}proxy?url=")],
      ..Default::default()
    }
  }

  fn chat_frame(data: Value) -> String {
    json!({
      "event": KickEvent::CHAT_MESSAGE,
      "data": data.to_string(),
      "channel": "chatrooms.4321.v2",
    })
    .to_string()
  }

  #[tokio::test]
  async fn connecting_resolves_replays_and_subscribes() {
    let fake_kick = FakeKick::default();
    let mut pusher = FakeSocketServer::start().await;
    let settings = KickSettings {
      endpoints: fake_kick_endpoints(fake_kick.clone(), &pusher).await,
      ..KickSettings::new("xqc")
    };
    let (events, mut receiver) = mpsc::unbounded_channel();
    let mut connection = KickConnection::new(settings, None, events);

    connection.connect().await.unwrap();

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(connection.chatroom_id(), Some(4321));
    assert_eq!(fake_kick.direct_metadata_hits.load(Ordering::SeqCst), 0);

    let ChatEvent::Message(oldest) = next_chat_event(&mut receiver).await else {
      panic!("Expected a history message.");
    };
    let ChatEvent::Message(newest) = next_chat_event(&mut receiver).await else {
      panic!("Expected a history message.");
    };
    assert_eq!(oldest.content, "oldest");
    assert_eq!(newest.content, "newest");
    assert_eq!(
      oldest.user.avatar_url.as_deref(),
      Some("https://files.kick.com/images/user/5/profile_image/conversion/default-thumb.webp")
    );

    let subscriptions: Vec<Value> = pusher
      .frames(2)
      .await
      .iter()
      .map(|frame| serde_json::from_str(frame).unwrap())
      .collect();
    assert_eq!(subscriptions[0]["event"], "pusher:subscribe");
    assert_eq!(subscriptions[0]["data"]["channel"], "chatrooms.4321.v2");
    assert_eq!(subscriptions[1]["data"]["channel"], "channel.668");

    pusher.push(r#"{"event":"pusher:ping","data":{}}"#);
    let pong: Value = serde_json::from_str(&pusher.next_frame().await).unwrap();
    assert_eq!(pong["event"], "pusher:pong");

    pusher.push(chat_frame(history_entry("live-1", "Carol", "live now")));
    let ChatEvent::Message(live) = next_chat_event(&mut receiver).await else {
      panic!("Expected a live message.");
    };
    assert_eq!(live.id, "live-1");
    assert_eq!(live.platform, Platform::Kick);

    connection.disconnect().await;
    connection.disconnect().await;
    assert_eq!(connection.state(), ConnectionState::Disconnected);
  }

  #[tokio::test]
  async fn rejected_sends_surface_the_status() {
    let fake_kick = FakeKick::default();
    let mut pusher = FakeSocketServer::start().await;
    let settings = KickSettings {
      endpoints: fake_kick_endpoints(fake_kick.clone(), &pusher).await,
      ..KickSettings::new("xqc")
    };
    let (events, _receiver) = mpsc::unbounded_channel();
    let mut connection = KickConnection::new(settings, Some(Secret::from("kick-token")), events);

    connection.connect().await.unwrap();
    pusher.frames(2).await;
    let result = connection.send_message("  hello kick  ").await;

    assert!(matches!(
      result,
      Err(AppError::FailedResponse { code: 403, .. })
    ));

    let posted = fake_kick.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].0.as_deref(), Some("Bearer kick-token"));
    assert_eq!(posted[0].1, json!({ "content": "hello kick", "type": "message" }));

    connection.disconnect().await;
  }

  #[tokio::test]
  async fn unresolvable_channels_stay_disconnected() {
    let router = Router::new().route("/api/v1/channels/{channel}", get(|| async { StatusCode::NOT_FOUND }));
    let base_url = serve_http(router).await;
    let settings = KickSettings {
      endpoints: KickEndpoints {
        site_url: base_url.clone(),
        public_api_url: base_url,
        pusher_url: "ws://127.0.0.1:1".into(),
        cors_proxies: vec![],
        ..Default::default()
      },
      ..KickSettings::new("nobody")
    };
    let (events, _receiver) = mpsc::unbounded_channel();
    let mut connection = KickConnection::new(settings, Some(Secret::from("kick-token")), events);

    assert!(connection.connect().await.is_ok());
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connection.chatroom_id(), None);
    assert!(matches!(
      connection.send_message("hello").await,
      Err(AppError::MissingChatroomId)
    ));
  }
}
