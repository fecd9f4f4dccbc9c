use crate::chat_message::{ChatEvent, Platform};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Lifecycle of a single platform connection.
///
/// `Disconnected -> Connecting -> Connected -> Closing -> Disconnected`. A connection
/// that fails while connecting goes straight back to `Disconnected`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  #[default]
  Disconnected,
  Connecting,
  Connected,
  Closing,
}

impl std::fmt::Display for ConnectionState {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(formatter, "{:?}", self)
  }
}

/// Shared between a connection and its socket task so both can move the state forward.
///
/// Every change is also pushed into the event stream.
#[derive(Debug, Clone)]
pub struct StateReporter {
  platform: Platform,
  state: Arc<watch::Sender<ConnectionState>>,
  events: mpsc::UnboundedSender<ChatEvent>,
}

impl StateReporter {
  pub fn new(platform: Platform, events: mpsc::UnboundedSender<ChatEvent>) -> Self {
    let (state, _) = watch::channel(ConnectionState::Disconnected);

    Self {
      platform,
      state: Arc::new(state),
      events,
    }
  }

  pub fn set(&self, state: ConnectionState) {
    let previous_state = self.state.send_replace(state);

    if previous_state == state {
      return;
    }

    tracing::info!(
      "{} connection went from {} to {}.",
      self.platform,
      previous_state,
      state
    );

    // The orchestrator may already be gone during shutdown.
    let _ = self.events.send(ChatEvent::ConnectionState {
      platform: self.platform,
      state,
    });
  }

  pub fn current(&self) -> ConnectionState {
    *self.state.borrow()
  }

  pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
    self.state.subscribe()
  }
}
