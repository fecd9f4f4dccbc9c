use crate::chat_message::ChatEvent;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tungstenite::Message;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// A websocket server that accepts a single client.
///
/// Text frames from the client are collected in order, and frames can be pushed to it.
pub struct FakeSocketServer {
  pub url: String,
  received: mpsc::UnboundedReceiver<String>,
  outgoing: mpsc::UnboundedSender<String>,
}

impl FakeSocketServer {
  pub async fn start() -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (received_sender, received) = mpsc::unbounded_channel();
    let (outgoing, mut outgoing_receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
      let (stream, _) = listener.accept().await.unwrap();
      let mut socket = accept_async(stream).await.unwrap();

      loop {
        tokio::select! {
          frame = socket.next() => match frame {
            Some(Ok(Message::Text(text))) => {
              let _ = received_sender.send(text.to_string());
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => {}
          },

          Some(frame) = outgoing_receiver.recv() => {
            if socket.send(Message::text(frame)).await.is_err() {
              break;
            }
          }
        }
      }
    });

    Self {
      url: format!("ws://{address}"),
      received,
      outgoing,
    }
  }

  pub async fn next_frame(&mut self) -> String {
    timeout(WAIT_LIMIT, self.received.recv())
      .await
      .expect("Timed out waiting for a frame from the client.")
      .expect("The fake server stopped.")
  }

  /// Waits for the given number of frames.
  pub async fn frames(&mut self, count: usize) -> Vec<String> {
    let mut frames = vec![];

    for _ in 0..count {
      frames.push(self.next_frame().await);
    }

    frames
  }

  /// True if the client sent nothing within the wait, or hung up.
  pub async fn stays_quiet(&mut self, wait: Duration) -> bool {
    !matches!(timeout(wait, self.received.recv()).await, Ok(Some(_)))
  }

  pub fn push(&self, frame: impl Into<String>) {
    self.outgoing.send(frame.into()).unwrap();
  }
}

/// Serves the router on a random local port, returning its base URL with a trailing slash.
pub async fn serve_http(router: axum::Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let address = listener.local_addr().unwrap();

  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });

  format!("http://{address}/")
}

/// The next event that isn't a connection state change.
pub async fn next_chat_event(events: &mut mpsc::UnboundedReceiver<ChatEvent>) -> ChatEvent {
  loop {
    let event = timeout(WAIT_LIMIT, events.recv())
      .await
      .expect("Timed out waiting for an event.")
      .expect("The event channel closed.");

    if !matches!(event, ChatEvent::ConnectionState { .. }) {
      return event;
    }
  }
}
