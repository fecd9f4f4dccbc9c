use crate::connection_state::{ConnectionState, StateReporter};
use crate::errors::AppError;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The protocol specific half of a socket session.
pub trait FrameHandler: Send + 'static {
  /// Handles one text frame from the server.
  ///
  /// The returned frames are written back before the next frame is read.
  fn handle_frame(&mut self, frame: &str) -> Vec<String>;

  /// The frame sent every keep alive period.
  fn keep_alive_frame(&self) -> String;
}

/// A websocket owned by a background task.
///
/// The task stops when the server closes the socket, when [`close`](SocketSession::close)
/// is called, or when the session is dropped. The keep alive timer lives inside the task,
/// so it can never fire after the task ends.
pub struct SocketSession {
  outbound: mpsc::UnboundedSender<String>,
  shutdown: Option<oneshot::Sender<()>>,
  task: Option<JoinHandle<()>>,
}

impl SocketSession {
  /// Opens the socket, writes the opening frames, then hands the socket to a background task.
  ///
  /// The state is moved to `Connected` once the opening frames were written.
  pub async fn open<H>(
    url: &str,
    opening_frames: Vec<String>,
    keep_alive: Duration,
    handler: H,
    state: StateReporter,
  ) -> Result<Self, AppError>
  where
    H: FrameHandler,
  {
    tracing::debug!("Opening a websocket to {}", url);

    let (mut socket, _) = connect_async(url).await?;

    for frame in opening_frames {
      socket.send(Message::text(frame)).await?;
    }

    let (outbound, outbound_receiver) = mpsc::unbounded_channel();
    let (shutdown, shutdown_receiver) = oneshot::channel();

    state.set(ConnectionState::Connected);

    let task = tokio::spawn(run_socket(
      socket,
      handler,
      keep_alive,
      outbound_receiver,
      shutdown_receiver,
      state,
    ));

    Ok(Self {
      outbound,
      shutdown: Some(shutdown),
      task: Some(task),
    })
  }

  /// Queues a frame to be written by the socket task.
  pub fn send(&self, frame: String) -> Result<(), AppError> {
    self
      .outbound
      .send(frame)
      .map_err(|error| AppError::MpscConnectionClosed {
        error: error.to_string(),
      })
  }

  /// False once the socket task has stopped.
  pub fn is_open(&self) -> bool {
    !self.outbound.is_closed()
  }

  /// Stops the socket task and waits for it to finish. Safe to call more than once.
  pub async fn close(&mut self) {
    if let Some(shutdown) = self.shutdown.take() {
      // The task may have already stopped on its own.
      let _ = shutdown.send(());
    }

    if let Some(task) = self.task.take() {
      if let Err(error) = task.await {
        tracing::error!("The socket task failed to finish cleanly: {}", error);
      }
    }
  }
}

async fn run_socket<H>(
  mut socket: Socket,
  mut handler: H,
  keep_alive: Duration,
  mut outbound: mpsc::UnboundedReceiver<String>,
  mut shutdown: oneshot::Receiver<()>,
  state: StateReporter,
) where
  H: FrameHandler,
{
  let mut keep_alive_timer = interval_at(Instant::now() + keep_alive, keep_alive);
  keep_alive_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      biased;

      _ = &mut shutdown => {
        if let Err(error) = socket.close(None).await {
          tracing::debug!("Failed to send a close frame: {}", error);
        }

        break;
      }

      _ = keep_alive_timer.tick() => {
        if let Err(error) = send_frames(&mut socket, vec![handler.keep_alive_frame()]).await {
          tracing::warn!("Failed to send a keep alive frame: {}", error);

          break;
        }
      }

      Some(frame) = outbound.recv() => {
        if let Err(error) = send_frames(&mut socket, vec![frame]).await {
          tracing::warn!("Failed to send an outbound frame: {}", error);

          break;
        }
      }

      incoming = socket.next() => match incoming {
        Some(Ok(Message::Text(frame))) => {
          let replies = handler.handle_frame(&frame);

          if let Err(error) = send_frames(&mut socket, replies).await {
            tracing::warn!("Failed to reply to the server: {}", error);

            break;
          }
        }
        Some(Ok(Message::Close(close_frame))) => {
          tracing::info!("The server closed the socket: {:?}", close_frame);

          break;
        }
        Some(Ok(_)) => {}
        Some(Err(error)) => {
          tracing::warn!("The socket failed: {}", error);

          break;
        }
        None => break,
      }
    }
  }

  state.set(ConnectionState::Disconnected);
}

async fn send_frames(socket: &mut Socket, frames: Vec<String>) -> Result<(), tungstenite::Error> {
  for frame in frames {
    socket.send(Message::text(frame)).await?;
  }

  Ok(())
}
