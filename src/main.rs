use app_config::AppConfig;
use chrono::{Local, TimeZone};
use duochat::assets::{segment_content, ContentSegment, EmoteMap};
use duochat::avatar::AvatarCache;
use duochat::chat_message::{ChatMessage, Platform};
use duochat::connection_state::ConnectionState;
use duochat::ingestion::{FirstInteractionLedger, FlushReport};
use duochat::orchestrator::{ChatOrchestrator, ChatRenderer, Credentials, OrchestratorSettings, UserCommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
  if let Err(error) = duochat::logging::setup_logging_config() {
    eprintln!("Failed to set up logging: {error}");

    std::process::exit(1);
  }

  let settings = OrchestratorSettings::from_app_config();

  if settings.twitch.is_none() && settings.kick.is_none() {
    println!("No channels to join. Pass --twitch or --kick, or set them in the config.");

    std::process::exit(0);
  }

  let ledger = if AppConfig::ledger_scope().is_persistent() {
    FirstInteractionLedger::load(AppConfig::ledger_path())
  } else {
    FirstInteractionLedger::in_memory()
  };

  let mut orchestrator = ChatOrchestrator::new(
    settings,
    Credentials::from_app_config(),
    ledger,
    Arc::new(AvatarCache::default()),
  );
  let (command_sender, command_receiver) = mpsc::unbounded_channel();

  tokio::spawn(read_user_input(command_sender.clone()));
  tokio::spawn(async move {
    if let Err(error) = tokio::signal::ctrl_c().await {
      tracing::error!("Failed to listen for ctrl-c: {}", error);
    }

    let _ = command_sender.send(UserCommand::Shutdown);
  });

  orchestrator.start().await;
  orchestrator
    .run(&mut TerminalRenderer::default(), command_receiver)
    .await;
}

/// Forwards each line typed on stdin as a command.
async fn read_user_input(commands: mpsc::UnboundedSender<UserCommand>) {
  let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

  while let Some(line) = lines.next().await {
    let line = match line {
      Ok(line) => line,
      Err(error) => {
        tracing::error!("Failed to read from stdin: {}", error);

        break;
      }
    };

    let Some(command) = parse_input(&line) else {
      continue;
    };

    if commands.send(command).is_err() {
      break;
    }
  }
}

/// `/twitch <text>` and `/kick <text>` pick a platform. Anything else goes to the default one.
fn parse_input(line: &str) -> Option<UserCommand> {
  let line = line.trim();

  if line.is_empty() {
    return None;
  }

  let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
  let send_to = |platform| UserCommand::Send {
    platform: Some(platform),
    text: rest.trim().to_string(),
  };

  let command = match command {
    "/twitch" => send_to(Platform::Twitch),
    "/kick" => send_to(Platform::Kick),
    "/pause" => UserCommand::Pause,
    "/resume" => UserCommand::Resume,
    "/quit" => UserCommand::Shutdown,
    _ => UserCommand::Send {
      platform: None,
      text: line.to_string(),
    },
  };

  Some(command)
}

#[derive(Default)]
struct TerminalRenderer {
  emotes: EmoteMap,
}

impl ChatRenderer for TerminalRenderer {
  fn render(&mut self, new_messages: &[ChatMessage], report: FlushReport) {
    for message in new_messages {
      println!("{}", format_message(message, &self.emotes));
    }

    if report.trimmed > 0 {
      tracing::debug!("Dropped {} old messages from the display.", report.trimmed);
    }

    if !report.should_auto_scroll && report.unread_count > 0 {
      println!("-- paused, {} unread --", report.unread_count);
    }
  }

  fn connection_changed(&mut self, platform: Platform, state: ConnectionState) {
    println!("-- {} {} --", platform, state);
  }

  fn send_failed(&mut self, platform: Option<Platform>, reason: &str) {
    match platform {
      Some(platform) => println!("-- couldn't send to {}: {} --", platform, reason),
      None => println!("-- couldn't send: {} --", reason),
    }
  }
}

fn format_message(message: &ChatMessage, emotes: &EmoteMap) -> String {
  let time = Local
    .timestamp_millis_opt(message.timestamp)
    .single()
    .map(|time| time.format("%H:%M:%S").to_string())
    .unwrap_or_default();
  let first_message_marker = if message.is_first_message { "* " } else { "" };
  let content = if message.is_deleted {
    "<message deleted>".to_string()
  } else {
    render_content(message, emotes)
  };

  format!(
    "[{}] [{}] {}{}: {}",
    time, message.platform, first_message_marker, message.user.username, content
  )
}

/// Emotes are written as `:name:` so they stand out from the text around them.
fn render_content(message: &ChatMessage, emotes: &EmoteMap) -> String {
  segment_content(&message.content, message.emotes.as_ref(), emotes)
    .into_iter()
    .map(|segment| match segment {
      ContentSegment::Text(text) => text,
      ContentSegment::Emote { name, .. } => format!(":{name}:"),
    })
    .collect()
}
