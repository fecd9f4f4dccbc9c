use app_config::log_level_wrapper::LoggingConfigLevel;
use app_config::AppConfig;
use tracing_subscriber::EnvFilter;

/// Crates that log every frame and request at their lower levels.
const NOISY_DEPENDENCIES: &[&str] = &["tungstenite", "tokio_tungstenite", "reqwest", "hyper", "hyper_util"];

pub fn setup_logging_config() -> Result<(), Box<dyn std::error::Error>> {
  let Some(log_level) = AppConfig::log_level() else {
    eprintln!("Logging is disabled.");

    return Ok(());
  };

  let subscriber_builder = tracing_subscriber::fmt()
    .with_env_filter(env_filter(*log_level))
    .with_ansi(false);

  if let Some(logging_dir) = AppConfig::logging_dir() {
    eprintln!("Logging to file");

    let filename_prefix = AppConfig::logging_filename_prefix();
    let logging_file = AppConfig::logging_file_roll_appender().clone();

    subscriber_builder
      .with_writer(logging_file.to_file_appender(logging_dir, filename_prefix)?)
      .init();
  } else {
    // Stdout belongs to the chat.
    eprintln!("Logging to stderr.");

    subscriber_builder.with_writer(std::io::stderr).init();
  }

  Ok(())
}

fn env_filter(log_level: LoggingConfigLevel) -> EnvFilter {
  let dependency_level = log_level.dependency_level();
  let directives = NOISY_DEPENDENCIES
    .iter()
    .map(|dependency| format!("{dependency}={dependency_level}"))
    .fold(log_level.to_string(), |directives, directive| {
      format!("{directives},{directive}")
    });

  EnvFilter::new(directives)
}
