/// The `log_level` setting. Leaving it out of the config disables logging.
#[derive(
  Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LoggingConfigLevel {
  #[default]
  Error,
  Warn,
  Info,
  Debug,
  Trace,
}

impl LoggingConfigLevel {
  /// The level used for the HTTP and websocket crates so they don't drown out chat logs.
  pub fn dependency_level(&self) -> Self {
    (*self).min(Self::Warn)
  }

  /// The name `EnvFilter` directives use for this level.
  pub fn directive(&self) -> &'static str {
    match self {
      Self::Error => "error",
      Self::Warn => "warn",
      Self::Info => "info",
      Self::Debug => "debug",
      Self::Trace => "trace",
    }
  }
}

impl std::fmt::Display for LoggingConfigLevel {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    formatter.write_str(self.directive())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dependency_level_never_exceeds_warn() {
    assert_eq!(
      LoggingConfigLevel::Trace.dependency_level(),
      LoggingConfigLevel::Warn
    );
    assert_eq!(
      LoggingConfigLevel::Error.dependency_level(),
      LoggingConfigLevel::Error
    );
    assert_eq!(LoggingConfigLevel::Info.to_string(), "info");
  }
}
