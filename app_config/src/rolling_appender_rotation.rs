use anyhow::anyhow;
use std::convert::Infallible;
use std::path::Path;
use std::str::FromStr;
use tracing_appender::rolling::{self, RollingFileAppender};

/// How often the log file is rotated when logging to a directory.
///
/// Read from plain words in the config (`hourly`, `days`, `none`...). Anything
/// unrecognized is kept in `Unknown` and rejected when the config is validated.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(from = "String")]
pub enum RollingAppenderRotation {
  Minutely,
  Hourly,
  #[default]
  Daily,
  Never,
  Unknown(String),
}

impl RollingAppenderRotation {
  pub fn to_file_appender(
    &self,
    logging_dir: &Path,
    filename_prefix: &str,
  ) -> anyhow::Result<RollingFileAppender> {
    let appender = match self {
      Self::Minutely => rolling::minutely(logging_dir, filename_prefix),
      Self::Hourly => rolling::hourly(logging_dir, filename_prefix),
      Self::Daily => rolling::daily(logging_dir, filename_prefix),
      Self::Never => rolling::never(logging_dir, filename_prefix),
      Self::Unknown(value) => return Err(anyhow!("Unknown log rotation {:?}", value)),
    };

    Ok(appender)
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Minutely => "minutely",
      Self::Hourly => "hourly",
      Self::Daily => "daily",
      Self::Never => "never",
      Self::Unknown(value) => value,
    }
  }
}

impl serde::Serialize for RollingAppenderRotation {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(self.as_str())
  }
}

impl From<String> for RollingAppenderRotation {
  fn from(value: String) -> Self {
    Self::from(value.as_str())
  }
}

impl From<&str> for RollingAppenderRotation {
  fn from(value: &str) -> Self {
    match value.trim().to_lowercase().as_str() {
      "minute" | "minutely" | "minutes" => Self::Minutely,
      "hour" | "hourly" | "hours" => Self::Hourly,
      "day" | "daily" | "days" => Self::Daily,
      "never" | "none" => Self::Never,
      _ => Self::Unknown(value.to_string()),
    }
  }
}

impl FromStr for RollingAppenderRotation {
  type Err = Infallible;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(value))
  }
}
