use std::str::FromStr;

/// How long the first-interaction ledger remembers a chatter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerScope {
  /// Loaded from and written to disk. A chatter is only ever flagged once.
  #[default]
  Persistent,

  /// Starts empty every run and is never written to disk.
  Session,
}

impl LedgerScope {
  pub fn is_persistent(&self) -> bool {
    matches!(self, Self::Persistent)
  }
}

impl<S> From<S> for LedgerScope
where
  S: AsRef<str>,
{
  fn from(value: S) -> Self {
    match value.as_ref().to_lowercase().trim() {
      "session" | "broadcast" | "none" => Self::Session,
      _ => Self::Persistent,
    }
  }
}

impl FromStr for LedgerScope {
  type Err = Box<dyn std::error::Error>;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(s))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_values_fall_back_to_persistent() {
    assert_eq!(LedgerScope::from("Session"), LedgerScope::Session);
    assert_eq!(LedgerScope::from(" broadcast "), LedgerScope::Session);
    assert_eq!(LedgerScope::from("forever"), LedgerScope::Persistent);
  }
}
