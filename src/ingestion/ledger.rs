use crate::chat_message::{identity_key, ChatMessage, Platform};
use crate::errors::AppError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Every `"{platform}-{username}"` this client has ever seen a message from.
///
/// Persisted as a JSON array of strings. Storage is best effort: a ledger that
/// can't be read starts empty, and a failed write is logged and forgotten.
#[derive(Debug, Default)]
pub struct FirstInteractionLedger {
  storage_path: Option<PathBuf>,
  seen: BTreeSet<String>,
}

impl FirstInteractionLedger {
  /// Loads the ledger stored at the path, starting empty if it's missing or unreadable.
  pub fn load(storage_path: impl Into<PathBuf>) -> Self {
    let storage_path = storage_path.into();
    let seen = match read_ledger_file(&storage_path) {
      Ok(seen) => seen,
      Err(error) => {
        tracing::warn!(
          "Starting with an empty first interaction ledger. Failed to read {:?}: {}",
          storage_path,
          error
        );

        BTreeSet::new()
      }
    };

    tracing::debug!("Loaded {} first interaction keys.", seen.len());

    Self {
      storage_path: Some(storage_path),
      seen,
    }
  }

  /// A ledger that only lasts for this session.
  pub fn in_memory() -> Self {
    Self::default()
  }

  /// Sets `is_first_message` on the message, recording the sender if they're new.
  ///
  /// New senders are always flagged. Known senders are only flagged if the platform
  /// explicitly says it's their first message.
  pub fn observe(&mut self, message: &mut ChatMessage) {
    if message.platform == Platform::System || message.is_subscription {
      return;
    }

    let key = message.identity_key();

    if self.seen.contains(&key) {
      message.is_first_message = message.native_first_message == Some(true);

      return;
    }

    message.is_first_message = true;

    self.seen.insert(key);
    self.persist();
  }

  pub fn contains(&self, platform: Platform, username: &str) -> bool {
    self.seen.contains(&identity_key(platform, username))
  }

  pub fn len(&self) -> usize {
    self.seen.len()
  }

  pub fn is_empty(&self) -> bool {
    self.seen.is_empty()
  }

  /// Writes the whole ledger out. Failures are only logged.
  pub fn persist(&self) {
    let Some(storage_path) = &self.storage_path else {
      return;
    };

    if let Err(error) = write_ledger_file(storage_path, &self.seen) {
      tracing::warn!(
        "Failed to persist the first interaction ledger to {:?}: {}",
        storage_path,
        error
      );
    }
  }
}

fn read_ledger_file(storage_path: &Path) -> Result<BTreeSet<String>, AppError> {
  if !storage_path.exists() {
    return Ok(BTreeSet::new());
  }

  let contents = std::fs::read_to_string(storage_path)?;

  if contents.trim().is_empty() {
    return Ok(BTreeSet::new());
  }

  let keys: Vec<String> = serde_json::from_str(&contents)?;

  Ok(keys.into_iter().collect())
}

fn write_ledger_file(storage_path: &Path, seen: &BTreeSet<String>) -> Result<(), AppError> {
  if let Some(parent) = storage_path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)?;
    }
  }

  let contents = serde_json::to_string(seen)?;
  std::fs::write(storage_path, contents)?;

  Ok(())
}
