use crate::chat_message::{ChatMessage, Platform};
use std::collections::VecDeque;

pub const DEFAULT_MAX_DISPLAYED_MESSAGES: usize = 500;

/// The result of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
  /// How many pending messages were moved to the displayed list.
  pub drained: usize,
  /// How many of the oldest displayed messages were dropped to stay under the cap.
  pub trimmed: usize,
  /// True when the view is at the live edge and new messages arrived.
  pub should_auto_scroll: bool,
  pub unread_count: usize,
}

/// Queues incoming messages until the next flush, then moves them into the displayed list.
///
/// Pushing never blocks and is never bounded. Only the displayed list has a cap.
#[derive(Debug)]
pub struct IngestionBuffer {
  pending: VecDeque<ChatMessage>,
  displayed: VecDeque<ChatMessage>,
  max_displayed: usize,
  paused: bool,
  unread_count: usize,
}

impl Default for IngestionBuffer {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_DISPLAYED_MESSAGES)
  }
}

impl IngestionBuffer {
  pub fn new(max_displayed: usize) -> Self {
    Self {
      pending: VecDeque::new(),
      displayed: VecDeque::with_capacity(max_displayed),
      max_displayed: max_displayed.max(1),
      paused: false,
      unread_count: 0,
    }
  }

  pub fn push(&mut self, message: ChatMessage) {
    self.pending.push_back(message);
  }

  /// Moves everything pending into the displayed list and trims it to the cap.
  ///
  /// While paused the drained count is added to the unread counter instead of asking for a scroll.
  pub fn flush(&mut self) -> FlushReport {
    let drained = self.pending.len();

    if drained == 0 {
      return FlushReport {
        unread_count: self.unread_count,
        ..Default::default()
      };
    }

    self.displayed.extend(self.pending.drain(..));

    let trimmed = self.displayed.len().saturating_sub(self.max_displayed);
    self.displayed.drain(..trimmed);

    if self.paused {
      self.unread_count += drained;
    }

    FlushReport {
      drained,
      trimmed,
      should_auto_scroll: !self.paused,
      unread_count: self.unread_count,
    }
  }

  /// The user scrolled away from the live edge.
  pub fn pause(&mut self) {
    self.paused = true;
  }

  /// The user returned to the live edge.
  pub fn resume(&mut self) {
    self.paused = false;
    self.unread_count = 0;
  }

  pub fn is_paused(&self) -> bool {
    self.paused
  }

  pub fn unread_count(&self) -> usize {
    self.unread_count
  }

  /// Marks the message deleted wherever it is. Returns false if it wasn't found.
  pub fn mark_deleted(&mut self, platform: Platform, message_id: &str) -> bool {
    let mut found = false;

    for message in self.messages_mut() {
      if message.is(platform, message_id) {
        message.is_deleted = true;
        found = true;
      }
    }

    found
  }

  /// Marks every message from the user deleted. Returns how many were marked.
  pub fn mark_user_cleared(&mut self, platform: Platform, user_id: &str) -> usize {
    let mut cleared = 0;

    for message in self.messages_mut() {
      if message.platform == platform && message.user.id.as_deref() == Some(user_id) {
        message.is_deleted = true;
        cleared += 1;
      }
    }

    cleared
  }

  fn messages_mut(&mut self) -> impl Iterator<Item = &mut ChatMessage> {
    self.displayed.iter_mut().chain(self.pending.iter_mut())
  }

  pub fn displayed(&self) -> impl Iterator<Item = &ChatMessage> {
    self.displayed.iter()
  }

  pub fn displayed_len(&self) -> usize {
    self.displayed.len()
  }

  pub fn pending_len(&self) -> usize {
    self.pending.len()
  }

  pub fn max_displayed(&self) -> usize {
    self.max_displayed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chat_message::User;

  fn message(platform: Platform, content: &str) -> ChatMessage {
    ChatMessage::new(platform, User::new("someone"), content)
  }

  #[test]
  fn flush_keeps_the_most_recent_messages_in_order() {
    let mut buffer = IngestionBuffer::default();

    for index in 0..600 {
      buffer.push(message(Platform::Twitch, &index.to_string()));
    }

    let report = buffer.flush();
    let contents: Vec<String> = buffer
      .displayed()
      .map(|message| message.content.clone())
      .collect();

    assert_eq!(report.drained, 600);
    assert_eq!(report.trimmed, 100);
    assert_eq!(contents.len(), 500);
    assert_eq!(
      contents,
      (100..600).map(|index| index.to_string()).collect::<Vec<_>>()
    );
    assert_eq!(buffer.pending_len(), 0);
  }

  #[test]
  fn trimming_applies_across_flushes() {
    let mut buffer = IngestionBuffer::new(3);

    for content in ["a", "b"] {
      buffer.push(message(Platform::Kick, content));
    }
    buffer.flush();

    for content in ["c", "d"] {
      buffer.push(message(Platform::Kick, content));
    }
    let report = buffer.flush();

    let contents: Vec<&str> = buffer
      .displayed()
      .map(|message| message.content.as_str())
      .collect();
    assert_eq!(contents, vec!["b", "c", "d"]);
    assert_eq!(report.trimmed, 1);
  }

  #[test]
  fn paused_flushes_count_unread_messages() {
    let mut buffer = IngestionBuffer::default();
    buffer.pause();

    for _ in 0..7 {
      buffer.push(message(Platform::Twitch, "hi"));
    }
    let report = buffer.flush();

    assert_eq!(report.unread_count, 7);
    assert!(!report.should_auto_scroll);
    assert_eq!(buffer.displayed_len(), 7);

    buffer.push(message(Platform::Twitch, "more"));
    assert_eq!(buffer.flush().unread_count, 8);

    buffer.resume();

    assert_eq!(buffer.unread_count(), 0);
    assert!(!buffer.is_paused());

    buffer.push(message(Platform::Twitch, "live"));
    let report = buffer.flush();
    assert!(report.should_auto_scroll);
    assert_eq!(report.unread_count, 0);
  }

  #[test]
  fn empty_flush_does_not_scroll() {
    let mut buffer = IngestionBuffer::default();

    assert_eq!(buffer.flush(), FlushReport::default());
  }

  #[test]
  fn deletes_reach_pending_and_displayed_messages() {
    let mut buffer = IngestionBuffer::default();
    let mut shown = message(Platform::Twitch, "shown");
    shown.id = "1".into();
    let mut kick_twin = message(Platform::Kick, "same id, other platform");
    kick_twin.id = "1".into();
    buffer.push(shown);
    buffer.push(kick_twin);
    buffer.flush();

    let mut waiting = message(Platform::Twitch, "waiting");
    waiting.id = "2".into();
    buffer.push(waiting);

    assert!(buffer.mark_deleted(Platform::Twitch, "1"));
    assert!(buffer.mark_deleted(Platform::Twitch, "2"));
    assert!(!buffer.mark_deleted(Platform::Twitch, "3"));

    buffer.flush();
    let deleted: Vec<bool> = buffer.displayed().map(|message| message.is_deleted).collect();
    assert_eq!(deleted, vec![true, false, true]);
  }

  #[test]
  fn clearing_a_user_marks_all_their_messages() {
    let mut buffer = IngestionBuffer::default();

    for content in ["one", "two"] {
      let mut user_message = message(Platform::Twitch, content);
      user_message.user.id = Some("42".into());
      buffer.push(user_message);
    }
    buffer.push(message(Platform::Twitch, "someone else"));

    assert_eq!(buffer.mark_user_cleared(Platform::Twitch, "42"), 2);
  }
}
