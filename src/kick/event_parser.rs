use crate::chat_message::{now_millis, Badge, ChatMessage, Platform, ReplyTo, User};
use crate::kick::payloads::*;
use crate::locale::Locale;
use chrono::DateTime;

/// What a single frame from the Pusher socket turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum KickFrame {
  Message(ChatMessage),
  Delete(String),
  /// The server wants a `pusher:pong`.
  Ping,
  Ignored,
}

/// Parses one Pusher frame.
///
/// Returns None when the frame or its payload isn't valid JSON of the expected shape.
pub fn parse_frame(frame: &str, locale: Locale) -> Option<KickFrame> {
  let envelope: PusherEnvelope = match serde_json::from_str(frame) {
    Ok(envelope) => envelope,
    Err(error) => {
      tracing::trace!("Dropping an unparsable Kick frame: {}", error);

      return None;
    }
  };

  let parsed_frame = match envelope.event.as_str() {
    KickEvent::CHAT_MESSAGE => envelope
      .payload::<KickChatMessage>()
      .ok()
      .map(|message| KickFrame::Message(normalize_chat_message(message))),
    KickEvent::MESSAGE_DELETED => envelope
      .payload::<KickDeletedMessage>()
      .ok()
      .map(|deleted| KickFrame::Delete(deleted.message.id)),
    KickEvent::SUBSCRIPTION | KickEvent::CHANNEL_SUBSCRIPTION => envelope
      .payload::<KickSubscription>()
      .ok()
      .map(|subscription| KickFrame::Message(subscription_message(subscription, locale))),
    KickEvent::GIFTED_SUBSCRIPTIONS => envelope
      .payload::<KickGiftedSubscriptions>()
      .ok()
      .map(|gift| KickFrame::Message(gifted_subscriptions_message(gift, locale))),
    KickEvent::PUSHER_PING => Some(KickFrame::Ping),
    KickEvent::PUSHER_ERROR => {
      tracing::warn!("Kick's Pusher socket sent an error: {}", envelope.data);

      Some(KickFrame::Ignored)
    }
    KickEvent::SUBSCRIPTION_SUCCEEDED => {
      tracing::debug!("Subscribed to Kick channel {:?}.", envelope.channel);

      Some(KickFrame::Ignored)
    }
    _ => Some(KickFrame::Ignored),
  };

  if parsed_frame.is_none() {
    tracing::trace!("Dropping a Kick {} frame with an unreadable payload.", envelope.event);
  }

  parsed_frame
}

/// Converts a Kick chat message, from the socket or the history endpoint.
pub fn normalize_chat_message(message: KickChatMessage) -> ChatMessage {
  let identity = message.sender.identity.unwrap_or_default();
  let badges = identity
    .badges
    .iter()
    .map(|badge| {
      let version = badge.count.map(|count| count.to_string());

      Badge::new(&badge.badge_type, version.as_deref())
    })
    .collect();
  let avatar_url = profile_picture_url(message.sender.id, message.sender.profile_pic.as_deref());
  let user = User {
    username: message.sender.username,
    id: Some(message.sender.id.to_string()),
    color: identity.color.filter(|color| !color.is_empty()),
    badges,
    avatar_url: Some(avatar_url),
  };

  let mut chat_message = ChatMessage::new(Platform::Kick, user, message.content.trim());
  chat_message.id = message.id;
  chat_message.timestamp = message
    .created_at
    .as_deref()
    .and_then(parse_timestamp)
    .unwrap_or_else(now_millis);
  chat_message.reply_to = message.metadata.and_then(reply_to);

  chat_message
}

/// The sender's picture, or Kick's default picture for that user id when there isn't one.
pub fn profile_picture_url(sender_id: u64, profile_pic: Option<&str>) -> String {
  match profile_pic.map(str::trim) {
    Some(url) if !url.is_empty() && url != "null" => url.to_string(),
    _ => format!(
      "https://files.kick.com/images/user/{sender_id}/profile_image/conversion/default-thumb.webp"
    ),
  }
}

fn parse_timestamp(created_at: &str) -> Option<i64> {
  match DateTime::parse_from_rfc3339(created_at) {
    Ok(timestamp) => Some(timestamp.timestamp_millis()),
    Err(error) => {
      tracing::debug!("Received an invalid Kick timestamp {:?}: {}", created_at, error);

      None
    }
  }
}

fn reply_to(metadata: KickMessageMetadata) -> Option<ReplyTo> {
  let original_message = metadata.original_message?;

  Some(ReplyTo {
    id: original_message.id,
    username: metadata
      .original_sender
      .map(|sender| sender.username)
      .unwrap_or_default(),
    content: original_message.content,
  })
}

fn subscription_message(subscription: KickSubscription, locale: Locale) -> ChatMessage {
  let content = match subscription.months {
    Some(months) if months > 1 => locale.resubscribed(&subscription.username, Some(months)),
    _ => locale.subscribed(&subscription.username, None),
  };

  let mut chat_message = ChatMessage::new(Platform::Kick, User::new(subscription.username), content);
  chat_message.is_subscription = true;
  chat_message.sub_months = subscription.months;

  chat_message
}

fn gifted_subscriptions_message(gift: KickGiftedSubscriptions, locale: Locale) -> ChatMessage {
  let content = match gift.gifted_usernames.as_slice() {
    [recipient] => locale.gifted_subscription(&gift.gifter_username, recipient),
    recipients => locale.gifted_subscriptions(&gift.gifter_username, recipients.len().max(1)),
  };

  let mut chat_message = ChatMessage::new(Platform::Kick, User::new(gift.gifter_username), content);
  chat_message.is_subscription = true;

  chat_message
}
