use crate::chat_message::{Badge, EmoteRanges, ReplyTo};
use crate::errors::AppError;
use crate::twitch::sub_tier::SubTier;
use irc::proto::Message as IrcMessage;
use serde::Deserialize;
use std::collections::HashMap;

/// The tag block of a Twitch IRC line.
///
/// Empty tag values are treated the same as missing tags.
#[derive(Debug, Deserialize, Default)]
pub struct TwitchIrcTagValues {
  /// Unique per message. Missing on synthesized lines such as CLEARCHAT.
  #[serde(rename = "id")]
  message_uuid: Option<String>,

  #[serde(rename = "login")]
  login_name: Option<String>,

  #[serde(rename = "display-name")]
  display_name: Option<String>,

  #[serde(rename = "user-id")]
  user_id: Option<String>,

  #[serde(rename = "color")]
  color: Option<String>,

  #[serde(rename = "badges")]
  badges: Option<String>,

  #[serde(rename = "emotes")]
  emotes: Option<String>,

  #[serde(rename = "emote-sets")]
  emote_sets: Option<String>,

  #[serde(rename = "first-msg")]
  first_message: Option<String>,

  #[serde(rename = "tmi-sent-ts")]
  timestamp_value: Option<String>,

  #[serde(rename = "reply-parent-msg-id")]
  reply_parent_message_id: Option<String>,

  #[serde(rename = "reply-parent-display-name")]
  reply_parent_display_name: Option<String>,

  #[serde(rename = "reply-parent-msg-body")]
  reply_parent_message_body: Option<String>,

  /// Comes with CLEARMSG.
  #[serde(rename = "target-msg-id")]
  target_message_id: Option<String>,

  /// Comes with CLEARCHAT when a single user was timed out or banned.
  #[serde(rename = "target-user-id")]
  target_user_id: Option<String>,

  /// Determines the kind of USERNOTICE.
  /// sub, resub, subgift, announcement, etc.
  #[serde(rename = "msg-id")]
  message_id: Option<String>,

  #[serde(rename = "system-msg")]
  system_message: Option<String>,

  #[serde(rename = "msg-param-sub-plan")]
  subscription_plan: Option<SubTier>,

  #[serde(rename = "msg-param-cumulative-months")]
  months_subscribed: Option<String>,

  #[serde(rename = "msg-param-recipient-display-name")]
  gift_recipient_display_name: Option<String>,

  #[serde(rename = "msg-param-recipient-user-name")]
  gift_recipient_login: Option<String>,

  /// Twitch omits this when only one sub was gifted.
  #[serde(rename = "msg-param-mass-gift-count")]
  gift_sub_count: Option<String>,
}

impl TwitchIrcTagValues {
  /// Reads the tag block of the message.
  ///
  /// A message without tags has every value missing.
  pub fn new(message: &IrcMessage) -> Result<Self, AppError> {
    let Some(tags) = &message.tags else {
      return Ok(Self::default());
    };
    let tag_map: HashMap<&str, &str> = tags
      .iter()
      .filter_map(|tag| {
        let key = tag.0.as_str();
        let value = tag.1.as_ref()?.as_str();

        if value.is_empty() {
          return None;
        }

        Some((key, value))
      })
      .collect();
    let serialized_tag_map = serde_json::to_string(&tag_map)?;

    Ok(serde_json::from_str(&serialized_tag_map)?)
  }

  pub fn message_uuid(&self) -> Option<&str> {
    self.message_uuid.as_deref()
  }

  pub fn login_name(&self) -> Option<&str> {
    self.login_name.as_deref()
  }

  pub fn display_name(&self) -> Option<&str> {
    self.display_name.as_deref()
  }

  pub fn user_id(&self) -> Option<&str> {
    self.user_id.as_deref()
  }

  pub fn color(&self) -> Option<&str> {
    self.color.as_deref()
  }

  /// Badges in the order Twitch sent them.
  pub fn badges(&self) -> Vec<Badge> {
    self.badges.as_deref().map(parse_badges).unwrap_or_default()
  }

  /// None when the message had no native emotes.
  pub fn emotes(&self) -> Option<EmoteRanges> {
    let emotes = parse_emotes(self.emotes.as_deref()?);

    (!emotes.is_empty()).then_some(emotes)
  }

  pub fn emote_sets(&self) -> Vec<String> {
    self
      .emote_sets
      .as_deref()
      .map(|emote_sets| {
        emote_sets
          .split(',')
          .map(str::trim)
          .filter(|emote_set| !emote_set.is_empty())
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
  }

  /// None if Twitch didn't send the tag at all.
  pub fn first_message(&self) -> Option<bool> {
    self.first_message.as_deref().map(|value| value == "1")
  }

  /// None if the tag was missing or wasn't a number.
  pub fn timestamp_millis(&self) -> Option<i64> {
    let timestamp_value = self.timestamp_value.as_deref()?;

    match timestamp_value.trim().parse::<i64>() {
      Ok(timestamp) => Some(timestamp),
      Err(_) => {
        tracing::debug!("Received an invalid tmi-sent-ts value: {:?}", timestamp_value);

        None
      }
    }
  }

  /// The quoted parent message, if this message is a reply.
  pub fn reply_to(&self) -> Option<ReplyTo> {
    Some(ReplyTo {
      id: self.reply_parent_message_id.clone()?,
      username: self.reply_parent_display_name.clone().unwrap_or_default(),
      content: self.reply_parent_message_body.clone().unwrap_or_default(),
    })
  }

  pub fn target_message_id(&self) -> Option<&str> {
    self.target_message_id.as_deref()
  }

  pub fn target_user_id(&self) -> Option<&str> {
    self.target_user_id.as_deref()
  }

  pub fn message_id(&self) -> Option<&str> {
    self.message_id.as_deref()
  }

  pub fn system_message(&self) -> Option<&str> {
    self.system_message.as_deref()
  }

  pub fn subscription_plan(&self) -> Option<&SubTier> {
    self.subscription_plan.as_ref()
  }

  pub fn months_subscribed(&self) -> Option<u32> {
    self.months_subscribed.as_deref()?.trim().parse().ok()
  }

  pub fn gift_recipient(&self) -> Option<&str> {
    self
      .gift_recipient_display_name
      .as_deref()
      .or(self.gift_recipient_login.as_deref())
  }

  /// If the value didn't exist, 1 is returned.
  pub fn gift_sub_count(&self) -> usize {
    self
      .gift_sub_count
      .as_deref()
      .and_then(|count| count.trim().parse().ok())
      .unwrap_or(1)
  }
}

/// Parses `moderator/1,subscriber/6` into badges, keeping their order.
pub fn parse_badges(value: &str) -> Vec<Badge> {
  value
    .split(',')
    .map(str::trim)
    .filter(|badge| !badge.is_empty())
    .map(|badge| match badge.split_once('/') {
      Some((badge_type, version)) => Badge::new(badge_type, Some(version)),
      None => Badge::new(badge, None),
    })
    .collect()
}

/// Parses `25:0-4,12-16/1902:6-10` into emote id to positions.
///
/// Groups without a `:` are skipped.
pub fn parse_emotes(value: &str) -> EmoteRanges {
  value
    .split('/')
    .filter_map(|group| group.split_once(':'))
    .fold(EmoteRanges::new(), |mut emotes, (emote_id, positions)| {
      let positions = positions
        .split(',')
        .map(str::trim)
        .filter(|position| position.contains('-'))
        .map(str::to_string);

      emotes
        .entry(emote_id.to_string())
        .or_default()
        .extend(positions);

      emotes
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use irc::proto::message::Tag as IrcTag;
  use irc::proto::{Command, Prefix};

  #[test]
  fn twitch_irc_tag_values_creation_works() {
    let tags = vec![
      IrcTag("id".into(), Some("b34ccfc7-4977-403a-8a94-33c6bac34fb8".into())),
      IrcTag("login".into(), Some("this_is_name".into())),
      IrcTag("display-name".into(), Some("This_Is_Name".into())),
      IrcTag("user-id".into(), Some("69420".into())),
      IrcTag("color".into(), Some("#1E90FF".into())),
      IrcTag("badges".into(), Some("moderator/1,subscriber/6".into())),
      IrcTag("emotes".into(), Some("25:0-4/1902:6-10".into())),
      IrcTag("first-msg".into(), Some("1".into())),
      IrcTag("tmi-sent-ts".into(), Some("12345".into())),
      IrcTag("reply-parent-msg-id".into(), Some("abc".into())),
      IrcTag("reply-parent-display-name".into(), Some("Parent".into())),
      IrcTag("reply-parent-msg-body".into(), Some("hi there".into())),
      IrcTag("msg-id".into(), Some("resub".into())),
      IrcTag("msg-param-sub-plan".into(), Some("1000".into())),
      IrcTag("msg-param-cumulative-months".into(), Some("15".into())),
      IrcTag("msg-param-recipient-display-name".into(), Some("Lucky".into())),
      IrcTag("room-id".into(), Some("02496".into())),
      IrcTag("turbo".into(), Some("".into())),
    ];
    let irc_message = IrcMessage {
      tags: Some(tags),
      prefix: Some(Prefix::Nickname(
        "this_is_name".into(),
        "this_is_name".into(),
        "this_is_name.tmi.twitch.tv".into(),
      )),
      command: Command::PRIVMSG("#gabepeixe".into(), "Kappa Keepo".into()),
    };

    let tag_values = TwitchIrcTagValues::new(&irc_message).unwrap();

    assert_eq!(
      tag_values.message_uuid(),
      Some("b34ccfc7-4977-403a-8a94-33c6bac34fb8")
    );
    assert_eq!(tag_values.login_name(), Some("this_is_name"));
    assert_eq!(tag_values.display_name(), Some("This_Is_Name"));
    assert_eq!(tag_values.user_id(), Some("69420"));
    assert_eq!(tag_values.color(), Some("#1E90FF"));
    assert_eq!(
      tag_values.badges(),
      vec![
        Badge::new("moderator", Some("1")),
        Badge::new("subscriber", Some("6"))
      ]
    );
    assert_eq!(
      tag_values.emotes(),
      Some(EmoteRanges::from([
        ("25".to_string(), vec!["0-4".to_string()]),
        ("1902".to_string(), vec!["6-10".to_string()]),
      ]))
    );
    assert_eq!(tag_values.first_message(), Some(true));
    assert_eq!(tag_values.timestamp_millis(), Some(12345));
    assert_eq!(
      tag_values.reply_to(),
      Some(ReplyTo {
        id: "abc".into(),
        username: "Parent".into(),
        content: "hi there".into(),
      })
    );
    assert_eq!(tag_values.message_id(), Some("resub"));
    assert_eq!(tag_values.subscription_plan(), Some(&SubTier::One));
    assert_eq!(tag_values.months_subscribed(), Some(15));
    assert_eq!(tag_values.gift_recipient(), Some("Lucky"));
    assert_eq!(tag_values.gift_sub_count(), 1);
  }

  #[test]
  fn message_without_tags_has_no_values() {
    let irc_message = IrcMessage::from(Command::PING("tmi.twitch.tv".into(), None));

    let tag_values = TwitchIrcTagValues::new(&irc_message).unwrap();

    assert_eq!(tag_values.display_name(), None);
    assert_eq!(tag_values.first_message(), None);
    assert!(tag_values.badges().is_empty());
    assert_eq!(tag_values.emotes(), None);
  }

  #[test]
  fn badges_without_versions_default_to_one() {
    assert_eq!(
      parse_badges("broadcaster/1,premium,"),
      vec![
        Badge::new("broadcaster", Some("1")),
        Badge::new("premium", None)
      ]
    );
  }

  #[test]
  fn emotes_with_multiple_positions_are_grouped() {
    let emotes = parse_emotes("25:0-4,12-16/bad-group/1902:6-10");

    assert_eq!(emotes["25"], vec!["0-4".to_string(), "12-16".to_string()]);
    assert_eq!(emotes["1902"], vec!["6-10".to_string()]);
    assert_eq!(emotes.len(), 2);
  }
}
