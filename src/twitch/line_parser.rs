use crate::chat_message::{generate_message_id, now_millis, ChatMessage, Platform, User};
use crate::locale::Locale;
use crate::twitch::tag_values::TwitchIrcTagValues;
use crate::twitch::tags::{TwitchCommand, UserNoticeKind};
use irc::proto::{Command, Message as IrcMessage};

const ACTION_PREFIX: &str = "\u{1}ACTION ";
const ACTION_SUFFIX: char = '\u{1}';

/// What a single line from the Twitch socket turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum TwitchLine {
  /// The server wants a `PONG` with this payload.
  Ping(String),
  Message(ChatMessage),
  /// CLEARMSG for the contained message id.
  Delete(String),
  /// CLEARCHAT targeting a single user id.
  ClearUser(String),
  EmoteSets(Vec<String>),
  /// A NOTICE from the server, such as a failed login.
  Notice(String),
  Ignored,
}

/// Splits one socket frame into the IRC lines it contains.
pub fn split_frame(frame: &str) -> impl Iterator<Item = &str> {
  frame.lines().filter(|line| !line.trim().is_empty())
}

/// Parses one line of Twitch IRC.
///
/// Returns None for lines that couldn't be parsed or were missing values
/// required by their command.
pub fn parse_line(line: &str, locale: Locale) -> Option<TwitchLine> {
  let message = match line.parse::<IrcMessage>() {
    Ok(message) => message,
    Err(error) => {
      tracing::trace!("Dropping an unparsable Twitch line {:?}: {}", line, error);

      return None;
    }
  };
  let tags = match TwitchIrcTagValues::new(&message) {
    Ok(tags) => tags,
    Err(error) => {
      tracing::trace!("Dropping a Twitch line with an unreadable tag block: {}", error);

      return None;
    }
  };

  let parsed_line = match &message.command {
    Command::PING(server, _) => Some(TwitchLine::Ping(server.to_owned())),
    Command::PRIVMSG(_, contents) => parse_user_message(&message, &tags, contents),
    Command::NOTICE(_, notice) => Some(TwitchLine::Notice(notice.to_owned())),
    Command::Raw(command, arguments) => parse_twitch_command(command, arguments, &tags, locale),
    _ => Some(TwitchLine::Ignored),
  };

  if parsed_line.is_none() {
    tracing::trace!("Dropping a malformed Twitch line: {:?}", line);
  }

  parsed_line
}

fn parse_twitch_command(
  command: &str,
  arguments: &[String],
  tags: &TwitchIrcTagValues,
  locale: Locale,
) -> Option<TwitchLine> {
  match command {
    TwitchCommand::USER_NOTICE => {
      let comment = arguments.get(1).map(String::as_str);

      parse_user_notice(tags, comment, locale).map(TwitchLine::Message)
    }
    TwitchCommand::CLEAR_MESSAGE => tags
      .target_message_id()
      .map(|message_id| TwitchLine::Delete(message_id.to_string())),
    TwitchCommand::CLEAR_CHAT => match tags.target_user_id() {
      Some(user_id) => Some(TwitchLine::ClearUser(user_id.to_string())),
      None => {
        tracing::debug!("The whole Twitch chat was cleared by a moderator.");

        Some(TwitchLine::Ignored)
      }
    },
    TwitchCommand::GLOBAL_USER_STATE | TwitchCommand::USER_STATE => {
      Some(TwitchLine::EmoteSets(tags.emote_sets()))
    }
    _ => Some(TwitchLine::Ignored),
  }
}

fn parse_user_message(
  message: &IrcMessage,
  tags: &TwitchIrcTagValues,
  contents: &str,
) -> Option<TwitchLine> {
  let mut user = tagged_user(tags).or_else(|| message.source_nickname().map(User::new))?;
  user.badges = tags.badges();

  let mut chat_message = ChatMessage::new(Platform::Twitch, user, strip_action(contents));
  chat_message.id = tags
    .message_uuid()
    .map(str::to_string)
    .unwrap_or_else(generate_message_id);
  chat_message.timestamp = tags.timestamp_millis().unwrap_or_else(now_millis);
  chat_message.emotes = tags.emotes();
  chat_message.reply_to = tags.reply_to();
  chat_message.native_first_message = tags.first_message();

  Some(TwitchLine::Message(chat_message))
}

/// Builds the system flavored message for subscriptions, gifts, and announcements.
///
/// Notices without a known kind fall back to Twitch's own `system-msg`.
fn parse_user_notice(
  tags: &TwitchIrcTagValues,
  comment: Option<&str>,
  locale: Locale,
) -> Option<ChatMessage> {
  let user = tagged_user(tags)?;
  let username = user.username.clone();
  let plan_name = tags.subscription_plan().and_then(|plan| plan.plan_name());
  let mut is_subscription = true;
  let mut sub_months = None;

  let system_text = match tags.message_id()? {
    UserNoticeKind::SUB => {
      sub_months = tags.months_subscribed();

      locale.subscribed(&username, plan_name)
    }
    UserNoticeKind::RESUB => {
      sub_months = tags.months_subscribed();

      locale.resubscribed(&username, sub_months)
    }
    UserNoticeKind::SUB_GIFT => match tags.gift_recipient() {
      Some(recipient) => locale.gifted_subscription(&username, recipient),
      None => tags.system_message()?.to_string(),
    },
    UserNoticeKind::MYSTERY_GIFT => locale.gifted_subscriptions(&username, tags.gift_sub_count()),
    UserNoticeKind::ANNOUNCEMENT => {
      is_subscription = false;

      locale.announcement(&username)
    }
    _ => {
      is_subscription = false;

      tags.system_message()?.to_string()
    }
  };

  let mut chat_message = ChatMessage::new(
    Platform::Twitch,
    user,
    Locale::with_comment(system_text, comment),
  );
  chat_message.user.badges = tags.badges();
  chat_message.id = tags
    .message_uuid()
    .map(str::to_string)
    .unwrap_or_else(generate_message_id);
  chat_message.timestamp = tags.timestamp_millis().unwrap_or_else(now_millis);
  chat_message.is_subscription = is_subscription;
  chat_message.sub_months = sub_months;

  Some(chat_message)
}

/// The sender as described by the tag block. None if the tags don't name anyone.
fn tagged_user(tags: &TwitchIrcTagValues) -> Option<User> {
  let username = tags.display_name().or(tags.login_name())?;

  Some(User {
    username: username.to_string(),
    id: tags.user_id().map(str::to_string),
    color: tags.color().map(str::to_string),
    ..Default::default()
  })
}

/// `/me` messages arrive wrapped as `\x01ACTION text\x01`.
fn strip_action(contents: &str) -> String {
  let contents = contents.trim();

  match contents.strip_prefix(ACTION_PREFIX) {
    Some(action) => action.trim_end_matches(ACTION_SUFFIX).trim().to_string(),
    None => contents.to_string(),
  }
}
