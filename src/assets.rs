use crate::chat_message::{Badge, EmoteRanges};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TWITCH_EMOTE_CDN_URL: &str = "https://static-cdn.jtvnw.net/emoticons/v2";
const KICK_EMOTE_CDN_URL: &str = "https://files.kick.com/emotes";

/// Badge images supplied from outside, `set id -> version id -> image url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeMap(HashMap<String, HashMap<String, String>>);

impl BadgeMap {
  pub fn new(badges: HashMap<String, HashMap<String, String>>) -> Self {
    Self(badges)
  }

  pub fn insert(&mut self, set_id: impl Into<String>, version_id: impl Into<String>, url: impl Into<String>) {
    self
      .0
      .entry(set_id.into())
      .or_default()
      .insert(version_id.into(), url.into());
  }

  /// The image for the badge's exact version, falling back to the set's default version.
  pub fn url_for(&self, badge: &Badge) -> Option<&str> {
    let versions = self.0.get(&badge.badge_type)?;

    versions
      .get(&badge.version)
      .or_else(|| versions.get(Badge::DEFAULT_VERSION))
      .map(String::as_str)
  }
}

/// Third party emotes supplied from outside, `emote name -> image url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmoteMap(HashMap<String, String>);

impl EmoteMap {
  pub fn new(emotes: HashMap<String, String>) -> Self {
    Self(emotes)
  }

  pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
    self.0.insert(name.into(), url.into());
  }

  pub fn url_for(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
  Text(String),
  Emote { name: String, url: String },
}

/// Splits message content into text and emotes.
///
/// Native Twitch emote ranges are applied first, counting UTF-16 code units. The
/// remaining text is split on spaces, and words naming a known emote (or Kick's
/// `[emote:id:name]` tokens) become emotes. Invalid or overlapping ranges are ignored.
pub fn segment_content(
  content: &str,
  native_emotes: Option<&EmoteRanges>,
  emote_map: &EmoteMap,
) -> Vec<ContentSegment> {
  let code_units: Vec<u16> = content.encode_utf16().collect();
  let mut segments = vec![];
  let mut cursor = 0;

  for (start, end, emote_id) in native_ranges(native_emotes, code_units.len()) {
    if start < cursor {
      continue;
    }

    segment_words(&String::from_utf16_lossy(&code_units[cursor..start]), emote_map, &mut segments);
    segments.push(ContentSegment::Emote {
      name: String::from_utf16_lossy(&code_units[start..=end]),
      url: format!("{TWITCH_EMOTE_CDN_URL}/{emote_id}/default/dark/1.0"),
    });
    cursor = end + 1;
  }

  segment_words(&String::from_utf16_lossy(&code_units[cursor..]), emote_map, &mut segments);

  segments
}

/// Valid native emote ranges sorted by their start.
fn native_ranges(native_emotes: Option<&EmoteRanges>, length: usize) -> Vec<(usize, usize, &str)> {
  let Some(native_emotes) = native_emotes else {
    return vec![];
  };

  let mut ranges: Vec<(usize, usize, &str)> = native_emotes
    .iter()
    .flat_map(|(emote_id, positions)| {
      positions.iter().filter_map(move |position| {
        let (start, end) = position.split_once('-')?;
        let (start, end) = (start.parse::<usize>().ok()?, end.parse::<usize>().ok()?);

        (start <= end && end < length).then_some((start, end, emote_id.as_str()))
      })
    })
    .collect();

  ranges.sort_by_key(|(start, _, _)| *start);

  ranges
}

fn segment_words(text: &str, emote_map: &EmoteMap, segments: &mut Vec<ContentSegment>) {
  if text.is_empty() {
    return;
  }

  let mut pending_text = String::new();

  for (index, word) in text.split(' ').enumerate() {
    if index > 0 {
      pending_text.push(' ');
    }

    let emote = match kick_emote(word) {
      Some(emote) => Some(emote),
      None => emote_map.url_for(word).map(|url| ContentSegment::Emote {
        name: word.to_string(),
        url: url.to_string(),
      }),
    };

    match emote {
      Some(emote) => {
        push_text(segments, std::mem::take(&mut pending_text));
        segments.push(emote);
      }
      None => pending_text.push_str(word),
    }
  }

  push_text(segments, pending_text);
}

/// Kick writes emotes into the content as `[emote:37226:KEKW]`.
fn kick_emote(word: &str) -> Option<ContentSegment> {
  let inner = word.strip_prefix("[emote:")?.strip_suffix(']')?;
  let (emote_id, name) = inner.split_once(':')?;

  if emote_id.is_empty() || !emote_id.chars().all(|character| character.is_ascii_digit()) {
    return None;
  }

  Some(ContentSegment::Emote {
    name: name.to_string(),
    url: format!("{KICK_EMOTE_CDN_URL}/{emote_id}/fullsize"),
  })
}

/// Appends text, merging it into the previous text segment.
fn push_text(segments: &mut Vec<ContentSegment>, text: String) {
  if text.is_empty() {
    return;
  }

  if let Some(ContentSegment::Text(previous_text)) = segments.last_mut() {
    previous_text.push_str(&text);

    return;
  }

  segments.push(ContentSegment::Text(text));
}
