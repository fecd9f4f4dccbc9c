use secrecy::{ExposeSecret, SecretString};
use std::convert::Infallible;
use std::str::FromStr;

/// Twitch hands out tokens as `oauth:<token>`, but the raw token is what gets sent.
const OAUTH_PREFIX: &str = "oauth:";

/// A chat access token.
///
/// Debug output and serialization never include the token. Surrounding whitespace
/// and Twitch's `oauth:` prefix are stripped when it's read.
#[derive(Debug, Clone)]
pub struct Secret(SecretString);

impl Secret {
  pub fn new(value: String) -> Self {
    Self(SecretString::from(value))
  }

  /// The bare token.
  pub fn expose(&self) -> &str {
    let token = self.0.expose_secret().trim();

    token.strip_prefix(OAUTH_PREFIX).unwrap_or(token).trim()
  }

  /// An empty env var or config value counts as no token at all.
  pub fn is_blank(&self) -> bool {
    self.expose().is_empty()
  }

  pub fn bearer(&self) -> String {
    format!("Bearer {}", self.expose())
  }
}

impl serde::Serialize for Secret {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str("[redacted]")
  }
}

impl<'de> serde::Deserialize<'de> for Secret {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    <String as serde::Deserialize>::deserialize(deserializer).map(Self::new)
  }
}

impl Default for Secret {
  fn default() -> Self {
    Self::new(String::new())
  }
}

impl PartialEq for Secret {
  fn eq(&self, other: &Self) -> bool {
    self.expose() == other.expose()
  }
}

impl<S> From<S> for Secret
where
  S: AsRef<str>,
{
  fn from(token: S) -> Self {
    Self::new(token.as_ref().to_string())
  }
}

impl FromStr for Secret {
  type Err = Infallible;

  fn from_str(token: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(token))
  }
}
