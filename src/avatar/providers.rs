use crate::chat_message::Platform;
use crate::errors::AppError;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use url::Url;

pub const IVR_API_URL: &str = "https://api.ivr.fi";
pub const DECAPI_URL: &str = "https://decapi.me";
pub const KICK_SITE_URL: &str = "https://kick.com";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// One place an avatar can be looked up.
pub trait AvatarProvider: Send + Sync + 'static {
  fn name(&self) -> &str;

  /// Ok(None) when the provider answered but had no avatar for the user.
  fn lookup(&self, username: &str) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpProviderKind {
  /// `GET /v2/twitch/user?login={username}`
  Ivr,
  /// `GET /twitch/avatar/{username}`, answering with the URL as plain text.
  DecApi,
  /// `GET /api/v2/channels/{username}`
  KickChannel,
  /// `GET /api/v1/users/{username}`
  KickUser,
}

#[derive(Debug, Clone)]
pub struct HttpAvatarProvider {
  kind: HttpProviderKind,
  base_url: String,
  client: reqwest::Client,
}

impl HttpAvatarProvider {
  pub fn new(kind: HttpProviderKind, base_url: impl Into<String>) -> Self {
    Self {
      kind,
      base_url: base_url.into(),
      client: build_client(DEFAULT_LOOKUP_TIMEOUT),
    }
  }

  /// A stalled provider is given up on after the timeout so the next one gets a turn.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.client = build_client(timeout);

    self
  }

  /// The providers for each platform in the order they're tried.
  pub fn defaults() -> HashMap<Platform, Vec<Self>> {
    HashMap::from([
      (
        Platform::Twitch,
        vec![
          Self::new(HttpProviderKind::Ivr, IVR_API_URL),
          Self::new(HttpProviderKind::DecApi, DECAPI_URL),
        ],
      ),
      (
        Platform::Kick,
        vec![
          Self::new(HttpProviderKind::KickChannel, KICK_SITE_URL),
          Self::new(HttpProviderKind::KickUser, KICK_SITE_URL),
        ],
      ),
    ])
  }

  pub fn kind(&self) -> HttpProviderKind {
    self.kind
  }

  fn lookup_url(&self, username: &str) -> Result<Url, AppError> {
    let base_url = Url::parse(&self.base_url)?;
    let mut url = match self.kind {
      HttpProviderKind::Ivr => base_url.join("v2/twitch/user")?,
      HttpProviderKind::DecApi => base_url.join(&format!("twitch/avatar/{username}"))?,
      HttpProviderKind::KickChannel => base_url.join(&format!("api/v2/channels/{username}"))?,
      HttpProviderKind::KickUser => base_url.join(&format!("api/v1/users/{username}"))?,
    };

    if self.kind == HttpProviderKind::Ivr {
      url.query_pairs_mut().append_pair("login", username);
    }

    Ok(url)
  }

  async fn fetch(&self, username: &str) -> Result<Option<String>, AppError> {
    let response = self
      .client
      .get(self.lookup_url(username)?)
      .header(ACCEPT, "application/json")
      .header(USER_AGENT, "duochat")
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(AppError::FailedResponse {
        location: "avatar lookup",
        code: response.status().as_u16(),
        body: response.text().await.unwrap_or_default(),
      });
    }

    let avatar_url = match self.kind {
      HttpProviderKind::Ivr => response
        .json::<Vec<IvrUser>>()
        .await?
        .into_iter()
        .find_map(|user| user.logo),
      HttpProviderKind::DecApi => Some(response.text().await?.trim().to_string()),
      HttpProviderKind::KickChannel => response
        .json::<KickChannelResponse>()
        .await?
        .user
        .and_then(|user| user.profile_pic),
      HttpProviderKind::KickUser => response.json::<KickUserResponse>().await?.profile_pic,
    };

    Ok(avatar_url.filter(|url| is_usable_url(url)))
  }
}

impl AvatarProvider for HttpAvatarProvider {
  fn name(&self) -> &str {
    match self.kind {
      HttpProviderKind::Ivr => "ivr",
      HttpProviderKind::DecApi => "decapi",
      HttpProviderKind::KickChannel => "kick channel api",
      HttpProviderKind::KickUser => "kick user api",
    }
  }

  fn lookup(&self, username: &str) -> impl Future<Output = Result<Option<String>, AppError>> + Send {
    self.fetch(username)
  }
}

fn build_client(timeout: Duration) -> reqwest::Client {
  reqwest::Client::builder()
    .timeout(timeout)
    .connect_timeout(timeout)
    .build()
    .unwrap_or_else(|error| {
      tracing::error!("Failed to build the avatar HTTP client, lookups won't time out: {}", error);

      reqwest::Client::new()
    })
}

/// DecAPI answers errors as plain text with a success code, and Kick sends `"null"`.
fn is_usable_url(url: &str) -> bool {
  url.starts_with("http://") || url.starts_with("https://")
}

#[derive(Debug, Deserialize)]
struct IvrUser {
  #[serde(default)]
  logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KickChannelResponse {
  #[serde(default)]
  user: Option<KickUserResponse>,
}

#[derive(Debug, Deserialize)]
struct KickUserResponse {
  #[serde(default, alias = "profilepic")]
  profile_pic: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_urls_follow_each_provider() {
    let ivr = HttpAvatarProvider::new(HttpProviderKind::Ivr, IVR_API_URL);
    let decapi = HttpAvatarProvider::new(HttpProviderKind::DecApi, DECAPI_URL);
    let kick_channel = HttpAvatarProvider::new(HttpProviderKind::KickChannel, KICK_SITE_URL);
    let kick_user = HttpAvatarProvider::new(HttpProviderKind::KickUser, KICK_SITE_URL);

    assert_eq!(
      ivr.lookup_url("gabepeixe").unwrap().as_str(),
      "https://api.ivr.fi/v2/twitch/user?login=gabepeixe"
    );
    assert_eq!(
      decapi.lookup_url("gabepeixe").unwrap().as_str(),
      "https://decapi.me/twitch/avatar/gabepeixe"
    );
    assert_eq!(
      kick_channel.lookup_url("xqc").unwrap().as_str(),
      "https://kick.com/api/v2/channels/xqc"
    );
    assert_eq!(
      kick_user.lookup_url("xqc").unwrap().as_str(),
      "https://kick.com/api/v1/users/xqc"
    );
  }

  #[test]
  fn placeholder_answers_are_not_urls() {
    assert!(is_usable_url("https://static-cdn.jtvnw.net/a.png"));
    assert!(!is_usable_url("null"));
    assert!(!is_usable_url("User not found: nobody"));
  }

  #[tokio::test]
  async fn stalled_providers_time_out() {
    use crate::testing_helper_methods::serve_http;
    use axum::routing::get;
    use axum::Router;

    async fn stalled() -> &'static str {
      tokio::time::sleep(Duration::from_secs(3600)).await;

      "https://static-cdn.jtvnw.net/a.png"
    }

    let base_url = serve_http(Router::new().route("/twitch/avatar/{username}", get(stalled))).await;
    let provider = HttpAvatarProvider::new(HttpProviderKind::DecApi, base_url)
      .with_timeout(Duration::from_millis(200));

    let result = tokio::time::timeout(Duration::from_secs(5), provider.lookup("gabepeixe"))
      .await
      .expect("The lookup never gave up on the stalled provider.");

    assert!(matches!(result, Err(AppError::ReqwestError(error)) if error.is_timeout()));
  }

  #[test]
  fn every_streaming_platform_has_providers() {
    let providers = HttpAvatarProvider::defaults();

    assert_eq!(providers[&Platform::Twitch][0].kind(), HttpProviderKind::Ivr);
    assert_eq!(providers[&Platform::Kick][1].kind(), HttpProviderKind::KickUser);
    assert!(!providers.contains_key(&Platform::System));
  }
}
