use crate::chat_message::Platform;
use crate::errors::AppError;
use crate::kick::payloads::{KickChannelMetadata, KickChatMessage, KickHistoryResponse};
use app_config::secret_string::Secret;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;
use url::Url;

pub const KICK_SITE_URL: &str = "https://kick.com";
pub const KICK_PUBLIC_API_URL: &str = "https://api.kick.com";
pub const PUSHER_KEY: &str = "32cbd69e4b950bf97679";
pub const PUSHER_CLUSTER: &str = "us2";
/// Tried in order before the direct request. The target URL is appended percent encoded.
pub const DEFAULT_CORS_PROXIES: [&str; 2] = [
  "https://corsproxy.io/?url=",
  "https://api.allorigins.win/raw?url=",
];
/// A proxy that accepts the connection but never answers must not stall the fallback chain.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Kick rejects requests that don't look like they came from a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct KickEndpoints {
  pub site_url: String,
  pub public_api_url: String,
  pub pusher_url: String,
  pub cors_proxies: Vec<String>,
  /// Applies to every request, including each metadata source on its own.
  pub request_timeout: Duration,
}

impl Default for KickEndpoints {
  fn default() -> Self {
    Self {
      site_url: KICK_SITE_URL.to_string(),
      public_api_url: KICK_PUBLIC_API_URL.to_string(),
      pusher_url: format!(
        "wss://ws-{PUSHER_CLUSTER}.pusher.com/app/{PUSHER_KEY}?protocol=7&client=js&version=8.4.0-rc2&flash=false"
      ),
      cors_proxies: DEFAULT_CORS_PROXIES.map(str::to_string).to_vec(),
      request_timeout: DEFAULT_REQUEST_TIMEOUT,
    }
  }
}

/// One way of reaching the channel metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSource {
  pub label: String,
  pub url: String,
}

impl KickEndpoints {
  pub fn channel_metadata_url(&self, channel: &str) -> Result<Url, AppError> {
    Ok(Url::parse(&self.site_url)?.join(&format!("api/v1/channels/{channel}"))?)
  }

  pub fn chatroom_messages_url(&self, chatroom_id: u64) -> Result<Url, AppError> {
    Ok(
      Url::parse(&self.public_api_url)?
        .join(&format!("public/v1/chatrooms/{chatroom_id}/messages"))?,
    )
  }

  /// Every proxy in order, then the direct request.
  pub fn metadata_sources(&self, channel: &str) -> Result<Vec<MetadataSource>, AppError> {
    let direct_url = self.channel_metadata_url(channel)?.to_string();
    let encoded_url: String = url::form_urlencoded::byte_serialize(direct_url.as_bytes()).collect();

    let mut sources: Vec<MetadataSource> = self
      .cors_proxies
      .iter()
      .enumerate()
      .map(|(index, proxy)| MetadataSource {
        label: format!("cors proxy #{}", index + 1),
        url: format!("{proxy}{encoded_url}"),
      })
      .collect();

    sources.push(MetadataSource {
      label: "direct request".to_string(),
      url: direct_url,
    });

    Ok(sources)
  }
}

/// The REST side of Kick.
#[derive(Debug, Clone)]
pub struct KickApi {
  client: reqwest::Client,
  endpoints: KickEndpoints,
}

impl KickApi {
  pub fn new(endpoints: KickEndpoints) -> Self {
    let client = reqwest::Client::builder()
      .timeout(endpoints.request_timeout)
      .connect_timeout(endpoints.request_timeout.min(DEFAULT_CONNECT_TIMEOUT))
      .build()
      .unwrap_or_else(|error| {
        tracing::error!("Failed to build the Kick HTTP client, requests won't time out: {}", error);

        reqwest::Client::new()
      });

    Self { client, endpoints }
  }

  pub fn endpoints(&self) -> &KickEndpoints {
    &self.endpoints
  }

  /// Looks up the channel's ids, returning the first metadata source that answered.
  pub async fn resolve_channel(&self, channel: &str) -> Result<KickChannelMetadata, AppError> {
    for source in self.endpoints.metadata_sources(channel)? {
      match self.fetch_channel_metadata(&source.url).await {
        Ok(metadata) => {
          tracing::debug!(
            "Resolved Kick channel {} through the {}. Chatroom id: {}",
            channel,
            source.label,
            metadata.chatroom.id
          );

          return Ok(metadata);
        }
        Err(error) => {
          tracing::warn!(
            "Failed to resolve Kick channel {} through the {}: {}",
            channel,
            source.label,
            error
          );
        }
      }
    }

    Err(AppError::KickChannelUnresolved {
      channel: channel.to_string(),
    })
  }

  async fn fetch_channel_metadata(&self, url: &str) -> Result<KickChannelMetadata, AppError> {
    let response = self
      .client
      .get(url)
      .header(ACCEPT, "application/json")
      .header(USER_AGENT, BROWSER_USER_AGENT)
      .send()
      .await?;
    let response = check_response(response, "kick channel metadata").await?;

    Ok(response.json().await?)
  }

  /// The chatroom's recent history, newest first.
  pub async fn recent_messages(
    &self,
    chatroom_id: u64,
    access_token: Option<&Secret>,
  ) -> Result<Vec<KickChatMessage>, AppError> {
    let mut request = self
      .client
      .get(self.endpoints.chatroom_messages_url(chatroom_id)?)
      .header(ACCEPT, "application/json")
      .header(USER_AGENT, BROWSER_USER_AGENT);

    if let Some(access_token) = access_token {
      request = request.header(AUTHORIZATION, access_token.bearer());
    }

    let response = check_response(request.send().await?, "kick chat history").await?;
    let history: KickHistoryResponse = response.json().await?;

    Ok(history.into_messages())
  }

  /// Posts a chat message.
  ///
  /// The token and chatroom are checked before anything is sent over the network.
  pub async fn send_message(
    &self,
    chatroom_id: Option<u64>,
    access_token: Option<&Secret>,
    text: &str,
  ) -> Result<(), AppError> {
    let Some(access_token) = access_token.filter(|token| !token.is_blank()) else {
      return Err(AppError::MissingAccessToken(Platform::Kick));
    };
    let Some(chatroom_id) = chatroom_id else {
      return Err(AppError::MissingChatroomId);
    };
    let text = text.trim();

    if text.is_empty() {
      return Err(AppError::EmptyMessage);
    }

    let response = self
      .client
      .post(self.endpoints.chatroom_messages_url(chatroom_id)?)
      .header(ACCEPT, "application/json")
      .header(AUTHORIZATION, access_token.bearer())
      .json(&json!({
        "content": text,
        "type": "message",
      }))
      .send()
      .await?;

    check_response(response, "kick send message").await?;

    Ok(())
  }
}

async fn check_response(response: Response, location: &'static str) -> Result<Response, AppError> {
  if response.status().is_success() {
    return Ok(response);
  }

  let code = response.status().as_u16();
  let body = response.text().await.unwrap_or_default();

  Err(AppError::FailedResponse {
    location,
    code,
    body,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn metadata_sources_try_proxies_first() {
    let sources = KickEndpoints::default().metadata_sources("xqc").unwrap();

    assert_eq!(sources.len(), 3);
    assert_eq!(
      sources[0].url,
      "https://corsproxy.io/?url=https%3A%2F%2Fkick.com%2Fapi%2Fv1%2Fchannels%2Fxqc"
    );
    assert!(sources[1].url.starts_with("https://api.allorigins.win/raw?url="));
    assert_eq!(sources[2].url, "https://kick.com/api/v1/channels/xqc");
  }

  #[test]
  fn chatroom_messages_url_is_built_from_the_public_api() {
    let url = KickEndpoints::default().chatroom_messages_url(668).unwrap();

    assert_eq!(
      url.as_str(),
      "https://api.kick.com/public/v1/chatrooms/668/messages"
    );
  }

  #[tokio::test]
  async fn sending_without_a_token_fails_before_the_network() {
    let endpoints = KickEndpoints {
      public_api_url: "http://127.0.0.1:9".to_string(),
      ..Default::default()
    };
    let api = KickApi::new(endpoints);

    let result = api.send_message(Some(1), None, "hello").await;

    assert!(matches!(
      result,
      Err(AppError::MissingAccessToken(Platform::Kick))
    ));
  }

  #[tokio::test]
  async fn stalled_proxy_falls_through_to_the_next_source() {
    use crate::testing_helper_methods::serve_http;
    use axum::routing::get;
    use axum::{Json, Router};

    async fn stalled_proxy() -> &'static str {
      tokio::time::sleep(Duration::from_secs(3600)).await;

      "{}"
    }

    async fn direct_metadata() -> Json<serde_json::Value> {
      Json(json!({ "id": 668, "slug": "xqc", "chatroom": { "id": 4321 } }))
    }

    let router = Router::new()
      .route("/stalled", get(stalled_proxy))
      .route("/api/v1/channels/{channel}", get(direct_metadata));
    let base_url = serve_http(router).await;
    let api = KickApi::new(KickEndpoints {
      site_url: base_url.clone(),
      public_api_url: base_url.clone(),
      cors_proxies: vec![format!("{base_url}stalled?url=")],
      request_timeout: Duration::from_millis(200),
      ..Default::default()
    });

    let metadata = tokio::time::timeout(Duration::from_secs(5), api.resolve_channel("xqc"))
      .await
      .expect("The stalled proxy blocked the fallback chain.")
      .unwrap();

    assert_eq!(metadata.chatroom.id, 4321);
  }

  #[tokio::test]
  async fn sending_without_a_chatroom_fails() {
    let api = KickApi::new(KickEndpoints::default());
    let token = Secret::from("token");

    let result = api.send_message(None, Some(&token), "hello").await;

    assert!(matches!(result, Err(AppError::MissingChatroomId)));
  }
}
