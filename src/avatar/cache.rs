use crate::avatar::providers::{AvatarProvider, HttpAvatarProvider};
use crate::chat_message::{identity_key, Platform};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Used when every provider missed. Resolves any `{platform}/{username}` to some image.
pub const CONVENTION_AVATAR_URL: &str = "https://unavatar.io";

/// Resolved avatar URLs keyed by `"{platform}-{username}"`.
///
/// Entries are never invalidated. Concurrent lookups for the same key are collapsed
/// into one through the in flight set.
pub struct AvatarCache<P = HttpAvatarProvider> {
  providers: HashMap<Platform, Vec<P>>,
  convention_url: Option<String>,
  resolved: Mutex<HashMap<String, String>>,
  in_flight: Mutex<HashSet<String>>,
}

impl Default for AvatarCache<HttpAvatarProvider> {
  fn default() -> Self {
    Self::new(HttpAvatarProvider::defaults())
  }
}

impl<P> AvatarCache<P>
where
  P: AvatarProvider,
{
  pub fn new(providers: HashMap<Platform, Vec<P>>) -> Self {
    Self {
      providers,
      convention_url: Some(CONVENTION_AVATAR_URL.to_string()),
      resolved: Mutex::new(HashMap::new()),
      in_flight: Mutex::new(HashSet::new()),
    }
  }

  /// Replaces the convention fallback. None disables it.
  pub fn with_convention_url(mut self, convention_url: Option<String>) -> Self {
    self.convention_url = convention_url;

    self
  }

  pub fn cached(&self, platform: Platform, username: &str) -> Option<String> {
    lock(&self.resolved)
      .get(&identity_key(platform, username))
      .cloned()
  }

  pub fn is_in_flight(&self, platform: Platform, username: &str) -> bool {
    lock(&self.in_flight).contains(&identity_key(platform, username))
  }

  pub fn len(&self) -> usize {
    lock(&self.resolved).len()
  }

  pub fn is_empty(&self) -> bool {
    lock(&self.resolved).is_empty()
  }

  /// Resolves the user's avatar, trying each provider in order before the convention URL.
  ///
  /// Returns None without doing anything if the same lookup is already running,
  /// or if nothing could produce a URL.
  pub async fn resolve(&self, platform: Platform, username: &str) -> Option<String> {
    let username = username.trim();

    if platform == Platform::System || username.is_empty() {
      return None;
    }

    if let Some(avatar_url) = self.cached(platform, username) {
      return Some(avatar_url);
    }

    let key = identity_key(platform, username);
    let _in_flight_guard = InFlightGuard::acquire(&self.in_flight, key.clone())?;

    let avatar_url = match self.lookup_providers(platform, username).await {
      Some(avatar_url) => avatar_url,
      None => self.convention_avatar_url(platform, username)?,
    };

    Some(
      lock(&self.resolved)
        .entry(key)
        .or_insert(avatar_url)
        .clone(),
    )
  }

  async fn lookup_providers(&self, platform: Platform, username: &str) -> Option<String> {
    for provider in self.providers.get(&platform)? {
      match provider.lookup(username).await {
        Ok(Some(avatar_url)) => return Some(avatar_url),
        Ok(None) => {
          tracing::trace!("{} had no avatar for {} user {}.", provider.name(), platform, username);
        }
        Err(error) => {
          tracing::debug!(
            "{} failed to look up the avatar for {} user {}: {}",
            provider.name(),
            platform,
            username,
            error
          );
        }
      }
    }

    None
  }

  fn convention_avatar_url(&self, platform: Platform, username: &str) -> Option<String> {
    let convention_url = self.convention_url.as_deref()?;

    Some(format!(
      "{}/{}/{}",
      convention_url.trim_end_matches('/'),
      platform.as_key(),
      username.to_lowercase()
    ))
  }
}

/// Holds a key in the in flight set until dropped.
struct InFlightGuard<'a> {
  in_flight: &'a Mutex<HashSet<String>>,
  key: String,
}

impl<'a> InFlightGuard<'a> {
  /// None if the key is already in flight.
  fn acquire(in_flight: &'a Mutex<HashSet<String>>, key: String) -> Option<Self> {
    if !lock(in_flight).insert(key.clone()) {
      return None;
    }

    Some(Self { in_flight, key })
  }
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    lock(self.in_flight).remove(&self.key);
  }
}

/// The maps are always left consistent, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;
  use std::future::Future;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[derive(Clone)]
  struct FakeProvider {
    name: &'static str,
    answer: Result<Option<&'static str>, ()>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
  }

  impl FakeProvider {
    fn new(name: &'static str, answer: Result<Option<&'static str>, ()>) -> Self {
      Self {
        name,
        answer,
        calls: Arc::new(AtomicUsize::new(0)),
        delay: Duration::ZERO,
      }
    }
  }

  impl AvatarProvider for FakeProvider {
    fn name(&self) -> &str {
      self.name
    }

    fn lookup(&self, _: &str) -> impl Future<Output = Result<Option<String>, AppError>> + Send {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let answer = self.answer;
      let delay = self.delay;

      async move {
        tokio::time::sleep(delay).await;

        match answer {
          Ok(avatar_url) => Ok(avatar_url.map(str::to_string)),
          Err(()) => Err(AppError::FailedResponse {
            location: "fake provider",
            code: 503,
            body: String::new(),
          }),
        }
      }
    }
  }

  fn cache_with(providers: Vec<FakeProvider>) -> AvatarCache<FakeProvider> {
    AvatarCache::new(HashMap::from([(Platform::Twitch, providers)]))
  }

  #[tokio::test]
  async fn providers_are_tried_in_order() {
    let failing = FakeProvider::new("failing", Err(()));
    let missing = FakeProvider::new("missing", Ok(None));
    let found = FakeProvider::new("found", Ok(Some("https://cdn/gabe.png")));
    let never_reached = FakeProvider::new("never", Ok(Some("https://cdn/other.png")));
    let cache = cache_with(vec![
      failing.clone(),
      missing.clone(),
      found.clone(),
      never_reached.clone(),
    ]);

    let avatar_url = cache.resolve(Platform::Twitch, "Gabe").await;

    assert_eq!(avatar_url.as_deref(), Some("https://cdn/gabe.png"));
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(missing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(never_reached.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
      cache.cached(Platform::Twitch, "gabe").as_deref(),
      Some("https://cdn/gabe.png")
    );
    assert!(!cache.is_in_flight(Platform::Twitch, "gabe"));
  }

  #[tokio::test]
  async fn cached_avatars_skip_the_providers() {
    let found = FakeProvider::new("found", Ok(Some("https://cdn/a.png")));
    let cache = cache_with(vec![found.clone()]);

    cache.resolve(Platform::Twitch, "a").await;
    cache.resolve(Platform::Twitch, "A").await;

    assert_eq!(found.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn total_miss_falls_back_to_the_convention_url() {
    let cache = cache_with(vec![FakeProvider::new("missing", Ok(None))]);

    let avatar_url = cache.resolve(Platform::Twitch, "Gabe").await;

    assert_eq!(avatar_url.as_deref(), Some("https://unavatar.io/twitch/gabe"));
  }

  #[tokio::test]
  async fn total_failure_leaves_the_cache_unset() {
    let cache =
      cache_with(vec![FakeProvider::new("failing", Err(()))]).with_convention_url(None);

    assert_eq!(cache.resolve(Platform::Twitch, "Gabe").await, None);
    assert!(cache.is_empty());
    assert!(!cache.is_in_flight(Platform::Twitch, "gabe"));
    assert_eq!(cache.resolve(Platform::System, "System").await, None);
  }

  #[tokio::test]
  async fn concurrent_lookups_are_collapsed() {
    let mut slow = FakeProvider::new("slow", Ok(Some("https://cdn/slow.png")));
    slow.delay = Duration::from_millis(50);
    let cache = Arc::new(cache_with(vec![slow.clone()]));

    let first = tokio::spawn({
      let cache = cache.clone();
      async move { cache.resolve(Platform::Twitch, "slowpoke").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = cache.resolve(Platform::Twitch, "SlowPoke").await;

    assert_eq!(second, None);
    assert_eq!(
      first.await.unwrap().as_deref(),
      Some("https://cdn/slow.png")
    );
    assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
  }
}
