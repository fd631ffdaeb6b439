//! Repository combining the remote source with the local page-1 cache.

use async_trait::async_trait;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;

use super::local::UserCache;
use super::remote::RemoteSource;
use super::types::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
  /// Fetch a page from the network. Errors are returned as-is.
  async fn fetch_users(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError>;

  /// The last cached first page, without any staleness check.
  async fn load_cached_users(&self) -> Option<Vec<User>>;
}

/// Repository with write-through caching of page 1.
///
/// Only a successful first-page fetch touches the cache, so it always holds
/// the first page of the most recent successful session.
#[derive(Clone)]
pub struct CachedUserRepository {
  remote: Arc<dyn RemoteSource>,
  local: Arc<dyn UserCache>,
}

impl CachedUserRepository {
  pub fn new(remote: Arc<dyn RemoteSource>, local: Arc<dyn UserCache>) -> Self {
    Self { remote, local }
  }
}

#[async_trait]
impl UserRepository for CachedUserRepository {
  async fn fetch_users(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError> {
    let users = self.remote.fetch_page(page).await?;

    if page.get() == 1 {
      debug!(count = users.len(), "Writing page 1 through to cache");
      self.local.save(&users);
    }

    Ok(users)
  }

  async fn load_cached_users(&self) -> Option<Vec<User>> {
    self.local.load()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::users::fixtures::{mock_page, mock_users};
  use std::collections::HashMap;
  use std::sync::Mutex;

  /// Remote returning canned results per page and recording requested pages.
  #[derive(Default)]
  struct MockRemote {
    pages: HashMap<u32, Result<Vec<User>, FetchError>>,
    requested: Mutex<Vec<u32>>,
  }

  impl MockRemote {
    fn with_page(mut self, page: u32, result: Result<Vec<User>, FetchError>) -> Self {
      self.pages.insert(page, result);
      self
    }
  }

  #[async_trait]
  impl RemoteSource for MockRemote {
    async fn fetch_page(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError> {
      self.requested.lock().unwrap().push(page.get());
      self
        .pages
        .get(&page.get())
        .cloned()
        .unwrap_or(Ok(Vec::new()))
    }
  }

  #[derive(Default)]
  struct MockCache {
    saved: Mutex<Option<Vec<User>>>,
    save_calls: Mutex<usize>,
  }

  impl UserCache for MockCache {
    fn save(&self, users: &[User]) {
      *self.save_calls.lock().unwrap() += 1;
      *self.saved.lock().unwrap() = Some(users.to_vec());
    }

    fn load(&self) -> Option<Vec<User>> {
      self.saved.lock().unwrap().clone()
    }
  }

  fn page(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
  }

  fn repository(remote: MockRemote) -> (Arc<MockRemote>, Arc<MockCache>, CachedUserRepository) {
    let remote = Arc::new(remote);
    let cache = Arc::new(MockCache::default());
    let repo = CachedUserRepository::new(remote.clone(), cache.clone());
    (remote, cache, repo)
  }

  #[tokio::test]
  async fn test_page_one_success_is_cached() {
    let users = mock_users(10);
    let (_, cache, repo) = repository(MockRemote::default().with_page(1, Ok(users.clone())));

    let fetched = repo.fetch_users(page(1)).await.unwrap();

    assert_eq!(fetched.len(), 10);
    assert_eq!(fetched[0].name.first, "John");
    assert_eq!(*cache.save_calls.lock().unwrap(), 1);
    assert_eq!(cache.load(), Some(users));
  }

  #[tokio::test]
  async fn test_cache_is_overwritten_not_merged() {
    let fresh = mock_page(100, 2);
    let (_, cache, repo) = repository(MockRemote::default().with_page(1, Ok(fresh.clone())));
    cache.save(&mock_users(3));

    repo.fetch_users(page(1)).await.unwrap();

    assert_eq!(cache.load(), Some(fresh));
  }

  #[tokio::test]
  async fn test_later_pages_are_never_cached() {
    let (_, cache, repo) = repository(MockRemote::default().with_page(2, Ok(mock_page(10, 10))));

    let fetched = repo.fetch_users(page(2)).await.unwrap();

    assert_eq!(fetched.len(), 10);
    assert_eq!(*cache.save_calls.lock().unwrap(), 0);
    assert_eq!(cache.load(), None);
  }

  #[tokio::test]
  async fn test_failure_propagates_and_skips_cache() {
    let (_, cache, repo) =
      repository(MockRemote::default().with_page(1, Err(FetchError::ServerError(500))));

    let result = repo.fetch_users(page(1)).await;

    assert_eq!(result, Err(FetchError::ServerError(500)));
    assert_eq!(*cache.save_calls.lock().unwrap(), 0);
  }

  #[tokio::test]
  async fn test_empty_first_page_still_overwrites_cache() {
    let (_, cache, repo) = repository(MockRemote::default().with_page(1, Ok(Vec::new())));
    cache.save(&mock_users(5));

    repo.fetch_users(page(1)).await.unwrap();

    assert_eq!(cache.load(), Some(Vec::new()));
  }

  #[tokio::test]
  async fn test_load_cached_users() {
    let (remote, cache, repo) = repository(MockRemote::default());
    cache.save(&mock_users(5));

    let cached = repo.load_cached_users().await.unwrap();

    assert_eq!(cached.len(), 5);
    assert_eq!(cached[0].name.first, "John");
    assert!(remote.requested.lock().unwrap().is_empty());
  }
}
