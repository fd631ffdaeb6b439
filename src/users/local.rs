//! Local persistence of the page-1 user snapshot.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::BlobStore;

use super::types::User;

/// Storage key holding the serialized page-1 users.
pub const USERS_CACHE_KEY: &str = "users:page1";

/// Best-effort cache of the last successfully fetched first page.
///
/// Neither operation can fail: a broken cache behaves like an empty one.
pub trait UserCache: Send + Sync {
  fn save(&self, users: &[User]);

  fn load(&self) -> Option<Vec<User>>;
}

/// [`UserCache`] backed by a [`BlobStore`], storing users as JSON.
#[derive(Clone)]
pub struct StoredUserCache {
  store: Arc<dyn BlobStore>,
}

impl StoredUserCache {
  pub fn new(store: Arc<dyn BlobStore>) -> Self {
    Self { store }
  }
}

impl UserCache for StoredUserCache {
  fn save(&self, users: &[User]) {
    let data = match serde_json::to_vec(users) {
      Ok(data) => data,
      Err(e) => {
        warn!("Failed to serialize users for cache: {}", e);
        return;
      }
    };

    match self.store.put(USERS_CACHE_KEY, &data) {
      Ok(()) => debug!(count = users.len(), "Cached page-1 users"),
      Err(e) => warn!("Failed to save users: {}", e),
    }
  }

  fn load(&self) -> Option<Vec<User>> {
    let blob = match self.store.get(USERS_CACHE_KEY) {
      Ok(Some(blob)) => blob,
      Ok(None) => return None,
      Err(e) => {
        warn!("Failed to load users: {}", e);
        return None;
      }
    };

    match serde_json::from_slice::<Vec<User>>(&blob.data) {
      Ok(users) => {
        debug!(count = users.len(), cached_at = %blob.cached_at, "Loaded cached users");
        Some(users)
      }
      Err(e) => {
        warn!("Discarding undecodable user cache: {}", e);
        None
      }
    }
  }
}
