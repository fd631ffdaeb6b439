//! Network-first user loading with cache fallback.

use async_trait::async_trait;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::FetchError;

use super::repository::UserRepository;
use super::types::User;

const FIRST_PAGE: NonZeroU32 = NonZeroU32::MIN;

/// Operations the list orchestrator needs to load users.
#[async_trait]
pub trait FetchUsers: Send + Sync {
  /// Load the first page, falling back to the cached snapshot on failure.
  async fn execute(&self) -> Result<Vec<User>, FetchError>;

  /// Load a subsequent page (`page > 1`). Never falls back to cache.
  async fn load_more_users(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError>;
}

#[derive(Clone)]
pub struct FetchUsersUseCase {
  repository: Arc<dyn UserRepository>,
}

impl FetchUsersUseCase {
  pub fn new(repository: Arc<dyn UserRepository>) -> Self {
    Self { repository }
  }
}

#[async_trait]
impl FetchUsers for FetchUsersUseCase {
  async fn execute(&self) -> Result<Vec<User>, FetchError> {
    let err = match self.repository.fetch_users(FIRST_PAGE).await {
      Ok(users) => return Ok(users),
      Err(err) => err,
    };

    // Cache is only consulted after the network attempt failed
    match self.repository.load_cached_users().await {
      Some(cached) if !cached.is_empty() => {
        if err == FetchError::NoConnection {
          info!(count = cached.len(), "Offline, serving cached users");
        } else {
          warn!(error = %err, count = cached.len(), "Fetch failed, serving cached users");
        }
        Ok(cached)
      }
      _ => Err(err),
    }
  }

  async fn load_more_users(&self, page: NonZeroU32) -> Result<Vec<User>, FetchError> {
    if page == FIRST_PAGE {
      return Err(FetchError::InvalidRequest);
    }
    self.repository.fetch_users(page).await
  }
}
