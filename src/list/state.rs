use std::num::NonZeroU32;

use crate::error::FetchError;
use crate::users::User;

/// Pagination, filter and status flags of the user list.
///
/// Only the list actor mutates this; everyone else reads snapshots.
#[derive(Debug, Clone)]
pub struct ListState {
  all_users: Vec<User>,
  filtered_users: Vec<User>,
  current_page: u32,
  has_more_pages: bool,
  is_loading: bool,
  is_loading_more: bool,
  is_connected: bool,
  search_text: String,
  last_error: Option<String>,
  filter_pending: bool,
  consecutive_page_failures: u32,
  prefetch_threshold: usize,
}

impl ListState {
  pub fn new(is_connected: bool, prefetch_threshold: usize) -> Self {
    Self {
      all_users: Vec::new(),
      filtered_users: Vec::new(),
      current_page: 1,
      has_more_pages: true,
      is_loading: false,
      is_loading_more: false,
      is_connected,
      search_text: String::new(),
      last_error: None,
      filter_pending: false,
      consecutive_page_failures: 0,
      prefetch_threshold,
    }
  }

  pub fn all_users(&self) -> &[User] {
    &self.all_users
  }

  pub fn filtered_users(&self) -> &[User] {
    &self.filtered_users
  }

  pub fn current_page(&self) -> u32 {
    self.current_page
  }

  pub fn has_more_pages(&self) -> bool {
    self.has_more_pages
  }

  pub fn is_loading(&self) -> bool {
    self.is_loading
  }

  pub fn is_loading_more(&self) -> bool {
    self.is_loading_more
  }

  pub fn is_connected(&self) -> bool {
    self.is_connected
  }

  pub fn search_text(&self) -> &str {
    &self.search_text
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  /// Search text changed but the debounced filter has not run yet.
  pub fn filter_pending(&self) -> bool {
    self.filter_pending
  }

  /// Page loads that failed in a row since the last successful one.
  pub fn consecutive_page_failures(&self) -> u32 {
    self.consecutive_page_failures
  }

  /// Error to show to the user. Hidden while the list has data, so a failed
  /// refresh never covers what is already visible.
  pub fn visible_error(&self) -> Option<&str> {
    if self.all_users.is_empty() {
      self.last_error()
    } else {
      None
    }
  }

  /// Whether showing row `index` should trigger loading the next page.
  ///
  /// Disabled while a search is active, since filtered rows don't line up
  /// with the page cursor.
  pub fn should_load_more_users(&self, index: usize) -> bool {
    let threshold = self.filtered_users.len() as i64 - self.prefetch_threshold as i64;
    index as i64 >= threshold
      && self.has_more_pages
      && !self.is_loading_more
      && self.is_connected
      && self.search_text.is_empty()
  }

  // ============================================================================
  // Transitions (driven by the list actor)
  // ============================================================================

  /// Enter the loading state. Returns false if a fetch is already running.
  ///
  /// A fetch supersedes any page load in flight.
  pub(super) fn begin_fetch(&mut self) -> bool {
    if self.is_loading {
      return false;
    }
    self.is_loading = true;
    self.is_loading_more = false;
    self.last_error = None;
    true
  }

  pub(super) fn finish_fetch(&mut self, result: Result<Vec<User>, FetchError>) {
    self.is_loading = false;
    match result {
      Ok(users) => {
        self.all_users = users;
        self.current_page = 1;
        self.has_more_pages = true;
        self.consecutive_page_failures = 0;
        self.refilter();
      }
      Err(err) => {
        self.last_error = Some(err.user_message());
      }
    }
  }

  /// Enter the loading-more state, returning the page to request.
  pub(super) fn begin_load_more(&mut self) -> Option<NonZeroU32> {
    if self.is_loading || self.is_loading_more || !self.has_more_pages || !self.is_connected {
      return None;
    }
    let next_page = NonZeroU32::new(self.current_page.saturating_add(1))?;
    self.is_loading_more = true;
    Some(next_page)
  }

  pub(super) fn finish_load_more(&mut self, page: NonZeroU32, result: Result<Vec<User>, FetchError>) {
    self.is_loading_more = false;
    match result {
      Ok(users) if users.is_empty() => {
        self.has_more_pages = false;
        self.consecutive_page_failures = 0;
      }
      Ok(users) => {
        self.all_users.extend(users);
        self.current_page = page.get();
        self.consecutive_page_failures = 0;
        self.refilter();
      }
      Err(_) => {
        // Left retryable: has_more_pages untouched, last_error untouched
        self.consecutive_page_failures += 1;
      }
    }
  }

  pub(super) fn set_search_text(&mut self, text: String) {
    self.search_text = text;
    self.filter_pending = true;
  }

  /// Run the debounced filter against the latest search text.
  pub(super) fn apply_filter(&mut self) {
    self.filter_pending = false;
    self.refilter();
  }

  /// Record a connectivity change. Returns true when the list should fetch
  /// again: the network came back and nothing is loaded.
  pub(super) fn set_connected(&mut self, connected: bool) -> bool {
    let reconnected = connected && !self.is_connected;
    self.is_connected = connected;
    reconnected && self.all_users.is_empty()
  }

  fn refilter(&mut self) {
    self.filtered_users = if self.search_text.is_empty() {
      self.all_users.clone()
    } else {
      self
        .all_users
        .iter()
        .filter(|user| user.matches(&self.search_text))
        .cloned()
        .collect()
    };
  }
}
