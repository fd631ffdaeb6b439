use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{BlobStore, NoopStorage, SqliteStorage};
use crate::config::Config;
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::list::{self, ListState, UserListHandle};
use crate::users::{
  CachedUserRepository, FetchUsersUseCase, HttpRemoteSource, StoredUserCache, User,
};

/// Options taken from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
  /// Total pages to load, including the first
  pub pages: u32,
  pub search: Option<String>,
  /// Start disconnected and skip the reachability probe
  pub offline: bool,
  pub no_cache: bool,
  pub details: bool,
}

/// Wire up the pipeline, drive the list through its commands and print the result.
pub async fn run(config: Config, options: RunOptions) -> Result<()> {
  let monitor = if options.offline {
    ConnectivityMonitor::new(Connectivity::Disconnected)
  } else {
    ConnectivityMonitor::new(Connectivity::Connected)
  };
  let _probe = (!options.offline).then(|| monitor.spawn_probe(&config.connectivity));

  let storage = open_storage(&config, options.no_cache);
  let remote = HttpRemoteSource::new(&config.api, monitor.clone())?;
  let repository = CachedUserRepository::new(Arc::new(remote), Arc::new(StoredUserCache::new(storage)));
  let use_case = FetchUsersUseCase::new(Arc::new(repository));

  let handle = list::spawn(Arc::new(use_case), &monitor, &config.list);
  tokio::spawn(trace_changes(handle.subscribe()));

  handle.fetch_users().await;
  let mut state = settle(&handle).await;
  info!(users = state.all_users().len(), "Initial load finished");

  // One retry for a transient failure with nothing cached to show
  if state.visible_error().is_some() && monitor.is_connected() {
    handle.refresh_users().await;
    state = settle(&handle).await;
  }

  while state.current_page() < options.pages.max(1) {
    let last_index = state.filtered_users().len().saturating_sub(1);
    if !handle.should_load_more_users(last_index) {
      break;
    }

    let page_before = state.current_page();
    handle.load_more_users().await;
    state = settle(&handle).await;

    if state.current_page() == page_before {
      // Either the last page was reached or the load failed; both end the run
      break;
    }
  }

  if let Some(search) = options.search.filter(|s| !s.is_empty()) {
    handle.set_search_text(search).await;
    if let Some(filtered) = handle.wait_until(|s| !s.filter_pending()).await {
      state = filtered;
    }
  }

  print_state(&state, options.details);
  Ok(())
}

fn open_storage(config: &Config, no_cache: bool) -> Arc<dyn BlobStore> {
  if no_cache || !config.cache.enabled {
    return Arc::new(NoopStorage);
  }

  match SqliteStorage::open(config.cache.path.as_deref()) {
    Ok(storage) => Arc::new(storage) as Arc<dyn BlobStore>,
    Err(e) => {
      warn!("Cache unavailable, continuing without it: {}", e);
      Arc::new(NoopStorage)
    }
  }
}

/// Wait for whatever load is running to finish.
async fn settle(handle: &UserListHandle) -> ListState {
  handle
    .wait_until(|s| !s.is_loading() && !s.is_loading_more())
    .await
    .unwrap_or_else(|| handle.snapshot())
}

async fn trace_changes(mut rx: watch::Receiver<ListState>) {
  while rx.changed().await.is_ok() {
    let state = rx.borrow_and_update();
    debug!(
      users = state.all_users().len(),
      visible = state.filtered_users().len(),
      page = state.current_page(),
      loading = state.is_loading(),
      loading_more = state.is_loading_more(),
      connected = state.is_connected(),
      "List state changed"
    );
  }
}

fn print_state(state: &ListState, details: bool) {
  if let Some(error) = state.visible_error() {
    println!("{}", error);
    return;
  }

  for (i, user) in state.filtered_users().iter().enumerate() {
    println!("{}", summary_line(i + 1, user));
    if details {
      for line in detail_lines(user) {
        println!("       {}", line);
      }
    }
  }

  println!();
  if !state.search_text().is_empty() {
    println!("Matching \"{}\"", state.search_text());
  }
  println!(
    "{} of {} users | page {} | more pages: {} | {}",
    state.filtered_users().len(),
    state.all_users().len(),
    state.current_page(),
    if state.has_more_pages() { "yes" } else { "no" },
    if state.is_connected() { "online" } else { "offline" },
  );
}

fn summary_line(position: usize, user: &User) -> String {
  format!(
    "{:>4}. {} <{}> {}, {} {}",
    position,
    user.full_name(),
    user.email,
    user.location.city,
    user.location.country,
    user.postcode()
  )
}

fn detail_lines(user: &User) -> Vec<String> {
  let mut lines = vec![
    format!("Gender: {}", user.gender_label()),
    format!("Nationality: {}", user.nat),
    format!("Phone: {} / Cell: {}", user.phone, user.cell),
    format!("Address: {}", user.address()),
    format!("Born: {}", user.date_of_birth_label()),
    format!("Registered: {}", user.registration_label()),
  ];
  if let Some(url) = user.picture_url() {
    lines.push(format!("Picture: {}", url));
  }
  lines
}
