//! The list actor: single owner of [`ListState`].
//!
//! Commands arrive from [`UserListHandle`]s over a channel. Network calls run
//! on spawned tasks that report back through a second channel, so the actor
//! keeps serving commands, connectivity changes and the search debounce while
//! requests are in flight. Each request carries a generation number and
//! results from superseded requests are discarded.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ListConfig;
use crate::connectivity::{Connectivity, ConnectivityMonitor, ConnectivitySubscription};
use crate::error::FetchError;
use crate::users::{FetchUsers, User};

use super::state::ListState;

/// Commands accepted by the actor; each is acknowledged once applied.
#[derive(Debug)]
enum Command {
  FetchUsers,
  LoadMoreUsers,
  SetSearchText(String),
}

/// Results reported by spawned request tasks
#[derive(Debug)]
enum Completion {
  Fetched {
    generation: u64,
    result: Result<Vec<User>, FetchError>,
  },
  PageLoaded {
    generation: u64,
    page: NonZeroU32,
    result: Result<Vec<User>, FetchError>,
  },
}

type Envelope = (Command, oneshot::Sender<()>);

/// Cloneable handle to a running user list.
///
/// Dropping the last handle stops the actor and abandons in-flight requests.
#[derive(Clone)]
pub struct UserListHandle {
  commands: mpsc::UnboundedSender<Envelope>,
  state: watch::Receiver<ListState>,
}

impl UserListHandle {
  /// Load page 1 (with cache fallback). No-op while a fetch is running.
  pub async fn fetch_users(&self) {
    self.send(Command::FetchUsers).await;
  }

  pub async fn refresh_users(&self) {
    self.fetch_users().await;
  }

  /// Load the next page if allowed by the current state.
  pub async fn load_more_users(&self) {
    self.send(Command::LoadMoreUsers).await;
  }

  /// Update the search text; filtering runs after the debounce delay.
  pub async fn set_search_text(&self, text: impl Into<String>) {
    self.send(Command::SetSearchText(text.into())).await;
  }

  pub fn should_load_more_users(&self, index: usize) -> bool {
    self.state.borrow().should_load_more_users(index)
  }

  pub fn snapshot(&self) -> ListState {
    self.state.borrow().clone()
  }

  /// Observable stream of state changes.
  pub fn subscribe(&self) -> watch::Receiver<ListState> {
    self.state.clone()
  }

  /// Wait until the state satisfies `predicate`. Returns `None` if the actor stopped.
  pub async fn wait_until(&self, predicate: impl FnMut(&ListState) -> bool) -> Option<ListState> {
    let mut rx = self.state.clone();
    let state = rx.wait_for(predicate).await.ok()?;
    Some(state.clone())
  }

  /// Resolves once the actor has applied the command (not once any
  /// resulting request finishes).
  async fn send(&self, command: Command) {
    let (ack_tx, ack_rx) = oneshot::channel();
    if self.commands.send((command, ack_tx)).is_err() {
      debug!("User list is gone, dropping command");
      return;
    }
    let _ = ack_rx.await;
  }
}

/// Start a user list actor on the current runtime.
pub fn spawn(
  use_case: Arc<dyn FetchUsers>,
  connectivity: &ConnectivityMonitor,
  config: &ListConfig,
) -> UserListHandle {
  let mut subscription = connectivity.subscribe();
  // Read once at registration, afterwards only deltas count
  let is_connected = subscription.current().is_connected();

  let (state_tx, state_rx) = watch::channel(ListState::new(is_connected, config.prefetch_threshold));
  let (commands_tx, commands_rx) = mpsc::unbounded_channel();
  let (results_tx, results_rx) = mpsc::unbounded_channel();

  let actor = UserList {
    state: state_tx,
    use_case,
    connectivity: Some(subscription),
    commands: commands_rx,
    results_tx,
    results_rx,
    debounce: Duration::from_millis(config.search_debounce_ms),
    search_deadline: None,
    fetch_generation: 0,
    more_generation: 0,
    fetch_task: None,
    more_task: None,
  };
  tokio::spawn(actor.run());

  UserListHandle {
    commands: commands_tx,
    state: state_rx,
  }
}

struct UserList {
  state: watch::Sender<ListState>,
  use_case: Arc<dyn FetchUsers>,
  connectivity: Option<ConnectivitySubscription>,
  commands: mpsc::UnboundedReceiver<Envelope>,
  results_tx: mpsc::UnboundedSender<Completion>,
  results_rx: mpsc::UnboundedReceiver<Completion>,
  debounce: Duration,
  /// When the pending search filter runs; rescheduled by every keystroke
  search_deadline: Option<Instant>,
  fetch_generation: u64,
  more_generation: u64,
  fetch_task: Option<JoinHandle<()>>,
  more_task: Option<JoinHandle<()>>,
}

impl UserList {
  async fn run(mut self) {
    loop {
      let deadline = self.search_deadline.unwrap_or_else(Instant::now);

      tokio::select! {
        envelope = self.commands.recv() => match envelope {
          Some((command, ack)) => {
            self.handle_command(command);
            let _ = ack.send(());
          }
          None => break,
        },
        Some(completion) = self.results_rx.recv() => self.handle_completion(completion),
        change = next_change(&mut self.connectivity) => self.handle_connectivity(change),
        _ = tokio::time::sleep_until(deadline), if self.search_deadline.is_some() => {
          self.search_deadline = None;
          self.state.send_modify(|s| s.apply_filter());
        }
      }
    }

    debug!("User list stopped");
  }

  fn handle_command(&mut self, command: Command) {
    match command {
      Command::FetchUsers => self.start_fetch(),
      Command::LoadMoreUsers => self.start_load_more(),
      Command::SetSearchText(text) => {
        self.state.send_modify(|s| s.set_search_text(text));
        self.search_deadline = Some(Instant::now() + self.debounce);
      }
    }
  }

  fn start_fetch(&mut self) {
    if !self.state.send_if_modified(|s| s.begin_fetch()) {
      debug!("Fetch already in progress");
      return;
    }

    // A fresh first page makes any page load in flight meaningless
    if let Some(task) = self.more_task.take() {
      task.abort();
      self.more_generation += 1;
    }

    self.fetch_generation += 1;
    let generation = self.fetch_generation;
    let use_case = self.use_case.clone();
    let results = self.results_tx.clone();

    self.fetch_task = Some(tokio::spawn(async move {
      let result = use_case.execute().await;
      let _ = results.send(Completion::Fetched { generation, result });
    }));
  }

  fn start_load_more(&mut self) {
    let mut next_page = None;
    self.state.send_if_modified(|s| {
      next_page = s.begin_load_more();
      next_page.is_some()
    });
    let Some(page) = next_page else {
      return;
    };

    self.more_generation += 1;
    let generation = self.more_generation;
    let use_case = self.use_case.clone();
    let results = self.results_tx.clone();

    debug!(page = page.get(), "Loading more users");
    self.more_task = Some(tokio::spawn(async move {
      let result = use_case.load_more_users(page).await;
      let _ = results.send(Completion::PageLoaded {
        generation,
        page,
        result,
      });
    }));
  }

  fn handle_completion(&mut self, completion: Completion) {
    match completion {
      Completion::Fetched { generation, result } => {
        if generation != self.fetch_generation {
          debug!(generation, "Discarding superseded fetch");
          return;
        }
        self.fetch_task = None;

        if let Err(err) = &result {
          warn!(error = %err, "Failed to fetch users");
        }
        self.state.send_modify(|s| s.finish_fetch(result));
      }
      Completion::PageLoaded {
        generation,
        page,
        result,
      } => {
        if generation != self.more_generation {
          debug!(generation, "Discarding superseded page load");
          return;
        }
        self.more_task = None;

        let failed = result.as_ref().err().cloned();
        self.state.send_modify(|s| s.finish_load_more(page, result));

        if let Some(err) = failed {
          warn!(
            page = page.get(),
            error = %err,
            consecutive = self.state.borrow().consecutive_page_failures(),
            "Failed to load more users"
          );
        }
      }
    }
  }

  fn handle_connectivity(&mut self, change: Option<Connectivity>) {
    let Some(connectivity) = change else {
      // Monitor dropped; keep the last known state
      self.connectivity = None;
      return;
    };

    let mut should_fetch = false;
    self.state.send_modify(|s| {
      should_fetch = s.set_connected(connectivity.is_connected());
    });

    if should_fetch {
      info!("Connection restored with an empty list, fetching users");
      self.start_fetch();
    }
  }
}

impl Drop for UserList {
  fn drop(&mut self) {
    if let Some(task) = self.fetch_task.take() {
      task.abort();
    }
    if let Some(task) = self.more_task.take() {
      task.abort();
    }
  }
}

async fn next_change(subscription: &mut Option<ConnectivitySubscription>) -> Option<Connectivity> {
  match subscription {
    Some(sub) => sub.next().await,
    None => std::future::pending().await,
  }
}
