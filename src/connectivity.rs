//! Network reachability monitoring.
//!
//! A background probe task records observations into a `watch` channel.
//! Subscribers read the current state once when they register and afterwards
//! only receive transitions.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::ConnectivityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
  Connected,
  Disconnected,
}

impl Connectivity {
  pub fn is_connected(self) -> bool {
    self == Connectivity::Connected
  }

  pub fn from_reachable(reachable: bool) -> Self {
    if reachable {
      Connectivity::Connected
    } else {
      Connectivity::Disconnected
    }
  }
}

/// Shared view of network reachability.
///
/// Cloning is cheap; all clones observe and update the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
  state: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityMonitor {
  pub fn new(initial: Connectivity) -> Self {
    let (tx, _rx) = watch::channel(initial);
    Self { state: Arc::new(tx) }
  }

  pub fn current(&self) -> Connectivity {
    *self.state.borrow()
  }

  pub fn is_connected(&self) -> bool {
    self.current().is_connected()
  }

  /// Record an observation. Subscribers are notified only when the state
  /// actually changes; returns whether it did.
  pub fn set(&self, connectivity: Connectivity) -> bool {
    self.state.send_if_modified(|current| {
      if *current == connectivity {
        false
      } else {
        *current = connectivity;
        true
      }
    })
  }

  /// Register for change notifications. Dropping the subscription unregisters it.
  pub fn subscribe(&self) -> ConnectivitySubscription {
    ConnectivitySubscription {
      rx: self.state.subscribe(),
    }
  }

  /// Start probing `probe_host:probe_port` with a TCP connect every interval.
  ///
  /// The probe stops when the returned handle is dropped.
  pub fn spawn_probe(&self, config: &ConnectivityConfig) -> ProbeHandle {
    let monitor = self.clone();
    let host = config.probe_host.clone();
    let port = config.probe_port;
    let interval = Duration::from_millis(config.interval_ms.max(1));
    let timeout = Duration::from_millis(config.timeout_ms);

    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        ticker.tick().await;
        let reachable = probe(&host, port, timeout).await;
        let state = Connectivity::from_reachable(reachable);
        if monitor.set(state) {
          info!(?state, host = %host, "Connectivity changed");
        } else {
          debug!(?state, "Connectivity probe");
        }
      }
    });

    ProbeHandle { task }
  }
}

async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
  matches!(
    tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
    Ok(Ok(_))
  )
}

/// Owns the background probe task and aborts it on drop.
pub struct ProbeHandle {
  task: JoinHandle<()>,
}

impl Drop for ProbeHandle {
  fn drop(&mut self) {
    self.task.abort();
  }
}

/// Registration for connectivity change events.
pub struct ConnectivitySubscription {
  rx: watch::Receiver<Connectivity>,
}

impl ConnectivitySubscription {
  /// State at the time of the call. Marks it as seen, so [`next`](Self::next)
  /// only yields later transitions.
  pub fn current(&mut self) -> Connectivity {
    *self.rx.borrow_and_update()
  }

  /// Wait for the next transition. Returns `None` once the monitor is gone.
  pub async fn next(&mut self) -> Option<Connectivity> {
    self.rx.changed().await.ok()?;
    Some(*self.rx.borrow_and_update())
  }
}
