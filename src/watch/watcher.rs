// src/watch/watcher.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, Instrument};

use crate::errors::Result;
use crate::types::{MatchedPath, WatcherState};
use crate::watch::resolve::{FsGlobResolver, GlobResolver};
use crate::watch::subscription::{NotifySubscriber, Subscriber, Subscription, SubscriptionStreams};
use crate::watch::throttle::Throttle;

/// Window used to collapse the burst of events a single save produces.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(50);

/// Per-watcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Minimum time between two callbacks of the same watcher.
    pub throttle: Duration,
    /// Also register each matched file's parent directory, so that files
    /// replaced by rename (as many editors save) keep producing events.
    pub watch_parents: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            watch_parents: true,
        }
    }
}

/// Starts watchers: owns the glob resolver, the subscription factory and
/// the options every watcher it starts will use.
///
/// Cheap to clone; every clone shares the same backends.
#[derive(Debug, Clone)]
pub struct Watcher {
    resolver: Arc<dyn GlobResolver>,
    subscriber: Arc<dyn Subscriber>,
    options: WatchOptions,
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new(Arc::new(FsGlobResolver::default()), Arc::new(NotifySubscriber))
    }
}

impl Watcher {
    pub fn new(resolver: Arc<dyn GlobResolver>, subscriber: Arc<dyn Subscriber>) -> Self {
        Self {
            resolver,
            subscriber,
            options: WatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    /// Resolve `patterns`, subscribe to every match and spawn the event loop.
    ///
    /// `on_change` receives the path of each event that passes the throttle.
    /// Resolution and registration errors are returned before anything is
    /// spawned. The loop runs until `cancel` fires.
    pub fn watch<F>(
        &self,
        cancel: CancellationToken,
        on_change: F,
        patterns: &[String],
    ) -> Result<WatchHandle>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let label = patterns.join(",");
        self.start(&label, cancel, on_change, patterns)
    }

    pub(crate) fn start<F>(
        &self,
        label: &str,
        cancel: CancellationToken,
        on_change: F,
        patterns: &[String],
    ) -> Result<WatchHandle>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(WatcherState::Created);

        transition(&state_tx, label, WatcherState::Resolving);
        let matched = self
            .resolver
            .resolve(patterns)
            .inspect_err(|_| transition(&state_tx, label, WatcherState::Failed))?;

        transition(&state_tx, label, WatcherState::Subscribing);
        let (mut subscription, streams) = self
            .subscriber
            .subscribe()
            .inspect_err(|_| transition(&state_tx, label, WatcherState::Failed))?;

        let registered = match register_all(
            subscription.as_mut(),
            &matched,
            self.options.watch_parents,
        ) {
            Ok(paths) => paths,
            Err(err) => {
                subscription.close();
                transition(&state_tx, label, WatcherState::Failed);
                return Err(err);
            }
        };

        let throttle = Throttle::new(self.options.throttle);

        info!(
            watcher = %label,
            files = matched.len(),
            registered = registered.len(),
            throttle_ms = throttle.interval().as_millis() as u64,
            "watching"
        );
        transition(&state_tx, label, WatcherState::Watching);

        let span = tracing::debug_span!("watcher", name = %label);
        let task = tokio::spawn(
            event_loop(cancel, subscription, streams, throttle, on_change, state_tx)
                .instrument(span),
        );

        Ok(WatchHandle {
            state: state_rx,
            paths: registered,
            task,
        })
    }
}

/// Start a single watcher with the default glob resolver and `notify`
/// subscription.
pub fn watch_one<F>(
    cancel: CancellationToken,
    on_change: F,
    patterns: &[String],
) -> Result<WatchHandle>
where
    F: Fn(&Path) + Send + 'static,
{
    Watcher::default().watch(cancel, on_change, patterns)
}

/// Handle to a running watcher.
///
/// Dropping it does not stop the watcher; cancel its token for that.
#[derive(Debug)]
pub struct WatchHandle {
    state: watch::Receiver<WatcherState>,
    paths: Vec<PathBuf>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Every path registered with the subscription, parents included.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the event loop to close its subscription and exit.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            error!(error = %err, "watcher task failed");
        }
    }
}

fn transition(state: &watch::Sender<WatcherState>, label: &str, next: WatcherState) {
    let prev = state.send_replace(next);
    debug!(watcher = %label, from = %prev, to = %next, "watcher state");
}

/// Register every matched path, preceded by its parent directory when
/// `with_parents` is set. Parents are registered once each; matched paths
/// are registered as often as the patterns produced them.
fn register_all(
    subscription: &mut dyn Subscription,
    matched: &[MatchedPath],
    with_parents: bool,
) -> Result<Vec<PathBuf>> {
    let mut registered = Vec::with_capacity(matched.len() * 2);
    let mut parents = HashSet::new();

    for m in matched {
        if with_parents && parents.insert(m.parent.clone()) {
            subscription.add(&m.parent)?;
            registered.push(m.parent.clone());
        }
        subscription.add(&m.path)?;
        registered.push(m.path.clone());
    }

    Ok(registered)
}

async fn event_loop<F>(
    cancel: CancellationToken,
    mut subscription: Box<dyn Subscription>,
    mut streams: SubscriptionStreams,
    throttle: Throttle,
    on_change: F,
    state: watch::Sender<WatcherState>,
) where
    F: Fn(&Path) + Send + 'static,
{
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some(event) = streams.events.recv() => {
                debug!(path = ?event.path, op = ?event.op, "change event");
                if !throttle.call(|| on_change(&event.path)) {
                    trace!(path = ?event.path, "change suppressed by throttle");
                }
            }

            Some(err) = streams.errors.recv() => {
                error!(error = %err, "file watch error");
            }
        }
    }

    state.send_replace(WatcherState::Closing);
    subscription.close();
    state.send_replace(WatcherState::Closed);
    debug!("watcher closed");
}
