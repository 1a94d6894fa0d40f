// src/watch/subscription.rs

//! OS file-event subscriptions.
//!
//! A [`Subscriber`] hands out one [`Subscription`] per watcher. The
//! subscription registers paths; its notifications arrive on the two
//! channels in [`SubscriptionStreams`]. The production implementation wraps
//! `notify::RecommendedWatcher`, whose callback runs on a notify-owned thread
//! and is bridged into Tokio through unbounded channels.

use std::fmt::Debug;
use std::path::Path;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::errors::{Result, WatchError};
use crate::types::{ChangeEvent, ChangeOp};

/// Receiving side of a subscription.
#[derive(Debug)]
pub struct SubscriptionStreams {
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
    pub errors: mpsc::UnboundedReceiver<WatchError>,
}

/// Handle used to register paths and to release the OS resource.
pub trait Subscription: Send + Debug {
    /// Start receiving notifications for `path` (non-recursive).
    fn add(&mut self, path: &Path) -> Result<()>;

    /// Release the underlying OS resource. No events arrive afterwards.
    fn close(&mut self);
}

/// Factory for subscriptions.
pub trait Subscriber: Send + Sync + Debug {
    fn subscribe(&self) -> Result<(Box<dyn Subscription>, SubscriptionStreams)>;
}

/// [`Subscriber`] backed by `notify`'s recommended platform watcher.
#[derive(Debug, Clone, Default)]
pub struct NotifySubscriber;

impl Subscriber for NotifySubscriber {
    fn subscribe(&self) -> Result<(Box<dyn Subscription>, SubscriptionStreams)> {
        let (forwarder, streams) = EventForwarder::channel();

        // Called synchronously by notify on its own thread.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| forwarder.forward(res),
            Config::default(),
        )
        .map_err(|err| WatchError::Subscribe(err.to_string()))?;

        let subscription = NotifySubscription {
            inner: Some(watcher),
        };
        Ok((Box::new(subscription), streams))
    }
}

/// Sending half of [`SubscriptionStreams`], fed from a `notify` callback.
///
/// Each changed path becomes one [`ChangeEvent`]; access events are dropped.
/// Backend errors go to the error stream.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    events: mpsc::UnboundedSender<ChangeEvent>,
    errors: mpsc::UnboundedSender<WatchError>,
}

impl EventForwarder {
    pub fn channel() -> (Self, SubscriptionStreams) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let forwarder = Self {
            events: event_tx,
            errors: error_tx,
        };
        let streams = SubscriptionStreams {
            events: event_rx,
            errors: error_rx,
        };
        (forwarder, streams)
    }

    /// Send failures mean the watcher loop is gone, so there is nobody to
    /// tell.
    pub fn forward(&self, res: notify::Result<Event>) {
        match res {
            Ok(event) => {
                let Some(op) = ChangeOp::from_kind(&event.kind) else {
                    trace!(kind = ?event.kind, paths = ?event.paths, "ignoring access event");
                    return;
                };
                for path in event.paths {
                    let _ = self.events.send(ChangeEvent { path, op });
                }
            }
            Err(err) => {
                let _ = self.errors.send(WatchError::Notify(err));
            }
        }
    }
}

/// A live `notify` watcher. Dropping the inner watcher stops its thread and
/// closes both channels.
pub struct NotifySubscription {
    inner: Option<RecommendedWatcher>,
}

impl Debug for NotifySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySubscription")
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl Subscription for NotifySubscription {
    fn add(&mut self, path: &Path) -> Result<()> {
        let watcher = self.inner.as_mut().ok_or_else(|| WatchError::Register {
            path: path.to_path_buf(),
            reason: "subscription already closed".to_string(),
        })?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|err| WatchError::Register {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("notify subscription closed");
        }
    }
}
