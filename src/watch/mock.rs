// src/watch/mock.rs

//! In-memory [`Subscriber`] for tests.
//!
//! Mimics what an OS primitive would deliver: an emitted event reaches every
//! open subscription that registered either the path itself or its parent
//! directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use tokio::sync::mpsc;

use super::subscription::{Subscriber, Subscription, SubscriptionStreams};
use crate::errors::{Result, WatchError};
use crate::types::{ChangeEvent, ChangeOp};

#[derive(Debug, Clone, Default)]
pub struct MockSubscriber {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    slots: Vec<Slot>,
    fail_subscribe: bool,
    fail_add: HashSet<PathBuf>,
}

#[derive(Debug)]
struct Slot {
    paths: Vec<PathBuf>,
    senders: Option<(
        mpsc::UnboundedSender<ChangeEvent>,
        mpsc::UnboundedSender<WatchError>,
    )>,
}

impl Slot {
    fn sees(&self, path: &Path) -> bool {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        self.paths.iter().any(|p| p == path || p == parent)
    }
}

impl MockSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `subscribe` call fail.
    pub fn fail_subscribe(&self) {
        self.lock().fail_subscribe = true;
    }

    /// Make registering `path` fail.
    pub fn fail_on_add(&self, path: impl Into<PathBuf>) {
        self.lock().fail_add.insert(path.into());
    }

    /// Deliver a change on `path`. Returns how many subscriptions received it.
    pub fn emit(&self, path: impl AsRef<Path>, op: ChangeOp) -> usize {
        let path = path.as_ref();
        let state = self.lock();
        let mut delivered = 0;
        for slot in state.slots.iter().filter(|slot| slot.sees(path)) {
            if let Some((events, _)) = &slot.senders {
                if events.send(ChangeEvent::new(path, op)).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Deliver a runtime error to every open subscription.
    pub fn emit_error(&self, message: &str) -> usize {
        let state = self.lock();
        let mut delivered = 0;
        for slot in &state.slots {
            if let Some((_, errors)) = &slot.senders {
                if errors.send(WatchError::Other(anyhow!("{message}"))).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Number of subscriptions ever created.
    pub fn subscription_count(&self) -> usize {
        self.lock().slots.len()
    }

    /// Number of subscriptions not yet closed.
    pub fn open_count(&self) -> usize {
        self.lock()
            .slots
            .iter()
            .filter(|slot| slot.senders.is_some())
            .count()
    }

    /// Paths registered on the `index`-th subscription, in registration order.
    pub fn registered_paths(&self, index: usize) -> Vec<PathBuf> {
        self.lock()
            .slots
            .get(index)
            .map(|slot| slot.paths.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Subscriber for MockSubscriber {
    fn subscribe(&self) -> Result<(Box<dyn Subscription>, SubscriptionStreams)> {
        let mut state = self.lock();
        if state.fail_subscribe {
            return Err(WatchError::Subscribe("mock subscriber refused".to_string()));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        state.slots.push(Slot {
            paths: Vec::new(),
            senders: Some((event_tx, error_tx)),
        });

        let subscription = MockSubscription {
            state: Arc::clone(&self.state),
            index: state.slots.len() - 1,
        };
        let streams = SubscriptionStreams {
            events: event_rx,
            errors: error_rx,
        };
        Ok((Box::new(subscription), streams))
    }
}

#[derive(Debug)]
struct MockSubscription {
    state: Arc<Mutex<MockState>>,
    index: usize,
}

impl MockSubscription {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Subscription for MockSubscription {
    fn add(&mut self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.fail_add.contains(path) {
            return Err(WatchError::Register {
                path: path.to_path_buf(),
                reason: "mock registration failure".to_string(),
            });
        }
        if let Some(slot) = state.slots.get_mut(self.index) {
            slot.paths.push(path.to_path_buf());
        }
        Ok(())
    }

    fn close(&mut self) {
        let index = self.index;
        if let Some(slot) = self.lock().slots.get_mut(index) {
            slot.senders = None;
        }
    }
}
