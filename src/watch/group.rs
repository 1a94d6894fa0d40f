// src/watch/group.rs

//! Fan a [`GroupTable`] out into one watcher per group.
//!
//! Every group gets its own watcher, and therefore its own throttle and its
//! own subscription: a burst on one group never suppresses another. All
//! watchers share one cancellation token and [`GroupWatch::run`] only returns
//! once every one of them has closed.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::exec::action::{Action, BoxFuture};
use crate::types::GroupTable;
use crate::watch::watcher::{WatchHandle, Watcher};

/// Callback invoked with the caller's cancellation token and the name of the
/// group whose files changed.
pub type GroupCallback = Arc<dyn Fn(&CancellationToken, &str) -> Result<()> + Send + Sync>;

/// A not-yet-started set of group watchers.
///
/// Nothing happens until [`run`](GroupWatch::run) (or [`Action::execute`])
/// is called with a cancellation token.
pub struct GroupWatch {
    watcher: Watcher,
    callback: GroupCallback,
    table: GroupTable,
}

impl fmt::Debug for GroupWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupWatch")
            .field("watcher", &self.watcher)
            .field("groups", &self.table.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Build a [`GroupWatch`] whose watchers use this watcher's backends and
    /// options.
    pub fn watch_groups<C>(&self, callback: C, table: GroupTable) -> GroupWatch
    where
        C: Fn(&CancellationToken, &str) -> Result<()> + Send + Sync + 'static,
    {
        GroupWatch {
            watcher: self.clone(),
            callback: Arc::new(callback),
            table,
        }
    }
}

/// Build a [`GroupWatch`] with the default glob resolver and `notify`
/// subscription.
pub fn watch_groups<C>(callback: C, table: GroupTable) -> GroupWatch
where
    C: Fn(&CancellationToken, &str) -> Result<()> + Send + Sync + 'static,
{
    Watcher::default().watch_groups(callback, table)
}

impl GroupWatch {
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Start one watcher per group, then wait for `cancel`.
    ///
    /// If any group fails to start, the groups already started are cancelled
    /// and joined before the error is returned. The caller's token is left
    /// untouched in that case.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let children = cancel.child_token();
        let mut handles: Vec<WatchHandle> = Vec::with_capacity(self.table.len());

        let options = self.watcher.options();
        info!(
            groups = self.table.len(),
            throttle = ?options.throttle,
            watch_parents = options.watch_parents,
            "starting group watchers"
        );

        for (name, patterns) in &self.table {
            let group = name.clone();
            let callback = Arc::clone(&self.callback);
            let caller_cancel = cancel.clone();

            let on_change = move |path: &Path| {
                debug!(group = %group, ?path, "group triggered");
                if let Err(err) = callback(&caller_cancel, &group) {
                    error!(group = %group, error = %err, "group callback failed");
                }
            };

            match self.watcher.start(name, children.clone(), on_change, patterns) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    error!(
                        group = %name,
                        error = %err,
                        started = handles.len(),
                        "group failed to start; stopping started groups"
                    );
                    children.cancel();
                    join_all(handles).await;
                    return Err(err);
                }
            }
        }

        info!(groups = handles.len(), "all group watchers running");
        children.cancelled().await;

        info!("shutdown requested; closing group watchers");
        join_all(handles).await;
        info!("group watchers closed");
        Ok(())
    }
}

async fn join_all(handles: Vec<WatchHandle>) {
    for handle in handles {
        handle.join().await;
    }
}

impl Action for GroupWatch {
    fn execute(self: Box<Self>, cancel: CancellationToken) -> BoxFuture<'static, Result<()>> {
        Box::pin((*self).run(cancel))
    }
}
