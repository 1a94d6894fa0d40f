// src/exec/command.rs

//! Shell command execution for triggered groups.

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, WatchError};
use crate::types::GroupName;

/// A command instance that is (or was) running for a group.
///
/// - `restart` asks the runner future to kill its child.
/// - `handle` is the Tokio task waiting on the child.
struct ActiveRun {
    restart: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// Runs the command bound to each group.
///
/// Per group there is never more than one child process: a trigger that
/// arrives while the previous run is still going kills it, waits for it to
/// exit and starts over.
pub struct CommandRunner {
    commands: BTreeMap<GroupName, String>,
    active: Mutex<HashMap<GroupName, ActiveRun>>,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    pub fn new(commands: BTreeMap<GroupName, String>) -> Self {
        Self {
            commands,
            active: Mutex::new(HashMap::new()),
        }
    }

    fn command_for(&self, group: &str) -> Result<&str> {
        self.commands
            .get(group)
            .map(String::as_str)
            .ok_or_else(|| WatchError::Config(format!("no command configured for group '{group}'")))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<GroupName, ActiveRun>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Group callback: start `group`'s command in the background, killing a
    /// still-running previous instance first. The child is killed when
    /// `cancel` fires.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self, cancel: &CancellationToken, group: &str) -> Result<()> {
        let cmd = self.command_for(group)?.to_string();
        let mut active = self.lock();

        // The new run owns the previous one's handle and waits for it to
        // exit before spawning, so runs of one group never overlap.
        let previous = active.remove(group).map(|mut previous| {
            if !previous.handle.is_finished() {
                info!(group, "group triggered while running; restarting command");
                if let Some(restart) = previous.restart.take() {
                    let _ = restart.send(());
                }
            }
            previous.handle
        });

        let (restart_tx, restart_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(run_command(
            group.to_string(),
            cmd,
            previous,
            restart_rx,
            cancel.clone(),
        ));

        active.insert(
            group.to_string(),
            ActiveRun {
                restart: Some(restart_tx),
                handle,
            },
        );
        Ok(())
    }

    /// Run `group`'s command to completion in the foreground.
    ///
    /// Returns whether it exited successfully.
    pub async fn run_once(&self, group: &str) -> Result<bool> {
        let cmd = self.command_for(group)?;
        info!(group, cmd, "running command");

        let status = shell_command(cmd)
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("running command for group '{group}'"))?;

        info!(group, exit_code = ?status.code(), success = status.success(), "command exited");
        Ok(status.success())
    }

    /// Wait for every background command to finish.
    pub async fn wait_idle(&self) {
        let handles: Vec<(GroupName, JoinHandle<()>)> = self
            .lock()
            .drain()
            .map(|(group, run)| (group, run.handle))
            .collect();

        for (group, handle) in handles {
            if let Err(err) = handle.await {
                error!(group = %group, error = %err, "command task failed");
            }
        }
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

async fn run_command(
    group: GroupName,
    cmd: String,
    previous: Option<JoinHandle<()>>,
    mut restart_rx: oneshot::Receiver<()>,
    cancel: CancellationToken,
) {
    if let Some(previous) = previous {
        if let Err(err) = previous.await {
            error!(group = %group, error = %err, "previous command task failed");
        }
    }

    // Superseded or shut down while the previous run was exiting. A closed
    // receiver must not be polled again.
    let restart_open = match restart_rx.try_recv() {
        Ok(()) => {
            debug!(group = %group, "restart superseded before start");
            return;
        }
        Err(TryRecvError::Empty) => true,
        Err(TryRecvError::Closed) => false,
    };
    if cancel.is_cancelled() {
        return;
    }

    info!(group = %group, cmd = %cmd, "starting command");

    let mut child = match shell_command(&cmd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            error!(group = %group, error = %err, "failed to spawn command");
            return;
        }
    };

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => {
                info!(group = %group, "command finished");
            }
            Ok(status) => {
                warn!(group = %group, exit_code = ?status.code(), "command failed");
            }
            Err(err) => {
                error!(group = %group, error = %err, "waiting for command failed");
            }
        },

        // A dropped sender (e.g. from `wait_idle`) disables this branch.
        Ok(()) = &mut restart_rx, if restart_open => {
            debug!(group = %group, "killing previous command instance");
            if let Err(err) = child.kill().await {
                warn!(group = %group, error = %err, "failed to kill command");
            }
        }

        _ = cancel.cancelled() => {
            debug!(group = %group, "shutdown; killing command");
            if let Err(err) = child.kill().await {
                warn!(group = %group, error = %err, "failed to kill command");
            }
        }
    }
}
