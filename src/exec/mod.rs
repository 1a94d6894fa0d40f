// src/exec/mod.rs

//! Execution layer.
//!
//! - [`action`] defines the [`Action`] seam through which a task runner
//!   starts a deferred unit of work (such as a [`GroupWatch`]) and owns its
//!   cancellation token.
//! - [`command`] runs the shell command bound to a group, restarting it when
//!   the group triggers again while a previous run is still going.
//!
//! [`GroupWatch`]: crate::watch::GroupWatch

pub mod action;
pub mod command;

pub use action::{run_until_ctrl_c, Action, BoxFuture};
pub use command::CommandRunner;
