// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::exec::{run_until_ctrl_c, CommandRunner};
use crate::watch::{FsGlobResolver, GlobResolver, NotifySubscriber, Watcher};

pub use crate::errors::WatchError;
pub use crate::types::{ChangeEvent, ChangeOp, GroupTable, MatchedPath, WatchSpec, WatcherState};
pub use crate::watch::{watch_groups, watch_one, GroupWatch, Throttle, WatchHandle, WatchOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one watcher per group, resolved relative to the config directory
/// - the command runner used as the group callback
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;

    let resolver = FsGlobResolver::default().with_root(config_root_dir(&config_path));
    debug!(root = ?resolver.root(), "resolving patterns");

    if args.dry_run {
        print_dry_run(&cfg, &resolver)?;
        return Ok(());
    }

    let runner = Arc::new(CommandRunner::new(cfg.commands()));

    if args.once {
        return run_all_once(&cfg, &runner).await;
    }

    let watcher = Watcher::new(Arc::new(resolver), Arc::new(NotifySubscriber))
        .with_options(cfg.watch_options());

    let groups = {
        let runner = Arc::clone(&runner);
        watcher.watch_groups(
            move |cancel, group| runner.trigger(cancel, group),
            cfg.group_table(),
        )
    };

    run_until_ctrl_c(Box::new(groups)).await?;

    // Commands are killed on cancellation; wait for them to be reaped.
    runner.wait_idle().await;
    info!("globwatch exiting");
    Ok(())
}

/// Directory the config file lives in; `"."` for a bare file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn run_all_once(cfg: &ConfigFile, runner: &CommandRunner) -> Result<()> {
    let mut failed = Vec::new();
    for group in cfg.groups().keys() {
        if !runner.run_once(group).await? {
            warn!(group = %group, "command failed");
            failed.push(group.as_str());
        }
    }
    if !failed.is_empty() {
        bail!("commands failed for groups: {}", failed.join(", "));
    }
    Ok(())
}

/// Print every group, its command, patterns and the files they resolve to.
fn print_dry_run(cfg: &ConfigFile, resolver: &FsGlobResolver) -> Result<()> {
    println!("globwatch dry-run");
    println!("  config.throttle_ms = {}", cfg.config_section().throttle_ms);
    println!("  config.watch_parents = {}", cfg.config_section().watch_parents);
    println!();

    println!("groups ({}):", cfg.groups().len());
    for (name, group) in cfg.groups() {
        println!("  - {name}");
        println!("      cmd: {}", group.cmd);
        println!("      watch: {:?}", group.watch);

        let matched = resolver.resolve(&group.watch)?;
        if matched.is_empty() {
            println!("      files: (none)");
        } else {
            println!("      files:");
            for m in matched {
                println!("        {}", m.path.display());
            }
        }
    }

    debug!("dry-run complete (nothing watched)");
    Ok(())
}
