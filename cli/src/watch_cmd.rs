use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use cw_core::ActivityKind;
use cw_core::ActivityLogAppender;
use cw_core::CwHome;
use cw_core::config::SOURCE_EXTENSION;
use cw_core::config::default_watch_root;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct WatchArgs {
    /// Workspace root to watch (defaults to the Desktop directory).
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

/// Long-running file-watch collaborator: appends one monitor-log line per
/// observed create/modify of a Python file under the root. Runs until Ctrl-C.
pub async fn run(args: WatchArgs) -> Result<()> {
    let home = CwHome::find()?;
    home.ensure_dir()
        .with_context(|| format!("failed to create {}", home.dir().display()))?;
    let root = match args.root {
        Some(root) => root,
        None => default_watch_root()?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("watch root {} does not exist", root.display()))?;
    let appender = ActivityLogAppender::new(home.monitor_log());

    let (tx, mut rx) = tokio::sync::mpsc::channel::<notify::Event>(1024);
    let mut watcher: RecommendedWatcher = RecommendedWatcher::new(
        move |result: Result<notify::Event, notify::Error>| match result {
            Ok(event) => {
                if tx.try_send(event).is_err() {
                    warn!("file event dropped: watch channel is full");
                }
            }
            Err(error) => warn!("file watch error: {error}"),
        },
        notify::Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("monitoring Python files in {}", root.display());
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                handle_event(&appender, &root, &event);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping the monitor");
                break;
            }
        }
    }
    Ok(())
}

fn handle_event(appender: &ActivityLogAppender, root: &Path, event: &notify::Event) {
    let kind = match event.kind {
        EventKind::Create(_) => ActivityKind::Created,
        EventKind::Modify(_) => ActivityKind::Modified,
        _ => return,
    };
    for path in &event.paths {
        if !is_tracked_source(root, path) {
            continue;
        }
        // A failed append must never take down the watcher.
        if let Err(error) = appender.append(kind, path) {
            warn!("failed to log {} event for {}: {error}", kind.tag(), path.display());
        } else {
            debug!("{} {}", kind.tag(), path.display());
        }
    }
}

/// Only Python sources strictly under the watch root are recorded; everything
/// else the OS reports is ignored.
fn is_tracked_source(root: &Path, path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
        && path.starts_with(root)
        && path != root
}
