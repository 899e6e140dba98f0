//! Watch command: incremental rebuilds driven by file-system events.

use super::build::{copy_static, log_report};
use super::{build_context, load_config};
use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rho_core::{BuildOptions, Config, DrainReport, Scheduler, SchedulerEvent};
use std::path::Path;
use tokio::sync::mpsc::{self, UnboundedSender};

pub async fn watch_site(config_path: &Path, no_cache: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let options = BuildOptions {
        use_cache: !no_cache,
        write: true,
    };

    let mut scheduler = Scheduler::new(build_context(&config, options)?);
    scheduler
        .enqueue_all()
        .context("Failed to scan content directory")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = start_watcher(&config, tx.clone())?;
    spawn_shutdown_signal(tx);

    println!("Watching for changes (Ctrl+C to stop)...");
    scheduler
        .run_cooperative(rx, |ctx, report| finish_pass(ctx.config(), &report))
        .await
        .context("Build aborted")?;

    drop(watcher);
    tracing::info!("Stopped watching");
    Ok(())
}

/// Work done each time the queue runs dry
pub fn finish_pass(config: &Config, report: &DrainReport) {
    if let Err(err) = copy_static(config) {
        tracing::error!("Failed to copy static files: {:?}", err);
    }
    if report.processed > 0 {
        log_report(report);
    }
}

/// Watch the source directories and the config file (never the output) and
/// forward changes
pub fn start_watcher(
    config: &Config,
    tx: UnboundedSender<SchedulerEvent>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                for path in event.paths {
                    let _ = tx.send(SchedulerEvent::Changed(path));
                }
            }
            Err(err) => tracing::warn!("Watcher error: {}", err),
        },
        notify::Config::default(),
    )
    .context("Failed to initialize file watcher")?;

    for dir in [
        config.content_dir(),
        config.layouts_dir(),
        config.partials_dir(),
        config.static_dir(),
    ] {
        if !dir.is_dir() {
            tracing::debug!("Not watching missing {:?}", dir);
            continue;
        }
        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {:?}", dir))?;
        tracing::debug!("Watching {:?}", dir);
    }

    if let Some(config_file) = config.config_path().filter(|p| p.is_file()) {
        watcher
            .watch(config_file, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", config_file))?;
        tracing::debug!("Watching {:?}", config_file);
    }

    Ok(watcher)
}

/// Turn Ctrl+C into a shutdown event
pub fn spawn_shutdown_signal(tx: UnboundedSender<SchedulerEvent>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            let _ = tx.send(SchedulerEvent::Shutdown);
        }
    });
}
