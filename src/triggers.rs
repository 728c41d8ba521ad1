//! Background refresh triggers.
//!
//! * [`spawn_refresh_timer`]: periodic refresh, re-armed when a reload
//!   changes `refresh_interval`.
//! * [`spawn_config_watcher`]: watches the configuration file and calls
//!   [`RefreshCoordinator::reload`] once per debounced burst of changes.
//!
//! Both stop when their [`CancellationToken`] is cancelled.

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::{RefreshCoordinator, RefreshReason};
use crate::debounce::Debouncer;

/// Refresh on a fixed period until `shutdown` is cancelled.
///
/// The first tick fires one full period after start; the startup pass has
/// already run by then.
pub fn spawn_refresh_timer(
    coordinator: Arc<RefreshCoordinator>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut periods = coordinator.subscribe_interval();
        let mut period = *periods.borrow_and_update();

        loop {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "refresh timer armed");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("refresh timer stopped");
                        return;
                    }
                    changed = periods.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        period = *periods.borrow_and_update();
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = coordinator.refresh(RefreshReason::Timer).await {
                            warn!(error = %e, "scheduled refresh failed");
                        }
                    }
                }
            }
        }
    })
}

/// Watch `config_path` and reload the coordinator after each burst of
/// changes settles for `window`.
///
/// The parent directory is watched, so editors that replace the file on
/// save are still seen.
pub fn spawn_config_watcher(
    coordinator: Arc<RefreshCoordinator>,
    config_path: &Path,
    window: Duration,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>> {
    let target = absolute(config_path)?;
    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .context("configuration path has no parent directory")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    let file = target.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "config watcher error"),
        },
        NotifyConfig::default(),
    )
    .context("Failed to create config watcher")?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    info!(path = %target.display(), window_ms = window.as_millis() as u64, "watching configuration");
    let debouncer = Debouncer::new(window);

    Ok(tokio::spawn(async move {
        // Dropping the watcher stops notifications.
        let _watcher = watcher;
        loop {
            let batch = tokio::select! {
                _ = shutdown.cancelled() => break,
                batch = debouncer.next(&mut rx) => batch,
            };
            let Some(events) = batch else { break };
            debug!(events, "configuration changed");
            match coordinator.reload().await {
                Ok(report) => info!(
                    generation = report.generation,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "configuration change applied"
                ),
                Err(e) => warn!(error = %e, "configuration change not applied"),
            }
        }
        debug!("config watcher stopped");
    }))
}

fn touches(event: &Event, file: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| p == file || p.file_name() == file.file_name())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}
