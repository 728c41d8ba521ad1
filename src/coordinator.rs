//! Refresh coordinator: owner of the published snapshot/index pair.
//!
//! The coordinator is the only component allowed to replace the
//! [`PublishedState`]. It runs ingestion passes one at a time and publishes
//! their results atomically.
//!
//! # State machine
//!
//! ```text
//!          trigger (startup | timer | config change | manual)
//!   Idle ────────────────────────────────────────────────▶ Refreshing
//!    ▲                                                        │
//!    │  ≥1 source succeeded  → swap in new PublishedState     │
//!    │  every source failed  → keep previous state            │
//!    └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Overlapping triggers
//!
//! A single `Mutex<()>` guards the `Idle → Refreshing` transition.
//!
//! * Timer and manual triggers that find a pass in flight **coalesce**: they
//!   wait for that pass and return its report.
//! * A config-change trigger **serializes**: it waits for the lock, reloads
//!   the configuration and runs one more pass, since a pass already in flight
//!   was built from the old source set.
//!
//! Each pass runs on its own task, so dropping the caller's future never
//! leaves the coordinator stuck in `Refreshing`.
//!
//! # Readers
//!
//! [`RefreshCoordinator::current`] suspends while a pass is in flight and
//! returns once the coordinator is back to `Idle`, so a reader sees either
//! the previous state in full or the new one in full.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use api_harness_core::snapshot::RegistrySnapshot;
use api_harness_core::state::PublishedState;

use crate::config::{load_config, Config};
use crate::ingest::ingest;
use crate::parser::DocumentParser;

/// What started a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    Startup,
    Timer,
    ConfigChange,
    Manual,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshReason::Startup => "startup",
            RefreshReason::Timer => "timer",
            RefreshReason::ConfigChange => "config_change",
            RefreshReason::Manual => "manual",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Refreshing,
}

/// Summary of one completed ingestion pass.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub generation: u64,
    pub reason: RefreshReason,
    pub succeeded: usize,
    pub failed: usize,
    pub endpoints: usize,
    /// Whether the pass replaced the published state.
    pub published: bool,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl RefreshReport {
    fn from_snapshot(snapshot: &RegistrySnapshot, reason: RefreshReason, elapsed: Duration) -> Self {
        Self {
            generation: snapshot.generation(),
            reason,
            succeeded: snapshot.success_count(),
            failed: snapshot.failure_count(),
            endpoints: snapshot.endpoint_count(),
            published: snapshot.success_count() > 0,
            duration_ms: elapsed.as_millis() as u64,
            completed_at: Utc::now(),
        }
    }
}

/// Observable coordinator status.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub phase: Phase,
    /// Completed passes, including the startup pass.
    pub passes: u64,
    pub last: Option<RefreshReport>,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),
    #[error("every source failed to ingest ({attempted} attempted)")]
    TotalIngestionFailure { attempted: usize },
    #[error("refresh task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct RefreshCoordinator {
    config: ArcSwap<Config>,
    config_path: Option<PathBuf>,
    parser: Arc<dyn DocumentParser>,
    published: ArcSwap<PublishedState>,
    single_flight: Arc<Mutex<()>>,
    status: watch::Sender<RefreshStatus>,
    interval: watch::Sender<Duration>,
    next_generation: AtomicU64,
}

impl RefreshCoordinator {
    /// Run the startup pass and build a coordinator around its result.
    ///
    /// Zero successful sources on this first pass is fatal.
    /// `config_path` is where [`reload`](Self::reload) re-reads configuration.
    pub async fn start(
        config: Config,
        config_path: Option<PathBuf>,
        parser: Arc<dyn DocumentParser>,
    ) -> Result<Arc<Self>, RefreshError> {
        let started = Instant::now();
        let sources = config.source_set();
        info!(sources = sources.len(), "initial ingestion started");

        let snapshot = ingest(parser.as_ref(), &sources, 1, config.fetch_timeout()).await;
        let report = RefreshReport::from_snapshot(&snapshot, RefreshReason::Startup, started.elapsed());

        if !report.published {
            error!(attempted = sources.len(), "no source could be ingested at startup");
            return Err(RefreshError::TotalIngestionFailure {
                attempted: sources.len(),
            });
        }

        info!(
            generation = report.generation,
            succeeded = report.succeeded,
            failed = report.failed,
            endpoints = report.endpoints,
            "initial state published"
        );

        let published = PublishedState::build(sources, snapshot, config.search_params());
        let (status, _) = watch::channel(RefreshStatus {
            phase: Phase::Idle,
            passes: 1,
            last: Some(report),
        });
        let (interval, _) = watch::channel(config.refresh_period());

        Ok(Arc::new(Self {
            config: ArcSwap::from_pointee(config),
            config_path,
            parser,
            published: ArcSwap::from_pointee(published),
            single_flight: Arc::new(Mutex::new(())),
            status,
            interval,
            next_generation: AtomicU64::new(2),
        }))
    }

    /// Trigger a pass with the current configuration.
    ///
    /// If a pass is already in flight, waits for it and returns its report
    /// instead of starting another one.
    pub async fn refresh(self: &Arc<Self>, reason: RefreshReason) -> Result<RefreshReport, RefreshError> {
        let guard = match self.single_flight.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => return self.join_in_flight(reason).await,
        };

        let this = Arc::clone(self);
        let outcome = tokio::spawn(async move {
            let _guard = guard;
            this.run_pass(reason).await
        })
        .await;
        self.settle(outcome)
    }

    /// Re-read the configuration file and run one pass with it.
    ///
    /// Waits for any in-flight pass first. An invalid configuration leaves
    /// both the previous configuration and the published state untouched.
    pub async fn reload(self: &Arc<Self>) -> Result<RefreshReport, RefreshError> {
        let guard = self.single_flight.clone().lock_owned().await;

        let this = Arc::clone(self);
        let outcome = tokio::spawn(async move {
            let _guard = guard;
            this.reload_locked().await
        })
        .await;
        self.settle(outcome)
    }

    /// The published state, once no pass is in flight.
    pub async fn current(&self) -> Arc<PublishedState> {
        let mut rx = self.status.subscribe();
        // The sender lives as long as `self`, so this never observes a close.
        let _ = rx.wait_for(|s| s.phase == Phase::Idle).await;
        self.published.load_full()
    }

    /// Generation currently being served, without waiting.
    pub fn published_generation(&self) -> u64 {
        self.published.load().generation()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    /// Receives the refresh period whenever a reload changes it.
    pub fn subscribe_interval(&self) -> watch::Receiver<Duration> {
        self.interval.subscribe()
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Wait for whoever holds the single-flight lock to release it, then
    /// report the latest pass. The holder may also be a reload that was
    /// rejected before running any pass.
    async fn join_in_flight(&self, reason: RefreshReason) -> Result<RefreshReport, RefreshError> {
        info!(reason = %reason, "refresh already in flight; waiting for it");
        drop(self.single_flight.lock().await);
        let last = self.status.borrow().last.clone();
        match last {
            Some(report) if report.published => Ok(report),
            Some(report) => Err(RefreshError::TotalIngestionFailure {
                attempted: report.succeeded + report.failed,
            }),
            None => Err(RefreshError::TotalIngestionFailure { attempted: 0 }),
        }
    }

    async fn reload_locked(&self) -> Result<RefreshReport, RefreshError> {
        let Some(path) = self.config_path.as_ref() else {
            return Err(RefreshError::Config(anyhow::anyhow!(
                "no configuration file to reload"
            )));
        };

        let config = match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{:#}", e),
                    "configuration reload rejected; keeping previous configuration"
                );
                return Err(RefreshError::Config(e));
            }
        };

        let period = config.refresh_period();
        info!(
            path = %path.display(),
            sources = config.sources.len(),
            "configuration reloaded"
        );
        self.config.store(Arc::new(config));
        self.interval.send_if_modified(|current| {
            if *current != period {
                *current = period;
                true
            } else {
                false
            }
        });

        self.run_pass(RefreshReason::ConfigChange).await
    }

    /// One ingestion pass. Caller holds the single-flight lock.
    async fn run_pass(&self, reason: RefreshReason) -> Result<RefreshReport, RefreshError> {
        self.status.send_modify(|s| s.phase = Phase::Refreshing);

        let config = self.config.load_full();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let sources = config.source_set();
        let started = Instant::now();
        info!(generation, reason = %reason, sources = sources.len(), "refresh started");

        let snapshot = ingest(self.parser.as_ref(), &sources, generation, config.fetch_timeout()).await;
        let report = RefreshReport::from_snapshot(&snapshot, reason, started.elapsed());

        if report.published {
            let state = PublishedState::build(sources, snapshot, config.search_params());
            self.published.store(Arc::new(state));
            info!(
                generation,
                reason = %reason,
                succeeded = report.succeeded,
                failed = report.failed,
                endpoints = report.endpoints,
                duration_ms = report.duration_ms,
                "refresh published"
            );
        } else {
            warn!(
                generation,
                reason = %reason,
                failed = report.failed,
                "every source failed; keeping previously published state"
            );
        }

        let result = if report.published {
            Ok(report.clone())
        } else {
            Err(RefreshError::TotalIngestionFailure {
                attempted: report.failed,
            })
        };

        self.status.send_modify(|s| {
            s.phase = Phase::Idle;
            s.passes += 1;
            s.last = Some(report);
        });

        result
    }

    fn settle(
        &self,
        outcome: Result<Result<RefreshReport, RefreshError>, tokio::task::JoinError>,
    ) -> Result<RefreshReport, RefreshError> {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "refresh task aborted");
                self.status.send_modify(|s| {
                    s.phase = Phase::Idle;
                    s.passes += 1;
                });
                Err(RefreshError::Task(e))
            }
        }
    }
}
