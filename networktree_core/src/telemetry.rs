//! Ingestion throughput counters and logging bootstrap.
//!
//! Counters are plain owned objects handed to the pipeline, not process
//! globals. The same events are also forwarded to the `metrics` facade,
//! which is a no-op until the host installs a recorder.

use crate::errors::Result;
use crate::types::InsertTally;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::info;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Cumulative ingestion counters, shared between the stages and a reporter.
#[derive(Debug, Default)]
pub struct IngestCounters {
    records: AtomicU64,
    skipped: AtomicU64,
    prefixes: AtomicU64,
    with_parent: AtomicU64,
    without_parent: AtomicU64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub records: u64,
    pub skipped: u64,
    pub prefixes: u64,
    pub with_parent: u64,
    pub without_parent: u64,
}

impl CounterSnapshot {
    pub fn since(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            records: self.records.saturating_sub(earlier.records),
            skipped: self.skipped.saturating_sub(earlier.skipped),
            prefixes: self.prefixes.saturating_sub(earlier.prefixes),
            with_parent: self.with_parent.saturating_sub(earlier.with_parent),
            without_parent: self.without_parent.saturating_sub(earlier.without_parent),
        }
    }
}

impl IngestCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_records(&self, n: u64) {
        self.records.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_skipped(&self, n: u64) {
        self.skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_tally(&self, tally: &InsertTally) {
        self.prefixes.fetch_add(tally.total(), Ordering::Relaxed);
        self.with_parent
            .fetch_add(tally.with_parent, Ordering::Relaxed);
        self.without_parent
            .fetch_add(tally.without_parent, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            records: self.records.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            prefixes: self.prefixes.load(Ordering::Relaxed),
            with_parent: self.with_parent.load(Ordering::Relaxed),
            without_parent: self.without_parent.load(Ordering::Relaxed),
        }
    }
}

/// Background thread logging per-interval rates until dropped.
pub struct RateReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RateReporter {
    pub fn spawn(counters: Arc<IngestCounters>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = bounded::<()>(0);
        let handle = std::thread::Builder::new()
            .name("networktree-rate".into())
            .spawn(move || {
                let secs = interval.as_secs_f64().max(f64::EPSILON);
                let mut last = counters.snapshot();
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let now = counters.snapshot();
                            let delta = now.since(&last);
                            info!(
                                "{:.0} count/sec    {} total    {} insertWithParent    {} insertWithoutParent",
                                delta.prefixes as f64 / secs,
                                now.prefixes,
                                delta.with_parent,
                                delta.without_parent
                            );
                            last = now;
                        }
                        // stop requested or the reporter was dropped
                        _ => break,
                    }
                }
            })?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RateReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Install `env_logger` once. `RUST_LOG` selects the level; default `info`.
pub fn init_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}
