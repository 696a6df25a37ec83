//! Compaction and the auto-compaction timer
//!
//! Compaction itself lives on `Database` (it needs the mutation section);
//! this module holds its report type and [`AutoCompactor`], the background
//! thread that triggers it periodically.
//!
//! The timer is an explicit lifecycle object owned by the database: it starts
//! when the database opens (unless disabled), and stops on shutdown or drop.
//! A failing or panicking run is logged and the timer keeps going.

use folio_core::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error};

/// Outcome of one compaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionInfo {
    /// Collections in the written snapshot
    pub collections: usize,
    /// Documents in the written snapshot
    pub documents: usize,
    /// Journal records folded into the snapshot
    pub journal_entries_folded: u64,
    /// Size of the written snapshot
    pub snapshot_bytes: u64,
}

/// Auto-compactor metrics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoCompactorStats {
    /// Completed runs (successful or not)
    pub runs: u64,
    /// Runs that returned an error or panicked
    pub failures: u64,
}

struct TimerInner {
    stopped: Mutex<bool>,
    wake: Condvar,
    runs: AtomicU64,
    failures: AtomicU64,
}

/// Periodic compaction trigger
pub struct AutoCompactor {
    inner: Arc<TimerInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl AutoCompactor {
    /// Spawn the timer thread, running `task` every `interval`
    ///
    /// The first run happens one full interval after start.
    pub fn start<F>(interval: Duration, task: F) -> Result<Self>
    where
        F: FnMut() -> Result<CompactionInfo> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(Error::invalid_input("compaction interval must be non-zero"));
        }

        let inner = Arc::new(TimerInner {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });

        let thread_inner = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name("folio-compactor".to_string())
            .spawn(move || timer_loop(&thread_inner, interval, task))?;

        debug!(target: "folio::compaction", interval_ms = interval.as_millis() as u64, "Auto-compaction started");
        Ok(AutoCompactor {
            inner,
            handle: Mutex::new(Some(handle)),
            interval,
        })
    }

    /// Period between runs
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run counters
    pub fn stats(&self) -> AutoCompactorStats {
        AutoCompactorStats {
            runs: self.inner.runs.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
        }
    }

    /// Stop the timer and wait for an in-flight run to finish
    ///
    /// Idempotent.
    pub fn stop(&self) {
        {
            let mut stopped = self.inner.stopped.lock();
            *stopped = true;
            self.inner.wake.notify_all();
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!(target: "folio::compaction", "Auto-compaction thread panicked");
            }
            debug!(target: "folio::compaction", "Auto-compaction stopped");
        }
    }
}

impl Drop for AutoCompactor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn timer_loop<F>(inner: &TimerInner, interval: Duration, mut task: F)
where
    F: FnMut() -> Result<CompactionInfo>,
{
    let mut stopped = inner.stopped.lock();
    loop {
        if *stopped {
            return;
        }
        let timed_out = inner.wake.wait_for(&mut stopped, interval).timed_out();
        if *stopped {
            return;
        }
        if !timed_out {
            // Spurious wakeup; wait out a fresh interval
            continue;
        }

        // Run outside the lock so stop() never waits on the condvar mutex
        // for the length of a compaction.
        let outcome = parking_lot::MutexGuard::unlocked(&mut stopped, || {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut task))
        });

        inner.runs.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(Ok(info)) => {
                debug!(
                    target: "folio::compaction",
                    documents = info.documents,
                    folded = info.journal_entries_folded,
                    "Auto-compaction run complete"
                );
            }
            Ok(Err(e)) => {
                inner.failures.fetch_add(1, Ordering::Relaxed);
                error!(target: "folio::compaction", error = %e, "Auto-compaction failed");
            }
            Err(panic) => {
                inner.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    target: "folio::compaction",
                    "Auto-compaction panicked: {}",
                    panic.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
                );
            }
        }
    }
}
