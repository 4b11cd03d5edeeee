//! Version-control staging off the caller's thread.
//!
//! The store writes ticket files itself and queues the matching `git add`
//! or `git rm` here. One worker thread drains the queue in order; failures
//! are logged and otherwise ignored.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use tracing::{debug, warn};

use crate::io::vcs::{Vcs, VcsError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StageJob {
    Add(PathBuf),
    Remove(PathBuf),
}

/// Count of queued jobs, with a condvar to wait for it to reach zero
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn incr(&self) {
        *self.count.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }

    fn decr(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count > 0 {
            count = self.idle.wait(count).unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Queue of staging work for one [`Vcs`]
pub struct Stager {
    vcs: Arc<dyn Vcs>,
    /// `None` when the worker could not be started; jobs then run inline
    tx: Option<Sender<StageJob>>,
    pending: Arc<Pending>,
}

impl Stager {
    /// Start the worker thread
    pub fn spawn(vcs: Arc<dyn Vcs>) -> Self {
        let (tx, rx) = mpsc::channel::<StageJob>();
        let pending = Arc::new(Pending::default());
        let worker_pending = Arc::clone(&pending);
        let worker_vcs = Arc::clone(&vcs);

        let spawned = thread::Builder::new()
            .name("tiki-stage".into())
            .spawn(move || {
                for job in rx {
                    run(worker_vcs.as_ref(), &job);
                    worker_pending.decr();
                }
                debug!("staging queue closed");
            });
        let tx = match spawned {
            Ok(_) => Some(tx),
            Err(e) => {
                warn!("could not start staging thread, staging inline: {}", e);
                None
            }
        };
        Stager { vcs, tx, pending }
    }

    /// Queue `git add` for a freshly written file
    pub fn add(&self, path: &Path) {
        self.submit(StageJob::Add(path.to_path_buf()));
    }

    /// Queue `git rm` for a file already gone from disk
    pub fn remove(&self, path: &Path) {
        self.submit(StageJob::Remove(path.to_path_buf()));
    }

    /// Block until every queued job has run
    pub fn wait_idle(&self) {
        self.pending.wait_idle();
    }

    fn submit(&self, job: StageJob) {
        let Some(tx) = &self.tx else {
            run(self.vcs.as_ref(), &job);
            return;
        };
        self.pending.incr();
        if let Err(mpsc::SendError(job)) = tx.send(job) {
            self.pending.decr();
            run(self.vcs.as_ref(), &job);
        }
    }
}

fn run(vcs: &dyn Vcs, job: &StageJob) {
    let (verb, path, result) = match job {
        StageJob::Add(path) => ("stage", path, vcs.add(path)),
        StageJob::Remove(path) => ("remove", path, vcs.remove(path)),
    };
    match result {
        Ok(()) => debug!(path = %path.display(), "{}d", verb),
        Err(VcsError::Unavailable(reason)) => {
            debug!(path = %path.display(), "cannot {}: {}", verb, reason)
        }
        Err(e) => warn!(path = %path.display(), "could not {}: {}", verb, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::vcs::FakeVcs;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn jobs_run_in_order_and_wait_idle_drains() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(FakeVcs::new());
        let stager = Stager::spawn(vcs.clone());
        let a = dir.path().join("tiki-aaaaaa.md");
        let b = dir.path().join("tiki-bbbbbb.md");
        stager.add(&a);
        stager.add(&b);
        stager.remove(&a);
        stager.wait_idle();
        assert_eq!(vcs.staged(), vec![a.clone(), b]);
        assert_eq!(vcs.removed(), vec![a]);
    }

    #[test]
    fn slow_version_control_does_not_block_the_caller() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiki-aaaaaa.md");
        fs::write(&path, "x").unwrap();
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_delay(Duration::from_millis(300));
        let stager = Stager::spawn(vcs.clone());

        let start = Instant::now();
        stager.add(&path);
        assert!(start.elapsed() < Duration::from_millis(300));
        assert!(vcs.staged().is_empty());

        stager.wait_idle();
        assert_eq!(vcs.staged(), vec![path]);
    }

    #[test]
    fn failures_are_swallowed() {
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_fail_add(true);
        let stager = Stager::spawn(vcs.clone());
        stager.add(Path::new("tiki-cccccc.md"));
        stager.wait_idle();
        assert!(vcs.staged().is_empty());

        let stager = Stager::spawn(Arc::new(FakeVcs::unavailable()));
        stager.remove(Path::new("tiki-cccccc.md"));
        stager.wait_idle();
    }
}
