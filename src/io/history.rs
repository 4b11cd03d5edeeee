use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::io::vcs::{FileVersion, Vcs, VcsError};
use crate::model::ticket::id_from_stem;
use crate::ops::burndown::{History, StatusVersion, WINDOW_DAYS, build_history, window_start};
use crate::parse::frontmatter::parse_status;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history build cancelled")]
    Cancelled,
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Shared flag that asks a running history build to stop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), HistoryError> {
        if self.is_cancelled() {
            Err(HistoryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn to_status_version(v: FileVersion) -> StatusVersion {
    let stem = v.file_name.strip_suffix(".md").unwrap_or(&v.file_name);
    StatusVersion {
        ticket_id: id_from_stem(stem),
        commit: v.commit,
        timestamp: v.timestamp,
        status: v.content.as_deref().and_then(parse_status),
    }
}

/// Build the burndown for the window ending at `now`. A directory without
/// version control yields an empty history.
pub fn build(
    vcs: &dyn Vcs,
    dir: &Path,
    now: DateTime<Utc>,
    token: &CancelToken,
) -> Result<History, HistoryError> {
    token.check()?;

    let since = window_start(now, WINDOW_DAYS);
    let versions = match vcs.file_versions(dir, since) {
        Ok(versions) => versions,
        Err(VcsError::Unavailable(reason)) => {
            debug!("no history available: {}", reason);
            return Ok(History::default());
        }
        Err(e) => return Err(e.into()),
    };
    let versions: Vec<StatusVersion> = versions.into_iter().map(to_status_version).collect();
    let history = build_history(&versions, now);

    token.check()?;
    Ok(history)
}

/// Runs [`build`] on a background thread
pub struct HistoryBuilder;

impl HistoryBuilder {
    /// Start a build. `on_done` receives the result unless the build was
    /// cancelled, in which case nothing is delivered.
    pub fn spawn<F>(
        vcs: Arc<dyn Vcs>,
        dir: PathBuf,
        now: DateTime<Utc>,
        token: CancelToken,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<History, HistoryError>) + Send + 'static,
    {
        thread::spawn(move || {
            let result = build(vcs.as_ref(), &dir, now, &token);
            match &result {
                Err(HistoryError::Cancelled) => {
                    debug!("history build cancelled");
                    return;
                }
                Err(e) => warn!("history build failed: {}", e),
                Ok(h) => info!(events = h.events.len(), "history built"),
            }
            on_done(result);
        })
    }
}
