//! Version-control collaborator.
//!
//! The store stages saved files and reads authorship through [`Vcs`]. The
//! history builder reads past file contents through it. [`GitCli`] shells
//! out to `git`; [`FakeVcs`] keeps everything in memory for tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

/// Error type for version-control operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VcsError {
    /// No repository, or the tool is not installed
    #[error("version control unavailable: {0}")]
    Unavailable(String),
    #[error("{command} failed: {message}")]
    Failed { command: String, message: String },
}

/// Authorship and timing of one ticket file, from its commit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub last_commit: DateTime<Utc>,
}

/// Content of a ticket file at one commit. `content` is `None` when the
/// commit deleted the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVersion {
    /// Bare file name, e.g. `tiki-abc123.md`
    pub file_name: String,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
    pub content: Option<String>,
}

pub trait Vcs: Send + Sync {
    /// Configured user name
    fn current_user(&self) -> Result<String, VcsError>;
    fn current_branch(&self) -> Result<String, VcsError>;
    /// Stage a file
    fn add(&self, path: &Path) -> Result<(), VcsError>;
    /// Drop a file from the index, deleting it from the working tree if
    /// it is still there
    fn remove(&self, path: &Path) -> Result<(), VcsError>;
    fn last_commit_time(&self, path: &Path) -> Result<Option<DateTime<Utc>>, VcsError>;
    /// Distinct authors of commits touching `dir` since `since`, newest first
    fn authors_since(&self, dir: &Path, since: DateTime<Utc>) -> Result<Vec<String>, VcsError>;
    /// One summary per file name under `dir`, in a single pass over the log
    fn file_summaries(&self, dir: &Path) -> Result<HashMap<String, FileSummary>, VcsError>;
    /// For every file under `dir`: its latest version at or before `since`,
    /// plus every version committed after `since`
    fn file_versions(&self, dir: &Path, since: DateTime<Utc>)
    -> Result<Vec<FileVersion>, VcsError>;
}

fn file_name_of(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase())
}

fn is_ticket_file(path: &str) -> bool {
    path.ends_with(".md")
}

// ---------------------------------------------------------------------------
// git
// ---------------------------------------------------------------------------

/// Record separator between commits in `git log` output
const RECORD_SEP: char = '\u{1e}';
/// Field separator inside a commit header
const FIELD_SEP: char = '\u{1f}';

/// [`Vcs`] backed by the `git` command-line tool
pub struct GitCli {
    /// Working directory for every git invocation
    workdir: PathBuf,
}

/// One commit of `git log --name-status` output
struct LogRecord {
    hash: String,
    timestamp: DateTime<Utc>,
    author: String,
    /// (status letter, repository-relative path)
    changes: Vec<(char, String)>,
}

impl GitCli {
    pub fn new(workdir: &Path) -> Self {
        GitCli {
            workdir: workdir.to_path_buf(),
        }
    }

    fn run_in(&self, dir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| VcsError::Unavailable(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.contains("not a git repository") {
                return Err(VcsError::Unavailable(stderr));
            }
            return Err(VcsError::Failed {
                command: format!("git {}", args.first().copied().unwrap_or("")),
                message: stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        self.run_in(&self.workdir, args)
    }

    /// Directory to run in for a path argument: its parent when it exists
    fn dir_for<'a>(&'a self, path: &'a Path) -> &'a Path {
        match path.parent() {
            Some(p) if p.is_dir() => p,
            _ => &self.workdir,
        }
    }

    fn log(&self, dir: &Path, since: Option<DateTime<Utc>>) -> Result<Vec<LogRecord>, VcsError> {
        let format = format!("--format={}%H{}%at{}%an", RECORD_SEP, FIELD_SEP, FIELD_SEP);
        let since_arg = since.map(|s| format!("--since={}", git_date(s)));
        let mut args = vec!["log", "--no-renames", "--name-status", format.as_str()];
        if let Some(s) = &since_arg {
            args.push(s);
        }
        args.extend(["--", "."]);
        let out = self.run_in(dir, &args)?;
        Ok(parse_log(&out))
    }

    fn show(&self, commit: &str, repo_path: &str) -> Result<String, VcsError> {
        let spec = format!("{}:{}", commit, repo_path);
        self.run(&["show", spec.as_str()])
    }
}

fn git_date(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S +0000").to_string()
}

fn parse_unix(s: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = s.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

fn parse_log(out: &str) -> Vec<LogRecord> {
    let mut records = Vec::new();
    for chunk in out.split(RECORD_SEP) {
        let mut lines = chunk.lines();
        let Some(header) = lines.next() else {
            continue;
        };
        let mut fields = header.split(FIELD_SEP);
        let (Some(hash), Some(ts), Some(author)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Some(timestamp) = parse_unix(ts) else {
            continue;
        };
        let changes = lines
            .filter_map(|line| {
                let (status, path) = line.split_once('\t')?;
                Some((status.chars().next()?, path.to_string()))
            })
            .collect();
        records.push(LogRecord {
            hash: hash.to_string(),
            timestamp,
            author: author.to_string(),
            changes,
        });
    }
    records
}

impl Vcs for GitCli {
    fn current_user(&self) -> Result<String, VcsError> {
        Ok(self.run(&["config", "user.name"])?.trim().to_string())
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    fn add(&self, path: &Path) -> Result<(), VcsError> {
        let arg = path.to_string_lossy();
        self.run_in(self.dir_for(path), &["add", "--", arg.as_ref()])?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), VcsError> {
        let arg = path.to_string_lossy();
        self.run_in(self.dir_for(path), &["rm", "-f", "--quiet", "--ignore-unmatch", "--", arg.as_ref()])?;
        Ok(())
    }

    fn last_commit_time(&self, path: &Path) -> Result<Option<DateTime<Utc>>, VcsError> {
        let arg = path.to_string_lossy();
        let out = self.run_in(self.dir_for(path), &["log", "-1", "--format=%at", "--", arg.as_ref()])?;
        Ok(parse_unix(&out))
    }

    fn authors_since(&self, dir: &Path, since: DateTime<Utc>) -> Result<Vec<String>, VcsError> {
        let mut authors: Vec<String> = Vec::new();
        for record in self.log(dir, Some(since))? {
            if !record.author.is_empty() && !authors.contains(&record.author) {
                authors.push(record.author);
            }
        }
        Ok(authors)
    }

    fn file_summaries(&self, dir: &Path) -> Result<HashMap<String, FileSummary>, VcsError> {
        let mut summaries: HashMap<String, FileSummary> = HashMap::new();
        // Log is newest first: the first sighting is the last commit, the
        // last sighting is the creating commit
        for record in self.log(dir, None)? {
            for (_, path) in &record.changes {
                if !is_ticket_file(path) {
                    continue;
                }
                let Some(name) = file_name_of(path) else {
                    continue;
                };
                summaries
                    .entry(name)
                    .and_modify(|s| {
                        s.created_at = record.timestamp;
                        s.created_by = record.author.clone();
                    })
                    .or_insert_with(|| FileSummary {
                        created_at: record.timestamp,
                        created_by: record.author.clone(),
                        last_commit: record.timestamp,
                    });
            }
        }
        Ok(summaries)
    }

    fn file_versions(
        &self,
        dir: &Path,
        since: DateTime<Utc>,
    ) -> Result<Vec<FileVersion>, VcsError> {
        let mut versions = Vec::new();

        // Baseline: the tree at the last commit on or before `since`
        let before = format!("--before={}", git_date(since));
        let baseline = self.run_in(dir, &["rev-list", "-1", before.as_str(), "HEAD"])?;
        let baseline = baseline.trim();
        if !baseline.is_empty() {
            let ts_out = self.run(&["show", "-s", "--format=%at", baseline])?;
            if let Some(timestamp) = parse_unix(&ts_out) {
                let tree = self.run_in(
                    dir,
                    &["ls-tree", "-r", "--name-only", "--full-name", baseline, "--", "."],
                )?;
                for path in tree.lines().filter(|p| is_ticket_file(p)) {
                    let Some(file_name) = file_name_of(path) else {
                        continue;
                    };
                    versions.push(FileVersion {
                        file_name,
                        commit: baseline.to_string(),
                        timestamp,
                        content: self.show(baseline, path).ok(),
                    });
                }
            }
        }

        let records = self.log(dir, Some(since))?;
        versions.extend(versions_after(&records, since, |hash, path| {
            self.show(hash, path)
        }));
        Ok(versions)
    }
}

/// Ticket file versions committed after `since`. A version whose content
/// cannot be read is skipped; the rest of the history is kept.
fn versions_after<F>(records: &[LogRecord], since: DateTime<Utc>, show: F) -> Vec<FileVersion>
where
    F: Fn(&str, &str) -> Result<String, VcsError>,
{
    let mut versions = Vec::new();
    for record in records.iter().filter(|r| r.timestamp > since) {
        for (status, path) in &record.changes {
            if !is_ticket_file(path) {
                continue;
            }
            let Some(file_name) = file_name_of(path) else {
                continue;
            };
            let content = if *status == 'D' {
                None
            } else {
                match show(&record.hash, path) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(commit = %record.hash, path = %path, "skipping unreadable version: {}", e);
                        continue;
                    }
                }
            };
            versions.push(FileVersion {
                file_name,
                commit: record.hash.clone(),
                timestamp: record.timestamp,
                content,
            });
        }
    }
    versions
}

// ---------------------------------------------------------------------------
// In-memory fake
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FakeState {
    available: bool,
    user: String,
    branch: String,
    fail_add: bool,
    fail_remove: bool,
    delay: Duration,
    staged: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    summaries: HashMap<String, FileSummary>,
    versions: Vec<FileVersion>,
}

/// In-memory [`Vcs`] for tests. `remove` deletes the file from disk the
/// way `git rm` would. `add` and `remove` sleep for the configured delay
/// before doing anything, to stand in for a slow repository.
#[derive(Debug)]
pub struct FakeVcs {
    state: Mutex<FakeState>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVcs {
    pub fn new() -> Self {
        FakeVcs {
            state: Mutex::new(FakeState {
                available: true,
                user: "tester".into(),
                branch: "main".into(),
                ..Default::default()
            }),
        }
    }

    /// A fake that answers every call with [`VcsError::Unavailable`]
    pub fn unavailable() -> Self {
        let fake = Self::new();
        fake.lock().available = false;
        fake
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), VcsError> {
        if self.lock().available {
            Ok(())
        } else {
            Err(VcsError::Unavailable("no repository".into()))
        }
    }

    pub fn set_user(&self, user: &str) {
        self.lock().user = user.to_string();
    }

    pub fn set_fail_add(&self, fail: bool) {
        self.lock().fail_add = fail;
    }

    pub fn set_fail_remove(&self, fail: bool) {
        self.lock().fail_remove = fail;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    fn pause(&self) {
        let delay = self.lock().delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    pub fn set_summary(&self, file_name: &str, summary: FileSummary) {
        self.lock()
            .summaries
            .insert(file_name.to_lowercase(), summary);
    }

    pub fn push_version(&self, version: FileVersion) {
        self.lock().versions.push(version);
    }

    /// Paths passed to `add`, in call order
    pub fn staged(&self) -> Vec<PathBuf> {
        self.lock().staged.clone()
    }

    /// Paths successfully passed to `remove`, in call order
    pub fn removed(&self) -> Vec<PathBuf> {
        self.lock().removed.clone()
    }
}

impl Vcs for FakeVcs {
    fn current_user(&self) -> Result<String, VcsError> {
        self.check()?;
        Ok(self.lock().user.clone())
    }

    fn current_branch(&self) -> Result<String, VcsError> {
        self.check()?;
        Ok(self.lock().branch.clone())
    }

    fn add(&self, path: &Path) -> Result<(), VcsError> {
        self.check()?;
        self.pause();
        let mut state = self.lock();
        if state.fail_add {
            return Err(VcsError::Failed {
                command: "git add".into(),
                message: "index locked".into(),
            });
        }
        state.staged.push(path.to_path_buf());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), VcsError> {
        self.check()?;
        self.pause();
        if self.lock().fail_remove {
            return Err(VcsError::Failed {
                command: "git rm".into(),
                message: "pathspec did not match any files".into(),
            });
        }
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(VcsError::Failed {
                    command: "git rm".into(),
                    message: e.to_string(),
                });
            }
        }
        self.lock().removed.push(path.to_path_buf());
        Ok(())
    }

    fn last_commit_time(&self, path: &Path) -> Result<Option<DateTime<Utc>>, VcsError> {
        self.check()?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase())
            .unwrap_or_default();
        Ok(self.lock().summaries.get(&name).map(|s| s.last_commit))
    }

    fn authors_since(&self, _dir: &Path, since: DateTime<Utc>) -> Result<Vec<String>, VcsError> {
        self.check()?;
        let state = self.lock();
        let mut authors: Vec<String> = Vec::new();
        for s in state.summaries.values() {
            if s.last_commit >= since && !authors.contains(&s.created_by) {
                authors.push(s.created_by.clone());
            }
        }
        authors.sort();
        Ok(authors)
    }

    fn file_summaries(&self, _dir: &Path) -> Result<HashMap<String, FileSummary>, VcsError> {
        self.check()?;
        Ok(self.lock().summaries.clone())
    }

    fn file_versions(
        &self,
        _dir: &Path,
        since: DateTime<Utc>,
    ) -> Result<Vec<FileVersion>, VcsError> {
        self.check()?;
        let state = self.lock();
        let mut latest_before: HashMap<&str, &FileVersion> = HashMap::new();
        let mut out = Vec::new();
        for v in &state.versions {
            if v.timestamp <= since {
                let slot = latest_before.entry(v.file_name.as_str()).or_insert(v);
                if v.timestamp >= slot.timestamp {
                    *slot = v;
                }
            } else {
                out.push(v.clone());
            }
        }
        out.extend(latest_before.into_values().cloned());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn parse_log_records() {
        let out = format!(
            "{r}abc{f}1700000000{f}Ada\n\nA\t.doc/tiki/tiki-aaaaaa.md\nM\tREADME\n\
             {r}def{f}1699990000{f}Grace\n\nD\t.doc/tiki/tiki-bbbbbb.md\n",
            r = RECORD_SEP,
            f = FIELD_SEP
        );
        let records = parse_log(&out);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash, "abc");
        assert_eq!(records[0].author, "Ada");
        assert_eq!(records[0].changes.len(), 2);
        assert_eq!(records[1].changes[0], ('D', ".doc/tiki/tiki-bbbbbb.md".into()));
    }

    #[test]
    fn unreadable_version_is_skipped_not_fatal() {
        let since = Utc::now() - Duration::days(14);
        let record = |hash: &str, days_ago: i64, changes: Vec<(char, &str)>| LogRecord {
            hash: hash.into(),
            timestamp: Utc::now() - Duration::days(days_ago),
            author: "Ada".into(),
            changes: changes.into_iter().map(|(c, p)| (c, p.to_string())).collect(),
        };
        let records = vec![
            record("c3", 1, vec![('D', ".doc/tiki/tiki-bbbbbb.md")]),
            record("c2", 2, vec![('M', ".doc/tiki/tiki-aaaaaa.md"), ('M', ".doc/tiki/tiki-bbbbbb.md")]),
            record("c1", 3, vec![('A', ".doc/tiki/tiki-aaaaaa.md")]),
            record("c0", 30, vec![('A', ".doc/tiki/tiki-bbbbbb.md")]),
        ];

        let versions = versions_after(&records, since, |hash, path| {
            if hash == "c2" && path.ends_with("tiki-aaaaaa.md") {
                Err(VcsError::Failed {
                    command: "git show".into(),
                    message: "path not in commit".into(),
                })
            } else {
                Ok(format!("{}:{}", hash, path))
            }
        });

        let seen: Vec<(&str, &str)> = versions
            .iter()
            .map(|v| (v.commit.as_str(), v.file_name.as_str()))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("c3", "tiki-bbbbbb.md"),
                ("c2", "tiki-bbbbbb.md"),
                ("c1", "tiki-aaaaaa.md"),
            ]
        );
        assert!(versions[0].content.is_none());
        assert_eq!(versions[2].content.as_deref(), Some("c1:.doc/tiki/tiki-aaaaaa.md"));
    }

    #[test]
    fn unavailable_fake_fails_everything() {
        let vcs = FakeVcs::unavailable();
        assert!(matches!(vcs.current_user(), Err(VcsError::Unavailable(_))));
        assert!(matches!(
            vcs.file_summaries(Path::new(".")),
            Err(VcsError::Unavailable(_))
        ));
    }

    #[test]
    fn fake_remove_deletes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiki-aaaaaa.md");
        fs::write(&path, "x").unwrap();
        let vcs = FakeVcs::new();
        vcs.remove(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(vcs.removed(), vec![path.clone()]);

        // Already gone from the working tree
        vcs.remove(&path).unwrap();
        assert_eq!(vcs.removed().len(), 2);
    }

    #[test]
    fn fake_versions_keep_one_baseline_per_file() {
        let now = Utc::now();
        let since = now - Duration::days(14);
        let vcs = FakeVcs::new();
        for (days, commit) in [(30, "c1"), (20, "c2"), (3, "c3")] {
            vcs.push_version(FileVersion {
                file_name: "tiki-aaaaaa.md".into(),
                commit: commit.into(),
                timestamp: now - Duration::days(days),
                content: Some(String::new()),
            });
        }
        let versions = vcs.file_versions(Path::new("."), since).unwrap();
        let commits: Vec<&str> = versions.iter().map(|v| v.commit.as_str()).collect();
        assert_eq!(versions.len(), 2);
        assert!(commits.contains(&"c2"));
        assert!(commits.contains(&"c3"));
    }
}
