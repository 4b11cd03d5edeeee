//! File-backed ticket store.
//!
//! Every ticket is one `<id>.md` file in the tickets directory. Writes use
//! optimistic concurrency: a save is refused when the file's modification
//! time no longer matches the one observed at load. Saved and deleted files
//! are handed to a [`Stager`] so version control never runs under the lock
//! or on the caller's thread.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::io::atomic::atomic_write;
use crate::io::stager::Stager;
use crate::io::vcs::{FileSummary, Vcs, VcsError};
use crate::model::ticket::{
    Comment, ID_PREFIX, ID_SUFFIX_LEN, Status, Ticket, file_name_for_id, id_from_stem,
};
use crate::ops::search::{SearchResult, search_tickets};
use crate::parse::{FrontmatterError, parse_ticket, serialize_ticket};

pub type ListenerId = u64;
type Listener = Arc<dyn Fn() + Send + Sync>;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ticket not found: {0}")]
    NotFound(String),
    #[error("{id} was changed on disk since it was loaded")]
    Conflict { id: String },
    #[error("ticket already exists: {0}")]
    Duplicate(String),
    #[error("invalid frontmatter in {path}: {source}")]
    InvalidFrontmatter {
        path: PathBuf,
        source: FrontmatterError,
    },
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of [`TicketStore::update_status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Changed { from: Status, to: Status },
}

pub struct TicketStore {
    dir: PathBuf,
    vcs: Arc<dyn Vcs>,
    stager: Stager,
    max_points: u32,
    current_user: String,
    tickets: RwLock<HashMap<String, Ticket>>,
    listeners: Mutex<BTreeMap<ListenerId, Listener>>,
    next_listener: AtomicU64,
}

fn to_utc(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

fn is_ticket_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("md")
}

impl TicketStore {
    /// Open the store rooted at `dir`, creating the directory if needed,
    /// and load every ticket in it.
    pub fn open(dir: &Path, vcs: Arc<dyn Vcs>, max_points: u32) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let current_user = match vcs.current_user() {
            Ok(user) => user,
            Err(e) => {
                debug!("no current user from version control: {}", e);
                String::new()
            }
        };
        let store = TicketStore {
            dir: dir.to_path_buf(),
            stager: Stager::spawn(Arc::clone(&vcs)),
            vcs,
            max_points,
            current_user,
            tickets: RwLock::new(HashMap::new()),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener: AtomicU64::new(1),
        };
        store.load()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_points(&self) -> u32 {
        self.max_points
    }

    /// User name reported by version control, empty when unknown
    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    pub fn vcs(&self) -> Arc<dyn Vcs> {
        Arc::clone(&self.vcs)
    }

    /// Wait for queued staging and removal to reach version control
    pub fn flush_staging(&self) {
        self.stager.wait_idle();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Ticket>> {
        self.tickets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Ticket>> {
        self.tickets.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Path of the file backing `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(file_name_for_id(id))
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Re-read every ticket file and enrich it from the commit log.
    /// Unparseable files are skipped with a warning. Returns the number of
    /// tickets loaded.
    pub fn load(&self) -> Result<usize, StoreError> {
        let mut loaded = self.read_dir_tickets()?;

        match self.vcs.file_summaries(&self.dir) {
            Ok(summaries) => {
                for ticket in loaded.values_mut() {
                    if let Some(summary) = summaries.get(&ticket.file_name()) {
                        apply_summary(ticket, summary);
                    }
                }
            }
            Err(VcsError::Unavailable(reason)) => {
                debug!("no history for tickets, using file times: {}", reason);
            }
            Err(e) => warn!("could not read ticket history: {}", e),
        }

        let count = loaded.len();
        *self.write() = loaded;
        info!(count, dir = %self.dir.display(), "loaded tickets");
        self.notify();
        Ok(count)
    }

    /// Re-read every ticket file without consulting version control.
    /// Creation data and comments carry over from the loaded copies.
    pub fn refresh(&self) -> Result<usize, StoreError> {
        let mut loaded = self.read_dir_tickets()?;
        let count = loaded.len();
        {
            let mut tickets = self.write();
            for (id, ticket) in loaded.iter_mut() {
                if let Some(existing) = tickets.get(id) {
                    keep_history(ticket, existing);
                }
            }
            *tickets = loaded;
        }
        info!(count, dir = %self.dir.display(), "refreshed tickets");
        self.notify();
        Ok(count)
    }

    fn read_dir_tickets(&self) -> Result<HashMap<String, Ticket>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut loaded = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_ticket_path(&path) {
                continue;
            }
            match self.read_ticket_file(&path) {
                Ok(ticket) => {
                    loaded.insert(ticket.id.clone(), ticket);
                }
                Err(e) => warn!("skipping ticket file: {}", e),
            }
        }
        Ok(loaded)
    }

    /// Parse one ticket file. Timestamps fall back to the file's mtime and
    /// the author to the current user.
    fn read_ticket_file(&self, path: &Path) -> Result<Ticket, StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let text = fs::read_to_string(path).map_err(io_err)?;
        let mtime = fs::metadata(path).and_then(|m| m.modified()).map_err(io_err)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let parsed = parse_ticket(&text, &id_from_stem(stem), self.max_points, to_utc(mtime))
            .map_err(|source| StoreError::InvalidFrontmatter {
                path: path.to_path_buf(),
                source,
            })?;
        for warning in &parsed.warnings {
            warn!(file = %path.display(), "{}", warning);
        }

        let mut ticket = parsed.ticket;
        ticket.created_by = self.current_user.clone();
        ticket.loaded_mtime = Some(mtime);
        Ok(ticket)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<Ticket> {
        self.read().get(&id.to_uppercase()).cloned()
    }

    /// Every ticket, ordered by id
    pub fn all(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.read().values().cloned().collect();
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        tickets
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Case-insensitive substring search over title and body
    pub fn search(
        &self,
        query: &str,
        pre_filter: Option<&dyn Fn(&Ticket) -> bool>,
    ) -> Vec<SearchResult> {
        let tickets = self.read();
        search_tickets(tickets.values(), query, pre_filter)
    }

    /// Current modification time of the file backing `id`
    pub fn disk_mtime(&self, id: &str) -> Result<SystemTime, StoreError> {
        let path = self.path_for(id);
        fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|source| StoreError::Io { path, source })
    }

    /// Distinct assignees currently in use, sorted
    pub fn assignees(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .values()
            .map(|t| t.assignee.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if !self.current_user.is_empty() {
            names.push(self.current_user.clone());
        }
        names.sort_by_key(|a| a.to_lowercase());
        names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        names
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a ticket. An empty id is replaced with a fresh `TIKI-XXXXXX`.
    pub fn create(&self, ticket: Ticket) -> Result<Ticket, StoreError> {
        let mut ticket = ticket;
        ticket.normalize(self.max_points);
        let now = Utc::now();
        ticket.created_at = now;
        ticket.updated_at = now;
        ticket.created_by = self.current_user.clone();
        ticket.loaded_mtime = None;

        {
            let mut tickets = self.write();
            if ticket.id.trim().is_empty() {
                ticket.id = self.generate_id(&tickets);
            }
            if tickets.contains_key(&ticket.id) || self.path_for(&ticket.id).exists() {
                return Err(StoreError::Duplicate(ticket.id));
            }
            tickets.insert(ticket.id.clone(), ticket.clone());
            if let Err(e) = self.save(&mut ticket) {
                tickets.remove(&ticket.id);
                return Err(e);
            }
            tickets.insert(ticket.id.clone(), ticket.clone());
        }

        self.stager.add(&self.path_for(&ticket.id));
        info!(id = %ticket.id, "created ticket");
        self.notify();
        Ok(ticket)
    }

    /// Persist changes to an existing ticket. The ticket's `loaded_mtime`
    /// is the version the caller last saw.
    pub fn update(&self, ticket: Ticket) -> Result<Ticket, StoreError> {
        let mut ticket = ticket;
        ticket.normalize(self.max_points);

        {
            let mut tickets = self.write();
            let previous = tickets
                .get(&ticket.id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(ticket.id.clone()))?;
            ticket.created_at = previous.created_at;
            ticket.created_by = previous.created_by.clone();

            tickets.insert(ticket.id.clone(), ticket.clone());
            if let Err(e) = self.save(&mut ticket) {
                tickets.insert(previous.id.clone(), previous);
                return Err(e);
            }
            tickets.insert(ticket.id.clone(), ticket.clone());
        }

        self.stager.add(&self.path_for(&ticket.id));
        debug!(id = %ticket.id, "updated ticket");
        self.notify();
        Ok(ticket)
    }

    pub fn update_status(&self, id: &str, status: Status) -> Result<StatusChange, StoreError> {
        let mut ticket = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_uppercase()))?;
        let from = ticket.status;
        if from == status {
            return Ok(StatusChange::Unchanged);
        }
        ticket.status = status;
        self.update(ticket)?;
        Ok(StatusChange::Changed { from, to: status })
    }

    /// Remove a ticket's file, then queue its removal from version control.
    /// In-memory state is untouched when the file cannot be removed.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_uppercase();
        if !self.read().contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        let path = self.path_for(&id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Io { path, source }),
        }

        self.write().remove(&id);
        self.stager.remove(&path);
        info!(id = %id, "deleted ticket");
        self.notify();
        Ok(())
    }

    /// Append a session comment. Comments are not written to disk.
    pub fn add_comment(&self, id: &str, author: &str, body: &str) -> Result<(), StoreError> {
        {
            let mut tickets = self.write();
            let ticket = tickets
                .get_mut(&id.to_uppercase())
                .ok_or_else(|| StoreError::NotFound(id.to_uppercase()))?;
            ticket.comments.push(Comment {
                author: author.to_string(),
                created_at: Utc::now(),
                body: body.to_string(),
            });
        }
        self.notify();
        Ok(())
    }

    /// Re-read one ticket from disk, discarding the in-memory copy
    pub fn reload(&self, id: &str) -> Result<Ticket, StoreError> {
        let id = id.to_uppercase();
        let mut ticket = self.read_ticket_file(&self.path_for(&id))?;
        {
            let mut tickets = self.write();
            if let Some(existing) = tickets.get(&id) {
                keep_history(&mut ticket, existing);
            }
            tickets.insert(id, ticket.clone());
        }
        self.notify();
        Ok(ticket)
    }

    /// Apply external changes reported by the watcher. Files whose mtime
    /// matches what is already loaded are skipped. Returns how many
    /// tickets changed.
    pub fn reload_paths(&self, paths: &[PathBuf]) -> usize {
        let mut changed = 0;
        for path in paths {
            if !is_ticket_path(path) || path.parent() != Some(self.dir.as_path()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = id_from_stem(stem);

            if !path.exists() {
                if self.write().remove(&id).is_some() {
                    debug!(id = %id, "ticket removed externally");
                    changed += 1;
                }
                continue;
            }

            let disk = fs::metadata(path).and_then(|m| m.modified()).ok();
            let loaded = self.read().get(&id).and_then(|t| t.loaded_mtime);
            if disk.is_some() && disk == loaded {
                continue;
            }

            match self.read_ticket_file(path) {
                Ok(mut ticket) => {
                    let mut tickets = self.write();
                    if let Some(existing) = tickets.get(&id) {
                        keep_history(&mut ticket, existing);
                    }
                    tickets.insert(id, ticket);
                    changed += 1;
                }
                Err(e) => warn!("ignoring external change: {}", e),
            }
        }
        if changed > 0 {
            self.notify();
        }
        changed
    }

    fn generate_id(&self, tickets: &HashMap<String, Ticket>) -> String {
        loop {
            let uuid = uuid::Uuid::new_v4();
            let suffix: String = uuid.as_bytes()[..ID_SUFFIX_LEN]
                .iter()
                .map(|b| ID_ALPHABET[usize::from(*b) % ID_ALPHABET.len()] as char)
                .collect();
            let id = format!("{}{}", ID_PREFIX, suffix.to_uppercase());
            if !tickets.contains_key(&id) && !self.path_for(&id).exists() {
                return id;
            }
        }
    }

    /// Write a ticket to disk, refusing when the file changed underneath us
    fn save(&self, ticket: &mut Ticket) -> Result<(), StoreError> {
        let path = self.path_for(&ticket.id);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(loaded) = ticket.loaded_mtime
            && let Ok(disk) = fs::metadata(&path).and_then(|m| m.modified())
            && disk != loaded
        {
            warn!(id = %ticket.id, "refusing to overwrite externally modified ticket");
            return Err(StoreError::Conflict {
                id: ticket.id.clone(),
            });
        }

        atomic_write(&path, serialize_ticket(ticket).as_bytes()).map_err(io_err)?;
        let mtime = fs::metadata(&path).and_then(|m| m.modified()).map_err(io_err)?;
        ticket.loaded_mtime = Some(mtime);
        ticket.updated_at = to_utc(mtime);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register a callback fired after every change. Ids start at 1.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

fn apply_summary(ticket: &mut Ticket, summary: &FileSummary) {
    ticket.created_at = summary.created_at;
    ticket.created_by = summary.created_by.clone();
    if summary.last_commit > ticket.updated_at {
        ticket.updated_at = summary.last_commit;
    }
}

/// Carry over fields that only the initial load knows
fn keep_history(ticket: &mut Ticket, existing: &Ticket) {
    ticket.created_at = existing.created_at;
    ticket.created_by = existing.created_by.clone();
    ticket.comments = existing.comments.clone();
    if existing.updated_at > ticket.updated_at {
        ticket.updated_at = existing.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::vcs::FakeVcs;
    use crate::model::ticket::{TicketType, is_default_id_shape};
    use chrono::Duration;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    fn open(dir: &Path, vcs: Arc<FakeVcs>) -> TicketStore {
        TicketStore::open(dir, vcs, 10).unwrap()
    }

    fn draft(title: &str) -> Ticket {
        let mut t = Ticket::template(10, Utc::now());
        t.title = title.into();
        t
    }

    /// Push a file's mtime into the past so the next write is observably newer
    fn age_file(path: &Path) {
        let past = SystemTime::now() - StdDuration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(past)
            .unwrap();
    }

    #[test]
    fn create_generates_id_and_writes_file() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(FakeVcs::new());
        let store = open(dir.path(), vcs.clone());

        let t = store.create(draft("Fix crash")).unwrap();
        assert!(is_default_id_shape(&t.id));
        assert_eq!(t.id, t.id.to_uppercase());
        let path = dir.path().join(format!("{}.md", t.id.to_lowercase()));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("title: Fix crash"));
        assert!(text.contains("status: backlog"));
        assert!(text.contains("priority: 3"));
        assert!(text.contains("points: 5"));
        assert_eq!(t.created_by, "tester");
        store.flush_staging();
        assert_eq!(vcs.staged(), vec![path]);
    }

    #[test]
    fn slow_staging_does_not_hold_up_writes() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_delay(StdDuration::from_millis(300));
        let store = open(dir.path(), vcs.clone());

        let started = std::time::Instant::now();
        let t = store.create(draft("Quick")).unwrap();
        let mut edited = t.clone();
        edited.title = "Quicker".into();
        store.update(edited).unwrap();
        assert!(started.elapsed() < StdDuration::from_millis(300));
        assert!(store.path_for(&t.id).exists());
        assert_eq!(store.get(&t.id).unwrap().title, "Quicker");

        store.flush_staging();
        assert_eq!(vcs.staged().len(), 2);
    }

    #[test]
    fn delete_removes_file_then_unstages() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(FakeVcs::new());
        let store = open(dir.path(), vcs.clone());
        let t = store.create(draft("Gone")).unwrap();
        let path = store.path_for(&t.id);
        store.delete(&t.id).unwrap();
        assert!(!path.exists());
        store.flush_staging();
        assert_eq!(vcs.removed(), vec![path]);
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        let mut t = draft("One");
        t.id = "tiki-abc123".into();
        store.create(t.clone()).unwrap();
        assert!(matches!(store.create(t), Err(StoreError::Duplicate(id)) if id == "TIKI-ABC123"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        let mut t = draft("Round trip");
        t.tags = vec!["zeta".into(), "alpha".into()];
        t.ticket_type = TicketType::Bug;
        t.body = "Line one\n\nLine two".into();
        t.priority = 9;
        let created = store.create(t).unwrap();

        let reopened = open(dir.path(), Arc::new(FakeVcs::new()));
        let loaded = reopened.get(&created.id).unwrap();
        assert_eq!(loaded.title, "Round trip");
        assert_eq!(loaded.tags, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(loaded.priority, 3);
        assert_eq!(loaded.body, "Line one\n\nLine two");
        assert_eq!(loaded.ticket_type, TicketType::Bug);
    }

    #[test]
    fn stale_save_is_a_conflict_and_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiki-aaaaaa.md");
        fs::write(&path, "---\ntitle: Original\n---\n").unwrap();
        age_file(&path);

        let a = open(dir.path(), Arc::new(FakeVcs::new()));
        let b = open(dir.path(), Arc::new(FakeVcs::new()));

        let mut ta = a.get("TIKI-AAAAAA").unwrap();
        ta.title = "Title A".into();
        a.update(ta).unwrap();

        let mut tb = b.get("tiki-aaaaaa").unwrap();
        tb.title = "Title B".into();
        let err = b.update(tb).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(fs::read_to_string(&path).unwrap().contains("title: Title A"));
        // B's memory keeps the last good copy
        assert_eq!(b.get("TIKI-AAAAAA").unwrap().title, "Original");
    }

    #[test]
    fn overwrite_after_conflict_uses_disk_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiki-aaaaaa.md");
        fs::write(&path, "---\ntitle: Original\n---\n").unwrap();
        age_file(&path);
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        fs::write(&path, "---\ntitle: External\n---\n").unwrap();

        let mut t = store.get("TIKI-AAAAAA").unwrap();
        t.title = "Mine".into();
        assert!(store.update(t.clone()).is_err());

        t.loaded_mtime = Some(store.disk_mtime("TIKI-AAAAAA").unwrap());
        store.update(t).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("title: Mine"));
    }

    #[test]
    fn update_status_reports_change() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        let t = store.create(draft("Move me")).unwrap();
        assert_eq!(
            store.update_status(&t.id, Status::Backlog).unwrap(),
            StatusChange::Unchanged
        );
        assert_eq!(
            store.update_status(&t.id, Status::Ready).unwrap(),
            StatusChange::Changed {
                from: Status::Backlog,
                to: Status::Ready
            }
        );
        assert!(matches!(
            store.update_status("TIKI-NOPE00", Status::Ready),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn delete_succeeds_when_version_control_refuses() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_fail_remove(true);
        let store = open(dir.path(), vcs);
        let t = store.create(draft("Remove me")).unwrap();
        store.delete(&t.id).unwrap();
        assert!(store.get(&t.id).is_none());
        assert!(!store.path_for(&t.id).exists());
    }

    #[test]
    fn failed_delete_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_fail_remove(true);
        let store = open(dir.path(), vcs);
        let t = store.create(draft("Stuck")).unwrap();

        // A directory in the file's place cannot be removed with remove_file
        let path = store.path_for(&t.id);
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(store.delete(&t.id), Err(StoreError::Io { .. })));
        assert!(store.get(&t.id).is_some());
    }

    #[test]
    fn load_without_history_uses_file_time_and_current_user() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiki-bbbbbb.md");
        fs::write(&path, "---\ntitle: No history\n---\n").unwrap();
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();

        let vcs = Arc::new(FakeVcs::new());
        vcs.set_user("ada");
        let store = open(dir.path(), vcs);
        let t = store.get("TIKI-BBBBBB").unwrap();
        assert_eq!(t.created_at, to_utc(mtime));
        assert_eq!(t.created_by, "ada");

        let store = open(dir.path(), Arc::new(FakeVcs::unavailable()));
        let t = store.get("TIKI-BBBBBB").unwrap();
        assert_eq!(t.created_at, to_utc(mtime));
        assert_eq!(t.created_by, "");
    }

    #[test]
    fn load_enriches_from_history() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tiki-cccccc.md"), "---\ntitle: Old\n---\n").unwrap();
        let created = Utc::now() - Duration::days(30);
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_summary(
            "tiki-cccccc.md",
            FileSummary {
                created_at: created,
                created_by: "grace".into(),
                last_commit: created,
            },
        );
        let store = open(dir.path(), vcs);
        let t = store.get("TIKI-CCCCCC").unwrap();
        assert_eq!(t.created_at, created);
        assert_eq!(t.created_by, "grace");
        assert!(t.updated_at > created);
    }

    #[test]
    fn refresh_rereads_files_and_keeps_history_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tiki-cccccc.md"), "---\ntitle: Old\n---\n").unwrap();
        let created = Utc::now() - Duration::days(30);
        let vcs = Arc::new(FakeVcs::new());
        vcs.set_summary(
            "tiki-cccccc.md",
            FileSummary {
                created_at: created,
                created_by: "grace".into(),
                last_commit: created,
            },
        );
        let store = open(dir.path(), vcs.clone());
        store.add_comment("TIKI-CCCCCC", "sam", "kept").unwrap();

        // Version control is not asked again
        vcs.set_summary(
            "tiki-cccccc.md",
            FileSummary {
                created_at: Utc::now(),
                created_by: "someone else".into(),
                last_commit: Utc::now(),
            },
        );
        fs::write(dir.path().join("tiki-cccccc.md"), "---\ntitle: New\n---\n").unwrap();
        fs::write(dir.path().join("tiki-dddddd.md"), "---\ntitle: Added\n---\n").unwrap();

        assert_eq!(store.refresh().unwrap(), 2);
        let t = store.get("TIKI-CCCCCC").unwrap();
        assert_eq!(t.title, "New");
        assert_eq!(t.created_at, created);
        assert_eq!(t.created_by, "grace");
        assert_eq!(t.comments.len(), 1);
        assert_eq!(store.get("TIKI-DDDDDD").unwrap().created_by, "tester");
    }

    #[test]
    fn unparseable_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tiki-dddddd.md"), "no frontmatter").unwrap();
        fs::write(dir.path().join("tiki-eeeeee.md"), "---\ntitle: Fine\n---\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn listeners_fire_after_changes_and_can_be_removed() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = store.add_listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(id, 1);

        let t = store.create(draft("Notify")).unwrap();
        store.add_comment(&t.id, "sam", "looks good").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(store.get(&t.id).unwrap().comments.len(), 1);

        assert!(store.remove_listener(id));
        store.delete(&t.id).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(store.add_listener(|| {}), 2);
    }

    #[test]
    fn listener_may_read_the_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(dir.path(), Arc::new(FakeVcs::new())));
        let seen = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&store);
        let s = seen.clone();
        store.add_listener(move || {
            if let Some(store) = weak.upgrade() {
                s.store(store.len(), Ordering::SeqCst);
            }
        });
        store.create(draft("Reentrant")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reload_paths_picks_up_external_edits_and_removals() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        let t = store.create(draft("Before")).unwrap();
        let path = store.path_for(&t.id);

        // Unchanged file is skipped
        assert_eq!(store.reload_paths(&[path.clone()]), 0);

        fs::write(&path, "---\ntitle: After\n---\n").unwrap();
        age_file(&path);
        assert_eq!(store.reload_paths(&[path.clone()]), 1);
        assert_eq!(store.get(&t.id).unwrap().title, "After");

        let added = dir.path().join("tiki-ffffff.md");
        fs::write(&added, "---\ntitle: New\n---\n").unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(store.reload_paths(&[path, added]), 2);
        assert!(store.get(&t.id).is_none());
        assert!(store.get("TIKI-FFFFFF").is_some());
    }

    #[test]
    fn search_orders_by_priority_then_title() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        for (title, priority) in [("b crash", 2), ("a crash", 2), ("urgent crash", 1), ("other", 1)] {
            let mut t = draft(title);
            t.priority = priority;
            store.create(t).unwrap();
        }
        let titles: Vec<String> = store
            .search("CRASH", None)
            .into_iter()
            .map(|r| r.ticket.title)
            .collect();
        assert_eq!(titles, vec!["urgent crash", "a crash", "b crash"]);
    }

    #[test]
    fn assignees_are_distinct_and_sorted() {
        let dir = TempDir::new().unwrap();
        let store = open(dir.path(), Arc::new(FakeVcs::new()));
        for name in ["zed", "Amy", "Amy", ""] {
            let mut t = draft("x");
            t.assignee = name.into();
            store.create(t).unwrap();
        }
        assert_eq!(store.assignees(), vec!["Amy", "tester", "zed"]);
    }
}
