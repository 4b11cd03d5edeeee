use std::env;
use std::path::{Path, PathBuf};

/// Overrides the project config directory (normally `<root>/.doc`)
pub const PROJECT_DIR_ENV: &str = "TIKI_PROJECT_DIR";
/// Overrides the user config directory (normally `<config>/tiki`)
pub const CONFIG_DIR_ENV: &str = "TIKI_CONFIG_DIR";

pub const DOC_DIR: &str = ".doc";
pub const TICKETS_DIR: &str = "tiki";
pub const WORKFLOW_FILE: &str = "workflow.yaml";
pub const CONFIG_FILE: &str = "config.yaml";
pub const LOG_FILE: &str = "tiki.log";
pub const STATE_FILE: &str = ".tiki-state.json";

/// Every filesystem location the application reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Project root: the nearest ancestor holding `.doc` or `.git`
    pub root: PathBuf,
    /// Project-level config directory, normally `<root>/.doc`
    pub project_config_dir: PathBuf,
    /// Directory holding one markdown file per ticket
    pub tickets_dir: PathBuf,
    /// Per-user config directory; `None` when the platform has none
    pub user_config_dir: Option<PathBuf>,
    /// Directory the process was started in
    pub cwd: PathBuf,
}

/// Walk up from `start` looking for a directory that contains `.doc` or
/// `.git`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(DOC_DIR).is_dir() || current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

impl AppPaths {
    /// Resolve paths for the process, honoring the environment overrides
    pub fn discover(cwd: &Path) -> Self {
        let project_override = env::var_os(PROJECT_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let user_dir = env::var_os(CONFIG_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("tiki")));
        Self::resolve(cwd, project_override, user_dir)
    }

    /// Resolve paths from explicit inputs, without reading the environment
    pub fn resolve(
        cwd: &Path,
        project_override: Option<PathBuf>,
        user_config_dir: Option<PathBuf>,
    ) -> Self {
        let root = find_project_root(cwd).unwrap_or_else(|| cwd.to_path_buf());
        let project_config_dir = project_override.unwrap_or_else(|| root.join(DOC_DIR));
        AppPaths {
            tickets_dir: project_config_dir.join(TICKETS_DIR),
            root,
            project_config_dir,
            user_config_dir,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.project_config_dir.join(LOG_FILE)
    }

    pub fn state_file(&self) -> PathBuf {
        self.project_config_dir.join(STATE_FILE)
    }

    /// The workflow file `tiki init` writes and view-mode changes persist to
    pub fn project_workflow_file(&self) -> PathBuf {
        self.project_config_dir.join(WORKFLOW_FILE)
    }

    pub fn project_config_file(&self) -> PathBuf {
        self.project_config_dir.join(CONFIG_FILE)
    }

    /// Config directories in merge order: user, project, cwd. Later
    /// entries override earlier ones. Duplicates are dropped.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        let candidates = self
            .user_config_dir
            .iter()
            .chain([&self.project_config_dir, &self.cwd]);
        for dir in candidates {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }

    /// Candidate workflow files in merge order (may not exist)
    pub fn workflow_files(&self) -> Vec<PathBuf> {
        self.search_dirs()
            .into_iter()
            .map(|d| d.join(WORKFLOW_FILE))
            .collect()
    }

    /// Candidate config files in merge order (may not exist)
    pub fn config_files(&self) -> Vec<PathBuf> {
        self.search_dirs()
            .into_iter()
            .map(|d| d.join(CONFIG_FILE))
            .collect()
    }
}
