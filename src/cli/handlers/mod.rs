mod init;
pub use init::{InitStep, cmd_init, init_project};

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::{Cli, Commands};
use crate::io::paths::AppPaths;
use crate::io::vcs::{GitCli, Vcs, VcsError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0} is already initialized (use --force to overwrite the defaults)")]
    AlreadyInitialized(PathBuf),
    #[error("cannot open {0}: only local files can be viewed")]
    UrlNotSupported(String),
    #[error("no such file: {0}")]
    MissingFile(PathBuf),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Ui(String),
}

impl CliError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    match (cli.command, cli.target) {
        (Some(Commands::Init(args)), _) => cmd_init(args),
        (Some(Commands::Sysinfo), _) => cmd_sysinfo(),
        (None, Some(target)) => cmd_view(&target),
        (None, None) => crate::tui::run().map_err(|e| CliError::Ui(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

fn is_url(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Check a positional target and return the local file to open
pub fn view_target(target: &str) -> Result<PathBuf, CliError> {
    if is_url(target) {
        return Err(CliError::UrlNotSupported(target.to_string()));
    }
    let path = PathBuf::from(target);
    if !path.is_file() {
        return Err(CliError::MissingFile(path));
    }
    Ok(path)
}

pub fn cmd_view(target: &str) -> Result<(), CliError> {
    let path = view_target(target)?;
    crate::tui::run_viewer(&path).map_err(|e| CliError::Ui(e.to_string()))
}

// ---------------------------------------------------------------------------
// Sysinfo
// ---------------------------------------------------------------------------

/// Number of ticket files in `dir`; zero when it does not exist
fn count_tickets(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .count()
}

/// Label/value rows printed by `tiki sysinfo`
pub fn sysinfo_rows(paths: &AppPaths, vcs: &dyn Vcs) -> Vec<(&'static str, String)> {
    let or_unavailable =
        |r: Result<String, VcsError>| r.unwrap_or_else(|_| "unavailable".to_string());
    let user_dir = paths
        .user_config_dir
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "none".to_string());
    vec![
        ("version", env!("CARGO_PKG_VERSION").to_string()),
        (
            "platform",
            format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        ),
        ("project root", paths.root.display().to_string()),
        ("project config", paths.project_config_dir.display().to_string()),
        ("user config", user_dir),
        ("tickets dir", paths.tickets_dir.display().to_string()),
        ("tickets", count_tickets(&paths.tickets_dir).to_string()),
        ("log file", paths.log_file().display().to_string()),
        ("git user", or_unavailable(vcs.current_user())),
        ("git branch", or_unavailable(vcs.current_branch())),
    ]
}

pub fn cmd_sysinfo() -> Result<(), CliError> {
    let cwd = std::env::current_dir().map_err(|e| CliError::io(Path::new("."), e))?;
    let paths = AppPaths::discover(&cwd);
    let vcs = GitCli::new(&paths.root);
    let rows = sysinfo_rows(&paths, &vcs);
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("{:<width$}  {}", label, value, width = width);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::vcs::FakeVcs;
    use tempfile::TempDir;

    #[test]
    fn urls_are_rejected() {
        for url in ["http://example.com/a.md", "HTTPS://example.com"] {
            assert!(matches!(view_target(url), Err(CliError::UrlNotSupported(_))));
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.md");
        let err = view_target(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CliError::MissingFile(_)));
    }

    #[test]
    fn local_file_is_accepted() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.md");
        fs::write(&file, "# notes\n").unwrap();
        assert_eq!(view_target(file.to_str().unwrap()).unwrap(), file);
    }

    #[test]
    fn sysinfo_counts_tickets_and_reports_user() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::resolve(dir.path(), None, None);
        fs::create_dir_all(&paths.tickets_dir).unwrap();
        fs::write(paths.tickets_dir.join("tiki-abc123.md"), "---\ntitle: a\n---\n").unwrap();
        fs::write(paths.tickets_dir.join("notes.txt"), "x").unwrap();

        let rows = sysinfo_rows(&paths, &FakeVcs::new());
        let get = |label: &str| {
            rows.iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("tickets"), "1");
        assert_eq!(get("git user"), "tester");
        assert_eq!(get("user config"), "none");
    }

    #[test]
    fn sysinfo_without_git() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::resolve(dir.path(), None, None);
        let rows = sysinfo_rows(&paths, &FakeVcs::unavailable());
        assert!(rows.contains(&("git user", "unavailable".to_string())));
        assert!(rows.contains(&("tickets", "0".to_string())));
    }
}
