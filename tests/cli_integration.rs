//! Integration tests for the `tiki` CLI.
//!
//! Each test runs `tiki` as a subprocess inside a temp directory and checks
//! its exit status, output and the files it leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the built `tiki` binary.
fn tiki_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tiki");
    path
}

/// Run tiki in `dir` with the user config dir pointed inside it
fn run_tiki(dir: &Path, args: &[&str]) -> Output {
    Command::new(tiki_bin())
        .args(args)
        .current_dir(dir)
        .env("TIKI_CONFIG_DIR", dir.join("user-config"))
        .env_remove("TIKI_PROJECT_DIR")
        .output()
        .expect("failed to run tiki")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn init_creates_project_layout() {
    let tmp = TempDir::new().unwrap();
    let out = run_tiki(tmp.path(), &["init"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let doc = tmp.path().join(".doc");
    assert!(doc.join("tiki").is_dir());
    let workflow = fs::read_to_string(doc.join("workflow.yaml")).unwrap();
    assert!(workflow.starts_with("views:"));
    assert!(workflow.contains("name: Kanban"));
    let config = fs::read_to_string(doc.join("config.yaml")).unwrap();
    assert!(config.contains("maxPoints: 10"));

    let text = stdout(&out);
    assert!(text.contains("Initialized tiki"));
    assert!(text.contains("created"));
}

#[test]
fn second_init_fails_without_force() {
    let tmp = TempDir::new().unwrap();
    assert!(run_tiki(tmp.path(), &["init"]).status.success());

    let out = run_tiki(tmp.path(), &["init"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).starts_with("error:"));
    assert!(stderr(&out).contains("already initialized"));

    let out = run_tiki(tmp.path(), &["init", "--force"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn init_from_subdirectory_uses_project_root() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".git")).unwrap();
    let sub = tmp.path().join("src/deep");
    fs::create_dir_all(&sub).unwrap();

    let out = run_tiki(&sub, &["init"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(tmp.path().join(".doc/tiki").is_dir());
    assert!(!sub.join(".doc").exists());
}

#[test]
fn sysinfo_reports_paths_and_ticket_count() {
    let tmp = TempDir::new().unwrap();
    let tickets = tmp.path().join(".doc/tiki");
    fs::create_dir_all(&tickets).unwrap();
    fs::write(tickets.join("tiki-abc123.md"), "---\ntitle: One\n---\n").unwrap();
    fs::write(tickets.join("tiki-def456.md"), "---\ntitle: Two\n---\n").unwrap();

    let out = run_tiki(tmp.path(), &["sysinfo"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains(env!("CARGO_PKG_VERSION")));
    assert!(text.contains(std::env::consts::OS));
    let count_line = text
        .lines()
        .find(|l| l.starts_with("tickets ") && !l.starts_with("tickets dir"))
        .unwrap();
    assert!(count_line.trim_end().ends_with('2'), "{}", count_line);
    assert!(text.contains("git user"));
}

#[test]
fn version_flag() {
    let tmp = TempDir::new().unwrap();
    let out = run_tiki(tmp.path(), &["--version"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn url_target_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let out = run_tiki(tmp.path(), &["https://example.com/readme.md"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("only local files"));
}

#[test]
fn missing_file_target_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let out = run_tiki(tmp.path(), &["nowhere.md"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("no such file"));
}

#[test]
fn file_with_subcommand_is_a_usage_error() {
    let tmp = TempDir::new().unwrap();
    let out = run_tiki(tmp.path(), &["notes.md", "init"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(!tmp.path().join(".doc").exists());
}

#[test]
fn unknown_subcommand_flag_is_a_usage_error() {
    let tmp = TempDir::new().unwrap();
    let out = run_tiki(tmp.path(), &["init", "--bogus"]);
    assert_eq!(out.status.code(), Some(2));
}
