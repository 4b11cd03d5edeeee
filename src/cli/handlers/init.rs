use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::CliError;
use crate::cli::commands::InitArgs;
use crate::io::defaults::DEFAULT_WORKFLOW_YAML;
use crate::io::paths::AppPaths;

const CONFIG_TEMPLATE: &str = r##"# tiki configuration
#
# Files are merged in order: user config dir, this directory, then the
# directory tiki is started from. Later files win.

logging:
  # tracing filter, e.g. "debug" or "tiki=trace"; RUST_LOG overrides it
  level: info

header:
  visible: true

tiki:
  # largest estimate the edit form accepts
  maxPoints: 10

appearance:
  # auto, dark or light
  theme: auto
  # colorThresholds:
  #   highPriority: 2
  #   largePoints: 8
  #   staleDays: 14
"##;

/// What `init` did with each file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStep {
    Created(PathBuf),
    Kept(PathBuf),
}

/// Create the tickets directory plus default workflow and config files.
/// Existing files are kept unless `force` is set.
pub fn init_project(paths: &AppPaths, force: bool) -> Result<Vec<InitStep>, CliError> {
    let workflow = paths.project_workflow_file();
    let config = paths.project_config_file();
    if !force && paths.tickets_dir.is_dir() && workflow.exists() && config.exists() {
        return Err(CliError::AlreadyInitialized(paths.project_config_dir.clone()));
    }

    fs::create_dir_all(&paths.tickets_dir).map_err(|e| CliError::io(&paths.tickets_dir, e))?;
    Ok(vec![
        write_default(&workflow, DEFAULT_WORKFLOW_YAML, force)?,
        write_default(&config, CONFIG_TEMPLATE, force)?,
    ])
}

fn write_default(path: &Path, content: &str, force: bool) -> Result<InitStep, CliError> {
    if path.exists() && !force {
        return Ok(InitStep::Kept(path.to_path_buf()));
    }
    fs::write(path, content).map_err(|e| CliError::io(path, e))?;
    info!(path = %path.display(), "wrote default");
    Ok(InitStep::Created(path.to_path_buf()))
}

pub fn cmd_init(args: InitArgs) -> Result<(), CliError> {
    let cwd = std::env::current_dir().map_err(|e| CliError::io(Path::new("."), e))?;
    let paths = AppPaths::discover(&cwd);
    let steps = init_project(&paths, args.force)?;

    println!("Initialized tiki in {}", paths.project_config_dir.display());
    println!("  tickets   {}", paths.tickets_dir.display());
    for step in &steps {
        match step {
            InitStep::Created(p) => println!("  created   {}", p.display()),
            InitStep::Kept(p) => println!("  kept      {}", p.display()),
        }
    }
    println!();
    println!("Run `tiki` to open the board.");
    Ok(())
}
