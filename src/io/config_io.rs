use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::model::config::AppConfig;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Starter `config.yaml` written by `tiki init`
pub const DEFAULT_CONFIG_YAML: &str = "\
logging:
  level: info
header:
  visible: true
tiki:
  maxPoints: 10
appearance:
  theme: auto
  colorThresholds:
    highPriority: 2
    largePoints: 8
    staleDays: 14
";

/// Recursively overlay `overlay` onto `base`. Mappings merge key by key;
/// any other value replaces what was there.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

fn read_yaml(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(value))
}

/// Load and deep-merge every existing config file, in order.
/// Returns the merged config and the files that contributed to it.
pub fn load_config(files: &[PathBuf]) -> Result<(AppConfig, Vec<PathBuf>), ConfigError> {
    let mut merged = Value::Mapping(Default::default());
    let mut used = Vec::new();
    for path in files {
        if let Some(value) = read_yaml(path)? {
            debug!(file = %path.display(), "merging config");
            deep_merge(&mut merged, value);
            used.push(path.clone());
        }
    }

    let config = serde_yaml::from_value(merged).map_err(|source| ConfigError::Yaml {
        path: used.last().cloned().unwrap_or_default(),
        source,
    })?;
    Ok((config, used))
}
