//! Plugin loading and view-mode persistence.
//!
//! Plugins start from the embedded defaults. Each existing `workflow.yaml`
//! (user dir, project dir, cwd, in that order) then overrides plugins by
//! name, field by field, or adds new ones. A plugin that fails to compile
//! is dropped and the reason kept as a diagnostic; the rest still load.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::io::atomic::atomic_write;
use crate::io::defaults::embedded_views;
use crate::model::plugin::{
    DocFetcher, KeyBinding, Lane, PluginDescriptor, PluginKind, PluginSource, ShortcutAction,
    ViewMode, default_sort,
};
use crate::model::workflow::{PluginEntry, VIEWS_KEY};
use crate::parse::{FilterError, parse_action, parse_filter, parse_key, parse_sort};

/// Error type for workflow loading and persistence
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid workflow: plugin {plugin}, lane {lane}: filter {source}")]
    Filter {
        plugin: String,
        lane: String,
        source: FilterError,
    },
    #[error("invalid workflow: plugin {plugin}: sort: {message}")]
    Sort { plugin: String, message: String },
    #[error("invalid workflow: plugin {plugin}: key: {message}")]
    Key { plugin: String, message: String },
    #[error("invalid workflow: plugin {plugin}: action: {message}")]
    Action { plugin: String, message: String },
    #[error("invalid workflow: {plugin}: {message}")]
    Validation { plugin: String, message: String },
    #[error("invalid workflow: key {key} of {dropped} is also used by {kept}; {dropped} dropped")]
    DuplicateKey {
        key: String,
        dropped: String,
        kept: String,
    },
    #[error("invalid workflow: {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of plugin loading
#[derive(Debug, Clone, Default)]
pub struct LoadedPlugins {
    /// Valid plugins in declaration order; exactly one is `default`
    pub plugins: Vec<PluginDescriptor>,
    /// Why dropped plugins were dropped, as display strings
    pub diagnostics: Vec<String>,
    /// Workflow files that were read
    pub files: Vec<PathBuf>,
}

impl LoadedPlugins {
    pub fn default_plugin(&self) -> Option<&PluginDescriptor> {
        self.plugins
            .iter()
            .find(|p| p.default)
            .or_else(|| self.plugins.first())
    }

    pub fn by_name(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn by_key(&self, key: &KeyBinding) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.activation_key == *key)
    }
}

/// A plugin entry merged across files, before compilation
struct MergedEntry {
    entry: PluginEntry,
    source: PluginSource,
}

/// Load plugins from the embedded defaults plus every existing file in
/// `files`, in order
pub fn load_plugins(files: &[PathBuf]) -> LoadedPlugins {
    let mut diagnostics: Vec<String> = Vec::new();
    let mut merged: Vec<MergedEntry> = Vec::new();

    for view in embedded_views() {
        match serde_yaml::from_value::<PluginEntry>(view) {
            Ok(entry) => merge_into(&mut merged, entry, PluginSource::default()),
            Err(e) => diagnostics.push(format!("invalid workflow: embedded plugin: {}", e)),
        }
    }

    let mut used = Vec::new();
    for path in files {
        if !path.is_file() {
            continue;
        }
        let views = match read_views(path) {
            Ok(views) => views,
            Err(e) => {
                warn!("{}", e);
                diagnostics.push(e.to_string());
                continue;
            }
        };
        debug!(file = %path.display(), count = views.len(), "read workflow");
        used.push(path.clone());

        for (index, view) in views.into_iter().enumerate() {
            let entry = match serde_yaml::from_value::<PluginEntry>(view) {
                Ok(entry) => entry,
                Err(source) => {
                    let e = WorkflowError::Yaml {
                        path: path.clone(),
                        source,
                    };
                    warn!("{}", e);
                    diagnostics.push(e.to_string());
                    continue;
                }
            };
            if entry.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
                let msg = format!(
                    "invalid workflow: {} entry {} has no name; dropped",
                    path.display(),
                    index
                );
                warn!("{}", msg);
                diagnostics.push(msg);
                continue;
            }
            let source = PluginSource {
                path: Some(path.clone()),
                index: Some(index),
            };
            merge_into(&mut merged, entry, source);
        }
    }

    let mut plugins = Vec::new();
    for m in merged {
        match compile_entry(&m.entry, m.source) {
            Ok(p) => plugins.push(p),
            Err(e) => {
                warn!("{}", e);
                diagnostics.push(e.to_string());
            }
        }
    }

    let plugins = drop_duplicate_keys(plugins, &mut diagnostics);
    let plugins = settle_default(plugins);

    LoadedPlugins {
        plugins,
        diagnostics,
        files: used,
    }
}

fn read_views(path: &Path) -> Result<Vec<Value>, WorkflowError> {
    let text = fs::read_to_string(path).map_err(|source| WorkflowError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_yaml::from_str(&text).map_err(|source| WorkflowError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(doc
        .get(VIEWS_KEY)
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default())
}

/// Overlay `entry` onto a same-named plugin, or append it
fn merge_into(merged: &mut Vec<MergedEntry>, entry: PluginEntry, source: PluginSource) {
    let name = entry.name.clone().unwrap_or_default();
    let existing = merged.iter_mut().find(|m| {
        m.entry
            .name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(&name))
    });
    match existing {
        Some(m) => {
            overlay_entry(&mut m.entry, entry);
            m.source = source;
        }
        None => merged.push(MergedEntry { entry, source }),
    }
}

fn overlay_entry(base: &mut PluginEntry, overlay: PluginEntry) {
    fn set<T>(slot: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *slot = value;
        }
    }
    set(&mut base.key, overlay.key);
    set(&mut base.kind, overlay.kind);
    set(&mut base.default, overlay.default);
    set(&mut base.view, overlay.view);
    set(&mut base.sort, overlay.sort);
    set(&mut base.lanes, overlay.lanes);
    set(&mut base.actions, overlay.actions);
    set(&mut base.fetcher, overlay.fetcher);
    set(&mut base.text, overlay.text);
    set(&mut base.url, overlay.url);
}

/// Validate an entry and turn it into a descriptor
pub fn compile_entry(
    entry: &PluginEntry,
    source: PluginSource,
) -> Result<PluginDescriptor, WorkflowError> {
    let name = entry.name.clone().unwrap_or_default().trim().to_string();
    let validation = |message: &str| WorkflowError::Validation {
        plugin: name.clone(),
        message: message.to_string(),
    };
    if name.is_empty() {
        return Err(validation("missing name"));
    }

    let key_spec = entry
        .key
        .as_deref()
        .ok_or_else(|| validation("missing key"))?;
    let activation_key = parse_key(key_spec).map_err(|message| WorkflowError::Key {
        plugin: name.clone(),
        message,
    })?;

    let is_doc = entry.fetcher.is_some() || entry.text.is_some() || entry.url.is_some();
    let kind = match entry.kind.as_deref().map(|k| k.trim().to_lowercase()) {
        Some(k) if k == "tiki" => PluginKind::Tiki,
        Some(k) if k == "doki" => PluginKind::Doki,
        Some(other) => return Err(validation(&format!("unknown type {}", other))),
        None if is_doc => PluginKind::Doki,
        None => PluginKind::Tiki,
    };

    let view_mode = match entry.view.as_deref() {
        None => ViewMode::default(),
        Some(v) => {
            ViewMode::parse(v).ok_or_else(|| validation(&format!("unknown view mode {}", v)))?
        }
    };

    let sort = match &entry.sort {
        None => default_sort(),
        Some(spec) => parse_sort(&spec.tokens()).map_err(|message| WorkflowError::Sort {
            plugin: name.clone(),
            message,
        })?,
    };

    let mut lanes = Vec::new();
    if kind == PluginKind::Tiki {
        let lane_entries = entry.lanes.as_deref().unwrap_or_default();
        if lane_entries.is_empty() {
            return Err(validation("a tiki plugin needs at least one lane"));
        }
        for lane in lane_entries {
            let lane_name = lane.name.clone().unwrap_or_default().trim().to_string();
            if lane_name.is_empty() {
                return Err(validation("lane without a name"));
            }
            let filter =
                parse_filter(lane.filter.as_deref().unwrap_or("")).map_err(|source| {
                    WorkflowError::Filter {
                        plugin: name.clone(),
                        lane: lane_name.clone(),
                        source,
                    }
                })?;
            let action = match lane.action.as_deref() {
                None => None,
                Some(a) => Some(parse_action(a).map_err(|message| WorkflowError::Action {
                    plugin: name.clone(),
                    message,
                })?),
            };
            let columns = match lane.columns {
                Some(c) if c >= 1 => c as usize,
                _ => 1,
            };
            lanes.push(Lane {
                name: lane_name,
                columns,
                filter,
                action,
            });
        }
    }

    let mut actions = Vec::new();
    for a in entry.actions.as_deref().unwrap_or_default() {
        let key = parse_key(&a.key).map_err(|message| WorkflowError::Key {
            plugin: name.clone(),
            message,
        })?;
        let action = parse_action(&a.action).map_err(|message| WorkflowError::Action {
            plugin: name.clone(),
            message,
        })?;
        actions.push(ShortcutAction {
            key,
            label: a.label.clone().unwrap_or_else(|| a.action.clone()),
            action,
        });
    }

    let fetcher = if kind == PluginKind::Doki {
        let fetcher = match entry.fetcher.as_deref().map(|f| f.trim().to_lowercase()) {
            Some(f) if f == "internal" => DocFetcher::Internal,
            Some(f) if f == "file" => DocFetcher::File,
            Some(other) => return Err(validation(&format!("unknown fetcher {}", other))),
            None if entry.url.is_some() => DocFetcher::File,
            None => DocFetcher::Internal,
        };
        if fetcher == DocFetcher::File && entry.url.as_deref().is_none_or(str::is_empty) {
            return Err(validation("file fetcher needs a url"));
        }
        Some(fetcher)
    } else {
        None
    };

    Ok(PluginDescriptor {
        name,
        activation_key,
        source,
        kind,
        default: entry.default.unwrap_or(false),
        lanes,
        sort,
        view_mode,
        actions,
        fetcher,
        text: entry.text.clone(),
        url: entry.url.clone(),
    })
}

/// When two plugins share an activation key the later one wins
fn drop_duplicate_keys(
    plugins: Vec<PluginDescriptor>,
    diagnostics: &mut Vec<String>,
) -> Vec<PluginDescriptor> {
    let mut kept: Vec<PluginDescriptor> = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        if let Some(pos) = kept
            .iter()
            .position(|p| p.activation_key == plugin.activation_key)
        {
            let dropped = kept.remove(pos);
            let e = WorkflowError::DuplicateKey {
                key: plugin.activation_key.to_string(),
                dropped: dropped.name,
                kept: plugin.name.clone(),
            };
            warn!("{}", e);
            diagnostics.push(e.to_string());
            kept.insert(pos, plugin);
        } else {
            kept.push(plugin);
        }
    }
    kept
}

/// Exactly one default: the first one marked, else the first plugin
fn settle_default(mut plugins: Vec<PluginDescriptor>) -> Vec<PluginDescriptor> {
    let first_marked = plugins.iter().position(|p| p.default).unwrap_or(0);
    for (i, p) in plugins.iter_mut().enumerate() {
        p.default = i == first_marked;
    }
    plugins
}

// ---------------------------------------------------------------------------
// View-mode persistence
// ---------------------------------------------------------------------------

fn entry_name_matches(entry: &Value, name: &str) -> bool {
    entry
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|n| n.eq_ignore_ascii_case(name))
}

/// Record a plugin's display mode in a workflow file.
///
/// The entry is found by `index` when the name there matches, otherwise by
/// name; when neither exists a `{name, view}` entry is appended. A missing
/// file starts as an empty `views` list. The file is replaced atomically.
pub fn save_view_mode(
    path: &Path,
    plugin_name: &str,
    index: Option<usize>,
    mode: ViewMode,
) -> Result<(), WorkflowError> {
    let mut doc = if path.is_file() {
        let text = fs::read_to_string(path).map_err(|source| WorkflowError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str::<Value>(&text).map_err(|source| WorkflowError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        Value::Null
    };
    if !doc.is_mapping() {
        doc = Value::Mapping(Mapping::new());
    }

    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| WorkflowError::Validation {
            plugin: plugin_name.to_string(),
            message: "workflow document is not a mapping".to_string(),
        })?;
    let views_key = Value::String(VIEWS_KEY.to_string());
    if !root.get(&views_key).is_some_and(Value::is_sequence) {
        root.insert(views_key.clone(), Value::Sequence(Vec::new()));
    }
    let Some(Value::Sequence(views)) = root.get_mut(&views_key) else {
        return Err(WorkflowError::Validation {
            plugin: plugin_name.to_string(),
            message: "views is not a list".to_string(),
        });
    };

    let position = index
        .filter(|i| views.get(*i).is_some_and(|e| entry_name_matches(e, plugin_name)))
        .or_else(|| views.iter().position(|e| entry_name_matches(e, plugin_name)));

    let view_value = Value::String(mode.as_str().to_string());
    match position.and_then(|i| views.get_mut(i)).and_then(Value::as_mapping_mut) {
        Some(entry) => {
            entry.insert(Value::String("view".into()), view_value);
        }
        None => {
            let mut entry = Mapping::new();
            entry.insert(
                Value::String("name".into()),
                Value::String(plugin_name.to_string()),
            );
            entry.insert(Value::String("view".into()), view_value);
            views.push(Value::Mapping(entry));
        }
    }

    let text = serde_yaml::to_string(&doc).map_err(|source| WorkflowError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| WorkflowError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    atomic_write(path, text.as_bytes()).map_err(|source| WorkflowError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(plugin = plugin_name, mode = mode.as_str(), "saved view mode");
    Ok(())
}
