use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::io::paths::AppPaths;
use crate::io::store::{StoreError, TicketStore};
use crate::io::vcs::Vcs;
use crate::io::workflow_io::{LoadedPlugins, load_plugins};
use crate::model::config::AppConfig;
use crate::model::plugin::PluginDescriptor;
use crate::tui::plugin_config::PluginRuntimeConfig;
use crate::tui::theme::Theme;

/// Everything views need from the outside world, built once at startup
/// and passed explicitly instead of living in globals
pub struct AppContext {
    pub paths: AppPaths,
    pub config: AppConfig,
    pub theme: Theme,
    pub store: Arc<TicketStore>,
    pub plugins: LoadedPlugins,
    /// Runtime state per board plugin, keyed by plugin name
    pub runtime: HashMap<String, Arc<PluginRuntimeConfig>>,
}

impl AppContext {
    /// Open the ticket store and load plugins for the resolved paths
    pub fn new(paths: AppPaths, config: AppConfig, vcs: Arc<dyn Vcs>) -> Result<Self, StoreError> {
        let store = TicketStore::open(&paths.tickets_dir, vcs, config.tiki.max_points)?;
        info!(tickets = store.len(), dir = %paths.tickets_dir.display(), "ticket store opened");

        let plugins = load_plugins(&paths.workflow_files());
        for diagnostic in &plugins.diagnostics {
            warn!("{}", diagnostic);
        }
        let runtime = plugins
            .plugins
            .iter()
            .filter(|p| p.is_board())
            .map(|p| (p.name.clone(), Arc::new(PluginRuntimeConfig::new(p))))
            .collect();

        Ok(AppContext {
            theme: Theme::from_config(&config.appearance),
            paths,
            config,
            store: Arc::new(store),
            plugins,
            runtime,
        })
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.by_name(name)
    }

    pub fn runtime_config(&self, name: &str) -> Option<Arc<PluginRuntimeConfig>> {
        self.plugin(name)
            .and_then(|p| self.runtime.get(&p.name))
            .cloned()
    }

    pub fn max_points(&self) -> u32 {
        self.store.max_points()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::io::vcs::FakeVcs;
    use tempfile::TempDir;

    /// A context over an empty temp project with the embedded plugins
    pub fn temp_context() -> (TempDir, AppContext) {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::resolve(dir.path(), None, None);
        let ctx = AppContext::new(paths, AppConfig::default(), Arc::new(FakeVcs::new())).unwrap();
        (dir, ctx)
    }
}
