use std::fs;
use std::path::Path;

use tracing::warn;

use crate::io::defaults::HELP_TEXT;
use crate::io::paths::AppPaths;
use crate::model::plugin::{DocFetcher, PluginDescriptor};
use crate::tui::actions::ActionId;

use super::Outcome;

/// Lines moved by PageUp/PageDown
const PAGE: usize = 10;

/// Plain-text document view for doki plugins and the single-file viewer
pub struct DocView {
    name: String,
    text: String,
    pub scroll: usize,
}

impl DocView {
    pub fn new(name: &str, text: String) -> Self {
        DocView {
            name: name.to_string(),
            text,
            scroll: 0,
        }
    }

    /// Fetch a doki plugin's text. Failures become the document body.
    pub fn for_plugin(plugin: &PluginDescriptor, paths: &AppPaths) -> Self {
        let text = match plugin.fetcher.unwrap_or(DocFetcher::Internal) {
            DocFetcher::Internal => plugin
                .text
                .clone()
                .unwrap_or_else(|| HELP_TEXT.to_string()),
            DocFetcher::File => match &plugin.url {
                Some(url) => read_doc(&paths.project_config_dir.join(url)),
                None => format!("{} has no url to load", plugin.name),
            },
        };
        DocView::new(&plugin.name, text)
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(DocView::new(&name, text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn handle_action(&mut self, id: &ActionId) -> Outcome {
        match id {
            ActionId::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            ActionId::ScrollDown => self.scroll += 1,
            ActionId::PageUp => self.scroll = self.scroll.saturating_sub(PAGE),
            ActionId::PageDown => self.scroll += PAGE,
            _ => return Outcome::Ignored,
        }
        Outcome::Handled
    }
}

fn read_doc(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), "could not read document: {}", e);
            format!("Could not read {}: {}", path.display(), e)
        }
    }
}
