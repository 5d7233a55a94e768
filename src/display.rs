//! Per-panel display state: toggles and the content currently shown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::ContentCache;
use crate::models::{PanelContent, PanelToggles};
use crate::render::{raw_content, structured_content};

/// Dashboard-wide presentation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Show structured values as JSON rather than the secondary format.
    pub view_json: bool,
    /// Emit highlighted markup rather than plain text.
    pub highlight: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            view_json: true,
            highlight: true,
        }
    }
}

#[derive(Debug)]
struct PanelState {
    toggles: PanelToggles,
    content: PanelContent,
    // Set by every refresh; only the newest refresh may store content.
    generation: u64,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            toggles: PanelToggles::default(),
            content: PanelContent::Loading,
            generation: 0,
        }
    }
}

#[derive(Debug, Default)]
struct DisplayState {
    settings: DisplaySettings,
    panels: HashMap<String, PanelState>,
    next_generation: u64,
}

/// Display state of every panel. Cloning shares the same state.
#[derive(Clone)]
pub struct PanelDisplays {
    cache: ContentCache,
    state: Arc<Mutex<DisplayState>>,
}

impl PanelDisplays {
    pub fn new(cache: ContentCache, settings: DisplaySettings) -> Self {
        Self {
            cache,
            state: Arc::new(Mutex::new(DisplayState {
                settings,
                panels: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    pub fn settings(&self) -> DisplaySettings {
        self.state.lock().settings
    }

    pub fn set_settings(&self, settings: DisplaySettings) {
        self.state.lock().settings = settings;
    }

    pub fn toggles(&self, name: &str) -> PanelToggles {
        self.state
            .lock()
            .panels
            .get(name)
            .map(|p| p.toggles)
            .unwrap_or_default()
    }

    pub fn set_raw(&self, name: &str, raw: bool) {
        self.state.lock().panels.entry(name.to_string()).or_default().toggles.raw = raw;
    }

    pub fn set_wrap(&self, name: &str, wrap: bool) {
        self.state.lock().panels.entry(name.to_string()).or_default().toggles.wrap = wrap;
    }

    /// The content last stored for a panel.
    pub fn content(&self, name: &str) -> PanelContent {
        self.state
            .lock()
            .panels
            .get(name)
            .map(|p| p.content.clone())
            .unwrap_or(PanelContent::Loading)
    }

    /// Re-render a panel from the cache, fetching on a miss.
    ///
    /// Honours the panel's raw toggle and the dashboard settings as they are
    /// when the refresh starts. A fetch failure shows the failed placeholder.
    pub async fn refresh(&self, name: &str) -> PanelContent {
        let (generation, toggles, settings) = {
            let mut state = self.state.lock();
            state.next_generation += 1;
            let generation = state.next_generation;
            let settings = state.settings;
            let panel = state.panels.entry(name.to_string()).or_default();
            panel.generation = generation;
            (generation, panel.toggles, settings)
        };

        let content = if toggles.raw {
            match self.cache.raw(name).await {
                Ok(text) => raw_content(&text, settings.highlight),
                Err(e) => {
                    tracing::warn!(module = name, "raw content unavailable: {}", e);
                    PanelContent::Failed
                }
            }
        } else {
            match self.cache.structured(name).await {
                Ok(value) => structured_content(&value, settings.view_json, settings.highlight),
                Err(e) => {
                    tracing::warn!(module = name, "structured content unavailable: {}", e);
                    PanelContent::Failed
                }
            }
        };

        let mut state = self.state.lock();
        let panel = state.panels.entry(name.to_string()).or_default();
        if panel.generation == generation {
            panel.content = content.clone();
        }
        content
    }

    /// Forget every panel. Settings are kept.
    pub fn clear(&self) {
        self.state.lock().panels.clear();
    }
}
