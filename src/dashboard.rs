//! The dashboard session.
//!
//! [`Dashboard`] owns every piece of panel state (registry, caches, display
//! state, edit sessions, local records) and hands shared handles to the
//! components it builds. Front ends drive it and draw the [`PanelView`]s it
//! returns.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;

use crate::cache::ContentCache;
use crate::client::{ClientError, ConfigApi};
use crate::display::{DisplaySettings, PanelDisplays};
use crate::edit::{AutosaveSettings, EditController, EditError};
use crate::filter;
use crate::layout::{self, Collation, DEFAULT_LOCALE};
use crate::models::{EditMode, Module, PanelContent, PanelView, RegisterModuleInput};
use crate::notify::{Notice, Notifier};
use crate::registry::ModuleRegistry;
use crate::store::{KeyValueStore, LocalRecords, StoreError};

/// Modules measured concurrently per batch after the first render.
pub const LENGTH_BATCH_SIZE: usize = 6;

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    pub locale: String,
    pub display: DisplaySettings,
    pub autosave: AutosaveSettings,
    pub length_batch_size: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            display: DisplaySettings::default(),
            autosave: AutosaveSettings::default(),
            length_batch_size: LENGTH_BATCH_SIZE,
        }
    }
}

pub struct Dashboard {
    api: Arc<dyn ConfigApi>,
    notifier: Arc<dyn Notifier>,
    records: LocalRecords,
    cache: ContentCache,
    displays: PanelDisplays,
    edits: EditController,
    registry: Mutex<ModuleRegistry>,
    query: Mutex<String>,
    /// Names of the panels in the order last rendered. This is what a drag
    /// rearranges and what the layout record is written from.
    rendered: Mutex<Vec<String>>,
    collation: Collation,
    batch_size: usize,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn ConfigApi>,
        store: Box<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        settings: DashboardSettings,
    ) -> Self {
        let cache = ContentCache::new(Arc::clone(&api));
        let displays = PanelDisplays::new(cache.clone(), settings.display);
        let edits = EditController::new(
            Arc::clone(&api),
            cache.clone(),
            displays.clone(),
            Arc::clone(&notifier),
            settings.autosave,
        );
        Self {
            api,
            notifier,
            records: LocalRecords::new(store),
            cache,
            displays,
            edits,
            registry: Mutex::new(ModuleRegistry::new()),
            query: Mutex::new(String::new()),
            rendered: Mutex::new(Vec::new()),
            collation: Collation::for_locale(&settings.locale),
            batch_size: settings.length_batch_size.max(1),
        }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn edits(&self) -> &EditController {
        &self.edits
    }

    pub fn records(&self) -> &LocalRecords {
        &self.records
    }

    pub fn modules(&self) -> Vec<Module> {
        self.registry.lock().modules().to_vec()
    }

    pub fn module(&self, name: &str) -> Option<Module> {
        self.registry.lock().get(name).cloned()
    }

    // ============================================================
    // Bootstrap and rendering
    // ============================================================

    /// Load the module listing, render, then measure content lengths and
    /// render again. A failed listing leaves an empty, usable dashboard.
    pub async fn bootstrap(&self) -> Vec<PanelView> {
        let modules = match self.api.list_modules().await {
            Ok(modules) => modules,
            Err(e) => {
                tracing::warn!("module listing unavailable, starting empty: {}", e);
                Vec::new()
            }
        };
        tracing::debug!(modules = modules.len(), "registry seeded");
        self.registry.lock().seed(modules);

        self.render().await;
        self.compute_lengths().await
    }

    /// Recompute the visible panel order and refresh every visible panel.
    pub async fn render(&self) -> Vec<PanelView> {
        let visible = self.visible_modules();
        *self.rendered.lock() = visible.iter().map(|m| m.name.clone()).collect();

        join_all(visible.iter().map(|m| self.displays.refresh(&m.name))).await;
        self.views()
    }

    /// Registry modules in render order, narrowed by the current query.
    fn visible_modules(&self) -> Vec<Module> {
        let modules = self.modules();
        let ordered = layout::compute_order(
            &modules,
            &self.records.layout(),
            &self.cache.lengths(),
            &self.collation,
        );
        let query = self.query.lock().clone();
        filter::filter(&ordered, &query)
    }

    /// Snapshot of the rendered panels, without fetching anything.
    pub fn views(&self) -> Vec<PanelView> {
        let rendered = self.rendered.lock().clone();
        let notes = self.records.notes();
        let registry = self.registry.lock().clone();
        rendered
            .iter()
            .filter_map(|name| registry.get(name))
            .map(|module| self.view_of(module, notes.get(&module.name).cloned()))
            .collect()
    }

    /// Snapshot of one panel, rendered or not.
    pub fn panel(&self, name: &str) -> Option<PanelView> {
        let module = self.module(name)?;
        Some(self.view_of(&module, Some(self.records.note(name))))
    }

    fn view_of(&self, module: &Module, note: Option<String>) -> PanelView {
        PanelView {
            name: module.name.clone(),
            path: module.path.clone(),
            tags: module.display_tags(),
            note: note.unwrap_or_default(),
            toggles: self.displays.toggles(&module.name),
            content: self.displays.content(&module.name),
            edit: self.edits.view(&module.name),
            length: self.cache.length(&module.name),
        }
    }

    /// Names of the rendered panels, in order.
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().clone()
    }

    /// Measure every module with an unknown length, a batch at a time, then
    /// render. Failed measurements are skipped.
    pub async fn compute_lengths(&self) -> Vec<PanelView> {
        let lengths = self.cache.lengths();
        let pending: Vec<String> = self
            .registry
            .lock()
            .modules()
            .iter()
            .filter(|m| !lengths.contains(&m.name))
            .map(|m| m.name.clone())
            .collect();
        if pending.is_empty() {
            return self.views();
        }

        for batch in pending.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|name| self.cache.measure(name))).await;
            for (name, result) in batch.iter().zip(results) {
                if let Err(e) = result {
                    tracing::debug!(module = %name, "length unavailable: {}", e);
                }
            }
        }
        self.render().await
    }

    // ============================================================
    // Search and display switches
    // ============================================================

    pub fn query(&self) -> String {
        self.query.lock().clone()
    }

    pub async fn set_query(&self, query: &str) -> Vec<PanelView> {
        *self.query.lock() = query.to_string();
        self.render().await
    }

    /// Switch a panel between raw text and the structured value.
    pub async fn set_raw(&self, name: &str, raw: bool) -> PanelContent {
        self.displays.set_raw(name, raw);
        self.displays.refresh(name).await
    }

    pub fn set_wrap(&self, name: &str, wrap: bool) {
        self.displays.set_wrap(name, wrap);
    }

    pub fn display_settings(&self) -> DisplaySettings {
        self.displays.settings()
    }

    /// Switch structured panels between JSON and the secondary format.
    pub async fn set_view_json(&self, view_json: bool) -> Vec<PanelView> {
        let settings = DisplaySettings {
            view_json,
            ..self.displays.settings()
        };
        self.displays.set_settings(settings);
        let rendered = self.rendered();
        join_all(rendered.iter().map(|name| self.displays.refresh(name))).await;
        self.views()
    }

    pub async fn set_highlight(&self, highlight: bool) -> Vec<PanelView> {
        let settings = DisplaySettings {
            highlight,
            ..self.displays.settings()
        };
        self.displays.set_settings(settings);
        self.render().await
    }

    // ============================================================
    // Notes and layout
    // ============================================================

    pub fn note(&self, name: &str) -> String {
        self.records.note(name)
    }

    pub fn set_note(&self, name: &str, text: &str) -> Result<(), StoreError> {
        self.records.set_note(name, text)
    }

    /// Drag a rendered panel to `index` and persist the new order.
    /// Returns false when the panel is not rendered.
    pub fn move_panel(&self, name: &str, index: usize) -> Result<bool, StoreError> {
        let mut rendered = self.rendered.lock();
        if !layout::move_panel(&mut rendered, name, index) {
            return Ok(false);
        }
        layout::persist_order(&self.records, &rendered)?;
        Ok(true)
    }

    /// Clear the persisted layout and reload the session from scratch.
    pub async fn reset_layout(&self) -> Result<Vec<PanelView>, StoreError> {
        self.records.clear_layout()?;
        self.edits.reset();
        self.cache.clear();
        self.displays.clear();
        self.query.lock().clear();
        self.rendered.lock().clear();
        *self.registry.lock() = ModuleRegistry::new();
        Ok(self.bootstrap().await)
    }

    // ============================================================
    // Scan and registration
    // ============================================================

    /// Ask the service to discover modules and merge what it reports.
    /// Returns how many modules were new.
    pub async fn rescan(&self) -> Result<usize, ClientError> {
        let report = match self.api.scan().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("scan failed: {}", e);
                self.notifier
                    .notify(Notice::error(format!("Scan failed: {}", e.detail())));
                return Err(e);
            }
        };

        let added = self.registry.lock().merge(report.added);
        tracing::info!(added, total = ?report.total, "scan merged");
        if let Err(e) = self.records.clear_layout() {
            tracing::warn!("could not clear layout after scan: {}", e);
        }

        self.render().await;
        self.compute_lengths().await;
        if added > 0 {
            self.notifier
                .notify(Notice::info(format!("New panels added: {}", added)));
        }
        Ok(added)
    }

    /// Register a module by name and path, then show it.
    pub async fn register(&self, name: &str, path: &str) -> Result<(), ClientError> {
        let input = RegisterModuleInput {
            name: name.to_string(),
            path: path.to_string(),
        };
        if let Err(e) = self.api.register(&input).await {
            tracing::warn!(module = name, "registration failed: {}", e);
            self.notifier
                .notify(Notice::error(format!("Registration failed: {}", e.detail())));
            return Err(e);
        }
        tracing::info!(module = name, path, "module registered");
        self.registry.lock().upsert(Module::new(name, path));
        self.render().await;
        Ok(())
    }

    // ============================================================
    // Editing
    // ============================================================

    pub async fn start_edit(&self, name: &str) -> String {
        self.edits.start_edit(name).await
    }

    pub fn update_text(&self, name: &str, text: impl Into<String>) -> Result<(), EditError> {
        self.edits.update_text(name, text)
    }

    pub async fn save(&self, name: &str) -> Result<(), EditError> {
        self.edits.save(name).await
    }

    pub fn cancel_edit(&self, name: &str) -> bool {
        self.edits.cancel(name)
    }

    pub fn edit_mode(&self, name: &str) -> EditMode {
        self.edits.mode(name)
    }

    /// Turn autosave on or off. Pending autosaves still fire.
    pub fn set_autosave(&self, enabled: bool) {
        let settings = AutosaveSettings {
            enabled,
            ..self.edits.autosave()
        };
        self.edits.set_autosave(settings);
    }
}
