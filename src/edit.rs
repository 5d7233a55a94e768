//! Edit sessions and debounced autosave.
//!
//! # Lifecycle
//!
//! ```text
//! Viewing --start_edit--> Editing --save--> Saving --ok--> Viewing
//!                           ^  |              |
//!                           |  +--autosave--> Saving(silent) --ok--+
//!                           +----------------- failure / silent ok-+
//! Editing --cancel--> Viewing
//! ```
//!
//! Viewing is the absence of a session. A silent save never closes the
//! editor. Failures keep the session open and raise an error notice with the
//! server's text; nothing is retried and the cache is only touched after the
//! server confirmed a write.
//!
//! Saves of one module are numbered as they start. A confirmation only
//! reaches the cache when no later save was confirmed first, and only the
//! most recently started save may move the session out of `Saving`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use crate::cache::ContentCache;
use crate::client::{ClientError, ConfigApi};
use crate::display::PanelDisplays;
use crate::models::{EditMode, EditView};
use crate::notify::{Notice, Notifier};
use crate::scheduler::Scheduler;

/// Quiet period before an autosave fires.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(600);

/// Editor text used when a module's raw text cannot be fetched.
pub const EMPTY_PLACEHOLDER: &str = "# empty";

#[derive(Debug, Error)]
pub enum EditError {
    #[error("module {0} is not being edited")]
    NotEditing(String),
    #[error("save failed: {}", .0.detail())]
    Save(#[source] ClientError),
}

/// Autosave behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveSettings {
    pub enabled: bool,
    pub delay: Duration,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: AUTOSAVE_DELAY,
        }
    }
}

/// Save numbering for one module.
#[derive(Debug, Default, Clone, Copy)]
struct SaveOrder {
    issued: u64,
    confirmed: u64,
}

#[derive(Debug, Clone)]
struct EditSession {
    mode: EditMode,
    text: String,
    last_saved: Option<DateTime<Utc>>,
}

impl EditSession {
    fn view(&self) -> EditView {
        EditView {
            mode: self.mode,
            text: self.text.clone(),
            last_saved: self.last_saved,
        }
    }
}

/// Drives the edit state machine of every panel. Cloning shares sessions.
#[derive(Clone)]
pub struct EditController {
    api: Arc<dyn ConfigApi>,
    cache: ContentCache,
    displays: PanelDisplays,
    notifier: Arc<dyn Notifier>,
    scheduler: Scheduler,
    sessions: Arc<Mutex<HashMap<String, EditSession>>>,
    saves: Arc<Mutex<HashMap<String, SaveOrder>>>,
    autosave: Arc<Mutex<AutosaveSettings>>,
}

impl EditController {
    pub fn new(
        api: Arc<dyn ConfigApi>,
        cache: ContentCache,
        displays: PanelDisplays,
        notifier: Arc<dyn Notifier>,
        autosave: AutosaveSettings,
    ) -> Self {
        Self {
            api,
            cache,
            displays,
            notifier,
            scheduler: Scheduler::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            saves: Arc::new(Mutex::new(HashMap::new())),
            autosave: Arc::new(Mutex::new(autosave)),
        }
    }

    pub fn autosave(&self) -> AutosaveSettings {
        *self.autosave.lock()
    }

    pub fn set_autosave(&self, settings: AutosaveSettings) {
        *self.autosave.lock() = settings;
    }

    pub fn mode(&self, name: &str) -> EditMode {
        self.sessions
            .lock()
            .get(name)
            .map_or(EditMode::Viewing, |s| s.mode)
    }

    pub fn view(&self, name: &str) -> Option<EditView> {
        self.sessions.lock().get(name).map(EditSession::view)
    }

    /// Whether an autosave is waiting for its quiet period to end.
    pub fn autosave_pending(&self, name: &str) -> bool {
        self.scheduler.is_pending(name)
    }

    /// Open the editor with the module's raw text, fetching it if needed.
    /// Returns the editor text; an open session is left as it is.
    pub async fn start_edit(&self, name: &str) -> String {
        let open = self.sessions.lock().get(name).map(|s| s.text.clone());
        if let Some(text) = open {
            return text;
        }

        let text = match self.cache.raw(name).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(module = name, "opening editor without content: {}", e);
                EMPTY_PLACEHOLDER.to_string()
            }
        };

        let mut sessions = self.sessions.lock();
        let session = sessions.entry(name.to_string()).or_insert_with(|| EditSession {
            mode: EditMode::Editing,
            text,
            last_saved: None,
        });
        session.text.clone()
    }

    /// Replace the editor text and restart the autosave quiet period.
    pub fn update_text(&self, name: &str, text: impl Into<String>) -> Result<(), EditError> {
        {
            let mut sessions = self.sessions.lock();
            let session = sessions
                .get_mut(name)
                .ok_or_else(|| EditError::NotEditing(name.to_string()))?;
            session.text = text.into();
        }

        let autosave = self.autosave();
        if autosave.enabled {
            let this = self.clone();
            let key = name.to_string();
            self.scheduler.schedule(name, autosave.delay, async move {
                if let Err(e) = this.run_save(&key, true).await {
                    tracing::debug!(module = %key, "autosave did not complete: {}", e);
                }
            });
        }
        Ok(())
    }

    /// Save and close the editor.
    pub async fn save(&self, name: &str) -> Result<(), EditError> {
        self.scheduler.cancel(name);
        self.run_save(name, false).await
    }

    /// Save without leaving edit mode.
    pub async fn save_silently(&self, name: &str) -> Result<(), EditError> {
        self.scheduler.cancel(name);
        self.run_save(name, true).await
    }

    /// Close the editor, discarding unsaved text and any pending autosave.
    /// Returns whether a session was open.
    pub fn cancel(&self, name: &str) -> bool {
        self.scheduler.cancel(name);
        self.sessions.lock().remove(name).is_some()
    }

    /// Close every session without saving.
    pub fn reset(&self) {
        self.scheduler.cancel_all();
        self.sessions.lock().clear();
    }

    async fn run_save(&self, name: &str, silent: bool) -> Result<(), EditError> {
        let (payload, seq) = {
            let mut sessions = self.sessions.lock();
            let session = sessions
                .get_mut(name)
                .ok_or_else(|| EditError::NotEditing(name.to_string()))?;
            session.mode = EditMode::Saving { silent };
            let mut saves = self.saves.lock();
            let order = saves.entry(name.to_string()).or_default();
            order.issued += 1;
            (session.text.clone(), order.issued)
        };

        tracing::debug!(module = name, silent, seq, "saving module");
        match self.api.put_raw(name, &payload).await {
            Ok(()) => {
                let (newest, latest) = {
                    let mut saves = self.saves.lock();
                    let order = saves.entry(name.to_string()).or_default();
                    let newest = seq > order.confirmed;
                    if newest {
                        order.confirmed = seq;
                    }
                    (newest, seq == order.issued)
                };
                if !newest {
                    tracing::debug!(module = name, seq, "a later save was confirmed first");
                    return Ok(());
                }

                self.cache.record_write(name, &payload);
                if latest {
                    let mut sessions = self.sessions.lock();
                    if silent {
                        // The session may have been closed while saving.
                        if let Some(session) = sessions.get_mut(name) {
                            session.mode = EditMode::Editing;
                            session.last_saved = Some(Utc::now());
                        }
                    } else {
                        sessions.remove(name);
                    }
                }
                self.displays.refresh(name).await;
                Ok(())
            }
            Err(e) => {
                if self.is_latest_save(name, seq) {
                    let mut sessions = self.sessions.lock();
                    if let Some(session) = sessions.get_mut(name) {
                        session.mode = EditMode::Editing;
                    }
                }
                tracing::warn!(module = name, silent, "save failed: {}", e);
                self.notifier
                    .notify(Notice::error(format!("Save failed: {}", e.detail())));
                Err(EditError::Save(e))
            }
        }
    }

    fn is_latest_save(&self, name: &str, seq: u64) -> bool {
        self.saves
            .lock()
            .get(name)
            .is_some_and(|order| order.issued == seq)
    }
}
