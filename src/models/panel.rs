use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown when a panel's content could not be fetched.
pub const FAILED_PLACEHOLDER: &str = "failed to load";

/// Per-panel display switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelToggles {
    /// Show the raw text instead of the structured value.
    pub raw: bool,
    /// Soft-wrap long lines.
    pub wrap: bool,
}

impl Default for PanelToggles {
    fn default() -> Self {
        Self {
            raw: false,
            wrap: true,
        }
    }
}

/// What the display area of a panel currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum PanelContent {
    Loading,
    /// Highlighted markup, already escaped.
    Markup(String),
    /// Unhighlighted text, not escaped.
    Text(String),
    Failed,
}

impl PanelContent {
    /// The content as text a terminal can print, markup tags included.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Loading => "loading...",
            Self::Markup(s) | Self::Text(s) => s,
            Self::Failed => FAILED_PLACEHOLDER,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// The edit state of a panel.
///
/// - `Viewing`: no edit session exists
/// - `Editing`: the editor is open
/// - `Saving`: a write is in flight; `silent` saves keep the editor open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    Viewing,
    Editing,
    Saving { silent: bool },
}

/// Snapshot of an open edit session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditView {
    pub mode: EditMode,
    pub text: String,
    pub last_saved: Option<DateTime<Utc>>,
}

/// Everything a front end needs to draw one module panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelView {
    pub name: String,
    pub path: String,
    pub tags: Vec<String>,
    pub note: String,
    pub toggles: PanelToggles,
    pub content: PanelContent,
    pub edit: Option<EditView>,
    /// Known raw-text length in bytes.
    pub length: Option<usize>,
}

impl PanelView {
    pub fn mode(&self) -> EditMode {
        self.edit.as_ref().map_or(EditMode::Viewing, |e| e.mode)
    }
}
