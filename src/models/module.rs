use serde::{Deserialize, Serialize};

use crate::filter::derive_tags;

/// A named configuration unit exposed by the remote service.
///
/// The whole module is edited as one blob of raw text. `path` is a display-only
/// hint about where the service keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Module {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tags: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Tags supplied by the server, empty when none were sent.
    pub fn server_tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Tags shown on the panel: the server's when present, otherwise derived
    /// from the module name.
    pub fn display_tags(&self) -> Vec<String> {
        match self.tags.as_deref() {
            Some(tags) if !tags.is_empty() => tags.to_vec(),
            _ => derive_tags(&self.name),
        }
    }
}

/// Response body of `POST /config/scan`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default)]
    pub added: Vec<Module>,
    #[serde(default)]
    pub total: Option<usize>,
}

/// Request body of `POST /config/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterModuleInput {
    pub name: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_listing_entry_without_tags() {
        let module: Module =
            serde_json::from_str(r#"{"name":"camera","path":"modules/camera/config/config.yml"}"#)
                .unwrap();
        assert_eq!(module.name, "camera");
        assert!(module.tags.is_none());
        assert_eq!(module.display_tags(), vec!["camera".to_string()]);
    }

    #[test]
    fn empty_server_tags_fall_back_to_derived() {
        let module = Module::new("neopixel", "").with_tags(Vec::<String>::new());
        assert_eq!(module.display_tags(), vec!["led".to_string()]);
    }

    #[test]
    fn server_tags_win_over_derived() {
        let module = Module::new("camera", "").with_tags(["vision", "usb"]);
        assert_eq!(module.display_tags(), vec!["vision", "usb"]);
    }
}
