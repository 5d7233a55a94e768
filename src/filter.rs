//! Free-text search over modules and display tag derivation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Module;

/// Tag given to modules no keyword rule matches.
pub const DEFAULT_TAG: &str = "core";

/// Ordered keyword rules: the first element is the tag, the second the
/// pattern matched against the lowercased module name.
static TAG_RULES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("camera", "cam|camera|vision"),
        ("led", "neo|pixel|led"),
        ("hardware", "arduino|serial"),
        ("audio", "speech|speak|audio"),
        ("ai", "wiki|rag|ollama"),
        ("ops", "diag|health"),
        ("alerts", "notify|telegram|discord"),
    ]
    .into_iter()
    .map(|(tag, pattern)| (tag, Regex::new(pattern).expect("Valid tag rule regex")))
    .collect()
});

/// Derive display tags from a module name. Never empty.
pub fn derive_tags(name: &str) -> Vec<String> {
    let name = name.to_lowercase();
    let mut tags: Vec<String> = TAG_RULES
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&name))
        .map(|(tag, _)| tag.to_string())
        .collect();
    if tags.is_empty() {
        tags.push(DEFAULT_TAG.to_string());
    }
    tags
}

/// Whether a module matches a search query.
///
/// Case-insensitive substring match against name, path and the
/// server-supplied tags. An empty query matches everything.
pub fn matches(module: &Module, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {}",
        module.name,
        module.path,
        module.server_tags().join(" ")
    )
    .to_lowercase();
    haystack.contains(&query.to_lowercase())
}

/// The subsequence of `modules` matching `query`, order preserved.
pub fn filter<'a, I>(modules: I, query: &str) -> Vec<Module>
where
    I: IntoIterator<Item = &'a Module>,
{
    modules
        .into_iter()
        .filter(|m| matches(m, query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_tags_in_rule_order() {
        assert_eq!(derive_tags("camera_a"), vec!["camera"]);
        assert_eq!(derive_tags("arduino_serial"), vec!["hardware"]);
        assert_eq!(derive_tags("vision_bridge"), vec!["camera"]);
        assert_eq!(derive_tags("speech_diag"), vec!["audio", "ops"]);
        assert_eq!(derive_tags("scheduler"), vec!["core"]);
    }

    #[test]
    fn test_derive_tags_ignores_case() {
        assert_eq!(derive_tags("NeoPixel"), vec!["led"]);
    }

    #[test]
    fn test_matches_path_and_tags() {
        let module = Module::new("ota", "modules/ota/config/config.yml").with_tags(["Updates"]);
        assert!(matches(&module, "OTA"));
        assert!(matches(&module, "config.yml"));
        assert!(matches(&module, "updates"));
        assert!(!matches(&module, "camera"));
    }
}
