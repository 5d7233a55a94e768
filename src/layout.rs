//! Panel ordering.
//!
//! Render order is built in three steps:
//! 1. modules named in the persisted layout, in that order, skipping names the
//!    registry does not know and repeats;
//! 2. every other registry module, in registry order;
//! 3. the whole sequence stably sorted by known raw-text length, smallest
//!    first, unknown lengths last.
//!
//! Ties in step 3 are broken by locale-aware name comparison. Since names are
//! unique, that comparison settles nearly every tie, so the manual order from
//! step 1 only survives among names that collate identically. This mirrors
//! the dashboard's long-standing behaviour: a drag persists, but sizes win.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::cache::LengthIndex;
use crate::models::Module;
use crate::store::{LocalRecords, StoreError};

const TURKISH_ALPHABET: &str = "abcçdefgğhıijklmnoöprsştuüvyz";

/// Locale-aware name comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collation {
    turkish: bool,
}

impl Collation {
    /// Collation for a locale tag such as `tr`, `tr-TR` or `en`.
    pub fn for_locale(locale: &str) -> Self {
        let language = locale.split(['-', '_']).next().unwrap_or_default();
        Self {
            turkish: language.eq_ignore_ascii_case("tr"),
        }
    }

    /// Letters first by alphabet, then lowercase before uppercase, then by
    /// code point so only identical names compare equal.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.primary_key(a)
            .cmp(&self.primary_key(b))
            .then_with(|| case_key(a).cmp(&case_key(b)))
            .then_with(|| a.cmp(b))
    }

    fn primary_key(&self, s: &str) -> Vec<u32> {
        s.chars()
            .flat_map(|c| self.fold(c))
            .map(|c| self.weight(c))
            .collect()
    }

    fn fold(&self, c: char) -> Vec<char> {
        match c {
            'I' if self.turkish => vec!['ı'],
            'İ' if self.turkish => vec!['i'],
            c => c.to_lowercase().collect(),
        }
    }

    fn weight(&self, c: char) -> u32 {
        if self.turkish {
            if let Some(pos) = TURKISH_ALPHABET.chars().position(|l| l == c) {
                return 0x1_0000 + pos as u32;
            }
        }
        if c.is_alphabetic() && !c.is_ascii() {
            // Non-ASCII letters after the ASCII range, in code point order.
            0x2_0000 + c as u32
        } else if c.is_ascii_alphabetic() && self.turkish {
            // q, w, x are outside the Turkish alphabet.
            0x1_0000 + TURKISH_ALPHABET.chars().count() as u32 + c as u32
        } else {
            c as u32
        }
    }
}

/// The dashboard orders names the Turkish way unless told otherwise.
pub const DEFAULT_LOCALE: &str = "tr";

impl Default for Collation {
    fn default() -> Self {
        Self::for_locale(DEFAULT_LOCALE)
    }
}

fn case_key(s: &str) -> Vec<bool> {
    s.chars().map(char::is_uppercase).collect()
}

/// Compute the render order of `modules`. Every module appears exactly once.
pub fn compute_order(
    modules: &[Module],
    persisted: &[String],
    lengths: &LengthIndex,
    collation: &Collation,
) -> Vec<Module> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(modules.len());
    let mut ordered: Vec<Module> = Vec::with_capacity(modules.len());

    for name in persisted {
        if seen.contains(name.as_str()) {
            continue;
        }
        if let Some(module) = modules.iter().find(|m| &m.name == name) {
            seen.insert(module.name.as_str());
            ordered.push(module.clone());
        }
    }
    for module in modules {
        if seen.insert(module.name.as_str()) {
            ordered.push(module.clone());
        }
    }

    // sort_by is stable.
    ordered.sort_by(|a, b| {
        compare_lengths(lengths.get(&a.name), lengths.get(&b.name))
            .then_with(|| collation.compare(&a.name, &b.name))
    });
    ordered
}

fn compare_lengths(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Move `name` to `index` within the rendered sequence, as a drag-and-drop
/// would. Out-of-range indexes clamp to the end. Returns false when the name
/// is not rendered.
pub fn move_panel(rendered: &mut Vec<String>, name: &str, index: usize) -> bool {
    let Some(from) = rendered.iter().position(|n| n == name) else {
        return false;
    };
    let entry = rendered.remove(from);
    let to = index.min(rendered.len());
    rendered.insert(to, entry);
    true
}

/// Overwrite the persisted layout with the rendered sequence.
pub fn persist_order(records: &LocalRecords, rendered: &[String]) -> Result<(), StoreError> {
    tracing::debug!(panels = rendered.len(), "persisting layout");
    records.save_layout(rendered)
}
