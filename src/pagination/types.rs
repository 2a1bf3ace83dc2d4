//! Continuation and enumeration types

use crate::types::{JsonObject, JsonValue, QueryParams};
use std::collections::BTreeMap;

/// Top-level key of the modern continuation object
pub const MODERN_CONTINUE_KEY: &str = "continue";

/// Top-level key of the legacy continuation object
pub const LEGACY_CONTINUE_KEY: &str = "query-continue";

/// Untyped payload found under the result key for one round trip
pub type RawResultPage = JsonValue;

// ============================================================================
// Continuation Shape
// ============================================================================

/// Which continuation shape a response carries
///
/// The modern shape is checked first; the legacy shape is only consulted
/// when the modern one is absent, so both are never reported together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContinuationShape<'a> {
    /// Flat key/value object
    Modern(&'a JsonObject),
    /// Object whose properties (one per query module) hold key/value objects
    Legacy(&'a JsonObject),
    /// No continuation: pagination has ended
    Absent,
}

impl<'a> ContinuationShape<'a> {
    /// Detect the continuation shape of a response body
    pub fn detect(response: &'a JsonValue) -> Self {
        if let Some(JsonValue::Object(map)) = response.get(MODERN_CONTINUE_KEY) {
            return Self::Modern(map);
        }
        if let Some(JsonValue::Object(map)) = response.get(LEGACY_CONTINUE_KEY) {
            return Self::Legacy(map);
        }
        Self::Absent
    }

    /// Check if this is the absent shape
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

// ============================================================================
// Continuation Cursor
// ============================================================================

/// Immutable snapshot of pagination state
///
/// `is_empty()` means "no cursor" (never received, or the server sent none).
/// A cursor can be present yet carry no entries; it is then inert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuationCursor {
    entries: Option<BTreeMap<String, String>>,
}

impl ContinuationCursor {
    /// Cursor before any response has been seen
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a cursor from a detected shape
    pub fn from_shape(shape: ContinuationShape<'_>) -> Self {
        let entries = match shape {
            ContinuationShape::Absent => return Self::empty(),
            ContinuationShape::Modern(map) => collect_scalars(map),
            ContinuationShape::Legacy(modules) => {
                let mut merged = BTreeMap::new();
                for module in modules.values() {
                    if let JsonValue::Object(map) = module {
                        merged.extend(collect_scalars(map));
                    }
                }
                merged
            }
        };
        Self {
            entries: Some(entries),
        }
    }

    /// Detect and capture the continuation of a response body
    pub fn from_response(response: &JsonValue) -> Self {
        Self::from_shape(ContinuationShape::detect(response))
    }

    /// True if no continuation is present
    pub fn is_empty(&self) -> bool {
        self.entries.is_none()
    }

    /// True if a continuation is present but carries no entries
    pub fn is_inert(&self) -> bool {
        self.entries.as_ref().is_some_and(BTreeMap::is_empty)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, BTreeMap::len)
    }

    /// Look up one entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.as_ref()?.get(key).map(String::as_str)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Overwrite or insert every entry into `params`.
    ///
    /// Returns true if `params` changed.
    pub fn apply_to(&self, params: &mut QueryParams) -> bool {
        let mut changed = false;
        for (key, value) in self.iter() {
            if params.get(key).map(String::as_str) != Some(value) {
                params.insert(key.to_string(), value.to_string());
                changed = true;
            }
        }
        changed
    }
}

/// Scalar continuation values as request strings; nested values are skipped
fn collect_scalars(map: &JsonObject) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

// ============================================================================
// Enumeration
// ============================================================================

/// Outcome of one successful advance
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Next non-empty result payload
    Page(RawResultPage),
    /// No more pages
    End,
}

impl Advance {
    /// Check if this is the end
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Take the page, if any
    pub fn into_page(self) -> Option<RawResultPage> {
        match self {
            Self::Page(page) => Some(page),
            Self::End => None,
        }
    }
}

/// Enumerator lifecycle; `Ended` and `Faulted` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumeratorState {
    #[default]
    Running,
    Ended,
    Faulted,
}

impl EnumeratorState {
    /// True for `Ended` and `Faulted`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}
