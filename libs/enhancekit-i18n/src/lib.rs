//! Language-keyed translation service with namespaced text keys.
//!
//! Design goals:
//! - Feature modules address text by its source-language (English) wording,
//!   optionally prefixed with organizational namespaces:
//!   `"chatCommands[.]spoiler"` means `chatCommands -> spoiler`.
//! - One active language per service, fixed at construction; tables for any
//!   number of languages can be registered up front.
//! - Lookups never panic and never leak a placeholder into UI text: a miss
//!   degrades to the source-language rendering of the key.
//!
//! Implementation details:
//! - Tables are nested JSON objects (namespace -> ... -> string), stored per
//!   language behind a `parking_lot::RwLock`.
//! - A raw key is parsed into a [`TextKey`] (ordered path segments) and the
//!   active table is walked segment by segment; the namespace separator is
//!   the literal substring `"[.]"`, chosen so keys can contain plain dots.
//!
//! Notes:
//! - Registering a table for a language that already has one replaces the
//!   whole table; there is no per-key mutation.
//! - For the source language the table is never consulted: namespaced keys
//!   collapse to their final segment, plain keys pass through unchanged.
//!   This is a documented rule, not a parsing accident.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::borrow::Cow;
use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Language whose strings double as text keys.
pub const SOURCE_LANGUAGE: &str = "en";

/// Literal separator between namespace segments inside a text key.
pub const NAMESPACE_SEPARATOR: &str = "[.]";

/// Parsed form of a text key: an ordered path of namespace segments ending
/// in the key proper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextKey<'a> {
    segments: Vec<&'a str>,
}

impl<'a> TextKey<'a> {
    /// Split `raw` on the namespace separator. A key without separators
    /// parses to a single segment.
    pub fn parse(raw: &'a str) -> Self {
        Self {
            segments: raw.split(NAMESPACE_SEPARATOR).collect(),
        }
    }

    /// The path segments, outermost namespace first.
    pub fn segments(&self) -> &[&'a str] {
        &self.segments
    }

    /// Final path segment — what the source-language UI renders.
    pub fn leaf(&self) -> &'a str {
        self.segments.last().copied().unwrap_or_default()
    }

    pub fn is_namespaced(&self) -> bool {
        self.segments.len() > 1
    }
}

/// Dictionary of per-language tables with one active language.
pub struct Translator {
    language: Box<str>,
    tables: RwLock<HashMap<String, Value>>,
}

impl Translator {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into().into_boxed_str(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// The active language identifier.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_source_language(&self) -> bool {
        *self.language == *SOURCE_LANGUAGE
    }

    /// Store or replace the whole nested table for `language`.
    pub fn add_translation(&self, language: impl Into<String>, table: Value) {
        self.tables.write().insert(language.into(), table);
    }

    /// Resolve `key` for the active language.
    ///
    /// Misses (unknown language, missing segment, non-string leaf) fall
    /// back to the source-language rendering of the key: the final segment
    /// for namespaced keys, the key itself otherwise.
    pub fn translate<'a>(&self, key: &'a str) -> Cow<'a, str> {
        let parsed = TextKey::parse(key);

        if self.is_source_language() {
            return Cow::Borrowed(parsed.leaf());
        }

        let tables = self.tables.read();
        match resolve(tables.get(&*self.language), parsed.segments()) {
            Some(text) => Cow::Owned(text.to_owned()),
            None => {
                tracing::debug!(
                    language = %self.language,
                    key,
                    "missing translation, falling back to source text"
                );
                Cow::Borrowed(parsed.leaf())
            }
        }
    }
}

/// Walk `segments` through a nested table down to a string leaf.
fn resolve<'v>(table: Option<&'v Value>, segments: &[&str]) -> Option<&'v str> {
    let mut node = table?;
    for segment in segments {
        node = node.get(segment)?;
    }
    node.as_str()
}
