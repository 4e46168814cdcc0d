//! Reverse index from query parameter names to the URLs carrying them.

use crate::endpoint::query_pairs;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterIndex {
    pub names: BTreeSet<String>,
    /// Per name, URLs in first-seen order. The same URL fed twice is listed twice.
    pub index: IndexMap<String, Vec<String>>,
}

impl ParameterIndex {
    pub fn urls_for(&self, name: &str) -> &[String] {
        self.index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Names are taken literally from the query: `a%5B%5D` stays encoded, and keys with a
/// blank value or no `=` at all (`?flag`, `?x=`) are indexed like any other, unlike
/// decoding query parsers that drop them.
pub fn index<I, S>(urls: I) -> ParameterIndex
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = ParameterIndex::default();
    for url in urls {
        let url = url.as_ref();
        let Some((_, query)) = url.split_once('?') else { continue };
        let keys: IndexSet<String> = query_pairs(query).into_iter().map(|(k, _)| k).collect();
        for key in keys {
            out.names.insert(key.clone());
            out.index.entry(key).or_default().push(url.to_string());
        }
    }
    out
}
