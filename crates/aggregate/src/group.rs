//! Endpoint grouping: one templated URL per endpoint key.

use crate::endpoint::NormalizedUrl;
use indexmap::{IndexMap, IndexSet};

/// Every observed parameterization of one endpoint. Parameters keep the order they
/// were first seen in; values are deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointGroup {
    pub key: String,
    pub params: IndexMap<String, IndexSet<String>>,
}

impl EndpointGroup {
    fn new(key: String) -> Self {
        EndpointGroup { key, params: IndexMap::new() }
    }

    fn merge(&mut self, pairs: &[(String, String)]) {
        for (k, v) in pairs {
            self.params.entry(k.clone()).or_default().insert(v.clone());
        }
    }

    /// `base?k=v&k2={a,b}`: a single observed value renders literally, several render
    /// as a sorted brace template.
    pub fn render(&self) -> String {
        let parts: Vec<String> = self
            .params
            .iter()
            .map(|(k, values)| {
                if values.len() == 1 {
                    format!("{}={}", k, values.iter().next().map(String::as_str).unwrap_or(""))
                } else {
                    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
                    sorted.sort_unstable();
                    format!("{}={{{}}}", k, sorted.join(","))
                }
            })
            .collect();
        format!("{}?{}", self.key, parts.join("&"))
    }
}

/// Grouping result: parameterized endpoints plus bare (parameter-less) URLs.
/// A bare observation never merges into a parameterized group of the same endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    pub groups: Vec<EndpointGroup>,
    pub bare: Vec<String>,
}

pub fn group_endpoints(urls: &[NormalizedUrl]) -> Grouping {
    let mut groups: IndexMap<String, EndpointGroup> = IndexMap::new();
    let mut bare: IndexMap<String, String> = IndexMap::new();
    for u in urls {
        let key = u.endpoint_key();
        if u.query().is_empty() {
            bare.entry(key).or_insert_with(|| u.as_str().to_string());
            continue;
        }
        groups.entry(key.clone()).or_insert_with(|| EndpointGroup::new(key)).merge(u.query());
    }
    Grouping { groups: groups.into_values().collect(), bare: bare.into_values().collect() }
}

/// Templated URLs: parameterized endpoints first, in first-seen order, then bare URLs verbatim.
pub fn group(urls: &[NormalizedUrl]) -> Vec<String> {
    let grouping = group_endpoints(urls);
    let mut out: Vec<String> = grouping.groups.iter().map(EndpointGroup::render).collect();
    out.extend(grouping.bare);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_urls;

    #[test]
    fn merges_values_and_keeps_bare_endpoint_separate() {
        let urls = normalize_urls(["http://a.com/x?id=1", "http://a.com/x?id=2", "http://a.com/x", "http://a.com/y.png"]);
        assert_eq!(group(&urls), vec!["http://a.com/x?id={1,2}", "http://a.com/x"]);
    }

    #[test]
    fn single_value_renders_literally_and_params_keep_first_seen_order() {
        let urls = normalize_urls([
            "https://a.com/s?q=rust&page=2",
            "https://a.com/s?page=1&q=rust&lang=en",
            "https://a.com/s?page=10",
        ]);
        assert_eq!(group(&urls), vec!["https://a.com/s?q=rust&page={1,10,2}&lang=en"]);
    }

    #[test]
    fn one_entry_per_endpoint_key() {
        let urls = normalize_urls([
            "http://a.com/p?x=1",
            "http://b.com/p?x=1",
            "http://a.com/p?y=2",
            "http://a.com/q",
            "http://a.com/q",
            "http://a.com/p?x=1",
        ]);
        let g = group_endpoints(&urls);
        assert_eq!(g.groups.len(), 2);
        assert_eq!(g.groups[0].render(), "http://a.com/p?x=1&y=2");
        assert_eq!(g.groups[1].render(), "http://b.com/p?x=1");
        assert_eq!(g.bare, vec!["http://a.com/q"]);
    }

    #[test]
    fn empty_input() {
        assert!(group(&[]).is_empty());
    }
}
