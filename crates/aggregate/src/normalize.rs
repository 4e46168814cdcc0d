//! Line cleaning for raw tool output, in URL mode or hostname mode.
//!
//! Both modes trim, cut everything from the first `#`, drop empties and deduplicate
//! while keeping first-seen order. The output is order-stable and normalizing it
//! again yields the same sequence.

use crate::endpoint::NormalizedUrl;
use std::collections::HashSet;
use tracing::debug;

/// Path suffixes treated as static assets and excluded in URL mode.
pub const STATIC_EXTENSIONS: &[&str] = &[".jpg", ".png", ".css", ".js", ".svg", ".woff", ".ttf", ".ico"];

fn clean(line: &str) -> Option<&str> {
    let t = line.trim();
    let t = match t.find('#') {
        Some(i) => &t[..i],
        None => t,
    };
    let t = t.trim();
    if t.is_empty() { None } else { Some(t) }
}

/// Case-insensitive check of a URL path (query excluded) against [`STATIC_EXTENSIONS`].
pub fn is_static_asset(path: &str) -> bool {
    let p = path.split('?').next().unwrap_or("").to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| p.ends_with(ext))
}

pub fn normalize_urls<I, S>(raw: I) -> Vec<NormalizedUrl>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut rejected = 0usize;
    for line in raw {
        let Some(t) = clean(line.as_ref()) else { continue };
        let url = match NormalizedUrl::parse(t) {
            Ok(u) => u,
            Err(_) => {
                rejected += 1;
                continue;
            }
        };
        if is_static_asset(url.path()) {
            continue;
        }
        if seen.insert(url.as_str().to_string()) {
            out.push(url);
        }
    }
    debug!(kept = out.len(), rejected, "normalized urls");
    out
}

pub fn normalize_hosts<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in raw {
        let Some(t) = clean(line.as_ref()) else { continue };
        if !t.chars().any(|c| !c.is_control() && !c.is_whitespace()) {
            continue;
        }
        if seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    debug!(kept = out.len(), "normalized hosts");
    out
}
