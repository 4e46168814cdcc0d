use recon_core::ToolError;
use url::Url;

/// A cleaned http(s) URL. The original string is kept verbatim; the parsed parts are
/// used for endpoint identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    raw: String,
    scheme: String,
    authority: String,
    path: String,
    query: Vec<(String, String)>,
}

impl NormalizedUrl {
    /// Parse an already trimmed, fragment-free line.
    pub fn parse(line: &str) -> Result<Self, ToolError> {
        let bad = || ToolError::Parse { family: "url", line: line.to_string() };
        if !(line.starts_with("http://") || line.starts_with("https://")) {
            return Err(bad());
        }
        let url = Url::parse(line).map_err(|_| bad())?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(bad)?;
        let authority = match url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };
        let query = line.split_once('?').map(|(_, q)| query_pairs(q)).unwrap_or_default();
        Ok(NormalizedUrl {
            raw: line.to_string(),
            scheme: url.scheme().to_string(),
            authority,
            path: url.path().to_string(),
            query,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host plus explicit non-default port.
    pub fn host(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query pairs in the order they appear, duplicates included.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// `scheme://host[:port]path`, query excluded.
    pub fn endpoint_key(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority, self.path)
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a raw query string on `&` and the first `=`. Values stay percent-encoded;
/// a key without `=` gets an empty value; empty segments and empty keys are skipped.
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.split('#').next().unwrap_or("");
    query
        .split('&')
        .filter(|seg| !seg.is_empty())
        .filter_map(|seg| {
            let (k, v) = seg.split_once('=').unwrap_or((seg, ""));
            if k.is_empty() {
                None
            } else {
                Some((k.to_string(), v.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_and_key() {
        let u = NormalizedUrl::parse("https://Example.com:8443/a/b?x=1&y=2").unwrap();
        assert_eq!(u.scheme(), "https");
        assert_eq!(u.host(), "example.com:8443");
        assert_eq!(u.path(), "/a/b");
        assert_eq!(u.endpoint_key(), "https://example.com:8443/a/b");
        assert_eq!(u.query(), &[("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())]);
        assert_eq!(u.as_str(), "https://Example.com:8443/a/b?x=1&y=2");
    }

    #[test]
    fn default_port_and_empty_path() {
        let u = NormalizedUrl::parse("http://a.com:80?id=1").unwrap();
        assert_eq!(u.endpoint_key(), "http://a.com/");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(NormalizedUrl::parse("ftp://a.com/x").is_err());
        assert!(NormalizedUrl::parse("a.com/x").is_err());
        assert!(matches!(NormalizedUrl::parse("http://"), Err(ToolError::Parse { family: "url", .. })));
    }

    #[test]
    fn query_pairs_edge_cases() {
        let pairs = query_pairs("a=1&&flag&=x&b=c=d");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("flag".to_string(), String::new()),
                ("b".to_string(), "c=d".to_string()),
            ]
        );
        assert!(query_pairs("").is_empty());
    }
}
