//! Subdomain takeover checks: a fingerprint tool and a DNS probe run side by side,
//! and their findings are correlated into one record per input subdomain.

use once_cell::sync::Lazy;
use recon_core::{run_all_bounded, strip_scheme, Findings, ToolCommand, ToolError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// `subdomain -> cname [status] body`
static FINGERPRINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s+->\s+(\S+)\s+\[(\d{3})\]\s*(.*?)\s*$").expect("valid regex"));

/// Markers that make a DNS probe line a positive match.
pub const DNS_MARKERS: &[&str] = &["Possible Takeover", "Vulnerable"];

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintHit {
    pub subdomain: String,
    pub cname: String,
    pub status: u16,
    pub body: String,
}

/// Takeover assessment of one input subdomain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TakeoverRecord {
    pub subdomain: String,
    pub cname: Option<String>,
    pub status: Option<u16>,
    pub snippet: Option<String>,
    pub tool_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TakeoverOptions {
    /// Reads the subdomain list from `{input}` and prints fingerprint matches.
    pub fingerprint: ToolCommand,
    /// Reads the subdomain list from `{input}` and prints free-text findings.
    pub dns: ToolCommand,
    pub concurrency: usize,
}

impl Default for TakeoverOptions {
    fn default() -> Self {
        TakeoverOptions {
            fingerprint: ToolCommand::new(
                "subjack",
                &["-w", "{input}", "-t", "100", "-timeout", "30", "-ssl", "-c", "/etc/subjack/fingerprints.json", "-v"],
            ),
            dns: ToolCommand::new("baddns", &["-i", "{input}", "-t", "100"]),
            concurrency: 2,
        }
    }
}

pub fn parse_fingerprint_line(line: &str) -> Result<FingerprintHit, ToolError> {
    let caps = FINGERPRINT
        .captures(line)
        .ok_or_else(|| ToolError::Parse { family: "fingerprint", line: line.to_string() })?;
    let status = caps[3]
        .parse()
        .map_err(|_| ToolError::Parse { family: "fingerprint", line: line.to_string() })?;
    Ok(FingerprintHit {
        subdomain: strip_scheme(&caps[1]).to_string(),
        cname: caps[2].to_string(),
        status,
        body: caps[4].to_string(),
    })
}

/// Index fingerprint output by cleaned subdomain. The first hit per subdomain wins;
/// lines that do not match the fixed pattern are skipped.
pub fn fingerprint_hits<S: AsRef<str>>(lines: &[S]) -> HashMap<String, FingerprintHit> {
    let mut hits = HashMap::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match parse_fingerprint_line(line) {
            Ok(hit) => {
                hits.entry(hit.subdomain.clone()).or_insert(hit);
            }
            Err(e) => debug!(error = %e, "skipping fingerprint line"),
        }
    }
    hits
}

/// Subdomains named by a DNS probe line that also carries one of [`DNS_MARKERS`].
pub fn dns_hits<S: AsRef<str>, T: AsRef<str>>(lines: &[S], subdomains: &[T]) -> HashSet<String> {
    let flagged: Vec<&str> = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| DNS_MARKERS.iter().any(|m| l.contains(m)))
        .collect();
    subdomains
        .iter()
        .map(|s| strip_scheme(s.as_ref()))
        .filter(|s| !s.is_empty() && flagged.iter().any(|l| l.contains(s)))
        .map(str::to_string)
        .collect()
}

/// One record per input subdomain, in input order.
pub fn correlate<S: AsRef<str>>(
    subdomains: &[S],
    fingerprint_hits: &HashMap<String, FingerprintHit>,
    dns_hits: &HashSet<String>,
) -> Vec<TakeoverRecord> {
    subdomains
        .iter()
        .map(|s| {
            let sub = strip_scheme(s.as_ref());
            let hit = fingerprint_hits.get(sub);
            TakeoverRecord {
                subdomain: sub.to_string(),
                cname: hit.map(|h| h.cname.clone()),
                status: hit.map(|h| h.status),
                snippet: hit.and_then(|h| snippet(&h.body)),
                tool_detected: hit.is_some() || dns_hits.contains(sub),
            }
        })
        .collect()
}

fn snippet(body: &str) -> Option<String> {
    let t = body.trim();
    if t.is_empty() {
        return None;
    }
    Some(t.chars().take(SNIPPET_CHARS).collect())
}

/// Subdomain list handed to the takeover tools. Written and closed before any tool
/// starts; removed on drop.
struct InputList {
    path: PathBuf,
}

impl InputList {
    async fn write(entries: &[&str]) -> Result<Self, ToolError> {
        let path = std::env::temp_dir().join(format!("recon-takeover-{}.txt", Uuid::now_v7()));
        let mut contents = entries.join("\n");
        contents.push('\n');
        tokio::fs::write(&path, contents).await.map_err(|e| ToolError::InvalidTask {
            tool: "takeover".into(),
            reason: format!("cannot write {}: {}", path.display(), e),
        })?;
        Ok(InputList { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InputList {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Run both takeover tools over `subdomains` and correlate their findings.
/// An empty list yields no records and starts no tools.
pub async fn check_takeover<S: AsRef<str>>(subdomains: &[S], opts: &TakeoverOptions) -> Result<Findings<Vec<TakeoverRecord>>, ToolError> {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = subdomains
        .iter()
        .map(|s| strip_scheme(s.as_ref()))
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .collect();
    if unique.is_empty() {
        return Ok(Findings::new(correlate(subdomains, &HashMap::new(), &HashSet::new())));
    }

    let input = InputList::write(&unique).await?;
    let path = input.path().to_string_lossy().to_string();
    let vars = [("input", path.as_str())];
    let specs = vec![opts.fingerprint.to_task(&vars), opts.dns.to_task(&vars)];
    let report = run_all_bounded(specs, opts.concurrency).await;
    drop(input);
    if report.all_failed() {
        return Err(ToolError::AllToolsFailed(report.failures));
    }

    let fp = fingerprint_hits(report.lines_of(0));
    let dns = dns_hits(report.lines_of(1), &unique);
    let records = correlate(subdomains, &fp, &dns);
    let flagged = records.iter().filter(|r| r.tool_detected).count();
    info!(subdomains = records.len(), fingerprint = fp.len(), dns = dns.len(), flagged, "takeover correlation done");
    Ok(Findings { results: records, failures: report.failures })
}
