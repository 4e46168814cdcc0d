//! Subdomain enumeration fan-out followed by a liveness probe over the merged host list.

use aggregate::normalize_hosts;
use once_cell::sync::Lazy;
use recon_core::{run, run_all_bounded, strip_scheme, Findings, Target, ToolCommand, ToolError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

static ANSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"));
static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").expect("valid regex"));

/// A probe-confirmed reachable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveHost {
    pub url: String,
    /// Last status of the redirect chain, always within 100..=599 when present.
    pub status: Option<u16>,
    pub final_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostDiscoveryOptions {
    pub enumerators: Vec<ToolCommand>,
    pub probe: ToolCommand,
    pub concurrency: usize,
}

impl Default for HostDiscoveryOptions {
    fn default() -> Self {
        HostDiscoveryOptions {
            enumerators: vec![
                ToolCommand::new("subfinder", &["-d", "{domain}", "-silent"]),
                ToolCommand::new("cero", &["{domain}"]),
                ToolCommand::new("shosubgo", &["-d", "{domain}"]),
            ],
            probe: ToolCommand::new("httpx", &["-silent", "-status-code", "-follow-redirects", "-location", "-no-color"])
                .with_timeout_secs(600),
            concurrency: 8,
        }
    }
}

/// Parse one probe line of the shape `<url> [<status>] [<location>] ...`.
/// Lines that do not start with an http(s) URL yield `None`.
pub fn parse_probe_line(line: &str) -> Option<LiveHost> {
    let clean = ANSI.replace_all(line.trim(), "");
    let mut parts = clean.splitn(2, char::is_whitespace);
    let url = parts.next()?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return None;
    }
    let rest = parts.next().unwrap_or("");
    let mut status = None;
    let mut final_url = None;
    for cap in BRACKETS.captures_iter(rest) {
        let inner = cap[1].trim();
        if status.is_none() {
            if let Some(code) = parse_status_chain(inner) {
                status = Some(code);
                continue;
            }
        }
        if final_url.is_none() && (inner.starts_with("http://") || inner.starts_with("https://")) {
            final_url = Some(inner.to_string());
        }
    }
    Some(LiveHost { url: url.to_string(), status, final_url })
}

/// `200` or a redirect chain such as `301,302,200`; returns the last code.
fn parse_status_chain(s: &str) -> Option<u16> {
    let mut last = None;
    for part in s.split(',') {
        let part = part.trim();
        if part.len() != 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let code: u16 = part.parse().ok()?;
        if !(100..=599).contains(&code) {
            return None;
        }
        last = Some(code);
    }
    last
}

/// Pipe hosts or URLs into the probe and keep the confirmed-live ones.
/// Empty input returns immediately without starting the probe.
pub async fn probe<S: AsRef<str>>(hosts_or_urls: &[S], probe: &ToolCommand) -> Result<Vec<LiveHost>, ToolError> {
    let entries: Vec<&str> = hosts_or_urls.iter().map(|h| h.as_ref().trim()).filter(|h| !h.is_empty()).collect();
    if entries.is_empty() {
        debug!("probe skipped: no input");
        return Ok(Vec::new());
    }
    let mut payload = entries.join("\n");
    payload.push('\n');
    let task = probe.to_task(&[]).stdin(payload);
    let lines = run(task).await.into_lines()?;

    let mut seen = HashSet::new();
    let live: Vec<LiveHost> = lines
        .iter()
        .filter_map(|l| parse_probe_line(l))
        .filter(|h| seen.insert(h.url.clone()))
        .collect();
    info!(input = entries.len(), live = live.len(), "liveness probe done");
    Ok(live)
}

/// Enumerate subdomains of `domain` with every configured enumerator, merge and clean
/// their output, then probe the result for liveness.
pub async fn enumerate_hosts(domain: &str, opts: &HostDiscoveryOptions) -> Result<Findings<Vec<LiveHost>>, ToolError> {
    let target = Target::parse(domain)?;
    let specs = opts.enumerators.iter().map(|c| c.to_task(&[("domain", target.as_str())])).collect();
    let merged = run_all_bounded(specs, opts.concurrency).await.into_findings()?;
    let hosts: Vec<String> = normalize_hosts(merged.results.iter().map(|l| strip_scheme(l)));
    info!(domain = %target, subdomains = hosts.len(), "enumeration merged");
    let live = probe(&hosts, &opts.probe).await?;
    Ok(Findings { results: live, failures: merged.failures })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", &["-c", script]).with_timeout_secs(10)
    }

    fn echo_probe() -> ToolCommand {
        sh("while read h; do case $h in dead*) ;; *) echo \"https://$h [200]\";; esac; done; echo 'not a url line'")
    }

    #[test]
    fn parses_status_and_location() {
        let h = parse_probe_line("https://a.example.com [301,200] [https://www.example.com/] [nginx]").unwrap();
        assert_eq!(h.url, "https://a.example.com");
        assert_eq!(h.status, Some(200));
        assert_eq!(h.final_url.as_deref(), Some("https://www.example.com/"));
    }

    #[test]
    fn strips_color_codes() {
        let h = parse_probe_line("http://b.example.com \u{1b}[32m[404]\u{1b}[0m").unwrap();
        assert_eq!(h.status, Some(404));
        assert!(h.final_url.is_none());
    }

    #[test]
    fn rejects_non_url_lines_and_bad_codes() {
        assert!(parse_probe_line("[INF] Current httpx version").is_none());
        assert!(parse_probe_line("").is_none());
        let h = parse_probe_line("https://c.example.com [999] [20]").unwrap();
        assert_eq!(h.status, None);
        let bare = parse_probe_line("https://d.example.com").unwrap();
        assert_eq!(bare.status, None);
    }

    #[tokio::test]
    async fn empty_input_never_starts_the_probe() {
        let missing = ToolCommand::new("recon-no-such-probe-4f1c", &[]);
        let empty: [&str; 0] = [];
        assert_eq!(probe(&empty, &missing).await.unwrap(), Vec::new());
        assert_eq!(probe(&["  ", ""], &missing).await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn probe_reads_stdin_and_parses_output() {
        let live = probe(&["a.example.com", "dead.example.com", "b.example.com"], &echo_probe()).await.unwrap();
        let urls: Vec<&str> = live.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example.com", "https://b.example.com"]);
        assert!(live.iter().all(|h| h.status == Some(200)));
    }

    #[tokio::test]
    async fn probe_failure_is_reported() {
        let err = probe(&["a.example.com"], &sh("exit 4")).await.unwrap_err();
        assert!(matches!(err, ToolError::NonZeroExit { code: Some(4), .. }));
    }

    #[tokio::test]
    async fn enumeration_tolerates_a_missing_tool() {
        let opts = HostDiscoveryOptions {
            enumerators: vec![
                sh("echo api.{domain}; echo www.{domain}"),
                sh("echo www.{domain}; echo https://dead.{domain}"),
                ToolCommand::new("recon-no-such-enum-4f1c", &["{domain}"]),
            ],
            probe: echo_probe(),
            concurrency: 4,
        };
        let found = enumerate_hosts("example.com", &opts).await.unwrap();
        let mut urls: Vec<&str> = found.results.iter().map(|h| h.url.as_str()).collect();
        urls.sort();
        assert_eq!(urls, vec!["https://api.example.com", "https://www.example.com"]);
        assert_eq!(found.failures.len(), 1);
        assert_eq!(found.failures[0].name, "recon-no-such-enum-4f1c");
    }

    #[tokio::test]
    async fn every_enumerator_failing_is_an_error() {
        let opts = HostDiscoveryOptions {
            enumerators: vec![sh("exit 1"), ToolCommand::new("recon-no-such-enum-4f1c", &[])],
            probe: echo_probe(),
            concurrency: 2,
        };
        let err = enumerate_hosts("example.com", &opts).await.unwrap_err();
        assert!(matches!(err, ToolError::AllToolsFailed(ref f) if f.len() == 2));
    }

    #[tokio::test]
    async fn nothing_found_is_empty_not_an_error() {
        let opts = HostDiscoveryOptions {
            enumerators: vec![sh("true")],
            probe: ToolCommand::new("recon-no-such-probe-4f1c", &[]),
            concurrency: 1,
        };
        let found = enumerate_hosts("example.com", &opts).await.unwrap();
        assert!(found.results.is_empty());
        assert!(found.failures.is_empty());
    }

    #[tokio::test]
    async fn blank_domain_is_empty_input() {
        let err = enumerate_hosts(" ", &HostDiscoveryOptions::default()).await.unwrap_err();
        assert!(matches!(err, ToolError::EmptyInput(_)));
    }
}
