//! Open-port listing through an external scanner (nmap by default).

use recon_core::{run, Findings, Target, TaskFailure, ToolCommand, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenPort {
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PortScanOptions {
    pub scanner: ToolCommand,
    /// Port list such as `22,80,443` or `1-1024,8080`, passed to the scanner as `-p`.
    pub ports: Option<String>,
}

impl Default for PortScanOptions {
    fn default() -> Self {
        PortScanOptions {
            scanner: ToolCommand::new("nmap", &["{domain}", "-sS", "-sV", "-T4", "-Pn"]).with_timeout_secs(1800),
            ports: None,
        }
    }
}

fn bad_ports(part: &str) -> ToolError {
    ToolError::Parse { family: "ports", line: part.to_string() }
}

fn port_number(token: &str, part: &str) -> Result<u16, ToolError> {
    match token.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(bad_ports(part)),
        Ok(p) => Ok(p),
    }
}

/// Expand a scanner port selection (`22,80,443`, `1-1024,8080`) into a sorted, duplicate-free
/// list. Overlapping entries collapse; a zero port or reversed range is rejected.
pub fn parse_ports(selection: &str) -> Result<Vec<u16>, ToolError> {
    let mut ports = BTreeSet::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => (port_number(a, part)?, port_number(b, part)?),
            None => {
                let p = port_number(part, part)?;
                (p, p)
            }
        };
        if lo > hi {
            return Err(bad_ports(part));
        }
        ports.extend(lo..=hi);
    }
    if ports.is_empty() {
        return Err(ToolError::EmptyInput("port list is empty".into()));
    }
    Ok(ports.into_iter().collect())
}

/// Compact a sorted port list back into scanner syntax, folding runs into ranges.
pub fn format_ports(ports: &[u16]) -> String {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < ports.len() {
        let start = ports[i];
        let mut end = start;
        while i + 1 < ports.len() && ports[i + 1] == end.saturating_add(1) {
            i += 1;
            end = ports[i];
        }
        parts.push(if start == end { start.to_string() } else { format!("{}-{}", start, end) });
        i += 1;
    }
    parts.join(",")
}

/// Parse a scanner table row such as `443/tcp open ssl/http nginx 1.18.0`.
pub fn parse_scan_line(line: &str) -> Option<OpenPort> {
    let t = line.trim();
    if !(t.contains("/tcp") || t.contains("/udp")) || !t.contains("open") {
        return None;
    }
    let mut tokens = t.split_whitespace();
    let (port, protocol) = tokens.next()?.split_once('/')?;
    let port: u16 = port.parse().ok()?;
    if protocol != "tcp" && protocol != "udp" {
        return None;
    }
    let state = tokens.next()?;
    if !state.starts_with("open") {
        return None;
    }
    let service = tokens.next().map(str::to_string);
    let version = tokens.collect::<Vec<_>>().join(" ");
    Some(OpenPort {
        port,
        protocol: protocol.to_string(),
        state: state.to_string(),
        service,
        version: if version.is_empty() { None } else { Some(version) },
    })
}

pub async fn scan_ports(domain: &str, opts: &PortScanOptions) -> Result<Findings<Vec<OpenPort>>, ToolError> {
    let target = Target::parse(domain)?;
    let mut task = opts.scanner.to_task(&[("domain", target.as_str())]);
    if let Some(spec) = &opts.ports {
        task = task.arg("-p").arg(format_ports(&parse_ports(spec)?));
    }
    let name = task.name.clone();
    let lines = run(task).await.into_lines().map_err(|error| {
        ToolError::AllToolsFailed(vec![TaskFailure { index: 0, name, error }])
    })?;
    let open: Vec<OpenPort> = lines.iter().filter_map(|l| parse_scan_line(l)).collect();
    info!(domain = %target, open = open.len(), "port scan done");
    Ok(Findings::new(open))
}
