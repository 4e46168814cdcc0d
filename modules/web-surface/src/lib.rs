//! Web attack surface from archive crawlers and parameter miners: templated URL
//! collection and parameter discovery.

use aggregate::{group, index, normalize_urls};
pub use aggregate::ParameterIndex;
use recon_core::{run_all_bounded, Findings, Target, ToolCommand, ToolError};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UrlCollectOptions {
    pub sources: Vec<ToolCommand>,
    /// Cap on templated URLs returned; 0 means no cap.
    pub max_results: usize,
    pub concurrency: usize,
}

impl Default for UrlCollectOptions {
    fn default() -> Self {
        UrlCollectOptions {
            sources: vec![
                ToolCommand::new("gau", &["{domain}"]),
                ToolCommand::new("waybackurls", &[]).with_stdin("{domain}\n"),
            ],
            max_results: 0,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParamOptions {
    pub sources: Vec<ToolCommand>,
    pub concurrency: usize,
}

impl Default for ParamOptions {
    fn default() -> Self {
        ParamOptions {
            sources: vec![ToolCommand::new("python3", &["/opt/ParamSpider/paramspider/main.py", "-d", "{domain}"])
                .named("paramspider")
                .with_cwd("/opt/ParamSpider")],
            concurrency: 4,
        }
    }
}

/// Gather archived URLs for `domain`, clean them and collapse them into one
/// templated URL per endpoint.
pub async fn collect_urls(domain: &str, max_results: usize, opts: &UrlCollectOptions) -> Result<Findings<Vec<String>>, ToolError> {
    let target = Target::parse(domain)?;
    let specs = opts.sources.iter().map(|c| c.to_task(&[("domain", target.as_str())])).collect();
    let merged = run_all_bounded(specs, opts.concurrency).await.into_findings()?;
    let raw = merged.results.len();
    let normalized = normalize_urls(&merged.results);
    let mut templated = group(&normalized);
    if max_results > 0 {
        templated.truncate(max_results);
    }
    info!(domain = %target, raw, unique = normalized.len(), templated = templated.len(), "urls collected");
    Ok(Findings { results: templated, failures: merged.failures })
}

/// Run the parameter miners for `domain` and index every query parameter they saw.
pub async fn discover_parameters(domain: &str, opts: &ParamOptions) -> Result<Findings<ParameterIndex>, ToolError> {
    let target = Target::parse(domain)?;
    let specs = opts.sources.iter().map(|c| c.to_task(&[("domain", target.as_str())])).collect();
    let merged = run_all_bounded(specs, opts.concurrency).await.into_findings()?;
    let urls = normalize_urls(merged.results.iter().filter(|l| l.contains('?')));
    let idx = index(urls.iter().map(|u| u.as_str()));
    info!(domain = %target, urls = urls.len(), params = idx.names.len(), "parameters indexed");
    Ok(Findings { results: idx, failures: merged.failures })
}
