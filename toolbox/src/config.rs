use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Per-module tool lineups and limits. Every section is optional; missing
/// sections and fields fall back to the module defaults.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[cfg(feature = "subdomains")]
    pub subdomains: Option<host_discovery::HostDiscoveryOptions>,
    #[cfg(any(feature = "urls", feature = "params"))]
    pub urls: Option<web_surface::UrlCollectOptions>,
    #[cfg(any(feature = "urls", feature = "params"))]
    pub params: Option<web_surface::ParamOptions>,
    #[cfg(feature = "takeover")]
    pub takeover: Option<takeover::TakeoverOptions>,
    #[cfg(feature = "ports")]
    pub ports: Option<port_scan::PortScanOptions>,
}

/// Load the explicit config file, or `./recon.yaml` when present. A file that exists
/// but does not parse is an error.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("recon.yaml");
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let cfg = serde_yaml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}
