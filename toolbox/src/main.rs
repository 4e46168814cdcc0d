use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod output;

use output::OutputArgs;

#[derive(Debug, Parser)]
#[command(name = "recon", version, about = "Recon tool orchestration: subdomains, URLs, parameters, takeovers")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./recon.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Enumerate subdomains with every configured tool and keep the live ones
    #[cfg(feature = "subdomains")]
    Subdomains {
        /// Target domain
        domain: String,
        /// Max enumerators running at once
        #[arg(long)]
        concurrency: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Collect archived URLs and group them into one templated URL per endpoint
    #[cfg(feature = "urls")]
    Urls {
        /// Target domain
        domain: String,
        /// Cap on templated URLs returned (0 = no cap)
        #[arg(long)]
        max_results: Option<usize>,
        /// Max sources running at once
        #[arg(long)]
        concurrency: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Discover query parameters and the URLs that carry them
    #[cfg(feature = "params")]
    Params {
        /// Target domain
        domain: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check subdomains for takeover indicators
    #[cfg(feature = "takeover")]
    Takeover {
        /// Subdomains (with or without scheme)
        #[arg(conflicts_with = "targets")]
        subdomains: Vec<String>,
        /// File with newline-delimited subdomains (comments with # and blanks ignored)
        #[arg(long, value_name = "FILE", conflicts_with = "subdomains")]
        targets: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List open ports with the configured scanner
    #[cfg(feature = "ports")]
    Ports {
        /// Target host
        domain: String,
        /// Ports: comma/range list (e.g., 22,80,443 or 1-1024,8080). Default: scanner's own.
        #[arg(long)]
        ports: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "takeover")]
fn read_targets(path: &std::path::Path) -> Result<Vec<String>> {
    let s = std::fs::read_to_string(path)?;
    Ok(s.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty() && !l.starts_with('#')).collect())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    match cli.command {
        Commands::Version => {
            println!("recon {} (core {})", env!("CARGO_PKG_VERSION"), recon_core::version());
        }
        #[cfg(feature = "subdomains")]
        Commands::Subdomains { domain, concurrency, output } => {
            let mut opts = cfg.subdomains.unwrap_or_default();
            if let Some(c) = concurrency { opts.concurrency = c; }
            let report = output::run_timed(&domain, host_discovery::enumerate_hosts(&domain, &opts))?;
            output::emit_list(&report, &output, |h| {
                let mut line = match h.status {
                    Some(s) => format!("{} [{}]", h.url, s),
                    None => h.url.clone(),
                };
                if let Some(f) = &h.final_url { line.push_str(&format!(" -> {}", f)); }
                line
            })?;
        }
        #[cfg(feature = "urls")]
        Commands::Urls { domain, max_results, concurrency, output } => {
            let mut opts = cfg.urls.unwrap_or_default();
            if let Some(c) = concurrency { opts.concurrency = c; }
            let max = max_results.unwrap_or(opts.max_results);
            let report = output::run_timed(&domain, web_surface::collect_urls(&domain, max, &opts))?;
            output::emit_list(&report, &output, |u| u.clone())?;
        }
        #[cfg(feature = "params")]
        Commands::Params { domain, output } => {
            let opts = cfg.params.unwrap_or_default();
            let report = output::run_timed(&domain, web_surface::discover_parameters(&domain, &opts))?;
            output::emit_params(&report, &output)?;
        }
        #[cfg(feature = "takeover")]
        Commands::Takeover { subdomains, targets, output } => {
            let list = match targets {
                Some(path) => read_targets(&path)?,
                None => subdomains,
            };
            let opts = cfg.takeover.unwrap_or_default();
            let label = format!("{} subdomains", list.len());
            let report = output::run_timed(&label, takeover::check_takeover(&list, &opts))?;
            output::emit_list(&report, &output, |r| {
                if !r.tool_detected {
                    return format!("{} ok", r.subdomain);
                }
                let mut line = format!("{} POSSIBLE TAKEOVER", r.subdomain);
                if let Some(c) = &r.cname { line.push_str(&format!(" cname={}", c)); }
                if let Some(s) = r.status { line.push_str(&format!(" [{}]", s)); }
                if let Some(b) = &r.snippet { line.push_str(&format!(" {}", b)); }
                line
            })?;
        }
        #[cfg(feature = "ports")]
        Commands::Ports { domain, ports, output } => {
            let mut opts = cfg.ports.unwrap_or_default();
            if ports.is_some() { opts.ports = ports; }
            let report = output::run_timed(&domain, port_scan::scan_ports(&domain, &opts))?;
            output::emit_list(&report, &output, |p| {
                let mut line = format!("{}/{} {}", p.port, p.protocol, p.state);
                if let Some(s) = &p.service { line.push_str(&format!(" {}", s)); }
                if let Some(v) = &p.version { line.push_str(&format!(" {}", v)); }
                line
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    #[cfg(feature = "takeover")]
    fn takeover_accepts_positional_subdomains() {
        let cli = Cli::try_parse_from(["recon", "takeover", "a.example.com", "https://b.example.com", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Takeover { subdomains, targets, output } => {
                assert_eq!(subdomains.len(), 2);
                assert!(targets.is_none());
                assert_eq!(output.format, output::OutputFormat::Json);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    #[cfg(feature = "urls")]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["recon", "urls", "example.com", "-vv", "--max-results", "10"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
