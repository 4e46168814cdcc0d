//! Rendering of run reports as text, JSON, JSONL or CSV.

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use recon_core::{Findings, TaskFailure, ToolError};
use serde::Serialize;
use std::fs::File;
use std::future::Future;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat { Text, Json, Jsonl }

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format: text, json, or jsonl
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Output file (overwrites). Stdout if omitted.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Write CSV instead of text/json when --out is provided
    #[arg(long, default_value_t = false)]
    pub csv: bool,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

#[derive(Debug, Serialize)]
pub struct ToolErrorView {
    pub index: usize,
    pub tool: String,
    pub kind: &'static str,
    pub message: String,
}

impl From<&TaskFailure> for ToolErrorView {
    fn from(f: &TaskFailure) -> Self {
        ToolErrorView { index: f.index, tool: f.name.clone(), kind: f.error.kind(), message: f.error.to_string() }
    }
}

/// Envelope around one operation's results.
#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub target: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u128,
    pub results: T,
    pub tool_errors: Vec<ToolErrorView>,
}

/// Block on one async operation and wrap its findings with timing.
pub fn run_timed<T, F>(target: &str, fut: F) -> Result<Report<T>>
where
    F: Future<Output = Result<Findings<T>, ToolError>>,
{
    let started_at = now_rfc3339();
    let start = Instant::now();
    let rt = tokio::runtime::Runtime::new()?;
    let findings = rt.block_on(fut)?;
    Ok(Report {
        target: target.to_string(),
        started_at,
        ended_at: now_rfc3339(),
        duration_ms: start.elapsed().as_millis(),
        tool_errors: findings.failures.iter().map(ToolErrorView::from).collect(),
        results: findings.results,
    })
}

fn sink(out: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(p) => Box::new(BufWriter::new(File::create(p)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn warn_failures(errors: &[ToolErrorView]) {
    for e in errors {
        eprintln!("[!] {} failed ({}): {}", e.tool, e.kind, e.message);
    }
}

/// Emit a list of records; `text` renders one record as a text line.
pub fn emit_list<I: Serialize>(report: &Report<Vec<I>>, args: &OutputArgs, text: impl Fn(&I) -> String) -> Result<()> {
    if args.csv {
        let path = args.out.as_ref().ok_or_else(|| anyhow!("--csv requires --out <file>"))?;
        let mut wtr = csv::Writer::from_path(path)?;
        for item in &report.results {
            wtr.serialize(item)?;
        }
        wtr.flush()?;
        warn_failures(&report.tool_errors);
        return Ok(());
    }
    let mut w = sink(&args.out)?;
    match args.format {
        OutputFormat::Text => {
            for item in &report.results {
                writeln!(w, "{}", text(item))?;
            }
            warn_failures(&report.tool_errors);
        }
        OutputFormat::Json => writeln!(w, "{}", serde_json::to_string_pretty(report)?)?,
        OutputFormat::Jsonl => {
            for item in &report.results {
                writeln!(w, "{}", serde_json::to_string(item)?)?;
            }
            for e in &report.tool_errors {
                writeln!(w, "{}", serde_json::json!({ "tool_error": e }))?;
            }
        }
    }
    w.flush()?;
    Ok(())
}

#[cfg(feature = "params")]
pub fn emit_params(report: &Report<web_surface::ParameterIndex>, args: &OutputArgs) -> Result<()> {
    if args.csv {
        return Err(anyhow!("--csv is not supported for parameter discovery"));
    }
    let mut w = sink(&args.out)?;
    match args.format {
        OutputFormat::Text => {
            for name in &report.results.names {
                writeln!(w, "{}\t{}", name, report.results.urls_for(name).len())?;
            }
            warn_failures(&report.tool_errors);
        }
        OutputFormat::Json => writeln!(w, "{}", serde_json::to_string_pretty(report)?)?,
        OutputFormat::Jsonl => {
            for (name, urls) in &report.results.index {
                writeln!(w, "{}", serde_json::json!({ "param": name, "urls": urls }))?;
            }
            for e in &report.tool_errors {
                writeln!(w, "{}", serde_json::json!({ "tool_error": e }))?;
            }
        }
    }
    w.flush()?;
    Ok(())
}
