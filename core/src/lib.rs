//! Core process orchestration shared by every recon module: task descriptions,
//! the process runner, the concurrent fan-out scheduler and the error taxonomy.

pub mod error;
pub mod fanout;
pub mod runner;
pub mod task;
pub mod tool;

pub use error::{TaskFailure, ToolError};
pub use fanout::{run_all, run_all_bounded, FanOutReport, Findings};
pub use runner::run;
pub use task::{TaskResult, TaskSpec};
pub use tool::ToolCommand;

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Domain or host a recon run is aimed at, with any URL scheme and trailing slash removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(pub String);

impl Target {
    pub fn parse(s: &str) -> Result<Self, ToolError> {
        let cleaned = strip_scheme(s).trim_end_matches('/');
        if cleaned.is_empty() {
            return Err(ToolError::EmptyInput("target domain is empty".into()));
        }
        Ok(Target(cleaned.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim a host entry and drop a leading `http://` or `https://`.
pub fn strip_scheme(s: &str) -> &str {
    let t = s.trim();
    let t = t
        .strip_prefix("https://")
        .or_else(|| t.strip_prefix("http://"))
        .unwrap_or(t);
    t.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }

    #[test]
    fn target_strips_scheme_and_slash() {
        assert_eq!(Target::parse(" https://example.com/ ").unwrap().as_str(), "example.com");
        assert_eq!(Target::parse("http://a.example.com").unwrap().to_string(), "a.example.com");
    }

    #[test]
    fn empty_target_is_rejected() {
        assert!(matches!(Target::parse("  "), Err(ToolError::EmptyInput(_))));
        assert!(matches!(Target::parse("https://"), Err(ToolError::EmptyInput(_))));
    }
}
