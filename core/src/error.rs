use thiserror::Error;

/// Everything that can go wrong while driving an external tool or a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The executable could not be located or started.
    #[error("{tool} unavailable: {reason}")]
    Unavailable { tool: String, reason: String },
    #[error("{tool} timed out after {} and was killed", timeout_label(.millis))]
    Timeout { tool: String, millis: u64 },
    #[error("{tool} exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit { tool: String, code: Option<i32>, stderr: String },
    #[error("unparseable {family} line: {line}")]
    Parse { family: &'static str, line: String },
    /// A stage received nothing to work on.
    #[error("empty input: {0}")]
    EmptyInput(String),
    #[error("invalid task {tool}: {reason}")]
    InvalidTask { tool: String, reason: String },
    /// The worker running a task went away without reporting a result.
    #[error("{tool} aborted before reporting")]
    Aborted { tool: String },
    /// No contributing tool produced usable output.
    #[error("every tool failed: {}", summarize(.0))]
    AllToolsFailed(Vec<TaskFailure>),
}

/// One failed task from a fan-out run, identified by its position and tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub index: usize,
    pub name: String,
    pub error: ToolError,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.index, self.name, self.error)
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

fn timeout_label(millis: &u64) -> String {
    if *millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

fn summarize(failures: &[TaskFailure]) -> String {
    if failures.is_empty() {
        return "no tools configured".to_string();
    }
    failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
}

impl ToolError {
    /// Short machine-friendly kind label, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Unavailable { .. } => "tool_unavailable",
            ToolError::Timeout { .. } => "tool_timeout",
            ToolError::NonZeroExit { .. } => "tool_nonzero_exit",
            ToolError::Parse { .. } => "parse_error",
            ToolError::EmptyInput(_) => "empty_input",
            ToolError::InvalidTask { .. } => "invalid_task",
            ToolError::Aborted { .. } => "aborted",
            ToolError::AllToolsFailed(_) => "all_tools_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = ToolError::NonZeroExit { tool: "gau".into(), code: Some(2), stderr: "boom".into() };
        assert_eq!(e.to_string(), "gau exited with status 2: boom");
        let e = ToolError::NonZeroExit { tool: "gau".into(), code: None, stderr: String::new() };
        assert_eq!(e.to_string(), "gau exited with a signal: ");
    }

    #[test]
    fn timeouts_keep_sub_second_precision() {
        let e = ToolError::Timeout { tool: "httpx".into(), millis: 300 };
        assert_eq!(e.to_string(), "httpx timed out after 300ms and was killed");
        let e = ToolError::Timeout { tool: "httpx".into(), millis: 600_000 };
        assert_eq!(e.to_string(), "httpx timed out after 600s and was killed");
    }

    #[test]
    fn aggregate_lists_every_failure() {
        let e = ToolError::AllToolsFailed(vec![
            TaskFailure { index: 0, name: "a".into(), error: ToolError::Timeout { tool: "a".into(), millis: 1000 } },
            TaskFailure { index: 1, name: "b".into(), error: ToolError::Aborted { tool: "b".into() } },
        ]);
        let s = e.to_string();
        assert!(s.contains("[0] a: a timed out"));
        assert!(s.contains("[1] b: b aborted"));
        assert_eq!(e.kind(), "all_tools_failed");
    }
}
