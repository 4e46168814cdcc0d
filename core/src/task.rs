use crate::error::ToolError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One external tool invocation: program, ordered args, optional stdin payload,
/// timeout and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub timeout: Duration,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl TaskSpec {
    /// New task named after its program, with the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        TaskSpec {
            name: program.clone(),
            program,
            args: Vec::new(),
            stdin: None,
            timeout: DEFAULT_TIMEOUT,
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    pub fn timeout(mut self, t: Duration) -> Self {
        self.timeout = t;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Check the invariants the runner relies on: a program to start and a positive timeout.
    pub fn validate(&self) -> Result<(), ToolError> {
        if self.program.trim().is_empty() {
            return Err(ToolError::InvalidTask { tool: self.name.clone(), reason: "empty command".into() });
        }
        if self.timeout.is_zero() {
            return Err(ToolError::InvalidTask { tool: self.name.clone(), reason: "timeout must be > 0".into() });
        }
        Ok(())
    }

    /// Command line as a single string, for logs.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Outcome of one task. When `error` is set, `lines` must not be treated as valid data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub name: String,
    pub lines: Vec<String>,
    pub stderr: String,
    pub status: Option<i32>,
    pub error: Option<ToolError>,
    pub duration_ms: u128,
}

impl TaskResult {
    pub(crate) fn failed(name: &str, error: ToolError) -> Self {
        TaskResult {
            name: name.to_string(),
            lines: Vec::new(),
            stderr: String::new(),
            status: None,
            error: Some(error),
            duration_ms: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Output lines when the task succeeded, otherwise the error.
    pub fn into_lines(self) -> Result<Vec<String>, ToolError> {
        match self.error {
            None => Ok(self.lines),
            Some(e) => Err(e),
        }
    }
}
