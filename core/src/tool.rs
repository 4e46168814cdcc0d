//! Configurable external tool commands, turned into tasks per run.

use crate::task::TaskSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    300
}

/// How to invoke one external tool. `args` and `stdin` may contain placeholders such as
/// `{domain}` or `{input}`, filled in by [`ToolCommand::to_task`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolCommand {
    #[serde(default)]
    pub name: Option<String>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub stdin: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        ToolCommand {
            name: None,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: None,
            timeout_secs: default_timeout_secs(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_stdin(mut self, template: &str) -> Self {
        self.stdin = Some(template.to_string());
        self
    }

    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Display name: the explicit name, else the program.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.program)
    }

    /// Build a task, replacing every `{key}` in args and stdin with its value.
    pub fn to_task(&self, vars: &[(&str, &str)]) -> TaskSpec {
        let mut spec = TaskSpec::new(substitute(&self.program, vars))
            .named(self.label())
            .args(self.args.iter().map(|a| substitute(a, vars)))
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(s) = &self.stdin {
            spec = spec.stdin(substitute(s, vars));
        }
        for (k, v) in &self.env {
            spec = spec.env(k, substitute(v, vars));
        }
        if let Some(dir) = &self.cwd {
            spec = spec.cwd(dir);
        }
        spec
    }
}

fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled() {
        let cmd = ToolCommand::new("subfinder", &["-d", "{domain}", "-silent"]);
        let task = cmd.to_task(&[("domain", "example.com")]);
        assert_eq!(task.name, "subfinder");
        assert_eq!(task.args, vec!["-d", "example.com", "-silent"]);
        assert_eq!(task.timeout, Duration::from_secs(300));
        assert!(task.stdin.is_none());
    }

    #[test]
    fn stdin_template_and_name() {
        let cmd = ToolCommand::new("waybackurls", &[]).named("wayback").with_stdin("{domain}\n").with_timeout_secs(5);
        let task = cmd.to_task(&[("domain", "a.com")]);
        assert_eq!(task.name, "wayback");
        assert_eq!(task.stdin.as_deref(), Some("a.com\n"));
        assert_eq!(task.timeout, Duration::from_secs(5));
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let task = ToolCommand::new("x", &["{other}"]).to_task(&[("domain", "a.com")]);
        assert_eq!(task.args, vec!["{other}"]);
    }
}
