//! Compose the scheduler invocation for a submission
//!
//! Each scheduler backend implements [`Composer`]. Clause order is fixed and shared between
//! backends: job name, output files and array, comment, dependencies, queue, options from the
//! options file, options from the command line, and finally the script input. The two option
//! sources are always merged by [`CommandLine::options`] so the backends can't disagree about it.

use std::path::PathBuf;

use serde::Serialize;

use crate::request::submission::SubmissionRequest;

/// Slurm (`sbatch`), script piped on stdin
pub mod slurm;

/// PBS/Torque (`qsub`), script passed by path with arguments exported as variables
pub mod pbs;

/// Builds the scheduler invocation for a request, without side effects
pub trait Composer {
    fn compose(&self, request: &SubmissionRequest) -> ComposedCommand;
}

/// Where the submission process reads the job script from
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ScriptInput {
    /// Script body written to the process's stdin
    Stdin,
    /// Script named on the command line
    Path(PathBuf),
}

/// A complete scheduler invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComposedCommand {
    /// Shell command line, run with `sh -c`
    pub command: String,
    /// Environment variables set for the submission process
    pub env: Vec<(String, String)>,
    pub input: ScriptInput,
}

/// Space-separated clauses of a command line, built in order
pub struct CommandLine {
    clauses: Vec<String>,
}

impl CommandLine {
    pub fn new(base: &str) -> Self {
        CommandLine { clauses: vec![base.to_string()] }
    }

    pub fn push(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    /// Push `flag value` if the value is set
    pub fn push_opt(&mut self, flag: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(format!("{flag} {value}"));
        }
    }

    /// Options file content first, then each `-o` value in the order given
    pub fn options(&mut self, request: &SubmissionRequest) {
        if let Some(opts) = &request.file_options {
            self.push(opts.as_str());
        }
        for opts in &request.cmdline_options {
            self.push(opts.as_str());
        }
    }

    pub fn finish(self) -> String {
        self.clauses.join(" ")
    }
}

/// `afterok:<id>` for each dependency, comma-joined, or `None` when there are none
pub fn afterok(request: &SubmissionRequest) -> Option<String> {
    if request.after.is_empty() {
        return None;
    }
    let specs: Vec<String> = request.after.iter().map(|id| format!("afterok:{id}")).collect();
    Some(specs.join(","))
}

/// Quote a script argument for the shell if it contains whitespace
pub fn quote_arg(arg: &str) -> String {
    match arg.chars().any(char::is_whitespace) {
        true => double_quote(arg),
        false => arg.to_string()
    }
}

/// Wrap in double quotes, escaping the characters the shell still interprets inside them
pub fn double_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
