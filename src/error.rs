use std::path::PathBuf;

/// Failures that end a run with a specific exit status
///
/// Calling automation branches on the exit status, so each kind keeps its own code. Anything
/// not listed here (I/O, template rendering, SMTP) exits with [`SubmitError::OTHER`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("scheduler rejected the submission: {0}")]
    SubmissionRejected(String),

    #[error("file `{}' does not exist", .0.display())]
    FileArraySourceMissing(PathBuf),

    #[error("missing script name, use --help for help")]
    MissingScriptArgument,

    #[error("script `{name}' not found either in current directory or in script library (script library: {library:?})")]
    ScriptNotFound { name: String, library: Vec<PathBuf> },

    #[error("scheduler returned `{0}' instead of a job id")]
    MalformedJobId(String),
}

impl SubmitError {
    /// Exit status for errors outside the taxonomy
    pub const OTHER: u8 = 6;
    /// Exit status for command line syntax errors
    pub const SYNTAX: u8 = 4;

    pub fn exit_code(&self) -> u8 {
        match self {
            SubmitError::SubmissionRejected(_) => 2,
            SubmitError::FileArraySourceMissing(_) => 3,
            SubmitError::MissingScriptArgument => Self::SYNTAX,
            SubmitError::ScriptNotFound { .. } => 5,
            SubmitError::MalformedJobId(_) => Self::OTHER,
        }
    }
}
