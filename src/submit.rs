use std::fmt;
use std::io::{self, Read};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::compose::{ComposedCommand, ScriptInput};
use crate::error::SubmitError;

/// Scheduler-assigned job identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse the first line printed by the submission command
///
/// `sbatch --parsable` may print `id;cluster` and qsub prints `id.server`, only the numeric id
/// is kept. Anything else means the scheduler broke its output contract.
pub fn parse_job_id(line: &str) -> Result<JobId, SubmitError> {
    let line = line.trim();
    let id = line.split([';', '.']).next().unwrap_or_default();
    id.parse::<u64>()
        .map(JobId)
        .map_err(|_| SubmitError::MalformedJobId(line.to_string()))
}

/// Runs a composed submission command, one process per call and no retries
///
/// Waits for the submission command to exit however long that takes.
pub struct SubmissionExecutor;

impl SubmissionExecutor {
    /// Run `command`, feeding `script` on stdin when the command reads the script from there
    ///
    /// Any output on stderr is a rejected submission, whatever was printed on stdout.
    pub fn submit<R: Read>(&self, command: &ComposedCommand, mut script: R) -> Result<JobId> {
        let mut sh = Command::new("sh");
        let cmd = sh.arg("-c")
            .arg(&command.command)
            .envs(command.env.iter().map(|(name, value)| (name, value)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        info!("Running submission process");
        info!("{:?}", &cmd);
        let mut child = cmd.spawn()
            .with_context(|| format!("Failed to run `{}`", command.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            if command.input == ScriptInput::Stdin {
                match io::copy(&mut script, &mut stdin) {
                    Ok(n) => debug!("Wrote {n} bytes of job script"),
                    Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                        warn!("Submission process stopped reading the job script")
                    }
                    Err(err) => return Err(err).context("Can't write job script to submission process"),
                }
            }
            // dropping stdin closes the pipe
        }

        let output = child.wait_with_output().context("Submission process failed")?;
        let error = String::from_utf8_lossy(&output.stderr);
        if !error.is_empty() {
            return Err(SubmitError::SubmissionRejected(error.into_owned()).into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let job_id = parse_job_id(stdout.lines().next().unwrap_or_default())?;
        info!("Scheduler job id: {job_id}");
        Ok(job_id)
    }
}
