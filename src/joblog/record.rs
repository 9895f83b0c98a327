use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{info, warn};

use crate::joblog::lock::FileLock;
use crate::submit::JobId;

/// One line of the submission log
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub timestamp: DateTime<Local>,
    pub job_id: JobId,
    pub user: String,
    /// File name of the submitted script
    pub script: String,
    pub cwd: PathBuf,
}

impl JobRecord {
    /// Record for a job submitted just now by the current user from the current directory
    pub fn now(job_id: JobId, script: &Path) -> JobRecord {
        JobRecord {
            timestamp: Local::now(),
            job_id,
            user: current_user(),
            script: script.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            cwd: env::current_dir().unwrap_or_default(),
        }
    }

    /// Tab-separated line: timestamp, job id, user, script, directory
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\n",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f"),
            self.job_id,
            self.user,
            self.script,
            self.cwd.display()
        )
    }
}

/// Login name, looked up the same way as most Unix tools without touching the passwd database
fn current_user() -> String {
    ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Appends records to the shared log file
///
/// Several submissions may write at once, so each append holds an exclusive lock on the file.
/// Failing to write is never fatal: the job has already been submitted.
pub struct LogRecorder {
    pub path: PathBuf,
}

impl LogRecorder {
    pub fn new(path: PathBuf) -> Self {
        LogRecorder { path }
    }

    pub fn record(&self, record: &JobRecord) {
        match self.append(&record.to_line()) {
            Ok(_) => info!("Recorded job {} in {}", record.job_id, self.path.display()),
            Err(err) => warn!("log file `{}' does not exist or is not writable: {}", self.path.display(), err)
        }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let lock = FileLock::exclusive(&file)?;
        let mut writer = lock.file();
        writer.write_all(line.as_bytes())
    }
}
