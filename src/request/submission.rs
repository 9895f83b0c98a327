use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::error::SubmitError;
use crate::request::read::count_lines;

/// How each task of a file array sees its line of the array file
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FileArrayMode {
    /// The whole line, in `JOB_FILEARRAY_LINE`
    Line,
    /// The line split into the `JOB_FILEARRAY_ARGS` shell array
    Args,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileArray {
    pub path: PathBuf,
    pub mode: FileArrayMode,
}

/// Where and when to send a job-completion email
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notify {
    pub address: String,
    /// Also notify when the job succeeds
    pub always: bool,
}

/// Everything needed to decorate, compose and submit one job
///
/// Built once per invocation (or once per row of an argument file) and never mutated while the
/// submission is composed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionRequest {
    /// Script name exactly as given on the command line, used as the job name
    pub script: String,
    /// Script path found by the locator
    pub script_path: PathBuf,
    /// Positional arguments for the script, excluding the script name
    pub script_args: Vec<String>,
    /// Array specification, e.g. `0-15%4`
    pub array: Option<String>,
    pub file_array: Option<FileArray>,
    /// `afterok` dependencies in the order given, without duplicates or `0`
    pub after: Vec<String>,
    pub queue: Option<String>,
    pub comment: Option<String>,
    /// Options from the per-user options file
    pub file_options: Option<String>,
    /// Options from `-o` flags, already space-separated
    pub cmdline_options: Vec<String>,
    pub decorate: bool,
    pub done_file: Option<String>,
    pub notify: Option<Notify>,
    /// Prefix for job output files, including the trailing slash
    pub log_dir: Option<String>,
}

impl SubmissionRequest {
    pub fn new(script: &str, script_path: PathBuf, script_args: Vec<String>) -> Self {
        SubmissionRequest {
            script: script.to_string(),
            script_path,
            script_args,
            decorate: true,
            ..Default::default()
        }
    }

    /// Check the request can be composed into a command
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.script.is_empty() || self.script_path.as_os_str().is_empty() {
            return Err(SubmitError::MissingScriptArgument);
        }
        Ok(())
    }

    /// The command line the user typed after the submit options (script and arguments)
    pub fn command_line(&self) -> String {
        let mut words = vec![self.script.as_str()];
        words.extend(self.script_args.iter().map(String::as_str));
        words.join(" ")
    }

    /// File name part of the script as given, used to name job output files
    pub fn script_basename(&self) -> &str {
        Path::new(&self.script)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.script)
    }

    /// Copy of this request with `leading` placed before the script arguments
    pub fn with_leading_args(&self, leading: &[String]) -> SubmissionRequest {
        let mut request = self.clone();
        request.script_args = leading.iter().chain(self.script_args.iter()).cloned().collect();
        request
    }

    /// Record a file array and derive the matching array specification
    pub fn set_file_array(&mut self, spec: &str, mode: FileArrayMode) -> Result<(), SubmitError> {
        let (file_array, array) = expand_file_array(spec, mode)?;
        self.file_array = Some(file_array);
        self.array = Some(array);
        Ok(())
    }
}

/// Dependency ids as an ordered set, dropping the `0` placeholder for "no dependency"
pub fn dependencies<I>(ids: I) -> Vec<String>
    where I: IntoIterator<Item = String>
{
    let mut after: Vec<String> = Vec::new();
    for id in ids {
        if id != "0" && !after.contains(&id) {
            after.push(id);
        }
    }
    after
}

/// Turn a `file[%cap]` argument into a file array and its `1-N[%cap]` array spec
pub fn expand_file_array(spec: &str, mode: FileArrayMode) -> Result<(FileArray, String), SubmitError> {
    let (name, cap) = match spec.split_once('%') {
        Some((name, cap)) => (name, Some(cap)),
        None => (spec, None)
    };
    let path = PathBuf::from(name);
    if !path.is_file() {
        return Err(SubmitError::FileArraySourceMissing(path));
    }
    let njobs = count_lines(&path).map_err(|_| SubmitError::FileArraySourceMissing(path.clone()))?;
    info!("File array {} has {} lines", path.display(), njobs);

    let mut array = format!("1-{njobs}");
    if let Some(cap) = cap {
        array.push('%');
        array.push_str(cap);
    }
    Ok((FileArray { path, mode }, array))
}

/// Prefix for job output files: the override if given, else `log/` when it exists in `cwd`
pub fn resolve_log_dir(explicit: Option<&str>, cwd: &Path) -> Option<String> {
    match explicit {
        Some(dir) if dir.ends_with('/') => Some(dir.to_string()),
        Some(dir) => Some(format!("{dir}/")),
        None if cwd.join("log").is_dir() => Some("log/".to_string()),
        None => None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zero_dependency_is_dropped() {
        assert!(dependencies(ids(&["0"])).is_empty());
        assert_eq!(dependencies(ids(&["100", "0", "200", "100"])), ids(&["100", "200"]));
    }

    #[test]
    fn file_array_covers_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.txt");
        fs::write(&path, "a\nb\nc\nd\ne\n").unwrap();

        let spec = format!("{}%4", path.display());
        let (fa, array) = expand_file_array(&spec, FileArrayMode::Args).unwrap();
        assert_eq!(array, "1-5%4");
        assert_eq!(fa.path, path);
        assert_eq!(fa.mode, FileArrayMode::Args);

        let (_, array) = expand_file_array(path.to_str().unwrap(), FileArrayMode::Line).unwrap();
        assert_eq!(array, "1-5");
    }

    #[test]
    fn file_array_source_must_exist() {
        let err = expand_file_array("/no/such/file%2", FileArrayMode::Line).unwrap_err();
        assert!(matches!(err, SubmitError::FileArraySourceMissing(p) if p == PathBuf::from("/no/such/file")));
    }

    #[test]
    fn log_dir_resolution() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_log_dir(None, dir.path()), None);
        fs::create_dir(dir.path().join("log")).unwrap();
        assert_eq!(resolve_log_dir(None, dir.path()).as_deref(), Some("log/"));
        assert_eq!(resolve_log_dir(Some("out"), dir.path()).as_deref(), Some("out/"));
        assert_eq!(resolve_log_dir(Some("out/"), dir.path()).as_deref(), Some("out/"));
    }

    #[test]
    fn leading_args_come_first() {
        let request = SubmissionRequest::new("job.qsub", PathBuf::from("job.qsub"), ids(&["x"]));
        let row = request.with_leading_args(&ids(&["a", "b"]));
        assert_eq!(row.script_args, ids(&["a", "b", "x"]));
        assert_eq!(row.command_line(), "job.qsub a b x");
    }

    #[test]
    fn empty_script_is_rejected() {
        let request = SubmissionRequest::default();
        assert!(matches!(request.validate(), Err(SubmitError::MissingScriptArgument)));
        let request = SubmissionRequest::new("scripts/job.qsub", PathBuf::from("/lib/job.qsub"), vec![]);
        assert!(request.validate().is_ok());
        assert_eq!(request.script_basename(), "job.qsub");
    }
}
