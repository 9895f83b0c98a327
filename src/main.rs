use std::env;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use log::{debug, error, info, warn};

use crate::compose::{ComposedCommand, Composer, ScriptInput};
use crate::error::SubmitError;
use crate::joblog::lookup::lookup_jobs;
use crate::joblog::record::{JobRecord, LogRecorder};
use crate::notify::message::{Completion, NotificationMessage};
use crate::notify::send::{send, SmtpConfig};
use crate::request::options::{option_flags, parse_dir_list, read_options};
use crate::request::read::read_arg_rows;
use crate::request::submission::{dependencies, resolve_log_dir, FileArrayMode, Notify, SubmissionRequest};
use crate::scheduler::Scheduler;
use crate::script::decorate::Decorator;
use crate::script::info::{list_scripts, view_script};
use crate::script::locate::ScriptLocator;
use crate::submit::SubmissionExecutor;

mod compose;
mod error;
mod joblog;
mod notify;
mod request;
mod scheduler;
mod script;
mod submit;

/// Submit job scripts to a cluster scheduler
///
/// Prints the id of the submitted job, suitable as the --after argument of a later submission:
///
///   STEP1=$(submit step1.qsub)
///   STEP2=$(submit --after $STEP1 step2.qsub)
#[derive(Parser)]
#[command(name = "submit", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    settings: Settings,

    #[command(flatten)]
    submit: SubmitArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the completion email for a finished job (called by decorated job scripts)
    Notify {
        #[command(flatten)]
        completion: Completion,

        #[command(flatten)]
        smtp: SmtpConfig,
    },

    /// Print the submission log records of job ids
    Lookup {
        #[arg(required = true, value_name = "JOBID")]
        job_ids: Vec<String>,
    },

    /// List the *.qsub scripts in the script library, optionally only names containing a pattern
    List {
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,
    },

    /// Describe a script: -v one-line description, -vv arguments too, -vvv the whole script
    View {
        #[arg(short = 'v', action = ArgAction::Count)]
        verbose: u8,

        script: String,
    },
}

/// Configuration shared by every mode
#[derive(Args)]
struct Settings {
    /// Scheduler syntax to use
    #[arg(long, global = true, env = "SUBMIT_MODE", value_enum, default_value_t = Scheduler::Slurm)]
    mode: Scheduler,

    /// Colon-separated search path for scripts [default: ../lib/scripts next to this program]
    #[arg(long, global = true, env = "SUBMIT_LIB", value_name = "DIRS")]
    lib: Option<String>,

    /// Submission log file [default: ../lib/submit.log next to this program]
    #[arg(long, global = true, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Log the submission command; twice to print the request and decorated script without submitting
    #[arg(short = 'd', global = true, action = ArgAction::Count)]
    debug: u8,
}

#[derive(Args)]
struct SubmitArgs {
    /// Read extra scheduler options from FILE, relative to your home directory [default: .sbatchrc or .qsubrc]
    #[arg(long, value_name = "FILE")]
    conf: Option<PathBuf>,

    /// Run after job JOBID has terminated successfully (repeatable, 0 is ignored)
    #[arg(long, value_name = "JOBID")]
    after: Vec<String>,

    /// Write the job's exit code to NAME when it ends, `@' is replaced by the job id
    #[arg(long, value_name = "NAME", conflicts_with = "no_decorate")]
    done: Option<String>,

    /// Comment attached to the job
    #[arg(short = 'p', long)]
    comment: Option<String>,

    /// Destination queue (account)
    #[arg(short = 'q', long)]
    queue: Option<String>,

    /// Job array specification, e.g. 0-15%4
    #[arg(short = 't', long, value_name = "SPEC", conflicts_with_all = ["file_array", "file_array_args"])]
    array: Option<String>,

    /// One array task per line of FILE, available as JOB_FILEARRAY_LINE; %N caps running tasks
    #[arg(short = 'T', long, value_name = "FILE[%N]", conflicts_with = "file_array_args")]
    file_array: Option<String>,

    /// Like -T for a tab-delimited FILE, fields available as JOB_FILEARRAY_ARGS
    #[arg(short = 'A', long, value_name = "FILE[%N]")]
    file_array_args: Option<String>,

    /// Submit one job per row of tab-delimited FILE, row fields go before the script arguments
    #[arg(short = 'F', long, value_name = "FILE")]
    args_file: Option<PathBuf>,

    /// Do not return until the job has finished
    #[arg(short = 'W', long)]
    wait: bool,

    /// Scheduler options separated by commas, e.g. --mem=10G,--time=20:00:00 (repeatable)
    #[arg(short = 'o', long, value_name = "OPTIONS", allow_hyphen_values = true)]
    options: Vec<String>,

    /// Submit the script as is, without start/stop instrumentation
    #[arg(short = 'n', long)]
    no_decorate: bool,

    /// Print the submission command instead of running it
    #[arg(short = 'x', long)]
    dry_run: bool,

    /// Email ADDRESS if the job fails
    #[arg(short = 'm', long, value_name = "ADDRESS", conflicts_with = "mail_always")]
    mail: Option<String>,

    /// Email ADDRESS when the job ends, whatever its exit code
    #[arg(short = 'M', long, value_name = "ADDRESS")]
    mail_always: Option<String>,

    /// Directory for the job's stdout and stderr files [default: ./log if it exists]
    #[arg(short = 'l', long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Job script, looked up in the current directory and then in the script library
    script: Option<String>,

    /// Arguments passed to the job script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Settings {
    fn library(&self) -> Result<Vec<PathBuf>> {
        match &self.lib {
            Some(dirs) => Ok(parse_dir_list(dirs)),
            None => Ok(vec![program_dir()?.join("../lib/scripts")])
        }
    }

    fn log_file(&self) -> Result<PathBuf> {
        match &self.log {
            Some(path) => Ok(path.clone()),
            None => Ok(program_dir()?.join("../lib/submit.log"))
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.use_stderr() {
                true => ExitCode::from(SubmitError::SYNTAX),
                false => ExitCode::SUCCESS
            };
        }
    };

    let level = if cli.settings.debug > 0 { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let submit_error = err.downcast_ref::<SubmitError>();
            if let Some(SubmitError::MissingScriptArgument) = submit_error {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::from(submit_error.map_or(SubmitError::OTHER, SubmitError::exit_code))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = &cli.settings;
    match cli.command {
        Some(Commands::Notify { completion, smtp }) => {
            let message = NotificationMessage::build(&completion)?;
            send(&message, &smtp)
        }
        Some(Commands::Lookup { job_ids }) => {
            let log = settings.log_file()?;
            let found = lookup_jobs(&log, &job_ids, &mut io::stdout().lock())
                .with_context(|| format!("Can't read log file {}", log.display()))?;
            debug!("{found} matching records in {}", log.display());
            Ok(())
        }
        Some(Commands::List { patterns }) => {
            list_scripts(&settings.library()?, &patterns, &mut io::stdout().lock())?;
            Ok(())
        }
        Some(Commands::View { verbose, script }) => {
            let path = ScriptLocator::new(settings.library()?).locate(&script)?;
            view_script(&script, &path, verbose.max(1), &mut io::stdout().lock())?;
            Ok(())
        }
        None => submit(settings, &cli.submit)
    }
}

/// Build the request(s) for a submission, then compose, run and record each of them
fn submit(settings: &Settings, args: &SubmitArgs) -> Result<()> {
    let scheduler = settings.mode;
    let request = build_request(settings, args)?;

    let requests = match &args.args_file {
        Some(path) => {
            if !path.is_file() {
                return Err(SubmitError::FileArraySourceMissing(path.clone()).into());
            }
            let rows = read_arg_rows(path)
                .with_context(|| format!("Can't read arguments file {}", path.display()))?;
            info!("Submitting {} jobs from {}", rows.len(), path.display());
            rows.iter().map(|row| request.with_leading_args(row)).collect()
        }
        None => vec![request]
    };

    let composer = scheduler.composer();
    let program = env::current_exe().context("Can't find the path of this program")?;
    let recorder = LogRecorder::new(settings.log_file()?);

    for request in &requests {
        let command = composer.compose(request);
        info!("Executing: {}", command.command);
        debug!("Environment: {:?}", command.env);

        if settings.debug > 1 {
            eprintln!("{}", serde_json::to_string_pretty(request)?);
            io::stderr().write_all(&script_body(request, scheduler, &command, &program)?)?;
            continue;
        }
        if args.dry_run {
            println!("{}", command.command);
            continue;
        }

        if !current_dir_writable() {
            warn!("Current directory is not writeable, log files for this job will not be created");
        }
        let body = script_body(request, scheduler, &command, &program)?;
        let job_id = SubmissionExecutor.submit(&command, body.as_slice())?;
        println!("{job_id}");
        recorder.record(&JobRecord::now(job_id, &request.script_path));
    }
    Ok(())
}

fn build_request(settings: &Settings, args: &SubmitArgs) -> Result<SubmissionRequest> {
    let scheduler = settings.mode;
    let script = args.script.as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(SubmitError::MissingScriptArgument)?;

    let path = ScriptLocator::new(settings.library()?).locate(script)?;
    let mut request = SubmissionRequest::new(script, path, args.args.clone());

    request.array = args.array.clone();
    if let Some(spec) = &args.file_array {
        request.set_file_array(spec, FileArrayMode::Line)?;
    }
    if let Some(spec) = &args.file_array_args {
        request.set_file_array(spec, FileArrayMode::Args)?;
    }
    request.after = dependencies(args.after.iter().cloned());
    request.queue = args.queue.clone();
    request.comment = args.comment.clone();

    let conf = args.conf.clone().unwrap_or_else(|| PathBuf::from(scheduler.conf_file()));
    request.file_options = match env::var_os("HOME") {
        Some(home) => {
            let path = Path::new(&home).join(&conf);
            read_options(&path).with_context(|| format!("Can't read options file {}", path.display()))?
        }
        None => {
            debug!("HOME is not set, not reading {}", conf.display());
            None
        }
    };
    request.cmdline_options = args.options.iter().map(|o| option_flags(o)).collect();
    if args.wait {
        request.cmdline_options.push("-W".to_string());
    }

    request.decorate = !args.no_decorate;
    request.done_file = args.done.clone();
    request.notify = match (&args.mail, &args.mail_always) {
        (_, Some(address)) => Some(Notify { address: address.clone(), always: true }),
        (Some(address), None) => Some(Notify { address: address.clone(), always: false }),
        (None, None) => None
    };
    request.log_dir = resolve_log_dir(args.log_dir.as_deref(), &env::current_dir()?);

    request.validate()?;
    Ok(request)
}

/// Bytes fed to the submission process: the decorated or plain script, or nothing when the
/// scheduler reads the script from its path
fn script_body(request: &SubmissionRequest, scheduler: Scheduler, command: &ComposedCommand, program: &Path) -> Result<Vec<u8>> {
    if let ScriptInput::Path(path) = &command.input {
        if request.decorate {
            warn!("{} is submitted by path and will not be decorated", path.display());
        }
        return Ok(Vec::new());
    }

    let path = &request.script_path;
    if !request.decorate {
        return fs::read(path).with_context(|| format!("Can't read script {}", path.display()));
    }
    let file = File::open(path).with_context(|| format!("Can't read script {}", path.display()))?;
    let mut body = Vec::new();
    Decorator::for_request(request, scheduler, program)?
        .stream(BufReader::new(file), &mut body)?;
    Ok(body)
}

fn program_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("Can't find the path of this program")?;
    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
}

fn current_dir_writable() -> bool {
    let here = b".\0";
    unsafe { libc::access(here.as_ptr() as *const libc::c_char, libc::W_OK | libc::X_OK) == 0 }
}
