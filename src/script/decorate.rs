use std::io::{self, BufRead, Write};
use std::path::Path;

use log::debug;
use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::compose::double_quote;
use crate::request::submission::{FileArrayMode, SubmissionRequest};
use crate::scheduler::Scheduler;

/// Position of the decorator in the input script
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Shebang, scheduler directives and blank lines, passed through untouched
    InHeader,
    /// Everything from the first command onwards
    InBody,
}

/// Rewrites a job script into its instrumented variant, one line at a time
///
/// The header (shebang, directives, blank lines) is kept as is. The rendered prologue is
/// inserted just before the first body line, and the rendered epilogue after the last line. A
/// script with no body never leaves [`State::InHeader`], so it only gets the epilogue.
///
/// Lines are handled as bytes so the original script is reproduced exactly.
pub struct Decorator {
    directive: &'static str,
    prologue: String,
    epilogue: String,
    state: State,
    unterminated: bool,
}

/// Rendering context for the prologue (instrumentation before the body)
#[derive(Serialize)]
struct PrologueContext {
    command_line: String,
    has_file_array: bool,
    file_array_args: bool,
    file_array: String,
    task_id: String,
}

/// Rendering context for the epilogue (exit code, done file, timing, notification)
#[derive(Serialize)]
struct EpilogueContext {
    has_done_file: bool,
    done_file: String,
    send_mail: bool,
    mail_always: bool,
    notify_command: String,
}

impl Decorator {
    pub fn new(directive: &'static str, prologue: String, epilogue: String) -> Self {
        Decorator { directive, prologue, epilogue, state: State::InHeader, unterminated: false }
    }

    /// Render the instrumentation for `request`
    ///
    /// `program` is the path of this executable, called back by the finished job to send the
    /// completion email.
    pub fn for_request(request: &SubmissionRequest, scheduler: Scheduler, program: &Path) -> Result<Decorator, tinytemplate::error::Error> {
        let prologue = render_prologue(request, scheduler)?;
        let epilogue = render_epilogue(request, scheduler, program)?;
        Ok(Decorator::new(scheduler.directive(), prologue, epilogue))
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Feed one input line, including its terminator, and append the output for it to `out`
    pub fn line(&mut self, line: &[u8], out: &mut Vec<u8>) {
        if self.state == State::InHeader && !self.is_header(line) {
            debug!("End of script header, inserting instrumentation");
            out.extend_from_slice(self.prologue.as_bytes());
            self.state = State::InBody;
        }
        out.extend_from_slice(line);
        self.unterminated = !line.ends_with(b"\n");
    }

    /// Append the epilogue once all lines have been fed
    pub fn finish(self, out: &mut Vec<u8>) {
        if self.state() == State::InHeader {
            debug!("Script has no body, adding the trailer only");
        }
        if self.unterminated {
            out.push(b'\n');
        }
        out.extend_from_slice(self.epilogue.as_bytes());
    }

    /// Decorate a whole script from `input` into `out`
    pub fn stream<R: BufRead, W: Write>(mut self, mut input: R, out: &mut W) -> io::Result<()> {
        let mut line = Vec::new();
        let mut emit = Vec::new();
        loop {
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            emit.clear();
            self.line(&line, &mut emit);
            out.write_all(&emit)?;
        }
        emit.clear();
        self.finish(&mut emit);
        out.write_all(&emit)
    }

    fn is_header(&self, line: &[u8]) -> bool {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        text.is_empty() || text.starts_with("#!") || text.starts_with(self.directive)
    }
}

/// Done file name with each `@` replaced by the job id variable, expanded when the job runs
pub fn done_file_name(name: &str, scheduler: Scheduler) -> String {
    name.replace('@', scheduler.job_id_var())
}

fn render_prologue(request: &SubmissionRequest, scheduler: Scheduler) -> Result<String, tinytemplate::error::Error> {
    /// included prologue template
    static PROLOGUE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/prologue.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("prologue", PROLOGUE)?;

    let file_array = request.file_array.as_ref();
    let context = PrologueContext {
        command_line: double_quote(&request.command_line()),
        has_file_array: file_array.is_some(),
        file_array_args: file_array.map_or(false, |fa| fa.mode == FileArrayMode::Args),
        file_array: file_array.map(|fa| fa.path.display().to_string()).unwrap_or_default(),
        task_id: scheduler.task_id_var().to_string(),
    };
    tt.render("prologue", &context)
}

fn render_epilogue(request: &SubmissionRequest, scheduler: Scheduler, program: &Path) -> Result<String, tinytemplate::error::Error> {
    /// included epilogue template
    static EPILOGUE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/epilogue.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("epilogue", EPILOGUE)?;

    let notify_command = match &request.notify {
        Some(notify) => format!(
            "{} notify {} {} $_RETCODE $(($_SUBMIT_TS2 - $_SUBMIT_TS)) \"$_ORIG_PWD\" {}",
            double_quote(&program.display().to_string()),
            double_quote(&notify.address),
            scheduler.job_id_var(),
            double_quote(&request.command_line()),
        ),
        None => String::new()
    };
    let context = EpilogueContext {
        has_done_file: request.done_file.is_some(),
        done_file: request.done_file.as_deref().map(|name| done_file_name(name, scheduler)).unwrap_or_default(),
        send_mail: request.notify.is_some(),
        mail_always: request.notify.as_ref().map_or(false, |n| n.always),
        notify_command,
    };
    tt.render("epilogue", &context)
}
