use crate::compose::{afterok, double_quote, quote_arg, CommandLine, ComposedCommand, Composer, ScriptInput};
use crate::request::submission::SubmissionRequest;

/// Composes `sbatch` invocations that read the job script from stdin
pub struct SlurmComposer;

impl Composer for SlurmComposer {
    fn compose(&self, request: &SubmissionRequest) -> ComposedCommand {
        let logdir = request.log_dir.as_deref().unwrap_or("");
        let name = request.script_basename();

        let mut line = CommandLine::new("sbatch --parsable -D \"`pwd`\"");
        line.push(format!("-J {}", request.script));
        match &request.array {
            Some(array) => line.push(format!("-o {logdir}{name}.o%A_%a -e {logdir}{name}.e%A_%a -a {array}")),
            None => line.push(format!("-o {logdir}{name}.IN.o%j -e {logdir}{name}.IN.e%j"))
        }
        if let Some(comment) = &request.comment {
            line.push(format!("--comment {}", double_quote(comment)));
        }
        line.push_opt("-d", afterok(request).as_deref());
        line.push_opt("-A", request.queue.as_deref());
        line.options(request);

        // sbatch takes the script from the pipe, its arguments follow
        line.push("/dev/stdin");
        for arg in &request.script_args {
            line.push(quote_arg(arg));
        }

        ComposedCommand { command: line.finish(), env: Vec::new(), input: ScriptInput::Stdin }
    }
}
