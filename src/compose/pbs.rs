use crate::compose::{afterok, CommandLine, ComposedCommand, Composer, ScriptInput};
use crate::request::submission::SubmissionRequest;

/// Composes `qsub` invocations
///
/// qsub takes the script by path and does not pass arguments to it. Instead each argument is
/// exported as `argN` (from 1), and all of them space-joined as `args`, then forwarded with `-v`.
pub struct PbsComposer;

impl Composer for PbsComposer {
    fn compose(&self, request: &SubmissionRequest) -> ComposedCommand {
        let env = argument_variables(&request.script_args);

        let mut line = CommandLine::new("qsub -d \"`pwd`\"");
        line.push(format!("-N {}", request.script_basename()));
        line.push_opt("-t", request.array.as_deref());
        line.push_opt("-W", afterok(request).map(|deps| format!("depend={deps}")).as_deref());
        line.push_opt("-q", request.queue.as_deref());
        line.options(request);

        let names: Vec<&str> = env.iter().map(|(name, _)| name.as_str()).collect();
        line.push(format!("-v {}", names.join(",")));
        line.push(request.script_path.display().to_string());

        ComposedCommand { command: line.finish(), env, input: ScriptInput::Path(request.script_path.clone()) }
    }
}

fn argument_variables(args: &[String]) -> Vec<(String, String)> {
    let mut env = vec![("args".to_string(), args.join(" "))];
    for (idx, arg) in args.iter().enumerate() {
        env.push((format!("arg{}", idx + 1), arg.clone()));
    }
    env
}
