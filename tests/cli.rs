use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SCRIPT: &str = "#!/bin/bash\n#SBATCH --mem=1G\n\necho $1\n";

/// A scratch working directory with a job script, an empty home and a bin dir for fake schedulers
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Sandbox {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("home")).unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::create_dir(dir.path().join("work")).unwrap();
        fs::write(dir.path().join("work/job.qsub"), SCRIPT).unwrap();
        Sandbox { dir }
    }

    fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Install an executable shell script on the sandbox PATH
    fn fake(&self, name: &str, body: &str) {
        let path = self.path("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn submit(&self, args: &[&str]) -> Output {
        let path = format!("{}:{}", self.path("bin").display(), std::env::var("PATH").unwrap_or_default());
        Command::new(env!("CARGO_BIN_EXE_submit"))
            .args(args)
            .current_dir(self.work())
            .env("HOME", self.path("home"))
            .env("PATH", path)
            .env("SUBMIT_LIB", self.path("lib"))
            .env("CAPTURE", self.path("captured.sh"))
            .env_remove("SUBMIT_MODE")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn log_arg(sandbox: &Sandbox) -> String {
    sandbox.path("submit.log").display().to_string()
}

#[test]
fn dry_run_prints_composed_command() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("home/.sbatchrc"), "--mem=2G\n--time=1:00:00\n").unwrap();

    let out = sandbox.submit(&["-x", "-p", "run-42", "-q", "bio", "--after", "100", "--after", "0", "-o", "-c,4", "job.qsub", "a", "b c"]);
    assert!(out.status.success(), "{out:?}");
    assert_eq!(
        stdout(&out),
        "sbatch --parsable -D \"`pwd`\" -J job.qsub -o job.qsub.IN.o%j -e job.qsub.IN.e%j \
         --comment \"run-42\" -d afterok:100 -A bio --mem=2G --time=1:00:00 -c 4 /dev/stdin a \"b c\"\n"
    );
}

#[test]
fn output_goes_to_log_directory() {
    let sandbox = Sandbox::new();
    fs::create_dir(sandbox.work().join("log")).unwrap();
    let out = sandbox.submit(&["-x", "job.qsub"]);
    assert!(stdout(&out).contains(" -o log/job.qsub.IN.o%j -e log/job.qsub.IN.e%j "), "{out:?}");
}

#[test]
fn file_array_sets_array_range() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.work().join("samples.txt"), "s1\ns2\ns3\n").unwrap();
    let out = sandbox.submit(&["-x", "-T", "samples.txt%2", "job.qsub"]);
    assert!(out.status.success(), "{out:?}");
    assert!(stdout(&out).contains(" -o job.qsub.o%A_%a -e job.qsub.e%A_%a -a 1-3%2 "), "{out:?}");
}

#[test]
fn pbs_mode() {
    let sandbox = Sandbox::new();
    let out = sandbox.submit(&["-x", "--mode", "pbs", "--after", "7", "job.qsub", "x"]);
    assert!(out.status.success(), "{out:?}");
    assert_eq!(stdout(&out), "qsub -d \"`pwd`\" -N job.qsub -W depend=afterok:7 -v args,arg1 ./job.qsub\n");
}

#[test]
fn args_file_submits_one_job_per_row() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.work().join("rows.tsv"), "s1\tr1\ns2\tr2\n").unwrap();
    let out = sandbox.submit(&["-x", "-F", "rows.tsv", "job.qsub", "fixed"]);
    let printed = stdout(&out);
    let lines: Vec<&str> = printed.lines().collect();
    assert_eq!(lines.len(), 2, "{out:?}");
    assert!(lines[0].ends_with("/dev/stdin s1 r1 fixed"));
    assert!(lines[1].ends_with("/dev/stdin s2 r2 fixed"));
}

#[test]
fn submits_decorated_script_and_logs_it() {
    let sandbox = Sandbox::new();
    sandbox.fake("sbatch", "cat > \"$CAPTURE\"\necho 4242");
    let log = log_arg(&sandbox);

    let out = sandbox.submit(&["--log", &log, "--done", "done.@", "job.qsub", "sample1"]);
    assert!(out.status.success(), "{out:?}");
    assert_eq!(stdout(&out), "4242\n");

    let captured = fs::read_to_string(sandbox.path("captured.sh")).unwrap();
    assert!(captured.starts_with("#!/bin/bash\n#SBATCH --mem=1G\n\n\necho %Commandline: \"job.qsub sample1\"\n"), "{captured}");
    assert!(captured.contains("echo $_RETCODE > done.${SLURM_JOBID}\n"));
    assert!(captured.ends_with("exit $_RETCODE\n"));

    let record = fs::read_to_string(sandbox.path("submit.log")).unwrap();
    let fields: Vec<&str> = record.trim_end().split('\t').collect();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[1], "4242");
    assert_eq!(fields[3], "job.qsub");

    let found = sandbox.submit(&["--log", &log, "lookup", "4242"]);
    assert_eq!(stdout(&found), record);
}

#[test]
fn undecorated_script_is_sent_verbatim() {
    let sandbox = Sandbox::new();
    sandbox.fake("sbatch", "cat > \"$CAPTURE\"\necho 7");
    let log = log_arg(&sandbox);
    let out = sandbox.submit(&["--log", &log, "-n", "job.qsub"]);
    assert!(out.status.success(), "{out:?}");
    assert_eq!(fs::read_to_string(sandbox.path("captured.sh")).unwrap(), SCRIPT);
}

#[test]
fn scheduler_error_is_surfaced() {
    let sandbox = Sandbox::new();
    sandbox.fake("sbatch", "cat > /dev/null\necho 'sbatch: error: Batch job submission failed' >&2");
    let log = log_arg(&sandbox);

    let out = sandbox.submit(&["--log", &log, "job.qsub"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Batch job submission failed"));
    assert!(!Path::new(&log).exists());
}

#[test]
fn exit_status_per_failure() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.submit(&["-x", "missing.qsub"]).status.code(), Some(5));
    assert_eq!(sandbox.submit(&["-x"]).status.code(), Some(4));
    assert_eq!(sandbox.submit(&["-x", "-T", "nope.txt", "job.qsub"]).status.code(), Some(3));
    assert_eq!(sandbox.submit(&["-x", "-F", "nope.tsv", "job.qsub"]).status.code(), Some(3));
    assert_eq!(sandbox.submit(&["-x", "-n", "--done", "d", "job.qsub"]).status.code(), Some(4));
}

#[test]
fn script_found_in_library() {
    let sandbox = Sandbox::new();
    fs::create_dir(sandbox.path("lib")).unwrap();
    fs::write(sandbox.path("lib/count.qsub"), "## Count reads\n## $1 = fastq\nzcat $1 | wc -l\n").unwrap();

    let out = sandbox.submit(&["-x", "count.qsub"]);
    assert!(stdout(&out).starts_with("sbatch --parsable -D \"`pwd`\" -J count.qsub "), "{out:?}");

    let out = sandbox.submit(&["list"]);
    assert!(stdout(&out).contains("  count.qsub\n"), "{out:?}");

    let out = sandbox.submit(&["view", "-vv", "count.qsub"]);
    assert_eq!(stdout(&out), "count.qsub - Count reads\nArguments:\n  $1 = fastq\n");
}
