use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::request::read::get_dir_paths;

/// Description embedded in a script as `##` comment lines
///
/// The first `##` line describes the script. The `##` lines directly after it describe the
/// arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    pub description: String,
    pub arguments: Vec<String>,
}

pub fn read_script_info(path: &Path) -> io::Result<ScriptInfo> {
    let content = fs::read_to_string(path)?;
    let mut info = ScriptInfo::default();
    let mut lines = content.lines().skip_while(|line| !line.starts_with("##"));
    if let Some(first) = lines.next() {
        info.description = first[2..].trim().to_string();
        info.arguments = lines
            .take_while(|line| line.starts_with("##"))
            .map(|line| line[2..].trim().to_string())
            .collect();
    }
    Ok(info)
}

/// Print a script's description (`verbosity` 1), its arguments too (2), or the whole script (3)
pub fn view_script<W: Write>(name: &str, path: &Path, verbosity: u8, out: &mut W) -> io::Result<()> {
    if verbosity >= 3 {
        let content = fs::read_to_string(path)?;
        return writeln!(out, "{content}");
    }
    let info = read_script_info(path)?;
    writeln!(out, "{} - {}", name, info.description)?;
    if verbosity == 2 {
        writeln!(out, "Arguments:")?;
        for arg in &info.arguments {
            writeln!(out, "  {arg}")?;
        }
    }
    Ok(())
}

/// Names of the `*.qsub` scripts in `dir`, sorted
pub fn library_scripts(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = get_dir_paths(dir)?
        .into_iter()
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "qsub"))
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// List the scripts of each library directory whose name contains one of `patterns` (all if empty)
///
/// Directories that can't be read are skipped.
pub fn list_scripts<W: Write>(library: &[PathBuf], patterns: &[String], out: &mut W) -> io::Result<()> {
    for dir in library {
        let names = match library_scripts(dir) {
            Ok(names) => names,
            Err(err) => {
                warn!("Skipping script library {}: {}", dir.display(), err);
                continue;
            }
        };
        if names.is_empty() {
            continue;
        }
        writeln!(out, "Scripts in {}:", dir.display())?;
        for name in names.iter().filter(|name| matches(name, patterns)) {
            writeln!(out, "  {name}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn matches(name: &str, patterns: &[String]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| name.contains(p.as_str()))
}
