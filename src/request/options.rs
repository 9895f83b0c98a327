use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

/// Read raw scheduler options from a per-user options file
///
/// A missing file is not an error, it just contributes no options. Newlines and carriage returns
/// are collapsed to spaces so the content can be appended to a single command line.
pub fn read_options(path: &Path) -> io::Result<Option<String>> {
    if !path.is_file() {
        debug!("No options file at {}", path.display());
        return Ok(None);
    }
    info!("Reading options from {}", path.display());
    let raw = fs::read_to_string(path)?;
    Ok(normalise_options(&raw))
}

fn normalise_options(raw: &str) -> Option<String> {
    let opts = raw.replace(['\n', '\r'], " ");
    let opts = opts.trim();
    match opts.is_empty() {
        true => None,
        false => Some(opts.to_string())
    }
}

/// Convert one `-o` value (options separated by commas) to space-separated form
pub fn option_flags(value: &str) -> String {
    value.replace(',', " ")
}

/// Split a colon-separated directory list, keeping only directories that exist
pub fn parse_dir_list(list: &str) -> Vec<PathBuf> {
    list.split(':')
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .filter(|d| d.is_dir())
        .collect()
}
