use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write every log line with a field equal to one of `job_ids`, grouped by id in the order given
///
/// Matching on any field keeps older logs, which split the timestamp into date and time columns,
/// searchable.
pub fn lookup_jobs<W: Write>(log: &Path, job_ids: &[String], out: &mut W) -> io::Result<usize> {
    let content = fs::read_to_string(log)?;
    let mut found = 0;
    for id in job_ids {
        for line in content.lines().filter(|line| line.split('\t').any(|field| field == id)) {
            writeln!(out, "{line}")?;
            found += 1;
        }
    }
    Ok(found)
}
