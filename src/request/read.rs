use std::{fs, io};
use std::io::{BufRead, BufReader, Error};
use std::path::{Path, PathBuf};

pub fn get_dir_paths(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    fs::read_dir(dir)?
        .map(|res| res.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, io::Error>>()
}

/// Number of lines in a file, counting a final line without a trailing newline
pub fn count_lines(path: &Path) -> Result<usize, Error> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut n = 0;
    for line in reader.split(b'\n') {
        line?;
        n += 1;
    }
    Ok(n)
}

/// Read a tab-delimited argument file, one row of fields per non-blank line
pub fn read_arg_rows(path: &Path) -> Result<Vec<Vec<String>>, Error> {
    let content = fs::read_to_string(path)?;
    let rows = content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(|line| line.split('\t').map(String::from).collect())
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn counts_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.txt");
        fs::write(&path, "a\nb\nc").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);

        let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"\n").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);
    }

    #[test]
    fn arg_rows_are_tab_split() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.tsv");
        fs::write(&path, "s1\tr1.fq\r\n\ns2\tr2.fq\n").unwrap();
        let rows = read_arg_rows(&path).unwrap();
        assert_eq!(rows, vec![vec!["s1", "r1.fq"], vec!["s2", "r2.fq"]]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(count_lines(&dir.path().join("nope")).is_err());
    }
}
