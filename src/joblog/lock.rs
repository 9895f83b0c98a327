use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// Exclusive advisory lock on an open file, released when dropped
pub struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Block until an exclusive lock on `file` is held
    pub fn exclusive(file: &'a File) -> io::Result<FileLock<'a>> {
        let fd = file.as_raw_fd();
        loop {
            let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
            if result == 0 {
                return Ok(FileLock { file });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub fn file(&self) -> &File {
        self.file
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    fn try_lock(file: &File) -> bool {
        unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submit.log");
        let first = OpenOptions::new().create(true).append(true).open(&path).unwrap();
        let second = OpenOptions::new().append(true).open(&path).unwrap();

        {
            let _lock = FileLock::exclusive(&first).unwrap();
            assert!(!try_lock(&second));
        }
        assert!(try_lock(&second));
    }
}
