use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::SubmitError;

/// Resolves script names to paths
///
/// The current directory is searched first, then each library directory in order.
pub struct ScriptLocator {
    pub library: Vec<PathBuf>,
}

impl ScriptLocator {
    pub fn new(library: Vec<PathBuf>) -> Self {
        ScriptLocator { library }
    }

    pub fn locate(&self, name: &str) -> Result<PathBuf, SubmitError> {
        self.locate_from(Path::new("."), name)
    }

    /// Like [`ScriptLocator::locate`], with relative names resolved against `cwd`
    pub fn locate_from(&self, cwd: &Path, name: &str) -> Result<PathBuf, SubmitError> {
        let local = cwd.join(name);
        if local.is_file() {
            info!("Found script {} in current directory", name);
            return Ok(local);
        }
        for dir in &self.library {
            let candidate = dir.join(name);
            debug!("Looking for script at {}", candidate.display());
            if candidate.is_file() {
                info!("Found script {} in library {}", name, dir.display());
                return Ok(candidate);
            }
        }
        Err(SubmitError::ScriptNotFound { name: name.to_string(), library: self.library.clone() })
    }
}
