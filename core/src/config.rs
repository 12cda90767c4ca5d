use std::io;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable that overrides the default `~/.cw` state directory.
pub const CW_HOME_ENV: &str = "CW_HOME";

/// Combined console output log (stdout and stderr interleaved, append-only).
pub const OUTPUT_LOG_FILE: &str = "output.log";
/// Error-only log, truncated on the first error write of each process.
pub const ERROR_LOG_FILE: &str = "error_output.log";
/// Append-only record of observed file create/modify/execute events.
pub const MONITOR_LOG_FILE: &str = "python_file_changes.log";
/// Most recently generated fix.
pub const SOLUTION_FILE: &str = "solution.py";

/// File extension of the sources the watcher tracks.
pub const SOURCE_EXTENSION: &str = "py";

#[derive(Debug, Error)]
pub enum CwHomeError {
    #[error("could not determine a home directory for the current user")]
    NoHomeDir,
}

/// The single configuration directory holding every persisted log and the
/// solution file. Paths within it are fixed, not configurable per invocation.
#[derive(Debug, Clone)]
pub struct CwHome {
    dir: PathBuf,
}

impl CwHome {
    /// Resolve the state directory: `$CW_HOME` when set, otherwise `~/.cw`.
    pub fn find() -> Result<Self, CwHomeError> {
        if let Some(dir) = std::env::var_os(CW_HOME_ENV) {
            return Ok(Self { dir: dir.into() });
        }
        let home = dirs::home_dir().ok_or(CwHomeError::NoHomeDir)?;
        Ok(Self {
            dir: home.join(".cw"),
        })
    }

    /// Use an explicit directory. Intended for tests.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn output_log(&self) -> PathBuf {
        self.dir.join(OUTPUT_LOG_FILE)
    }

    pub fn error_log(&self) -> PathBuf {
        self.dir.join(ERROR_LOG_FILE)
    }

    pub fn monitor_log(&self) -> PathBuf {
        self.dir.join(MONITOR_LOG_FILE)
    }

    pub fn solution_path(&self) -> PathBuf {
        self.dir.join(SOLUTION_FILE)
    }
}

/// Workspace root the file watcher observes. The platform Desktop directory,
/// falling back to `~/Desktop` when the platform does not report one.
pub fn default_watch_root() -> Result<PathBuf, CwHomeError> {
    if let Some(dir) = dirs::desktop_dir() {
        return Ok(dir);
    }
    let home = dirs::home_dir().ok_or(CwHomeError::NoHomeDir)?;
    Ok(home.join("Desktop"))
}
