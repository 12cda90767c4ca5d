use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::CwHome;
use crate::fix::FixRequest;
use crate::index::ActivityIndexError;
use crate::index::FileActivityIndex;
use crate::tail::DEFAULT_TAIL_LINES;
use crate::tail::tail_lines;

/// Which captured log tails feed the fix request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSelection {
    Both,
    ErrorsOnly,
    ConsoleOnly,
}

/// A file the assembler could not read; recorded in the bundle instead of
/// aborting assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReadFailure {
    pub path: PathBuf,
    pub error: String,
}

/// The ephemeral aggregate handed to fix generation. Rebuilt in full on every
/// invocation, never cached.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub error_tail: String,
    pub output_tail: String,
    pub recent_files: Vec<PathBuf>,
    pub file_contents: String,
    pub read_failures: Vec<FileReadFailure>,
}

impl ContextBundle {
    pub fn to_fix_request(&self, selection: LogSelection, instruction: Option<String>) -> FixRequest {
        let (error_text, output_text) = match selection {
            LogSelection::Both => (self.error_tail.clone(), self.output_tail.clone()),
            LogSelection::ErrorsOnly => (self.error_tail.clone(), String::new()),
            LogSelection::ConsoleOnly => (String::new(), self.output_tail.clone()),
        };
        FixRequest {
            error_text,
            output_text,
            file_contents: self.file_contents.clone(),
            instruction,
        }
    }
}

#[derive(Debug, Error)]
pub enum AssembleError {
    /// Neither log tail holds anything: there is nothing to analyze and no
    /// external call should be made.
    #[error("no recent console output or errors have been captured")]
    NothingToAnalyze,
    #[error(transparent)]
    Index(#[from] ActivityIndexError),
    #[error("failed to tail {path}")]
    Tail {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Combines the recency index, the capture log tails, and file contents into
/// one [`ContextBundle`] per invocation.
pub struct ContextAssembler {
    index: FileActivityIndex,
    output_log: PathBuf,
    error_log: PathBuf,
}

impl ContextAssembler {
    pub fn new(home: &CwHome) -> Self {
        Self {
            index: FileActivityIndex::new(home.monitor_log()),
            output_log: home.output_log(),
            error_log: home.error_log(),
        }
    }

    pub fn assemble(
        &self,
        n: usize,
        exclude_patterns: &[String],
    ) -> Result<ContextBundle, AssembleError> {
        let recent_files = self.index.recent_unique_files(n, exclude_patterns)?;

        let output_tail = tail_lines(&self.output_log, DEFAULT_TAIL_LINES).map_err(|error| {
            AssembleError::Tail {
                path: self.output_log.clone(),
                error,
            }
        })?;
        let error_tail = tail_lines(&self.error_log, DEFAULT_TAIL_LINES).map_err(|error| {
            AssembleError::Tail {
                path: self.error_log.clone(),
                error,
            }
        })?;

        if output_tail.trim().is_empty() && error_tail.trim().is_empty() {
            return Err(AssembleError::NothingToAnalyze);
        }

        let mut file_contents = String::new();
        let mut read_failures = Vec::new();
        for path in &recent_files {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    file_contents.push_str(&format!("\n--- {} ---\n{contents}", path.display()));
                }
                Err(error) => {
                    // Recoverable: record and omit rather than abort the bundle.
                    read_failures.push(FileReadFailure {
                        path: path.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        Ok(ContextBundle {
            error_tail,
            output_tail,
            recent_files,
            file_contents,
            read_failures,
        })
    }
}
