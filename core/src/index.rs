use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::activity::parse_activity_line;

/// Path substrings excluded from recency results by default, so the tool
/// never feeds its own artifacts back as "recent user edits": the generated
/// solution file and anything under the cw state directory.
pub const DEFAULT_EXCLUDED: &[&str] = &["solution.py", "/.cw/"];

#[derive(Debug, Error)]
pub enum ActivityIndexError {
    /// The monitor log has never been written: nothing has ever been tracked.
    /// Distinct from a log that exists but matched nothing.
    #[error("monitor log not found at {path}: nothing has been tracked yet")]
    Untracked { path: PathBuf },
    #[error("failed to read monitor log {path}")]
    Read {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Reconstructs "what files were most recently touched" from the append-only
/// monitor log.
#[derive(Debug, Clone)]
pub struct FileActivityIndex {
    log_path: PathBuf,
}

impl FileActivityIndex {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    /// Up to `n` distinct paths, strictly most-recent-first.
    ///
    /// The log is consumed in a single bounded read (it may be growing under
    /// a live watcher) and scanned last line first. Malformed lines are
    /// skipped silently; the first occurrence of a path scanning backward
    /// wins, so each path is reported at its most recent touch. Paths
    /// containing any exclusion substring ([`DEFAULT_EXCLUDED`] plus the
    /// caller's patterns) are dropped.
    pub fn recent_unique_files(
        &self,
        n: usize,
        exclude_patterns: &[String],
    ) -> Result<Vec<PathBuf>, ActivityIndexError> {
        let bytes = std::fs::read(&self.log_path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                ActivityIndexError::Untracked {
                    path: self.log_path.clone(),
                }
            } else {
                ActivityIndexError::Read {
                    path: self.log_path.clone(),
                    error,
                }
            }
        })?;
        // Lossy: a concurrent appender can leave a torn multi-byte sequence
        // at the tail, which must not poison the whole reconstruction.
        let contents = String::from_utf8_lossy(&bytes);

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut ordered = Vec::new();
        for line in contents.lines().rev() {
            if ordered.len() >= n {
                break;
            }
            let Some(record) = parse_activity_line(line) else {
                continue;
            };
            if is_excluded(&record.path, exclude_patterns) {
                continue;
            }
            if seen.insert(record.path.clone()) {
                ordered.push(record.path);
            }
        }
        Ok(ordered)
    }
}

fn is_excluded(path: &std::path::Path, exclude_patterns: &[String]) -> bool {
    let text = path.to_string_lossy();
    DEFAULT_EXCLUDED
        .iter()
        .any(|pattern| text.contains(pattern))
        || exclude_patterns
            .iter()
            .any(|pattern| text.contains(pattern.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_log(dir: &tempfile::TempDir, lines: &[&str]) -> FileActivityIndex {
        let log_path = dir.path().join("python_file_changes.log");
        let mut contents = lines.join("\n");
        contents.push('\n');
        std::fs::write(&log_path, contents).expect("write log");
        FileActivityIndex::new(log_path)
    }

    #[test]
    fn most_recent_first_with_dedup() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index = write_log(
            &tmp,
            &[
                "Modified: /d/a.py at Mon Jan  5 09:00:00 2026",
                "Created: /d/b.py at Mon Jan  5 09:01:00 2026",
                "Modified: /d/a.py at Mon Jan  5 09:02:00 2026",
                "Executed: /d/c.py at Mon Jan  5 09:03:00 2026",
            ],
        );

        let files = index.recent_unique_files(3, &[]).expect("reconstruct");
        assert_eq!(
            files,
            vec![
                PathBuf::from("/d/c.py"),
                PathBuf::from("/d/a.py"),
                PathBuf::from("/d/b.py"),
            ]
        );
    }

    #[test]
    fn result_length_is_capped_at_n() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index = write_log(
            &tmp,
            &[
                "Modified: /d/a.py at noon",
                "Modified: /d/b.py at noon",
                "Modified: /d/c.py at noon",
            ],
        );

        let files = index.recent_unique_files(2, &[]).expect("reconstruct");
        assert_eq!(
            files,
            vec![PathBuf::from("/d/c.py"), PathBuf::from("/d/b.py")]
        );
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index = write_log(
            &tmp,
            &[
                "Modified: /d/a.py at noon",
                "Garbage line with no tag",
                "Modified:",
                "Created: /d/b.py at noon",
            ],
        );

        let files = index.recent_unique_files(10, &[]).expect("reconstruct");
        assert_eq!(
            files,
            vec![PathBuf::from("/d/b.py"), PathBuf::from("/d/a.py")]
        );
    }

    #[test]
    fn fully_excluded_log_yields_empty_not_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index = write_log(
            &tmp,
            &[
                "Modified: /home/u/.cw/solution.py at noon",
                "Modified: /d/watcher_helper.py at noon",
            ],
        );

        let files = index
            .recent_unique_files(5, &["watcher_helper.py".to_string()])
            .expect("reconstruct");
        assert_eq!(files, Vec::<PathBuf>::new());
    }

    #[test]
    fn missing_log_is_a_distinct_untracked_condition() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let index = FileActivityIndex::new(tmp.path().join("never_written.log"));
        assert!(matches!(
            index.recent_unique_files(3, &[]),
            Err(ActivityIndexError::Untracked { .. })
        ));
    }
}
