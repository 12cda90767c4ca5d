use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Kind of file event recorded in the monitor log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Modified,
    Created,
    Executed,
}

impl ActivityKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Modified => "Modified:",
            Self::Created => "Created:",
            Self::Executed => "Executed:",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Modified:" => Some(Self::Modified),
            "Created:" => Some(Self::Created),
            "Executed:" => Some(Self::Executed),
            _ => None,
        }
    }
}

/// One parsed monitor-log entry. Derived from the log on demand, never stored
/// independently of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileActivityRecord {
    pub path: PathBuf,
    pub kind: ActivityKind,
}

/// Appends one line per observed file event to the monitor log:
/// `<Tag> <absolute-path> at <human-readable-timestamp>`.
///
/// The log is append-only; lines are written with a single buffered write and
/// flushed before returning so a concurrent reader sees whole lines.
#[derive(Debug, Clone)]
pub struct ActivityLogAppender {
    log_path: PathBuf,
}

impl ActivityLogAppender {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn append(&self, kind: ActivityKind, path: &Path) -> io::Result<()> {
        let timestamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
        let line = format!("{} {} at {timestamp}\n", kind.tag(), path.display());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

/// Parse one monitor-log line. Returns `None` for malformed lines: fewer than
/// two whitespace-delimited tokens, or an unrecognized leading tag. Partial
/// trailing lines from a still-running watcher fall out here as malformed.
pub fn parse_activity_line(line: &str) -> Option<FileActivityRecord> {
    let mut parts = line.split_whitespace();
    let kind = ActivityKind::from_tag(parts.next()?)?;
    let path = PathBuf::from(parts.next()?);
    Some(FileActivityRecord { path, kind })
}
