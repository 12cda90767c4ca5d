use std::io;
use std::path::Path;

/// Number of log lines the context assembler reads from each capture log.
pub const DEFAULT_TAIL_LINES: usize = 40;

/// Last `k` lines of a text log, newline-joined. A missing file reads as
/// empty: the log simply has not been written yet. The file is consumed in
/// one read since the owning process may still be appending to it.
pub fn tail_lines(path: &Path, k: usize) -> io::Result<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(error) => return Err(error),
    };
    let contents = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(k);
    Ok(lines[start..].join("\n"))
}
