use std::io;
use std::io::Write;
use std::path::Path;

/// A writable capture sink. Implementations duplicate each write into a
/// persistent log while passing it through to the original destination.
///
/// The `io::Result` returned by `write` and `flush` carries only failures of
/// the original stream; log-file failures are reported out of band and never
/// propagate, so a full disk cannot break the caller's console.
pub trait StreamSink {
    fn write(&mut self, message: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    /// Idempotent. After `close`, `write` must still forward to the original
    /// stream without touching the log file.
    fn close(&mut self);
}

/// Best-effort report of a log-file failure to the true stderr. The process's
/// real fd 2 is never replaced by the redirection layer, so this cannot
/// recurse into a capture sink.
pub(crate) fn report_capture_failure(log_path: &Path, error: &io::Error) {
    let _ = writeln!(
        io::stderr(),
        "cw: failed to write capture log {}: {error}",
        log_path.display()
    );
}
