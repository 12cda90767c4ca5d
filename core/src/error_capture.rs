use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::PathBuf;

use crate::sink::StreamSink;
use crate::sink::report_capture_failure;

/// Error capture sink: every write is appended to the combined output log and
/// mirrored into a dedicated error-only log, then forwarded to the *true*
/// original stderr (never the currently-active handle, so a double
/// installation cannot recurse into itself).
///
/// The error-only log uses the overwrite-on-first-error policy: the first
/// error write of a process lifetime truncates it, later writes in the same
/// process append. The file therefore reflects only the current process's
/// error sequence.
pub struct ErrorCaptureSink {
    combined: Option<File>,
    combined_path: PathBuf,
    error_log_path: PathBuf,
    error_logged: bool,
    closed: bool,
    original: Box<dyn Write + Send>,
}

impl ErrorCaptureSink {
    pub fn new(
        combined_path: impl Into<PathBuf>,
        error_log_path: impl Into<PathBuf>,
    ) -> io::Result<Self> {
        Self::with_original(combined_path, error_log_path, Box::new(io::stderr()))
    }

    /// Forward to an arbitrary original stream. Used by tests.
    pub fn with_original(
        combined_path: impl Into<PathBuf>,
        error_log_path: impl Into<PathBuf>,
        original: Box<dyn Write + Send>,
    ) -> io::Result<Self> {
        let combined_path = combined_path.into();
        let combined = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&combined_path)?;
        Ok(Self {
            combined: Some(combined),
            combined_path,
            error_log_path: error_log_path.into(),
            error_logged: false,
            closed: false,
            original,
        })
    }

    fn append_error_log(&mut self, message: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).write(true);
        if self.error_logged {
            options.append(true);
        } else {
            options.truncate(true);
        }
        let mut file = options.open(&self.error_log_path)?;
        file.write_all(message.as_bytes())?;
        file.flush()?;
        // Only a successful write arms append mode; a failed first attempt
        // retries the truncation next time.
        self.error_logged = true;
        Ok(())
    }
}

impl StreamSink for ErrorCaptureSink {
    fn write(&mut self, message: &str) -> io::Result<()> {
        if !self.closed {
            if let Some(combined) = self.combined.as_mut() {
                let logged = combined
                    .write_all(message.as_bytes())
                    .and_then(|()| combined.flush());
                if let Err(error) = logged {
                    report_capture_failure(&self.combined_path, &error);
                }
            }
            if let Err(error) = self.append_error_log(message) {
                report_capture_failure(&self.error_log_path, &error);
            }
        }
        self.original.write_all(message.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.closed {
            if let Some(combined) = self.combined.as_mut() {
                if let Err(error) = combined.flush() {
                    report_capture_failure(&self.combined_path, &error);
                }
            }
        }
        self.original.flush()
    }

    fn close(&mut self) {
        if !self.closed {
            self.combined.take();
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::SharedBuf;
    use pretty_assertions::assert_eq;

    struct Setup {
        sink: ErrorCaptureSink,
        original: SharedBuf,
        combined_path: PathBuf,
        error_log_path: PathBuf,
    }

    fn setup(dir: &tempfile::TempDir) -> Setup {
        let combined_path = dir.path().join("output.log");
        let error_log_path = dir.path().join("error_output.log");
        let original = SharedBuf::default();
        let sink = ErrorCaptureSink::with_original(
            &combined_path,
            &error_log_path,
            Box::new(original.clone()),
        )
        .expect("open sink");
        Setup {
            sink,
            original,
            combined_path,
            error_log_path,
        }
    }

    #[test]
    fn first_error_truncates_then_appends_within_one_process() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error_log_path = dir.path().join("error_output.log");
        std::fs::write(&error_log_path, "stale error from a previous run\n").expect("seed");

        let mut s = setup(&dir);
        s.sink.write("Traceback one\n").expect("write");
        assert_eq!(
            std::fs::read_to_string(&s.error_log_path).expect("read"),
            "Traceback one\n"
        );

        s.sink.write("Traceback two\n").expect("write");
        assert_eq!(
            std::fs::read_to_string(&s.error_log_path).expect("read"),
            "Traceback one\nTraceback two\n"
        );
    }

    #[test]
    fn combined_log_always_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let combined_path = dir.path().join("output.log");
        std::fs::write(&combined_path, "earlier stdout\n").expect("seed");

        let mut s = setup(&dir);
        s.sink.write("an error\n").expect("write");

        assert_eq!(
            std::fs::read_to_string(&s.combined_path).expect("read"),
            "earlier stdout\nan error\n"
        );
    }

    #[test]
    fn original_stream_receives_every_write_even_after_close() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut s = setup(&dir);

        s.sink.write("before\n").expect("write");
        s.sink.close();
        s.sink.close();
        s.sink.write("after\n").expect("write");
        s.sink.flush().expect("flush after close");

        assert_eq!(s.original.contents(), "before\nafter\n");
        // The closed sink no longer touches either log file.
        assert_eq!(
            std::fs::read_to_string(&s.error_log_path).expect("read"),
            "before\n"
        );
    }
}
