use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::PathBuf;

use crate::sink::StreamSink;
use crate::sink::report_capture_failure;

/// Output capture sink: every write lands in the combined output log first,
/// flushed immediately, and is then forwarded to the original stream. A crash
/// between the two writes loses console visibility, never the log.
pub struct DualWriteTee {
    file: Option<File>,
    log_path: PathBuf,
    original: Box<dyn Write + Send>,
}

impl DualWriteTee {
    /// Open the log in append mode and tee into the process's real stdout.
    pub fn new(log_path: impl Into<PathBuf>) -> io::Result<Self> {
        let log_path = log_path.into();
        Self::with_original(log_path, Box::new(io::stdout()))
    }

    /// Tee into an arbitrary original stream. Used by tests.
    pub fn with_original(
        log_path: impl Into<PathBuf>,
        original: Box<dyn Write + Send>,
    ) -> io::Result<Self> {
        let log_path = log_path.into();
        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
        Ok(Self {
            file: Some(file),
            log_path,
            original,
        })
    }
}

impl StreamSink for DualWriteTee {
    fn write(&mut self, message: &str) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            let logged = file
                .write_all(message.as_bytes())
                .and_then(|()| file.flush());
            if let Err(error) = logged {
                report_capture_failure(&self.log_path, &error);
            }
        }
        self.original.write_all(message.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            if let Err(error) = file.flush() {
                report_capture_failure(&self.log_path, &error);
            }
        }
        self.original.flush()
    }

    fn close(&mut self) {
        // Dropping the handle closes it; a second close finds None.
        self.file.take();
    }
}
