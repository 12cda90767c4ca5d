use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use thiserror::Error;

use crate::config::CwHome;
use crate::error_capture::ErrorCaptureSink;
use crate::sink::StreamSink;
use crate::tee::DualWriteTee;

/// Process-wide stream redirection. `install` swaps in one [`DualWriteTee`]
/// for output and one [`ErrorCaptureSink`] for errors; every subsequent
/// [`write_stdout`] / [`write_stderr`] is mirrored into the log files for the
/// lifetime of the process.
///
/// Installation is guarded: a second `install` is a no-op that leaves the
/// existing sinks in place and reports [`RedirectError::AlreadyInstalled`],
/// so nested initializations never leak file handles. Teardown runs through
/// `libc::atexit` on normal process exit (not on kill signals) and closes the
/// sinks exactly once, output then error.
struct RedirectState {
    stdout_sink: DualWriteTee,
    stderr_sink: ErrorCaptureSink,
}

static ACTIVE: Mutex<Option<RedirectState>> = Mutex::new(None);
static ATEXIT_REGISTERED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("stream redirection is already installed")]
    AlreadyInstalled,
    #[error("failed to open capture log: {0}")]
    OpenLog(#[from] io::Error),
}

pub fn install(home: &CwHome) -> Result<(), RedirectError> {
    let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    if active.is_some() {
        return Err(RedirectError::AlreadyInstalled);
    }

    let stdout_sink = DualWriteTee::new(home.output_log())?;
    let stderr_sink = ErrorCaptureSink::new(home.output_log(), home.error_log())?;
    *active = Some(RedirectState {
        stdout_sink,
        stderr_sink,
    });

    if !ATEXIT_REGISTERED.swap(true, Ordering::SeqCst) {
        // Registered once per process; the callback tolerates having nothing
        // to tear down.
        unsafe {
            libc::atexit(close_at_exit);
        }
    }
    Ok(())
}

extern "C" fn close_at_exit() {
    uninstall();
}

/// Close and remove the installed sinks, output then error. Idempotent; safe
/// to call when nothing is installed.
pub fn uninstall() {
    let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut state) = active.take() {
        state.stdout_sink.close();
        state.stderr_sink.close();
    }
}

pub fn is_installed() -> bool {
    ACTIVE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Route a message through the installed output sink, or straight to the real
/// stdout when no redirection is active.
pub fn write_stdout(message: &str) -> io::Result<()> {
    let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    match active.as_mut() {
        Some(state) => state.stdout_sink.write(message),
        None => io::stdout().write_all(message.as_bytes()),
    }
}

/// Route a message through the installed error sink, or straight to the real
/// stderr when no redirection is active.
pub fn write_stderr(message: &str) -> io::Result<()> {
    let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    match active.as_mut() {
        Some(state) => state.stderr_sink.write(message),
        None => io::stderr().write_all(message.as_bytes()),
    }
}

pub fn flush() -> io::Result<()> {
    let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(state) = active.as_mut() {
        state.stdout_sink.flush()?;
        state.stderr_sink.flush()?;
    }
    Ok(())
}
