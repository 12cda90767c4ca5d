use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use cw_core::ActivityKind;
use cw_core::ActivityLogAppender;
use cw_core::CwHome;
use cw_core::config::SOURCE_EXTENSION;
use cw_core::config::default_watch_root;
use cw_core::redirect;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Command to run, e.g. `cw run python3 script.py`.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

/// Run a command with the stream redirector installed: the child's stdout and
/// stderr pass through unchanged while both capture logs fill. Returns the
/// child's exit code.
pub fn run(args: RunArgs) -> Result<i32> {
    let home = CwHome::find()?;
    home.ensure_dir()
        .with_context(|| format!("failed to create {}", home.dir().display()))?;

    log_executed_script(&home, &args.command);

    redirect::install(&home).context("failed to install stream capture")?;

    let (program, rest) = match args.command.split_first() {
        Some(split) => split,
        None => bail!("no command given"),
    };
    let mut child = Command::new(program)
        .args(rest)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    std::thread::scope(|scope| {
        if let Some(stdout) = stdout {
            scope.spawn(|| pump(stdout, redirect::write_stdout));
        }
        if let Some(stderr) = stderr {
            scope.spawn(|| pump(stderr, redirect::write_stderr));
        }
    });

    let status = child.wait().context("failed to wait for child")?;
    redirect::uninstall();
    Ok(status.code().unwrap_or(1))
}

/// Forward a child stream chunk by chunk through a redirected sink, so output
/// appears on the console as it is produced rather than at exit.
fn pump(mut reader: impl Read, write: fn(&str) -> std::io::Result<()>) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => {
                let chunk = String::from_utf8_lossy(&buf[..read]);
                if let Err(error) = write(&chunk) {
                    warn!("console write failed: {error}");
                    break;
                }
            }
            Err(error) => {
                warn!("failed to read child stream: {error}");
                break;
            }
        }
    }
}

/// When the command names a Python script under the watch root, record an
/// `Executed:` line the way the watcher records edits. Best effort.
fn log_executed_script(home: &CwHome, command: &[String]) {
    let Ok(root) = default_watch_root() else {
        return;
    };
    let Some(script) = command.iter().find_map(|arg| {
        let path = Path::new(arg);
        (path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION))
            .then(|| path.canonicalize().ok())
            .flatten()
    }) else {
        return;
    };
    if !script.starts_with(&root) {
        return;
    }
    let appender = ActivityLogAppender::new(home.monitor_log());
    if let Err(error) = appender.append(ActivityKind::Executed, &script) {
        warn!("failed to log executed script {}: {error}", script.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_args_stay_with_the_child_command() {
        let args = RunArgs::try_parse_from(["run", "python3", "script.py", "--flag"])
            .expect("parse");
        assert_eq!(
            args.command,
            vec!["python3".to_string(), "script.py".to_string(), "--flag".to_string()]
        );
    }
}
