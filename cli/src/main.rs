mod fix_cmd;
mod run_cmd;
mod watch_cmd;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use tracing_subscriber::EnvFilter;

/// Developer-machine diagnostic pipeline: capture console output and errors,
/// track recently touched source files, and assemble both into fix requests.
#[derive(Debug, Parser)]
#[command(name = "cw", version)]
struct Cli {
    #[command(subcommand)]
    command: CwCommand,
}

#[derive(Debug, Subcommand)]
enum CwCommand {
    /// Watch a workspace root and record Python file create/modify events.
    Watch(watch_cmd::WatchArgs),
    /// Run a command with its stdout/stderr captured into the cw logs.
    Run(run_cmd::RunArgs),
    /// Assemble captured context and request a fix for the latest error.
    Fix(fix_cmd::FixArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        CwCommand::Watch(args) => watch_cmd::run(args).await,
        CwCommand::Run(args) => {
            let code = run_cmd::run(args)?;
            std::process::exit(code);
        }
        CwCommand::Fix(args) => fix_cmd::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_asserts_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn fix_accepts_count_instruction_and_only_filter() {
        let cli = Cli::try_parse_from(["cw", "fix", "3", "use pathlib", "--only", "err"])
            .expect("parse");
        assert!(matches!(cli.command, CwCommand::Fix(_)));
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["cw", "run"]).is_err());
    }
}
