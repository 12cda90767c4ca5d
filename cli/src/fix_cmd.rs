use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use cw_core::ContextAssembler;
use cw_core::CwHome;
use cw_core::LogSelection;
use cw_core::context::AssembleError;
use cw_core::fix::FixClient;
use cw_core::fix::open_in_editor;
use cw_core::fix::parse_fix_output;
use cw_core::fix::save_solution;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct FixArgs {
    /// Number of recently touched files to include in the context.
    #[arg(value_name = "N")]
    n: usize,
    /// Extra instruction forwarded with the fix request.
    instruction: Option<String>,
    /// Send only one captured log instead of both.
    #[arg(long, value_enum, value_name = "LOG")]
    only: Option<OnlyLog>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnlyLog {
    /// Only the error log tail.
    Err,
    /// Only the console output tail.
    Console,
}

pub async fn run(args: FixArgs) -> Result<()> {
    let home = CwHome::find()?;
    home.ensure_dir()
        .with_context(|| format!("failed to create {}", home.dir().display()))?;

    let bundle = match ContextAssembler::new(&home).assemble(args.n, &[]) {
        Ok(bundle) => bundle,
        Err(AssembleError::NothingToAnalyze) => {
            println!("No recent output or errors found.");
            return Ok(());
        }
        Err(error) => return Err(error).context("failed to assemble context"),
    };

    println!("Recent files:");
    for path in &bundle.recent_files {
        println!("  {}", path.display());
    }
    for failure in &bundle.read_failures {
        warn!("skipping {}: {}", failure.path.display(), failure.error);
    }

    let selection = match args.only {
        Some(OnlyLog::Err) => LogSelection::ErrorsOnly,
        Some(OnlyLog::Console) => LogSelection::ConsoleOnly,
        None => LogSelection::Both,
    };
    let request = bundle.to_fix_request(selection, args.instruction);

    let client = FixClient::from_env()?;
    println!("\n--- Generating fix ---");
    let reply = client
        .generate_fix(&request)
        .await
        .context("fix request failed")?;
    println!("\n--- Suggested fix ---\n{reply}");

    let parsed = parse_fix_output(&reply);
    if parsed.has_code {
        let solution_path = home.solution_path();
        save_solution(&solution_path, &parsed.text)
            .with_context(|| format!("failed to save {}", solution_path.display()))?;
        println!("Saved solution to {}", solution_path.display());
        open_in_editor(&solution_path);
    } else {
        println!("\n--- Solution ---\n{}", parsed.text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_filter_parses_both_variants() {
        let args = FixArgs::try_parse_from(["fix", "3", "--only", "err"]).expect("parse");
        assert!(matches!(args.only, Some(OnlyLog::Err)));

        let args = FixArgs::try_parse_from(["fix", "3", "--only", "console"]).expect("parse");
        assert!(matches!(args.only, Some(OnlyLog::Console)));
    }

    #[test]
    fn instruction_is_optional() {
        let args = FixArgs::try_parse_from(["fix", "5"]).expect("parse");
        assert_eq!(args.n, 5);
        assert!(args.instruction.is_none());
        assert!(args.only.is_none());
    }
}
