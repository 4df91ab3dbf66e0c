mod commands;

use clap::Parser;
use dynadiag_core::domain::DiagError;

const PROGRAM_NAME: &str = "dynadiag";

pub fn run_from_env() -> i32 {
    let args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(std::env::args().skip(1))
        .collect::<Vec<_>>();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_diag_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            if let Some(summary_line) = diagnostic.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            diagnostic.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "dynadiag",
    version,
    about = "Post-run diagnostics for explicit solver result directories"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Analyze a result directory and report findings
    Analyze(commands::AnalyzeArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Analyze(args) => commands::run_analyze_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Analysis(DiagError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_diag_error(&self) -> DiagError {
        match self {
            Self::Usage(message) => DiagError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Analysis(error) => error.clone(),
            Self::Internal(error) => DiagError::internal("INTERNAL.CLI", format!("{error:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, parse_and_dispatch};
    use dynadiag_core::domain::{DiagError, DiagErrorCategory};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn help_exits_successfully() {
        let code = parse_and_dispatch(args(&["dynadiag", "--help"])).expect("help should render");
        assert_eq!(code, 0);
    }

    #[test]
    fn unknown_subcommand_is_a_usage_error() {
        let error = parse_and_dispatch(args(&["dynadiag", "simulate"]))
            .expect_err("unknown subcommand should fail");
        assert!(matches!(error, CliError::Usage(_)));
        assert_eq!(
            error.as_diag_error().category(),
            DiagErrorCategory::InputValidationError
        );
        assert_eq!(error.as_diag_error().exit_code(), 2);
    }

    #[test]
    fn internal_errors_map_to_internal_exit_code() {
        let error = CliError::Internal(anyhow::anyhow!("report serialization failed"));
        let diagnostic = error.as_diag_error();
        assert_eq!(diagnostic.category(), DiagErrorCategory::InternalError);
        assert_eq!(diagnostic.placeholder(), "INTERNAL.CLI");
        assert_eq!(diagnostic.exit_code(), 5);
    }

    #[test]
    fn analysis_errors_keep_their_own_exit_code() {
        let error = CliError::Analysis(DiagError::io_system("IO.JSON_REPORT_WRITE", "denied"));
        assert_eq!(error.as_diag_error().exit_code(), 3);
    }
}
