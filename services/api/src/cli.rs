use crate::console::{run_console, ConsoleArgs};
use crate::operator::{run_responses, run_score, ResponsesArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use triage::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "triage-api",
    about = "Serve, run and inspect the weighted triage questionnaire",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk the questionnaire interactively in the terminal
    Run(ConsoleArgs),
    /// Score a stored answer set against a definition file
    Score(ScoreArgs),
    /// List stored response records or dump them to CSV
    Responses(ResponsesArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run(args) => run_console(args).await,
        Command::Score(args) => run_score(args),
        Command::Responses(args) => run_responses(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["triage-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn score_requires_survey_path_and_answers() {
        let err = Cli::try_parse_from(["triage-api", "score", "--path", "phishing"])
            .expect_err("missing arguments");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "triage-api",
            "score",
            "--survey",
            "survey.json",
            "--path",
            "phishing",
            "--answers",
            "answers.json",
            "--json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.path, "phishing");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_accepts_path_code_and_export() {
        let cli = Cli::try_parse_from([
            "triage-api",
            "run",
            "--path",
            "malware",
            "--access-code",
            "abc",
            "--export",
            "out.json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.path.as_deref(), Some("malware"));
                assert_eq!(args.access_code.as_deref(), Some("abc"));
                assert!(args.export.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
