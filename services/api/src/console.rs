use crate::infra::{build_recorder, load_definition};
use chrono::Utc;
use clap::Args;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use triage::config::AppConfig;
use triage::error::AppError;
use triage::export::SurveyExport;
use triage::gate::AccessGate;
use triage::persistence::{ResponseRecord, ResponseRecorder};
use triage::survey::{QuestionnaireDefinition, ScoreResult, SurveySession, TraversalError};
use triage::telemetry;

#[derive(Args, Debug, Default)]
pub(crate) struct ConsoleArgs {
    /// Path id or label to start on. Prompts when omitted.
    #[arg(long)]
    pub(crate) path: Option<String>,
    /// Access code. Prompts when omitted.
    #[arg(long)]
    pub(crate) access_code: Option<String>,
    /// Write the export JSON of a finished run to this file
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
}

#[derive(Debug)]
pub(crate) enum ConsoleOutcome {
    Finished(Box<SurveySession>),
    Quit,
    Denied,
}

pub(crate) async fn run_console(args: ConsoleArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_for_console(&config.telemetry.log_level)?;

    let definition = load_definition(&config)?;
    let gate = AccessGate::new(config.access.code.clone());
    let recorder = build_recorder(&config);
    let user_id = format!("console-{}", Utc::now().timestamp_millis());

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock(), &recorder, user_id);
    let outcome = console
        .drive(
            definition,
            &gate,
            args.path.as_deref(),
            args.access_code.as_deref(),
        )
        .await?;

    match outcome {
        ConsoleOutcome::Finished(session) => {
            if let Some(target) = args.export {
                let export =
                    SurveyExport::from_session(&session).map_err(traversal_to_app_error)?;
                let body = export
                    .to_json_pretty()
                    .map_err(|err| AppError::Input(err.to_string()))?;
                std::fs::write(&target, body)?;
                info!(path = %target.display(), "survey export written");
                println!("Zapisano wynik: {}", target.display());
            }
            Ok(())
        }
        ConsoleOutcome::Quit => Ok(()),
        ConsoleOutcome::Denied => Err(AppError::Input("access code rejected".to_string())),
    }
}

/// Line-oriented front end over a [`SurveySession`].
pub(crate) struct Console<'a, R, W> {
    input: R,
    output: W,
    recorder: &'a ResponseRecorder,
    user_id: String,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub(crate) fn new(input: R, output: W, recorder: &'a ResponseRecorder, user_id: String) -> Self {
        Self {
            input,
            output,
            recorder,
            user_id,
        }
    }

    pub(crate) async fn drive(
        &mut self,
        definition: Arc<QuestionnaireDefinition>,
        gate: &AccessGate,
        path: Option<&str>,
        access_code: Option<&str>,
    ) -> Result<ConsoleOutcome, AppError> {
        let submitted = match access_code {
            Some(code) => code.to_string(),
            None => match self.prompt("Kod dostępu: ")? {
                Some(code) => code,
                None => return Ok(ConsoleOutcome::Quit),
            },
        };
        if !gate.verify(&submitted) {
            writeln!(self.output, "Nieprawidłowy kod dostępu.")?;
            return Ok(ConsoleOutcome::Denied);
        }

        if let Some(title) = &definition.meta.title {
            writeln!(self.output, "{title}")?;
        }
        if let Some(disclaimer) = &definition.meta.disclaimer {
            writeln!(self.output, "{disclaimer}")?;
        }

        let mut session =
            SurveySession::new(definition.clone(), None).map_err(traversal_to_app_error)?;

        let path_id = match path {
            Some(wanted) => definition
                .resolve_path(wanted)
                .map(|path| path.id.clone())
                .ok_or_else(|| AppError::Input(format!("unknown path '{wanted}'")))?,
            None if definition.paths.len() > 1 => match self.choose_path(&definition)? {
                Some(id) => id,
                None => return Ok(ConsoleOutcome::Quit),
            },
            None => session.selected_path_id().to_string(),
        };
        session
            .select_path(&path_id)
            .map_err(traversal_to_app_error)?;

        loop {
            if session.is_finished() {
                if let Some(result) = session.result().copied() {
                    self.render_result(&result, definition.version())?;
                }
                match self.prompt("[e] popraw odpowiedzi, [r] od nowa, [q] zakończ: ")? {
                    Some(choice) if choice == "e" => {
                        if let Err(err) = session.edit() {
                            writeln!(self.output, "{err}")?;
                            return Ok(ConsoleOutcome::Finished(Box::new(session)));
                        }
                    }
                    Some(choice) if choice == "r" => {
                        session.reset();
                        if session.is_finished() {
                            return Ok(ConsoleOutcome::Finished(Box::new(session)));
                        }
                    }
                    _ => return Ok(ConsoleOutcome::Finished(Box::new(session))),
                }
                continue;
            }

            let Some(question) = session.current_question().cloned() else {
                return Ok(ConsoleOutcome::Finished(Box::new(session)));
            };
            let (position, total) = session.progress();
            writeln!(self.output)?;
            writeln!(self.output, "[{}/{}] {}", position + 1, total, question.text)?;
            let choices = question.choices();
            for (index, choice) in choices.iter().enumerate() {
                let marker = if session.current_answer() == Some(*choice) {
                    " *"
                } else {
                    ""
                };
                writeln!(self.output, "  {}) {}{}", index + 1, choice, marker)?;
            }

            let Some(line) = self.prompt("> ")? else {
                return Ok(ConsoleOutcome::Quit);
            };
            if choices.contains(&line.as_str()) {
                self.answer(&mut session, &line).await?;
                continue;
            }

            match line.as_str() {
                "q" => return Ok(ConsoleOutcome::Quit),
                "b" => {
                    if let Err(err) = session.go_back() {
                        writeln!(self.output, "{}", traversal_message(&err))?;
                    }
                }
                "r" => session.reset(),
                raw => match parse_choice(raw, &choices) {
                    Some(value) => self.answer(&mut session, &value).await?,
                    None => writeln!(
                        self.output,
                        "Nieprawidłowy wybór. Podaj numer od 1 do {}, b, r lub q.",
                        choices.len()
                    )?,
                },
            }
        }
    }

    fn choose_path(
        &mut self,
        definition: &QuestionnaireDefinition,
    ) -> Result<Option<String>, AppError> {
        loop {
            writeln!(self.output, "Wybierz rodzaj zdarzenia:")?;
            for (index, path) in definition.paths.iter().enumerate() {
                writeln!(self.output, "  {}) {}", index + 1, path.label)?;
            }
            let Some(line) = self.prompt("> ")? else {
                return Ok(None);
            };
            if line == "q" {
                return Ok(None);
            }

            let chosen = line
                .parse::<usize>()
                .ok()
                .and_then(|number| number.checked_sub(1))
                .and_then(|index| definition.paths.get(index))
                .or_else(|| definition.resolve_path(&line));
            match chosen {
                Some(path) => return Ok(Some(path.id.clone())),
                None => writeln!(self.output, "Nieznany rodzaj zdarzenia: {line}")?,
            }
        }
    }

    async fn answer(&mut self, session: &mut SurveySession, value: &str) -> Result<(), AppError> {
        match session.answer(value) {
            Ok(_) => self.record(session).await,
            Err(err) => {
                writeln!(self.output, "{}", traversal_message(&err))?;
                Ok(())
            }
        }
    }

    async fn record(&mut self, session: &SurveySession) -> Result<(), AppError> {
        let record = ResponseRecord::from_snapshot(
            self.user_id.clone(),
            session.definition().version(),
            session.snapshot(),
        );
        let report = self.recorder.record(&record).await;
        for warning in report.warnings() {
            writeln!(self.output, "Uwaga: odpowiedź nie została zapisana ({warning})")?;
        }
        Ok(())
    }

    fn render_result(&mut self, result: &ScoreResult, version: &str) -> Result<(), AppError> {
        writeln!(self.output)?;
        writeln!(self.output, "Szacowane ryzyko: {}%", result.percent())?;
        writeln!(self.output, "Suma punktów: {}", result.points_summary())?;
        writeln!(self.output, "Poziom: {}", result.level.label())?;
        writeln!(self.output, "Wersja: {version}")?;
        Ok(())
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>, AppError> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Accepts the literal option text or a 1-based option number. Option text always wins,
/// so an option labelled `q`, `b`, `r` or `2` is picked by typing it; console commands
/// and numbering only apply to input that matches no option.
fn parse_choice(raw: &str, choices: &[&str]) -> Option<String> {
    if let Some(choice) = choices.iter().find(|choice| **choice == raw) {
        return Some(choice.to_string());
    }
    raw.parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| choices.get(index))
        .map(|choice| choice.to_string())
}

fn traversal_message(err: &TraversalError) -> &'static str {
    match err {
        TraversalError::AtFirstQuestion => "To jest pierwsze pytanie.",
        TraversalError::AlreadyFinished => "Ankieta jest już zakończona.",
        TraversalError::InvalidAnswer { .. } => "Ta odpowiedź nie pasuje do pytania.",
        TraversalError::NotFinished => "Ankieta nie jest jeszcze zakończona.",
        TraversalError::UnknownPath(_) | TraversalError::NoPaths => "Nieznany rodzaj zdarzenia.",
    }
}

fn traversal_to_app_error(err: TraversalError) -> AppError {
    AppError::Input(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::io::Cursor;
    use triage::persistence::MemorySink;
    use triage::survey::RiskLevel;

    fn definition() -> Arc<QuestionnaireDefinition> {
        let raw = r#"{
            "meta": {"version": "cli-1", "title": "Ocena ryzyka"},
            "paths": [
                {"id": "phishing", "label": "Phishing", "questions": [
                    {"id": "q1", "text": "Kliknięto link?", "type": "tri", "weight_yes": 2, "weight_maybe": 1},
                    {"id": "q2", "text": "Co podano?", "type": "select", "options": [
                        {"label": "nic", "weight": 0},
                        {"label": "hasło", "weight": 3}
                    ]}
                ]},
                {"id": "malware", "label": "Malware", "questions": [
                    {"id": "m1", "text": "Uruchomiono plik?", "type": "tri", "weight_yes": 4}
                ]},
                {"id": "letters", "label": "Litery", "questions": [
                    {"id": "l1", "text": "Który wariant?", "type": "select", "options": [
                        {"label": "b", "weight": 0},
                        {"label": "q", "weight": 1},
                        {"label": "1", "weight": 2}
                    ]},
                    {"id": "l2", "text": "Który numer?", "type": "select", "options": [
                        {"label": "r", "weight": 0},
                        {"label": "2", "weight": 1}
                    ]}
                ]}
            ]
        }"#;
        Arc::new(QuestionnaireDefinition::from_json_str(raw).expect("fixture parses"))
    }

    fn gate() -> AccessGate {
        AccessGate::new(SecretString::new("abc".to_string()))
    }

    async fn drive(
        script: &str,
        path: Option<&str>,
        access_code: Option<&str>,
    ) -> (ConsoleOutcome, String, MemorySink) {
        let memory = MemorySink::default();
        let recorder = ResponseRecorder::new().with_sink(Arc::new(memory.clone()));
        let mut output = Vec::new();
        let outcome = {
            let mut console = Console::new(
                Cursor::new(script.as_bytes().to_vec()),
                &mut output,
                &recorder,
                "console-test".to_string(),
            );
            console
                .drive(definition(), &gate(), path, access_code)
                .await
                .expect("console runs")
        };
        (outcome, String::from_utf8(output).expect("utf8"), memory)
    }

    #[tokio::test]
    async fn wrong_code_is_denied() {
        let (outcome, output, memory) = drive("", None, Some("abd")).await;

        assert!(matches!(outcome, ConsoleOutcome::Denied));
        assert!(output.contains("Nieprawidłowy kod dostępu."));
        assert!(memory.records().is_empty());
    }

    #[tokio::test]
    async fn code_is_prompted_when_not_given() {
        let (outcome, output, _) = drive("abc\nq\n", Some("phishing"), None).await;

        assert!(matches!(outcome, ConsoleOutcome::Quit));
        assert!(output.starts_with("Kod dostępu: "));
        assert!(output.contains("[1/2] Kliknięto link?"));
    }

    #[tokio::test]
    async fn full_run_with_a_changed_answer() {
        let script = "2\nb\n1\nhasło\nq\n";
        let (outcome, output, memory) = drive(script, Some("Phishing"), Some("abc")).await;

        let session = match outcome {
            ConsoleOutcome::Finished(session) => session,
            other => panic!("expected a finished run, got {other:?}"),
        };
        assert_eq!(session.answers().get("q1"), Some("nie"));
        let result = session.result().copied().expect("scored");
        assert_eq!(result.score, 3.0);
        assert_eq!(result.max_score, 5.0);
        assert_eq!(result.level, RiskLevel::Moderate);

        assert!(output.contains("  2) tak *"));
        assert!(output.contains("Suma punktów: 3.0 / 5.0"));
        assert!(output.contains("Poziom: umiarkowane"));
        assert!(output.contains("Wersja: cli-1"));

        let records = memory.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.user_id == "console-test"));
        assert!(records[2].finished);
    }

    #[tokio::test]
    async fn invalid_choices_and_first_question_back_are_reported() {
        let (outcome, output, memory) = drive("7\nb\nq\n", Some("malware"), Some("abc")).await;

        assert!(matches!(outcome, ConsoleOutcome::Quit));
        assert!(output.contains("Nieprawidłowy wybór. Podaj numer od 1 do 3, b, r lub q."));
        assert!(output.contains("To jest pierwsze pytanie."));
        assert!(memory.records().is_empty());
    }

    #[tokio::test]
    async fn path_is_chosen_from_a_numbered_list() {
        let (outcome, output, _) = drive("9\n2\n2\n\n", None, Some("abc")).await;

        assert!(output.contains("Wybierz rodzaj zdarzenia:"));
        assert!(output.contains("Nieznany rodzaj zdarzenia: 9"));
        assert!(output.contains("Uruchomiono plik?"));
        let session = match outcome {
            ConsoleOutcome::Finished(session) => session,
            other => panic!("expected a finished run, got {other:?}"),
        };
        assert_eq!(session.selected_path_id(), "malware");
        assert_eq!(session.result().map(|r| r.percent()), Some(95));
    }

    #[tokio::test]
    async fn edit_reopens_a_finished_run() {
        let (outcome, _, memory) = drive("1\ne\n2\nq\n", Some("malware"), Some("abc")).await;

        let session = match outcome {
            ConsoleOutcome::Finished(session) => session,
            other => panic!("expected a finished run, got {other:?}"),
        };
        assert_eq!(session.answers().get("m1"), Some("tak"));
        assert_eq!(memory.records().len(), 2);
    }

    #[tokio::test]
    async fn option_text_wins_over_commands_and_numbers() {
        let (outcome, _, memory) = drive("q\nb\n1\nr\n\n", Some("letters"), Some("abc")).await;

        let session = match outcome {
            ConsoleOutcome::Finished(session) => session,
            other => panic!("expected a finished run, got {other:?}"),
        };
        assert_eq!(session.answers().get("l1"), Some("1"));
        assert_eq!(session.answers().get("l2"), Some("r"));
        assert_eq!(memory.records().len(), 3);
    }

    #[test]
    fn choices_accept_numbers_and_literals() {
        let choices = ["nie", "tak", "nie wiem"];

        assert_eq!(parse_choice("3", &choices).as_deref(), Some("nie wiem"));
        assert_eq!(parse_choice("tak", &choices).as_deref(), Some("tak"));
        assert_eq!(parse_choice("0", &choices), None);
        assert_eq!(parse_choice("4", &choices), None);
        assert_eq!(parse_choice("Tak", &choices), None);

        let numbered = ["2", "q", "1"];
        assert_eq!(parse_choice("1", &numbered).as_deref(), Some("1"));
        assert_eq!(parse_choice("3", &numbered).as_deref(), Some("1"));
        assert_eq!(parse_choice("q", &numbered).as_deref(), Some("q"));
    }
}
