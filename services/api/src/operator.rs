use chrono::Local;
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use triage::error::AppError;
use triage::persistence::{write_csv, ResponseRecord, SqliteResponseStore};
use triage::survey::{
    evaluate, score_components, AnswerSet, QuestionnaireDefinition, RiskLevel, ScoreComponent,
};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Questionnaire definition (JSON)
    #[arg(long)]
    pub(crate) survey: PathBuf,
    /// Path id or label to score against
    #[arg(long)]
    pub(crate) path: String,
    /// JSON object mapping question ids to answer values
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ResponsesArgs {
    /// Local response store to read
    #[arg(long, default_value = "responses.sqlite3")]
    pub(crate) database: PathBuf,
    /// Number of most recent records to show
    #[arg(long, default_value_t = 20)]
    pub(crate) limit: usize,
    /// Write the records to this CSV file instead of printing them
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreReport {
    pub(crate) version: String,
    pub(crate) path_id: String,
    pub(crate) path_label: String,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) probability: f64,
    pub(crate) percent: u8,
    pub(crate) level: RiskLevel,
    pub(crate) level_label: &'static str,
    pub(crate) components: Vec<ScoreComponent>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let report = build_score_report(&args.survey, &args.path, &args.answers)?;
    let stdout = std::io::stdout();
    render_score_report(&report, args.json, &mut stdout.lock())
}

pub(crate) fn build_score_report(
    survey: &Path,
    path: &str,
    answers: &Path,
) -> Result<ScoreReport, AppError> {
    let definition = QuestionnaireDefinition::from_path(survey)?;
    let selected = definition
        .resolve_path(path)
        .ok_or_else(|| AppError::Input(format!("unknown path '{path}'")))?;

    let reader = BufReader::new(File::open(answers)?);
    let answers: AnswerSet = serde_json::from_reader(reader).map_err(|err| {
        AppError::Input(format!(
            "answers file {} is not a JSON object of strings: {err}",
            answers.display()
        ))
    })?;

    let result = evaluate(&answers, selected);
    Ok(ScoreReport {
        version: definition.version().to_string(),
        path_id: selected.id.clone(),
        path_label: selected.label.clone(),
        score: result.score,
        max_score: result.max_score,
        probability: result.probability,
        percent: result.percent(),
        level: result.level,
        level_label: result.level.label(),
        components: score_components(&answers, selected),
    })
}

pub(crate) fn render_score_report<W: Write>(
    report: &ScoreReport,
    json: bool,
    output: &mut W,
) -> Result<(), AppError> {
    if json {
        let body =
            serde_json::to_string_pretty(report).map_err(|err| AppError::Input(err.to_string()))?;
        writeln!(output, "{body}")?;
        return Ok(());
    }

    writeln!(output, "{} ({})", report.path_label, report.path_id)?;
    for component in &report.components {
        let marker = if component.answered { "" } else { " (brak odpowiedzi)" };
        writeln!(
            output,
            "  {:<12} {:>5.1} / {:<5.1}{}",
            component.question_id, component.points, component.max_points, marker
        )?;
    }
    writeln!(output, "Szacowane ryzyko: {}%", report.percent)?;
    writeln!(
        output,
        "Suma punktów: {:.1} / {:.1}",
        report.score, report.max_score
    )?;
    writeln!(output, "Poziom: {}", report.level_label)?;
    writeln!(output, "Wersja: {}", report.version)?;
    Ok(())
}

pub(crate) fn run_responses(args: ResponsesArgs) -> Result<(), AppError> {
    let records = load_recent(&args.database, args.limit)?;

    match args.csv {
        Some(target) => {
            write_csv(&records, File::create(&target)?)?;
            println!("{} records written to {}", records.len(), target.display());
            Ok(())
        }
        None => {
            let stdout = std::io::stdout();
            render_records(&records, &mut stdout.lock())
        }
    }
}

/// Most recent records in chronological order.
pub(crate) fn load_recent(database: &Path, limit: usize) -> Result<Vec<ResponseRecord>, AppError> {
    if !database.exists() {
        return Err(AppError::Input(format!(
            "no response store at {}",
            database.display()
        )));
    }

    let store = SqliteResponseStore::open(database)?;
    let mut records = store.recent(limit)?;
    records.reverse();
    Ok(records)
}

pub(crate) fn render_records<W: Write>(
    records: &[ResponseRecord],
    output: &mut W,
) -> Result<(), AppError> {
    if records.is_empty() {
        writeln!(output, "no stored responses")?;
        return Ok(());
    }

    for record in records {
        let outcome = match &record.result {
            Some(result) => format!(
                "{} {}% {}",
                result.points_summary(),
                result.percent(),
                result.level.as_str()
            ),
            None if record.finished => "finished".to_string(),
            None => "in progress".to_string(),
        };
        writeln!(
            output,
            "{}  {}  {}@{}  q{}  {} answers  {}",
            record
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            record.user_id,
            record.path_id,
            record.survey_version,
            record.q_idx,
            record.answers.len(),
            outcome
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage::survey::TraversalSnapshot;

    const SURVEY: &str = r#"{
        "meta": {"version": "ops-1"},
        "paths": [
            {"id": "phishing", "label": "Phishing", "questions": [
                {"id": "q1", "text": "Kliknięto link?", "type": "tri", "weight_yes": 2, "weight_maybe": 1},
                {"id": "q2", "text": "Co podano?", "type": "select", "options": [
                    {"label": "nic", "weight": 0},
                    {"label": "hasło", "weight": 3}
                ]}
            ]}
        ]
    }"#;

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("fixture written");
        path
    }

    #[test]
    fn score_report_resolves_path_by_label() {
        let dir = tempfile::tempdir().expect("temp dir");
        let survey = write_file(dir.path(), "survey.json", SURVEY);
        let answers = write_file(dir.path(), "answers.json", r#"{"q1": "nie wiem"}"#);

        let report = build_score_report(&survey, "Phishing", &answers).expect("report");

        assert_eq!(report.path_id, "phishing");
        assert_eq!(report.score, 1.0);
        assert_eq!(report.max_score, 5.0);
        assert_eq!(report.level, RiskLevel::Low);
        assert_eq!(report.components.len(), 2);
        assert!(!report.components[1].answered);

        let mut output = Vec::new();
        render_score_report(&report, false, &mut output).expect("renders");
        let text = String::from_utf8(output).expect("utf8");
        assert!(text.contains("Suma punktów: 1.0 / 5.0"));
        assert!(text.contains("Poziom: niskie"));
        assert!(text.contains("(brak odpowiedzi)"));
    }

    #[test]
    fn score_report_renders_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let survey = write_file(dir.path(), "survey.json", SURVEY);
        let answers = write_file(dir.path(), "answers.json", r#"{"q1": "tak", "q2": "hasło"}"#);

        let report = build_score_report(&survey, "phishing", &answers).expect("report");
        let mut output = Vec::new();
        render_score_report(&report, true, &mut output).expect("renders");

        let json: serde_json::Value = serde_json::from_slice(&output).expect("json");
        assert_eq!(json["level"], "high");
        assert_eq!(json["percent"], 95);
        assert_eq!(json["components"][1]["points"], 3.0);
    }

    #[test]
    fn unknown_path_and_bad_answers_are_input_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let survey = write_file(dir.path(), "survey.json", SURVEY);
        let answers = write_file(dir.path(), "answers.json", r#"{"q1": "tak"}"#);
        let broken = write_file(dir.path(), "broken.json", r#"["tak"]"#);

        assert!(matches!(
            build_score_report(&survey, "ransomware", &answers),
            Err(AppError::Input(_))
        ));
        assert!(matches!(
            build_score_report(&survey, "phishing", &broken),
            Err(AppError::Input(_))
        ));
    }

    #[test]
    fn stored_records_are_listed_oldest_first() {
        let dir = tempfile::tempdir().expect("temp dir");
        let database = dir.path().join("responses.sqlite3");
        let store = SqliteResponseStore::open(&database).expect("store");
        for q_idx in 1..=3 {
            let record = ResponseRecord::from_snapshot(
                "session-9",
                "ops-1",
                TraversalSnapshot {
                    selected_path_id: "phishing".to_string(),
                    current_index: q_idx,
                    answers: [("q1", "tak")].into_iter().collect(),
                    finished: false,
                    result: None,
                },
            );
            store.append(&record).expect("append");
        }
        drop(store);

        let records = load_recent(&database, 2).expect("records");
        let indexes: Vec<_> = records.iter().map(|record| record.q_idx).collect();
        assert_eq!(indexes, vec![2, 3]);

        let mut output = Vec::new();
        render_records(&records, &mut output).expect("renders");
        let text = String::from_utf8(output).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("session-9  phishing@ops-1  q3  1 answers  in progress"));
    }

    #[test]
    fn missing_database_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");

        let err = load_recent(&dir.path().join("absent.sqlite3"), 5).expect_err("missing");

        assert!(matches!(err, AppError::Input(_)));
    }
}
