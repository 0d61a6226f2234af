use super::ResponseRecord;
use std::io::Write;

const HEADER: [&str; 11] = [
    "created_at",
    "user_id",
    "survey_version",
    "path_id",
    "q_idx",
    "finished",
    "score",
    "max_score",
    "probability",
    "level",
    "answers",
];

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode answers: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes records as CSV, one row per record; answers are embedded as a JSON object.
pub fn write_csv<W: Write>(records: &[ResponseRecord], writer: W) -> Result<(), DumpError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for record in records {
        let answers = serde_json::to_string(&record.answers)?;
        let (score, max_score, probability, level) = match &record.result {
            Some(result) => (
                result.score.to_string(),
                result.max_score.to_string(),
                format!("{:.4}", result.probability),
                result.level.as_str().to_string(),
            ),
            None => Default::default(),
        };

        csv.write_record([
            record.created_at.to_rfc3339(),
            record.user_id.clone(),
            record.survey_version.clone(),
            record.path_id.clone(),
            record.q_idx.to_string(),
            record.finished.to_string(),
            score,
            max_score,
            probability,
            level,
            answers,
        ])?;
    }

    csv.flush()?;
    Ok(())
}
