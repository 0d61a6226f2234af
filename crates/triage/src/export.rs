use crate::survey::{AnswerSet, SurveySession, TraversalError};
use serde::{Deserialize, Serialize};

/// Downloadable summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyExport {
    pub path_label: String,
    pub version: String,
    pub responses: AnswerSet,
    pub score: f64,
    pub max_score: f64,
    pub probability: f64,
}

impl SurveyExport {
    pub fn from_session(session: &SurveySession) -> Result<Self, TraversalError> {
        let result = session.result().ok_or(TraversalError::NotFinished)?;

        Ok(Self {
            path_label: session.path().label.clone(),
            version: session.definition().version().to_string(),
            responses: session.answers().clone(),
            score: result.score,
            max_score: result.max_score,
            probability: result.probability,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested download name, e.g. `wynik_witnessed.json`.
    pub fn file_name(path_id: &str) -> String {
        format!("wynik_{path_id}.json")
    }
}
