use serde::Serialize;

use crate::survey::{PathSummary, RiskLevel, ScoreResult, SurveySession};

use super::service::SessionId;

/// Everything a presentation layer needs to render the current step.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub survey_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    pub path: PathSummary,
    pub current_index: usize,
    pub total_questions: usize,
    pub question: Option<QuestionView>,
    pub finished: bool,
    pub result: Option<ResultView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub choices: Vec<String>,
    /// Answer given on an earlier pass, for prefill after going back.
    pub prior_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub score: f64,
    pub max_score: f64,
    pub probability: f64,
    pub percent: u8,
    pub level: RiskLevel,
    pub level_label: &'static str,
}

impl From<&ScoreResult> for ResultView {
    fn from(result: &ScoreResult) -> Self {
        Self {
            score: result.score,
            max_score: result.max_score,
            probability: result.probability,
            percent: result.percent(),
            level: result.level,
            level_label: result.level.label(),
        }
    }
}

impl SessionView {
    pub fn from_session(id: &SessionId, session: &SurveySession) -> Self {
        let definition = session.definition();
        let question = session.current_question().map(|question| QuestionView {
            id: question.id.clone(),
            text: question.text.clone(),
            kind: question.type_name(),
            choices: question.choices().into_iter().map(str::to_string).collect(),
            prior_answer: session.current_answer().map(str::to_string),
        });

        Self {
            session_id: id.0.clone(),
            survey_version: definition.version().to_string(),
            title: definition.meta.title.clone(),
            disclaimer: definition.meta.disclaimer.clone(),
            path: session.path().summary(),
            current_index: session.current_index(),
            total_questions: session.path().questions.len(),
            question,
            finished: session.is_finished(),
            result: session.result().map(ResultView::from),
            warnings: Vec::new(),
        }
    }
}
