//! Pure scoring: answers + path in, risk estimate out. No I/O, no validation.

use super::answers::{AnswerSet, TriAnswer};
use super::definition::{Question, QuestionKind, SurveyPath};
use serde::{Deserialize, Serialize};

/// Slope of the logistic squashing around a ratio of 0.5.
pub const LOGISTIC_SCALE: f64 = 6.0;
/// Probabilities below this are `low`.
pub const MODERATE_THRESHOLD: f64 = 0.3;
/// Probabilities at or above this are `high`.
pub const HIGH_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }

    /// Display label shown to the person filling in the questionnaire.
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "niskie",
            RiskLevel::Moderate => "umiarkowane",
            RiskLevel::High => "wysokie",
        }
    }
}

/// Raw fold of a path's answers before bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTotals {
    pub score: f64,
    pub max_score: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub max_score: f64,
    pub probability: f64,
    pub level: RiskLevel,
}

impl ScoreResult {
    /// Probability as a whole percentage for display.
    pub fn percent(&self) -> u8 {
        (self.probability * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// `score / max_score` with one decimal, as shown next to the estimate.
    pub fn points_summary(&self) -> String {
        format!("{:.1} / {:.1}", self.score, self.max_score)
    }
}

/// Contribution of a single scored question, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub question_id: String,
    pub points: f64,
    pub max_points: f64,
    pub answered: bool,
}

/// Per-question contributions in path order. `noscore` questions are left out.
pub fn score_components(answers: &AnswerSet, path: &SurveyPath) -> Vec<ScoreComponent> {
    path.questions
        .iter()
        .filter(|question| !question.noscore)
        .filter_map(|question| question_component(question, answers.get(&question.id)))
        .collect()
}

pub fn compute_scores(answers: &AnswerSet, path: &SurveyPath) -> ScoreTotals {
    let (score, max_score) = score_components(answers, path)
        .iter()
        .fold((0.0, 0.0), |(score, max), component| {
            (score + component.points, max + component.max_points)
        });

    ScoreTotals {
        score,
        max_score,
        probability: probability_for(score, max_score),
    }
}

/// Logistic transform of `score / max_score`; zero when nothing can be scored.
pub fn probability_for(score: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }

    let ratio = score / max_score;
    let logit = (ratio - 0.5) * LOGISTIC_SCALE;
    1.0 / (1.0 + (-logit).exp())
}

pub fn risk_level(probability: f64) -> RiskLevel {
    if probability < MODERATE_THRESHOLD {
        RiskLevel::Low
    } else if probability < HIGH_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

pub fn evaluate(answers: &AnswerSet, path: &SurveyPath) -> ScoreResult {
    let totals = compute_scores(answers, path);
    ScoreResult {
        score: totals.score,
        max_score: totals.max_score,
        probability: totals.probability,
        level: risk_level(totals.probability),
    }
}

fn question_component(question: &Question, answer: Option<&str>) -> Option<ScoreComponent> {
    let (points, max_points, answered) = match &question.kind {
        QuestionKind::Tri {
            weight_yes,
            weight_maybe,
            weight_no,
        } => {
            let max_points = weight_yes.max(*weight_maybe).max(*weight_no);
            match answer.and_then(TriAnswer::parse) {
                Some(TriAnswer::Yes) => (*weight_yes, max_points, true),
                Some(TriAnswer::DontKnow) => (*weight_maybe, max_points, true),
                Some(TriAnswer::No) => (*weight_no, max_points, true),
                None => (0.0, max_points, false),
            }
        }
        QuestionKind::Select { options } => {
            let max_points = options
                .iter()
                .map(|option| option.weight)
                .reduce(f64::max)
                .unwrap_or(0.0);
            let chosen = answer.and_then(|value| options.iter().find(|option| option.label == value));
            match chosen {
                Some(option) => (option.weight, max_points, true),
                None => (0.0, max_points, false),
            }
        }
        QuestionKind::Unsupported => return None,
    };

    Some(ScoreComponent {
        question_id: question.id.clone(),
        points,
        max_points,
        answered,
    })
}
