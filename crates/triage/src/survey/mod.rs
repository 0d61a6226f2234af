//! Questionnaire model, scoring engine and traversal controller.

pub mod answers;
pub mod definition;
pub mod scoring;
pub mod traversal;

pub use answers::{AnswerSet, TriAnswer};
pub use definition::{
    DefinitionError, PathSummary, Question, QuestionKind, QuestionnaireDefinition,
    SelectOption, SurveyMeta, SurveyPath,
};
pub use scoring::{
    compute_scores, evaluate, risk_level, score_components, RiskLevel, ScoreComponent,
    ScoreResult, ScoreTotals,
};
pub use traversal::{Advance, SurveySession, TraversalError, TraversalSnapshot};
