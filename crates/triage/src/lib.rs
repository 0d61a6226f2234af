//! Weighted triage questionnaire.
//!
//! A questionnaire definition describes a handful of incident paths, each a linear list
//! of questions. A [`survey::SurveySession`] walks one path, the scoring engine folds the
//! answers into a logistic risk estimate, and every accepted answer is offered to the
//! configured [`persistence::ResponseSink`]s on a best-effort basis.

pub mod config;
pub mod error;
pub mod export;
pub mod gate;
pub mod persistence;
pub mod survey;
pub mod telemetry;
pub mod workflow;
