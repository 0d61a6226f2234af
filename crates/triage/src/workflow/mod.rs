//! Session registry and HTTP surface over the survey core.

pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use router::session_router;
pub use service::{ServiceError, SessionId, TriageService};
pub use views::{QuestionView, ResultView, SessionView};
