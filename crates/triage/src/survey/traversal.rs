use super::answers::AnswerSet;
use super::definition::{Question, QuestionnaireDefinition, SurveyPath};
use super::scoring::{evaluate, ScoreResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Per-user progress through one path of a shared definition.
///
/// A zero-question path has nothing to ask, so it is finished as soon as it is
/// selected (and again after every reset) with a zero score.
#[derive(Debug, Clone)]
pub struct SurveySession {
    definition: Arc<QuestionnaireDefinition>,
    path_index: usize,
    current_index: usize,
    answers: AnswerSet,
    finished: bool,
    result: Option<ScoreResult>,
}

/// What happened after an accepted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next { index: usize },
    Finished(ScoreResult),
}

/// State offered to persistence after each accepted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalSnapshot {
    pub selected_path_id: String,
    pub current_index: usize,
    pub answers: AnswerSet,
    pub finished: bool,
    pub result: Option<ScoreResult>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TraversalError {
    #[error("questionnaire defines no paths")]
    NoPaths,
    #[error("unknown path '{0}'")]
    UnknownPath(String),
    #[error("survey run is already finished")]
    AlreadyFinished,
    #[error("survey run is not finished yet")]
    NotFinished,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("'{value}' is not a valid answer to question '{question_id}'")]
    InvalidAnswer { question_id: String, value: String },
}

impl SurveySession {
    /// Starts on `path_id`, or on the first path of the definition when none is given.
    pub fn new(
        definition: Arc<QuestionnaireDefinition>,
        path_id: Option<&str>,
    ) -> Result<Self, TraversalError> {
        let path_index = match path_id {
            Some(id) => definition
                .path_index(id)
                .ok_or_else(|| TraversalError::UnknownPath(id.to_string()))?,
            None if definition.paths.is_empty() => return Err(TraversalError::NoPaths),
            None => 0,
        };

        let mut session = Self {
            definition,
            path_index,
            current_index: 0,
            answers: AnswerSet::new(),
            finished: false,
            result: None,
        };
        session.restart();
        Ok(session)
    }

    pub fn definition(&self) -> &Arc<QuestionnaireDefinition> {
        &self.definition
    }

    pub fn path(&self) -> &SurveyPath {
        &self.definition.paths[self.path_index]
    }

    pub fn selected_path_id(&self) -> &str {
        &self.path().id
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn result(&self) -> Option<&ScoreResult> {
        self.result.as_ref()
    }

    /// Question awaiting an answer, if the run is still open.
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.path().questions.get(self.current_index)
    }

    /// Previously recorded answer for the current question, used to prefill it.
    pub fn current_answer(&self) -> Option<&str> {
        self.current_question()
            .and_then(|question| self.answers.get(&question.id))
    }

    /// `(position, total)` where position counts questions already passed.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.path().questions.len();
        if self.finished {
            (total, total)
        } else {
            (self.current_index, total)
        }
    }

    /// Switches to `path_id`. Returns `false` when it is already selected, in which case
    /// nothing is reset.
    pub fn select_path(&mut self, path_id: &str) -> Result<bool, TraversalError> {
        if self.selected_path_id() == path_id {
            return Ok(false);
        }

        let path_index = self
            .definition
            .path_index(path_id)
            .ok_or_else(|| TraversalError::UnknownPath(path_id.to_string()))?;

        debug!(from = %self.selected_path_id(), to = %path_id, "switching survey path");
        self.path_index = path_index;
        self.restart();
        Ok(true)
    }

    pub fn answer(&mut self, value: &str) -> Result<Advance, TraversalError> {
        if self.finished {
            return Err(TraversalError::AlreadyFinished);
        }

        let path = &self.definition.paths[self.path_index];
        let question = path
            .questions
            .get(self.current_index)
            .ok_or(TraversalError::AlreadyFinished)?;

        if !question.accepts(value) {
            return Err(TraversalError::InvalidAnswer {
                question_id: question.id.clone(),
                value: value.to_string(),
            });
        }

        self.answers.insert(question.id.clone(), value);

        if self.current_index + 1 < path.questions.len() {
            self.current_index += 1;
            return Ok(Advance::Next {
                index: self.current_index,
            });
        }

        let result = evaluate(&self.answers, path);
        self.result = Some(result);
        self.finished = true;
        debug!(
            path_id = %path.id,
            score = result.score,
            max_score = result.max_score,
            level = result.level.as_str(),
            "survey run finished"
        );
        Ok(Advance::Finished(result))
    }

    /// Steps back one question, keeping the recorded answer for prefill.
    pub fn go_back(&mut self) -> Result<usize, TraversalError> {
        if self.finished {
            return Err(TraversalError::AlreadyFinished);
        }
        if self.current_index == 0 {
            return Err(TraversalError::AtFirstQuestion);
        }

        self.current_index -= 1;
        Ok(self.current_index)
    }

    pub fn reset(&mut self) {
        self.restart();
    }

    /// Reopens a finished run for changes without discarding answers. The cursor lands on
    /// the first unanswered question, or the last one when everything is answered.
    pub fn edit(&mut self) -> Result<usize, TraversalError> {
        if !self.finished {
            return Err(TraversalError::NotFinished);
        }

        let path = &self.definition.paths[self.path_index];
        if path.questions.is_empty() {
            return Ok(0);
        }

        let index = path
            .questions
            .iter()
            .position(|question| !self.answers.contains(&question.id))
            .unwrap_or(path.questions.len() - 1);

        self.current_index = index;
        self.finished = false;
        self.result = None;
        Ok(index)
    }

    /// Scores whatever has been answered so far without touching the session.
    pub fn preview(&self) -> ScoreResult {
        evaluate(&self.answers, self.path())
    }

    pub fn snapshot(&self) -> TraversalSnapshot {
        TraversalSnapshot {
            selected_path_id: self.selected_path_id().to_string(),
            current_index: self.current_index,
            answers: self.answers.clone(),
            finished: self.finished,
            result: self.result,
        }
    }

    fn restart(&mut self) {
        self.current_index = 0;
        self.answers = AnswerSet::new();
        self.finished = false;
        self.result = None;

        let path = &self.definition.paths[self.path_index];
        if path.questions.is_empty() {
            self.result = Some(evaluate(&self.answers, path));
            self.finished = true;
        }
    }
}
