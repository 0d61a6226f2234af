use super::answers::TriAnswer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Questionnaire document loaded once per process and shared read-only between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireDefinition {
    pub meta: SurveyMeta,
    pub paths: Vec<SurveyPath>,
}

/// Provenance and page copy for a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyMeta {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

/// One incident type: an ordered list of questions walked front to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPath {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    /// Asked but excluded from both score and maximum.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub noscore: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Tri {
        #[serde(default)]
        weight_yes: f64,
        #[serde(default)]
        weight_maybe: f64,
        #[serde(default)]
        weight_no: f64,
    },
    Select {
        #[serde(default)]
        options: Vec<SelectOption>,
    },
    /// Any `type` this build does not understand. Rejected by the loader.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    #[serde(default)]
    pub weight: f64,
}

/// Path identity as shown in a selection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSummary {
    pub id: String,
    pub label: String,
    pub question_count: usize,
}

impl Question {
    /// Answer literals the user may pick, in display order.
    pub fn choices(&self) -> Vec<&str> {
        match &self.kind {
            QuestionKind::Tri { .. } => TriAnswer::CHOICES.iter().map(|a| a.as_str()).collect(),
            QuestionKind::Select { options } => {
                options.iter().map(|option| option.label.as_str()).collect()
            }
            QuestionKind::Unsupported => Vec::new(),
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match &self.kind {
            QuestionKind::Tri { .. } => TriAnswer::parse(value).is_some(),
            QuestionKind::Select { options } => options.iter().any(|option| option.label == value),
            QuestionKind::Unsupported => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            QuestionKind::Tri { .. } => "tri",
            QuestionKind::Select { .. } => "select",
            QuestionKind::Unsupported => "unsupported",
        }
    }
}

impl SurveyPath {
    pub fn summary(&self) -> PathSummary {
        PathSummary {
            id: self.id.clone(),
            label: self.label.clone(),
            question_count: self.questions.len(),
        }
    }
}

impl QuestionnaireDefinition {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DefinitionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let definition = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            version = %definition.meta.version,
            paths = definition.paths.len(),
            "questionnaire definition loaded"
        );
        Ok(definition)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DefinitionError> {
        let definition: Self = serde_json::from_reader(reader)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DefinitionError> {
        let definition: Self = serde_json::from_str(raw)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn version(&self) -> &str {
        &self.meta.version
    }

    pub fn path(&self, id: &str) -> Option<&SurveyPath> {
        self.paths.iter().find(|path| path.id == id)
    }

    pub fn path_by_label(&self, label: &str) -> Option<&SurveyPath> {
        self.paths.iter().find(|path| path.label == label)
    }

    /// Looks a path up by id first, then by its display label.
    pub fn resolve_path(&self, id_or_label: &str) -> Option<&SurveyPath> {
        self.path(id_or_label)
            .or_else(|| self.path_by_label(id_or_label))
    }

    pub(crate) fn path_index(&self, id: &str) -> Option<usize> {
        self.paths.iter().position(|path| path.id == id)
    }

    pub fn summaries(&self) -> Vec<PathSummary> {
        self.paths.iter().map(SurveyPath::summary).collect()
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.paths.is_empty() {
            return Err(DefinitionError::NoPaths);
        }

        let mut path_ids = HashSet::new();
        let mut labels = HashSet::new();

        for path in &self.paths {
            if !path_ids.insert(path.id.as_str()) {
                return Err(DefinitionError::DuplicatePathId(path.id.clone()));
            }
            if !labels.insert(path.label.as_str()) {
                return Err(DefinitionError::DuplicatePathLabel(path.label.clone()));
            }

            let mut question_ids = HashSet::new();
            for question in &path.questions {
                if !question_ids.insert(question.id.as_str()) {
                    return Err(DefinitionError::DuplicateQuestionId {
                        path_id: path.id.clone(),
                        question_id: question.id.clone(),
                    });
                }

                match &question.kind {
                    QuestionKind::Unsupported => {
                        return Err(DefinitionError::UnsupportedQuestionType {
                            path_id: path.id.clone(),
                            question_id: question.id.clone(),
                        });
                    }
                    QuestionKind::Select { options } => {
                        let mut option_labels = HashSet::new();
                        for option in options {
                            if !option_labels.insert(option.label.as_str()) {
                                warn!(
                                    path_id = %path.id,
                                    question_id = %question.id,
                                    label = %option.label,
                                    "duplicate option label; the first one wins when scoring"
                                );
                            }
                        }
                    }
                    QuestionKind::Tri { .. } => {}
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum DefinitionError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    NoPaths,
    DuplicatePathId(String),
    DuplicatePathLabel(String),
    DuplicateQuestionId {
        path_id: String,
        question_id: String,
    },
    UnsupportedQuestionType {
        path_id: String,
        question_id: String,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::Io { path, source } => {
                write!(f, "failed to read questionnaire '{}': {}", path, source)
            }
            DefinitionError::Json(err) => write!(f, "invalid questionnaire JSON: {}", err),
            DefinitionError::NoPaths => write!(f, "questionnaire defines no paths"),
            DefinitionError::DuplicatePathId(id) => write!(f, "duplicate path id '{}'", id),
            DefinitionError::DuplicatePathLabel(label) => {
                write!(f, "duplicate path label '{}'", label)
            }
            DefinitionError::DuplicateQuestionId {
                path_id,
                question_id,
            } => write!(
                f,
                "duplicate question id '{}' in path '{}'",
                question_id, path_id
            ),
            DefinitionError::UnsupportedQuestionType {
                path_id,
                question_id,
            } => write!(
                f,
                "question '{}' in path '{}' has an unsupported type",
                question_id, path_id
            ),
        }
    }
}

impl std::error::Error for DefinitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DefinitionError::Io { source, .. } => Some(source),
            DefinitionError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DefinitionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
