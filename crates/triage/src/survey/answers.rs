use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Three-way answer accepted by `tri` questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriAnswer {
    #[serde(rename = "tak")]
    Yes,
    #[serde(rename = "nie")]
    No,
    #[serde(rename = "nie wiem")]
    DontKnow,
}

impl TriAnswer {
    /// Choices in the order they are offered to the user.
    pub const CHOICES: [TriAnswer; 3] = [TriAnswer::No, TriAnswer::Yes, TriAnswer::DontKnow];

    pub fn as_str(self) -> &'static str {
        match self {
            TriAnswer::Yes => "tak",
            TriAnswer::No => "nie",
            TriAnswer::DontKnow => "nie wiem",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "tak" => Some(TriAnswer::Yes),
            "nie" => Some(TriAnswer::No),
            "nie wiem" => Some(TriAnswer::DontKnow),
            _ => None,
        }
    }
}

/// Answers keyed by question id.
///
/// Values are kept as the literal strings the user picked so the set can be persisted and
/// exported without knowing the question types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    pub fn insert(&mut self, question_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(question_id.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, value)| (id.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for AnswerSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, value)| (id.into(), value.into()))
                .collect(),
        )
    }
}
