use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for a questionnaire in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionnaireId(pub String);

impl QuestionnaireId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionnaireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a linked pair of members.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoupleId(pub String);

impl fmt::Display for CoupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a single respondent, supplied by the caller's auth layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a question is answered and therefore how two answers are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    /// 1..=5 agreement rating.
    #[serde(rename = "likert5", alias = "scale5")]
    Scale5,
    /// Forced pick between two options, encoded 1 or 2.
    #[serde(rename = "choice", alias = "binary_choice")]
    BinaryChoice,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scale5 => "1-5 scale",
            Self::BinaryChoice => "binary choice",
        }
    }

    /// Inclusive range of answers a respondent may submit.
    pub const fn answer_range(self) -> (i32, i32) {
        match self {
            Self::Scale5 => (1, 5),
            Self::BinaryChoice => (1, 2),
        }
    }

    pub fn accepts(self, answer: i32) -> bool {
        let (low, high) = self.answer_range();
        (low..=high).contains(&answer)
    }
}

pub const DEFAULT_WEIGHT: f64 = 1.0;

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

fn is_default_weight(weight: &f64) -> bool {
    (*weight - DEFAULT_WEIGHT).abs() < f64::EPSILON
}

/// One prompt in a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub topic: String,
    #[serde(default = "default_weight", skip_serializing_if = "is_default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<[String; 2]>,
}

impl QuestionDefinition {
    /// Scale question with the id namespaced under its topic.
    pub fn scale(topic: &str, short_id: &str, text: &str) -> Self {
        Self {
            id: format!("{topic}:{short_id}"),
            text: text.to_string(),
            kind: QuestionKind::Scale5,
            topic: topic.to_string(),
            weight: DEFAULT_WEIGHT,
            labels: None,
            options: None,
        }
    }

    /// Two-option question with the id namespaced under its topic.
    pub fn choice(topic: &str, short_id: &str, text: &str, options: [&str; 2]) -> Self {
        Self {
            id: format!("{topic}:{short_id}"),
            text: text.to_string(),
            kind: QuestionKind::BinaryChoice,
            topic: topic.to_string(),
            weight: DEFAULT_WEIGHT,
            labels: None,
            options: Some(options.map(str::to_string)),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_labels(mut self, low: &str, high: &str) -> Self {
        self.labels = Some([low.to_string(), high.to_string()]);
        self
    }
}

/// Named, ordered set of questions answered identically by both members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireDefinition {
    pub id: QuestionnaireId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<QuestionDefinition>,
}

impl QuestionnaireDefinition {
    pub fn question(&self, question_id: &str) -> Option<&QuestionDefinition> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }

    /// Topics in first-appearance order.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::new();
        for question in &self.questions {
            if !topics.contains(&question.topic.as_str()) {
                topics.push(&question.topic);
            }
        }
        topics
    }
}

/// A respondent's answers keyed by question id. Absent ids are unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, i32>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<i32> {
        self.0.get(question_id).copied()
    }

    pub fn insert(&mut self, question_id: impl Into<String>, answer: i32) -> Option<i32> {
        self.0.insert(question_id.into(), answer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(id, answer)| (id.as_str(), *answer))
    }
}

impl<K: Into<String>> FromIterator<(K, i32)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (K, i32)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, answer)| (id.into(), answer))
                .collect(),
        )
    }
}

/// Aggregate score plus per-topic percentages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub score: u8,
    pub breakdown: BTreeMap<String, u8>,
}

/// A member's stored answers for one questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub couple_id: CoupleId,
    pub member_id: MemberId,
    pub questionnaire_id: QuestionnaireId,
    pub answers: AnswerSet,
    pub submitted_at: DateTime<Utc>,
}

/// Persisted result for a (couple, questionnaire) pair. Later computations overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub couple_id: CoupleId,
    pub questionnaire_id: QuestionnaireId,
    #[serde(flatten)]
    pub result: CompatibilityResult,
    pub updated_at: DateTime<Utc>,
}
