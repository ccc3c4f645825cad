use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::domain::{QuestionDefinition, QuestionnaireDefinition, QuestionnaireId};

const SCALE_LABELS: (&str, &str) = ("Strongly disagree", "Strongly agree");

/// Immutable table of questionnaires, loaded once and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QuestionnaireCatalog {
    questionnaires: Vec<QuestionnaireDefinition>,
}

impl QuestionnaireCatalog {
    /// Validates and wraps a set of definitions.
    pub fn new(questionnaires: Vec<QuestionnaireDefinition>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for questionnaire in &questionnaires {
            validate_questionnaire(questionnaire)?;
            if !seen.insert(questionnaire.id.clone()) {
                return Err(CatalogError::DuplicateQuestionnaire(
                    questionnaire.id.to_string(),
                ));
            }
        }

        Ok(Self { questionnaires })
    }

    /// Questionnaires shipped with the service.
    pub fn builtin() -> Self {
        Self {
            questionnaires: vec![compat_v1(), musicians_test(), fruits_test()],
        }
    }

    /// Parses a JSON array of questionnaire definitions.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let questionnaires: Vec<QuestionnaireDefinition> = serde_json::from_reader(reader)?;
        Self::new(questionnaires)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Loads from `path` when given, falling back to the built-in catalog.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, id: &QuestionnaireId) -> Option<&QuestionnaireDefinition> {
        self.questionnaires
            .iter()
            .find(|questionnaire| &questionnaire.id == id)
    }

    pub fn list(&self) -> &[QuestionnaireDefinition] {
        &self.questionnaires
    }

    pub fn ids(&self) -> impl Iterator<Item = &QuestionnaireId> {
        self.questionnaires.iter().map(|questionnaire| &questionnaire.id)
    }

    pub fn len(&self) -> usize {
        self.questionnaires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questionnaires.is_empty()
    }
}

impl Default for QuestionnaireCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_questionnaire(questionnaire: &QuestionnaireDefinition) -> Result<(), CatalogError> {
    if questionnaire.id.as_str().trim().is_empty() {
        return Err(CatalogError::EmptyQuestionnaireId);
    }

    let mut question_ids = HashSet::new();
    for question in &questionnaire.questions {
        if !question_ids.insert(question.id.as_str()) {
            return Err(CatalogError::DuplicateQuestion {
                questionnaire: questionnaire.id.to_string(),
                question: question.id.clone(),
            });
        }
        if !(question.weight.is_finite() && question.weight > 0.0) {
            return Err(CatalogError::InvalidWeight {
                questionnaire: questionnaire.id.to_string(),
                question: question.id.clone(),
                weight: question.weight,
            });
        }
    }

    Ok(())
}

/// Failure loading or validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("questionnaire id must not be empty")]
    EmptyQuestionnaireId,
    #[error("questionnaire {0} is defined more than once")]
    DuplicateQuestionnaire(String),
    #[error("question {question} appears more than once in {questionnaire}")]
    DuplicateQuestion {
        questionnaire: String,
        question: String,
    },
    #[error("question {question} in {questionnaire} has invalid weight {weight}")]
    InvalidWeight {
        questionnaire: String,
        question: String,
        weight: f64,
    },
}

fn likert(topic: &str, short_id: &str, text: &str) -> QuestionDefinition {
    QuestionDefinition::scale(topic, short_id, text).with_labels(SCALE_LABELS.0, SCALE_LABELS.1)
}

fn compat_v1() -> QuestionnaireDefinition {
    QuestionnaireDefinition {
        id: QuestionnaireId::new("compat_v1"),
        title: "Compatibility v1".to_string(),
        description: "A short test about values, everyday life, money and shared free time. \
                      Rate each statement from 1 to 5."
            .to_string(),
        questions: vec![
            likert("values", "v1", "Our life goals are similar."),
            likert(
                "values",
                "v2",
                "Honesty matters to me, and my partner shares that.",
            ),
            likert(
                "daily",
                "d1",
                "We have similar expectations about running the household.",
            ),
            likert("daily", "d2", "Our sleep and rest rhythms fit together."),
            likert(
                "finance",
                "f1",
                "We approach spending and saving the same way.",
            ),
            likert("finance", "f2", "We talk about our budget openly."),
            likert(
                "fun",
                "u1",
                "We have similar ideas about spending free time together.",
            ),
            likert("fun", "u2", "We often laugh together."),
        ],
    }
}

fn musicians_test() -> QuestionnaireDefinition {
    QuestionnaireDefinition {
        id: QuestionnaireId::new("musicians_test"),
        title: "Music taste".to_string(),
        description: "Across seven questions, pick the musician or band closer to you. \
                      Your picks are compared with your partner's."
            .to_string(),
        questions: vec![
            QuestionDefinition::choice(
                "music",
                "m1",
                "Whose music would you rather listen to?",
                ["The Beatles", "The Rolling Stones"],
            ),
            QuestionDefinition::choice(
                "music",
                "m2",
                "Which artist is closer to you?",
                ["Ed Sheeran", "Bruno Mars"],
            ),
            QuestionDefinition::choice(
                "music",
                "m3",
                "Which genre describes your taste better?",
                ["Pop", "Rock"],
            ),
            QuestionDefinition::choice(
                "music",
                "m4",
                "Whose concert would you go to?",
                ["Taylor Swift", "Ariana Grande"],
            ),
            QuestionDefinition::choice(
                "music",
                "m5",
                "Which band is better?",
                ["Metallica", "AC/DC"],
            ),
            QuestionDefinition::choice(
                "music",
                "m6",
                "Which rap artist is better?",
                ["Eminem", "Drake"],
            ),
            QuestionDefinition::choice(
                "music",
                "m7",
                "Which electronic artist?",
                ["Daft Punk", "The Chainsmokers"],
            ),
        ],
    }
}

fn fruits_test() -> QuestionnaireDefinition {
    QuestionnaireDefinition {
        id: QuestionnaireId::new("fruits_test"),
        title: "Fruit test".to_string(),
        description: "Across seven questions, pick the fruit or berry you like more. \
                      Your picks are compared with your partner's."
            .to_string(),
        questions: vec![
            QuestionDefinition::choice(
                "food",
                "f1",
                "Which fruit is better?",
                ["Apple", "Banana"],
            ),
            QuestionDefinition::choice(
                "food",
                "f2",
                "Which citrus do you prefer?",
                ["Orange", "Mandarin"],
            ),
            QuestionDefinition::choice(
                "food",
                "f3",
                "Which berry is tastier?",
                ["Strawberry", "Raspberry"],
            ),
            QuestionDefinition::choice(
                "food",
                "f4",
                "Which tropical fruit is better?",
                ["Mango", "Pineapple"],
            ),
            QuestionDefinition::choice(
                "food",
                "f5",
                "Which berry is better?",
                ["Blueberry", "Lingonberry"],
            ),
            QuestionDefinition::choice(
                "food",
                "f6",
                "Which summer fruit?",
                ["Watermelon", "Melon"],
            ),
            QuestionDefinition::choice(
                "food",
                "f7",
                "Which exotic fruit?",
                ["Kiwi", "Passion fruit"],
            ),
        ],
    }
}
