use serde::{Deserialize, Serialize};

use super::domain::{
    AnswerSubmission, CompatibilityResult, CoupleId, MemberId, QuestionnaireId, ResultRecord,
};
use super::pairing::CoupleRecord;

/// Storage abstraction for couples, answer sets and computed results.
///
/// Keys mirror the document layout the service expects: couples by id, answers by
/// (couple, member, questionnaire) and results by (couple, questionnaire).
pub trait CompatibilityStore: Send + Sync {
    fn insert_couple(&self, couple: CoupleRecord) -> Result<CoupleRecord, RepositoryError>;
    /// Replaces the stored couple only while its members still equal `expected_members`,
    /// otherwise fails with [`RepositoryError::Conflict`].
    fn update_couple(
        &self,
        couple: CoupleRecord,
        expected_members: &[MemberId],
    ) -> Result<(), RepositoryError>;
    fn fetch_couple(&self, id: &CoupleId) -> Result<Option<CoupleRecord>, RepositoryError>;
    /// `code` is already normalized to upper case.
    fn find_by_invite_code(&self, code: &str) -> Result<Option<CoupleRecord>, RepositoryError>;

    /// Replaces any earlier submission for the same key.
    fn put_answers(&self, submission: AnswerSubmission) -> Result<(), RepositoryError>;
    fn fetch_answers(
        &self,
        couple: &CoupleId,
        member: &MemberId,
        questionnaire: &QuestionnaireId,
    ) -> Result<Option<AnswerSubmission>, RepositoryError>;

    /// Replaces any earlier result for the same key.
    fn put_result(&self, record: ResultRecord) -> Result<(), RepositoryError>;
    fn fetch_result(
        &self,
        couple: &CoupleId,
        questionnaire: &QuestionnaireId,
    ) -> Result<Option<ResultRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook fired whenever a result document changes.
pub trait ResultNotifier: Send + Sync {
    fn publish(&self, event: ResultUpdated) -> Result<(), NotifyError>;
}

/// Change notification for a (couple, questionnaire) result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultUpdated {
    pub couple_id: CoupleId,
    pub questionnaire_id: QuestionnaireId,
    pub result: CompatibilityResult,
}

impl From<&ResultRecord> for ResultUpdated {
    fn from(record: &ResultRecord) -> Self {
        Self {
            couple_id: record.couple_id.clone(),
            questionnaire_id: record.questionnaire_id.clone(),
            result: record.result.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
