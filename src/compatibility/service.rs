use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::catalog::QuestionnaireCatalog;
use super::domain::{
    AnswerSet, AnswerSubmission, CompatibilityResult, CoupleId, MemberId, QuestionKind,
    QuestionnaireDefinition, QuestionnaireId, ResultRecord,
};
use super::pairing::{normalize_invite_code, CoupleRecord, PairingError};
use super::repository::{CompatibilityStore, RepositoryError, ResultNotifier, ResultUpdated};
use super::scoring::CompatibilityScorer;

const COUPLE_CREATE_ATTEMPTS: usize = 5;
const COUPLE_JOIN_ATTEMPTS: usize = 3;

/// Service composing the questionnaire catalog, storage port and scorer.
pub struct CompatibilityService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    catalog: Arc<QuestionnaireCatalog>,
    scorer: CompatibilityScorer,
}

impl<S, N> CompatibilityService<S, N>
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, catalog: Arc<QuestionnaireCatalog>) -> Self {
        Self {
            store,
            notifier,
            catalog,
            scorer: CompatibilityScorer::new(),
        }
    }

    pub fn catalog(&self) -> &QuestionnaireCatalog {
        &self.catalog
    }

    pub fn questionnaires(&self) -> &[QuestionnaireDefinition] {
        self.catalog.list()
    }

    pub fn questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<&QuestionnaireDefinition, CompatibilityServiceError> {
        self.catalog
            .get(questionnaire_id)
            .ok_or_else(|| CompatibilityServiceError::UnknownQuestionnaire(questionnaire_id.clone()))
    }

    /// Start a couple with `member` as its first member.
    ///
    /// A clash with an existing invite code regenerates the code a bounded number of times.
    pub fn create_couple(
        &self,
        member: MemberId,
    ) -> Result<CoupleRecord, CompatibilityServiceError> {
        let mut attempt = 1;
        loop {
            match self.store.insert_couple(CoupleRecord::new(member.clone())) {
                Ok(stored) => {
                    info!(couple = %stored.id, "couple created");
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) if attempt < COUPLE_CREATE_ATTEMPTS => {
                    warn!(attempt, "invite code already taken, regenerating");
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Join the couple owning `invite_code`. Joining a couple twice is a no-op.
    ///
    /// The write only lands if the membership is unchanged since it was read; a
    /// concurrent join forces a re-read, so the loser sees the full couple.
    pub fn join_couple(
        &self,
        invite_code: &str,
        member: MemberId,
    ) -> Result<CoupleRecord, CompatibilityServiceError> {
        let code = normalize_invite_code(invite_code);

        for attempt in 1..=COUPLE_JOIN_ATTEMPTS {
            let mut couple = self
                .store
                .find_by_invite_code(&code)?
                .ok_or_else(|| CompatibilityServiceError::InviteCodeNotFound(code.clone()))?;
            let previous_members = couple.members.clone();

            if !couple.join(member.clone())? {
                return Ok(couple);
            }

            match self.store.update_couple(couple.clone(), &previous_members) {
                Ok(()) => {
                    info!(couple = %couple.id, %member, "member joined couple");
                    return Ok(couple);
                }
                Err(RepositoryError::Conflict) => {
                    debug!(couple = %couple.id, %member, attempt, "couple changed during join, re-reading");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(RepositoryError::Conflict.into())
    }

    pub fn couple(&self, couple_id: &CoupleId) -> Result<CoupleRecord, CompatibilityServiceError> {
        self.store
            .fetch_couple(couple_id)?
            .ok_or_else(|| CompatibilityServiceError::CoupleNotFound(couple_id.clone()))
    }

    /// Store a member's complete answer set, replacing any earlier submission.
    pub fn submit_answers(
        &self,
        couple_id: &CoupleId,
        member: &MemberId,
        questionnaire_id: &QuestionnaireId,
        answers: AnswerSet,
    ) -> Result<AnswerSubmission, CompatibilityServiceError> {
        let questionnaire = self.questionnaire(questionnaire_id)?;
        let couple = self.couple(couple_id)?;

        if !couple.is_member(member) {
            return Err(CompatibilityServiceError::NotAMember {
                couple: couple_id.clone(),
                member: member.clone(),
            });
        }

        if let Err(error) = validate_answers(questionnaire, &answers) {
            warn!(couple = %couple_id, %member, questionnaire = %questionnaire_id, %error, "rejected answer submission");
            return Err(error);
        }

        let submission = AnswerSubmission {
            couple_id: couple_id.clone(),
            member_id: member.clone(),
            questionnaire_id: questionnaire_id.clone(),
            answers,
            submitted_at: Utc::now(),
        };
        self.store.put_answers(submission.clone())?;

        info!(couple = %couple_id, %member, questionnaire = %questionnaire_id, "answers submitted");
        Ok(submission)
    }

    /// Score both members' stored answers and persist the result, overwriting any prior one.
    pub fn compute(
        &self,
        couple_id: &CoupleId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<ResultRecord, CompatibilityServiceError> {
        let questionnaire = self.questionnaire(questionnaire_id)?;
        let couple = self.couple(couple_id)?;
        let (first, second) = couple
            .pair()
            .ok_or(CompatibilityServiceError::IncompleteCouple {
                members: couple.members.len(),
            })?;

        let answers_a = self.stored_answers(couple_id, first, questionnaire_id)?;
        let answers_b = self.stored_answers(couple_id, second, questionnaire_id)?;

        let result = self.scorer.score(questionnaire, &answers_a, &answers_b);
        let record = ResultRecord {
            couple_id: couple_id.clone(),
            questionnaire_id: questionnaire_id.clone(),
            result,
            updated_at: Utc::now(),
        };
        self.store.put_result(record.clone())?;

        if let Err(error) = self.notifier.publish(ResultUpdated::from(&record)) {
            warn!(couple = %couple_id, questionnaire = %questionnaire_id, %error, "result saved but change notification failed");
        }

        info!(
            couple = %couple_id,
            questionnaire = %questionnaire_id,
            score = record.result.score,
            "compatibility computed"
        );
        Ok(record)
    }

    /// Latest stored result for the pair.
    pub fn result(
        &self,
        couple_id: &CoupleId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<ResultRecord, CompatibilityServiceError> {
        self.store
            .fetch_result(couple_id, questionnaire_id)?
            .ok_or_else(|| CompatibilityServiceError::ResultNotFound {
                couple: couple_id.clone(),
                questionnaire: questionnaire_id.clone(),
            })
    }

    /// Score two ad-hoc answer sets without touching storage.
    pub fn score(
        &self,
        questionnaire_id: &QuestionnaireId,
        answers_a: &AnswerSet,
        answers_b: &AnswerSet,
    ) -> Result<CompatibilityResult, CompatibilityServiceError> {
        let questionnaire = self.questionnaire(questionnaire_id)?;
        Ok(self.scorer.score(questionnaire, answers_a, answers_b))
    }

    fn stored_answers(
        &self,
        couple_id: &CoupleId,
        member: &MemberId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<AnswerSet, CompatibilityServiceError> {
        self.store
            .fetch_answers(couple_id, member, questionnaire_id)?
            .map(|submission| submission.answers)
            .ok_or_else(|| CompatibilityServiceError::AwaitingAnswers(member.clone()))
    }
}

fn validate_answers(
    questionnaire: &QuestionnaireDefinition,
    answers: &AnswerSet,
) -> Result<(), CompatibilityServiceError> {
    for (question_id, answer) in answers.iter() {
        let question = questionnaire.question(question_id).ok_or_else(|| {
            CompatibilityServiceError::UnknownQuestion(question_id.to_string())
        })?;
        if !question.kind.accepts(answer) {
            return Err(CompatibilityServiceError::AnswerOutOfRange {
                question: question_id.to_string(),
                answer,
                kind: question.kind,
            });
        }
    }

    let missing: Vec<String> = questionnaire
        .questions
        .iter()
        .filter(|question| answers.get(&question.id).is_none())
        .map(|question| question.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(CompatibilityServiceError::IncompleteAnswers { missing });
    }

    Ok(())
}

/// Error raised by the compatibility service.
#[derive(Debug, thiserror::Error)]
pub enum CompatibilityServiceError {
    #[error("questionnaire {0} not found")]
    UnknownQuestionnaire(QuestionnaireId),
    #[error("couple {0} not found")]
    CoupleNotFound(CoupleId),
    #[error("no couple found for invite code {0}")]
    InviteCodeNotFound(String),
    #[error(transparent)]
    Pairing(#[from] PairingError),
    #[error("{member} is not a member of couple {couple}")]
    NotAMember { couple: CoupleId, member: MemberId },
    #[error("please answer all questions (missing: {})", .missing.join(", "))]
    IncompleteAnswers { missing: Vec<String> },
    #[error("question {0} is not part of this questionnaire")]
    UnknownQuestion(String),
    #[error("answer {answer} is outside the {} range for question {question}", .kind.label())]
    AnswerOutOfRange {
        question: String,
        answer: i32,
        kind: QuestionKind,
    },
    #[error("need 2 members to compute compatibility, couple has {members}")]
    IncompleteCouple { members: usize },
    #[error("waiting for {0} to complete the questionnaire")]
    AwaitingAnswers(MemberId),
    #[error("no result computed yet for couple {couple} and questionnaire {questionnaire}")]
    ResultNotFound {
        couple: CoupleId,
        questionnaire: QuestionnaireId,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
