//! In-memory adapters for the storage and notification ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::compatibility::{
    AnswerSubmission, CompatibilityStore, CoupleId, CoupleRecord, MemberId, NotifyError,
    QuestionnaireId, RepositoryError, ResultNotifier, ResultRecord, ResultUpdated,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

type AnswerKey = (CoupleId, MemberId, QuestionnaireId);
type ResultKey = (CoupleId, QuestionnaireId);

#[derive(Default)]
struct Tables {
    couples: HashMap<CoupleId, CoupleRecord>,
    answers: HashMap<AnswerKey, AnswerSubmission>,
    results: HashMap<ResultKey, ResultRecord>,
}

/// Mutex-guarded maps standing in for the hosted document store.
#[derive(Default, Clone)]
pub struct InMemoryCompatibilityStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryCompatibilityStore {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn couple_count(&self) -> usize {
        self.tables().map(|tables| tables.couples.len()).unwrap_or(0)
    }
}

impl CompatibilityStore for InMemoryCompatibilityStore {
    fn insert_couple(&self, couple: CoupleRecord) -> Result<CoupleRecord, RepositoryError> {
        let mut tables = self.tables()?;
        let code_taken = tables
            .couples
            .values()
            .any(|existing| existing.invite_code == couple.invite_code);
        if code_taken || tables.couples.contains_key(&couple.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.couples.insert(couple.id.clone(), couple.clone());
        Ok(couple)
    }

    fn update_couple(
        &self,
        couple: CoupleRecord,
        expected_members: &[MemberId],
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let existing = tables
            .couples
            .get_mut(&couple.id)
            .ok_or(RepositoryError::NotFound)?;
        if existing.members != expected_members {
            return Err(RepositoryError::Conflict);
        }
        *existing = couple;
        Ok(())
    }

    fn fetch_couple(&self, id: &CoupleId) -> Result<Option<CoupleRecord>, RepositoryError> {
        Ok(self.tables()?.couples.get(id).cloned())
    }

    fn find_by_invite_code(&self, code: &str) -> Result<Option<CoupleRecord>, RepositoryError> {
        Ok(self
            .tables()?
            .couples
            .values()
            .find(|couple| couple.invite_code == code)
            .cloned())
    }

    fn put_answers(&self, submission: AnswerSubmission) -> Result<(), RepositoryError> {
        let key = (
            submission.couple_id.clone(),
            submission.member_id.clone(),
            submission.questionnaire_id.clone(),
        );
        self.tables()?.answers.insert(key, submission);
        Ok(())
    }

    fn fetch_answers(
        &self,
        couple: &CoupleId,
        member: &MemberId,
        questionnaire: &QuestionnaireId,
    ) -> Result<Option<AnswerSubmission>, RepositoryError> {
        let key = (couple.clone(), member.clone(), questionnaire.clone());
        Ok(self.tables()?.answers.get(&key).cloned())
    }

    fn put_result(&self, record: ResultRecord) -> Result<(), RepositoryError> {
        let key = (record.couple_id.clone(), record.questionnaire_id.clone());
        self.tables()?.results.insert(key, record);
        Ok(())
    }

    fn fetch_result(
        &self,
        couple: &CoupleId,
        questionnaire: &QuestionnaireId,
    ) -> Result<Option<ResultRecord>, RepositoryError> {
        let key = (couple.clone(), questionnaire.clone());
        Ok(self.tables()?.results.get(&key).cloned())
    }
}

/// Fans result changes out to live subscribers over a bounded broadcast channel.
#[derive(Clone)]
pub struct BroadcastResultNotifier {
    sender: broadcast::Sender<ResultUpdated>,
}

impl BroadcastResultNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResultUpdated> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastResultNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ResultNotifier for BroadcastResultNotifier {
    fn publish(&self, event: ResultUpdated) -> Result<(), NotifyError> {
        // No subscribers is fine; nobody is watching this result yet.
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::{AnswerSet, CompatibilityResult};
    use chrono::Utc;

    fn member(id: &str) -> MemberId {
        MemberId(id.to_string())
    }

    #[test]
    fn couples_round_trip_and_lookup_by_code() {
        let store = InMemoryCompatibilityStore::default();
        let couple = CoupleRecord::new(member("alex"));
        let code = couple.invite_code.clone();

        store.insert_couple(couple.clone()).expect("insert");
        assert!(matches!(
            store.insert_couple(couple.clone()),
            Err(RepositoryError::Conflict)
        ));

        let found = store
            .find_by_invite_code(&code)
            .expect("lookup")
            .expect("couple present");
        assert_eq!(found.id, couple.id);
        assert_eq!(store.couple_count(), 1);
    }

    #[test]
    fn update_requires_existing_couple() {
        let store = InMemoryCompatibilityStore::default();
        let couple = CoupleRecord::new(member("alex"));

        assert!(matches!(
            store.update_couple(couple, &[member("alex")]),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn update_rejects_stale_membership() {
        let store = InMemoryCompatibilityStore::default();
        let couple = store
            .insert_couple(CoupleRecord::new(member("alex")))
            .expect("insert");

        let mut with_sam = couple.clone();
        with_sam.join(member("sam")).expect("sam joins");
        store
            .update_couple(with_sam, &couple.members)
            .expect("first join lands");

        let mut with_jo = couple.clone();
        with_jo.join(member("jo")).expect("jo joins stale copy");
        assert!(matches!(
            store.update_couple(with_jo, &couple.members),
            Err(RepositoryError::Conflict)
        ));

        let stored = store
            .fetch_couple(&couple.id)
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.members, vec![member("alex"), member("sam")]);
    }

    #[test]
    fn answers_are_keyed_by_member_and_questionnaire() {
        let store = InMemoryCompatibilityStore::default();
        let couple_id = CoupleId("c1".to_string());
        let questionnaire = QuestionnaireId::new("compat_v1");
        let submission = AnswerSubmission {
            couple_id: couple_id.clone(),
            member_id: member("alex"),
            questionnaire_id: questionnaire.clone(),
            answers: AnswerSet::from_iter([("values:v1", 4)]),
            submitted_at: Utc::now(),
        };

        store.put_answers(submission.clone()).expect("put");

        let fetched = store
            .fetch_answers(&couple_id, &member("alex"), &questionnaire)
            .expect("fetch");
        assert_eq!(fetched, Some(submission));
        assert!(store
            .fetch_answers(&couple_id, &member("sam"), &questionnaire)
            .expect("fetch")
            .is_none());
    }

    #[test]
    fn later_results_overwrite_earlier_ones() {
        let store = InMemoryCompatibilityStore::default();
        let couple_id = CoupleId("c1".to_string());
        let questionnaire = QuestionnaireId::new("compat_v1");
        let record = |score| ResultRecord {
            couple_id: couple_id.clone(),
            questionnaire_id: questionnaire.clone(),
            result: CompatibilityResult {
                score,
                ..CompatibilityResult::default()
            },
            updated_at: Utc::now(),
        };

        store.put_result(record(40)).expect("first");
        store.put_result(record(75)).expect("second");

        let stored = store
            .fetch_result(&couple_id, &questionnaire)
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.result.score, 75);
    }

    #[test]
    fn notifier_delivers_to_subscribers() {
        let notifier = BroadcastResultNotifier::default();
        let mut receiver = notifier.subscribe();
        let event = ResultUpdated {
            couple_id: CoupleId("c1".to_string()),
            questionnaire_id: QuestionnaireId::new("compat_v1"),
            result: CompatibilityResult::default(),
        };

        notifier.publish(event.clone()).expect("publish");

        assert_eq!(receiver.try_recv().expect("event queued"), event);
    }

    #[test]
    fn notifier_tolerates_missing_subscribers() {
        let notifier = BroadcastResultNotifier::new(0);
        let event = ResultUpdated {
            couple_id: CoupleId("c1".to_string()),
            questionnaire_id: QuestionnaireId::new("compat_v1"),
            result: CompatibilityResult::default(),
        };

        assert!(notifier.publish(event).is_ok());
    }
}
