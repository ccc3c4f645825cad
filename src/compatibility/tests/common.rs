use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use axum::response::Response;
use serde_json::Value;

use crate::compatibility::domain::{
    AnswerSet, AnswerSubmission, CoupleId, MemberId, QuestionDefinition, QuestionnaireDefinition,
    QuestionnaireId, ResultRecord,
};
use crate::compatibility::pairing::CoupleRecord;
use crate::compatibility::repository::{
    CompatibilityStore, NotifyError, RepositoryError, ResultNotifier, ResultUpdated,
};
use crate::compatibility::{compatibility_router, CompatibilityService, QuestionnaireCatalog};
use crate::infra::{BroadcastResultNotifier, InMemoryCompatibilityStore};

pub(super) type MemoryService =
    CompatibilityService<InMemoryCompatibilityStore, BroadcastResultNotifier>;

pub(super) fn member(id: &str) -> MemberId {
    MemberId(id.to_string())
}

pub(super) fn compat_v1() -> QuestionnaireId {
    QuestionnaireId::new("compat_v1")
}

pub(super) fn answers(pairs: &[(&str, i32)]) -> AnswerSet {
    pairs.iter().map(|(id, answer)| (*id, *answer)).collect()
}

/// Two scale questions, one per topic.
pub(super) fn values_and_daily() -> Vec<QuestionDefinition> {
    vec![
        QuestionDefinition::scale("values", "v1", "Our life goals are similar."),
        QuestionDefinition::scale("daily", "d1", "Our routines fit together."),
    ]
}

pub(super) fn questionnaire(questions: Vec<QuestionDefinition>) -> QuestionnaireDefinition {
    QuestionnaireDefinition {
        id: QuestionnaireId::new("fixture"),
        title: "Fixture".to_string(),
        description: String::new(),
        questions,
    }
}

/// Complete compat_v1 answer set with every question rated `rating`.
pub(super) fn uniform_compat_answers(rating: i32) -> AnswerSet {
    QuestionnaireCatalog::builtin()
        .get(&compat_v1())
        .expect("compat_v1 present")
        .questions
        .iter()
        .map(|question| (question.id.clone(), rating))
        .collect()
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryCompatibilityStore>,
    Arc<BroadcastResultNotifier>,
) {
    let store = Arc::new(InMemoryCompatibilityStore::default());
    let notifier = Arc::new(BroadcastResultNotifier::default());
    let service = CompatibilityService::new(
        store.clone(),
        notifier.clone(),
        Arc::new(QuestionnaireCatalog::builtin()),
    );
    (service, store, notifier)
}

/// Service with a complete couple of `alex` and `sam`.
pub(super) fn paired_service() -> (MemoryService, CoupleId, Arc<BroadcastResultNotifier>) {
    let (service, _, notifier) = build_service();
    let couple = service
        .create_couple(member("alex"))
        .expect("couple created");
    service
        .join_couple(&couple.invite_code, member("sam"))
        .expect("sam joins");
    (service, couple.id, notifier)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    compatibility_router(Arc::new(service))
}

pub(super) struct UnavailableStore;

impl CompatibilityStore for UnavailableStore {
    fn insert_couple(&self, _couple: CoupleRecord) -> Result<CoupleRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_couple(
        &self,
        _couple: CoupleRecord,
        _expected_members: &[MemberId],
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_couple(&self, _id: &CoupleId) -> Result<Option<CoupleRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_invite_code(&self, _code: &str) -> Result<Option<CoupleRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn put_answers(&self, _submission: AnswerSubmission) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_answers(
        &self,
        _couple: &CoupleId,
        _member: &MemberId,
        _questionnaire: &QuestionnaireId,
    ) -> Result<Option<AnswerSubmission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn put_result(&self, _record: ResultRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_result(
        &self,
        _couple: &CoupleId,
        _questionnaire: &QuestionnaireId,
    ) -> Result<Option<ResultRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// In-memory store that can report invite code clashes on insert and hold the first
/// `lookup_gate` invite lookups until all of them have arrived.
#[derive(Default)]
pub(super) struct ScriptedStore {
    pub inner: InMemoryCompatibilityStore,
    pub insert_conflicts: AtomicUsize,
    pub lookup_gate: Option<Barrier>,
    pub gated_lookups: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl ScriptedStore {
    pub fn with_insert_conflicts(conflicts: usize) -> Self {
        Self {
            insert_conflicts: AtomicUsize::new(conflicts),
            ..Self::default()
        }
    }

    pub fn with_lookup_gate(lookups: usize) -> Self {
        Self {
            lookup_gate: Some(Barrier::new(lookups)),
            gated_lookups: AtomicUsize::new(lookups),
            ..Self::default()
        }
    }
}

impl CompatibilityStore for ScriptedStore {
    fn insert_couple(&self, couple: CoupleRecord) -> Result<CoupleRecord, RepositoryError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let clash = self
            .insert_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if clash {
            return Err(RepositoryError::Conflict);
        }
        self.inner.insert_couple(couple)
    }

    fn update_couple(
        &self,
        couple: CoupleRecord,
        expected_members: &[MemberId],
    ) -> Result<(), RepositoryError> {
        self.inner.update_couple(couple, expected_members)
    }

    fn fetch_couple(&self, id: &CoupleId) -> Result<Option<CoupleRecord>, RepositoryError> {
        self.inner.fetch_couple(id)
    }

    fn find_by_invite_code(&self, code: &str) -> Result<Option<CoupleRecord>, RepositoryError> {
        let found = self.inner.find_by_invite_code(code);
        let gated = self
            .gated_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if let (true, Some(gate)) = (gated, &self.lookup_gate) {
            gate.wait();
        }
        found
    }

    fn put_answers(&self, submission: AnswerSubmission) -> Result<(), RepositoryError> {
        self.inner.put_answers(submission)
    }

    fn fetch_answers(
        &self,
        couple: &CoupleId,
        member: &MemberId,
        questionnaire: &QuestionnaireId,
    ) -> Result<Option<AnswerSubmission>, RepositoryError> {
        self.inner.fetch_answers(couple, member, questionnaire)
    }

    fn put_result(&self, record: ResultRecord) -> Result<(), RepositoryError> {
        self.inner.put_result(record)
    }

    fn fetch_result(
        &self,
        couple: &CoupleId,
        questionnaire: &QuestionnaireId,
    ) -> Result<Option<ResultRecord>, RepositoryError> {
        self.inner.fetch_result(couple, questionnaire)
    }
}

pub(super) fn scripted_service(
    store: ScriptedStore,
) -> (
    CompatibilityService<ScriptedStore, BroadcastResultNotifier>,
    Arc<ScriptedStore>,
) {
    let store = Arc::new(store);
    let service = CompatibilityService::new(
        store.clone(),
        Arc::new(BroadcastResultNotifier::default()),
        Arc::new(QuestionnaireCatalog::builtin()),
    );
    (service, store)
}

pub(super) struct FailingNotifier;

impl ResultNotifier for FailingNotifier {
    fn publish(&self, _event: ResultUpdated) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("socket closed".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
