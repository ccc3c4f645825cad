use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{AnswerSet, CoupleId, MemberId, QuestionnaireDefinition, QuestionnaireId};
use super::repository::{CompatibilityStore, RepositoryError, ResultNotifier};
use super::service::{CompatibilityService, CompatibilityServiceError};

/// Router builder exposing catalog, pairing, submission and scoring endpoints.
pub fn compatibility_router<S, N>(service: Arc<CompatibilityService<S, N>>) -> Router
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    Router::new()
        .route("/api/v1/questionnaires", get(list_questionnaires::<S, N>))
        .route(
            "/api/v1/questionnaires/:questionnaire_id",
            get(questionnaire_handler::<S, N>),
        )
        .route("/api/v1/couples", post(create_couple_handler::<S, N>))
        .route("/api/v1/couples/join", post(join_couple_handler::<S, N>))
        .route("/api/v1/couples/:couple_id", get(couple_handler::<S, N>))
        .route(
            "/api/v1/couples/:couple_id/responses/:questionnaire_id",
            put(submit_answers_handler::<S, N>),
        )
        .route(
            "/api/v1/couples/:couple_id/results/:questionnaire_id",
            post(compute_handler::<S, N>).get(result_handler::<S, N>),
        )
        .route("/api/v1/score", post(score_handler::<S, N>))
        .with_state(service)
}

/// Catalog entry without the question bodies.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireSummary {
    pub id: QuestionnaireId,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub topics: Vec<String>,
}

impl From<&QuestionnaireDefinition> for QuestionnaireSummary {
    fn from(questionnaire: &QuestionnaireDefinition) -> Self {
        Self {
            id: questionnaire.id.clone(),
            title: questionnaire.title.clone(),
            description: questionnaire.description.clone(),
            question_count: questionnaire.questions.len(),
            topics: questionnaire
                .topics()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCoupleRequest {
    pub member_id: MemberId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinCoupleRequest {
    pub invite_code: String,
    pub member_id: MemberId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub member_id: MemberId,
    pub answers: AnswerSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub questionnaire_id: QuestionnaireId,
    #[serde(default)]
    pub answers_a: AnswerSet,
    #[serde(default)]
    pub answers_b: AnswerSet,
}

pub(crate) async fn list_questionnaires<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    let summaries: Vec<QuestionnaireSummary> = service
        .questionnaires()
        .iter()
        .map(QuestionnaireSummary::from)
        .collect();
    (StatusCode::OK, Json(summaries)).into_response()
}

pub(crate) async fn questionnaire_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.questionnaire(&QuestionnaireId(questionnaire_id)) {
        Ok(questionnaire) => (StatusCode::OK, Json(questionnaire)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_couple_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Json(request): Json<CreateCoupleRequest>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.create_couple(request.member_id) {
        Ok(couple) => (StatusCode::CREATED, Json(couple)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn join_couple_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Json(request): Json<JoinCoupleRequest>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.join_couple(&request.invite_code, request.member_id) {
        Ok(couple) => (StatusCode::OK, Json(couple)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn couple_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Path(couple_id): Path<String>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.couple(&CoupleId(couple_id)) {
        Ok(couple) => (StatusCode::OK, Json(couple)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_answers_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Path((couple_id, questionnaire_id)): Path<(String, String)>,
    Json(request): Json<SubmitAnswersRequest>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.submit_answers(
        &CoupleId(couple_id),
        &request.member_id,
        &QuestionnaireId(questionnaire_id),
        request.answers,
    ) {
        Ok(submission) => (StatusCode::ACCEPTED, Json(submission)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn compute_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Path((couple_id, questionnaire_id)): Path<(String, String)>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.compute(&CoupleId(couple_id), &QuestionnaireId(questionnaire_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn result_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Path((couple_id, questionnaire_id)): Path<(String, String)>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.result(&CoupleId(couple_id), &QuestionnaireId(questionnaire_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_handler<S, N>(
    State(service): State<Arc<CompatibilityService<S, N>>>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    S: CompatibilityStore + 'static,
    N: ResultNotifier + 'static,
{
    match service.score(
        &request.questionnaire_id,
        &request.answers_a,
        &request.answers_b,
    ) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(error: &CompatibilityServiceError) -> StatusCode {
    match error {
        CompatibilityServiceError::UnknownQuestionnaire(_)
        | CompatibilityServiceError::CoupleNotFound(_)
        | CompatibilityServiceError::InviteCodeNotFound(_)
        | CompatibilityServiceError::ResultNotFound { .. }
        | CompatibilityServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CompatibilityServiceError::NotAMember { .. } => StatusCode::FORBIDDEN,
        CompatibilityServiceError::Pairing(_)
        | CompatibilityServiceError::IncompleteCouple { .. }
        | CompatibilityServiceError::AwaitingAnswers(_)
        | CompatibilityServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CompatibilityServiceError::IncompleteAnswers { .. }
        | CompatibilityServiceError::UnknownQuestion(_)
        | CompatibilityServiceError::AnswerOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CompatibilityServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn error_response(error: CompatibilityServiceError) -> Response {
    let status = status_for(&error);
    let payload = match &error {
        CompatibilityServiceError::Repository(RepositoryError::Unavailable(_)) => json!({
            "error": error.to_string(),
            "retryable": true,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, Json(payload)).into_response()
}
