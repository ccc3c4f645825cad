//! Couple compatibility: questionnaire catalog, pairing, answer intake and scoring.
//!
//! The scorer in [`scoring`] is pure. Everything that touches storage goes through the
//! [`CompatibilityStore`] and [`ResultNotifier`] ports injected into
//! [`CompatibilityService`].

pub mod catalog;
pub mod domain;
pub mod pairing;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, QuestionnaireCatalog};
pub use domain::{
    AnswerSet, AnswerSubmission, CompatibilityResult, CoupleId, MemberId, QuestionDefinition,
    QuestionKind, QuestionnaireDefinition, QuestionnaireId, ResultRecord,
};
pub use pairing::{CoupleRecord, PairingError};
pub use repository::{
    CompatibilityStore, NotifyError, RepositoryError, ResultNotifier, ResultUpdated,
};
pub use router::compatibility_router;
pub use scoring::{score, similarity, CompatibilityScorer};
pub use service::{CompatibilityService, CompatibilityServiceError};
