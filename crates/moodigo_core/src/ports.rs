//! crates/moodigo_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the database and of the concrete classifier models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{
    Assessment, CleanupSummary, Condition, Conversation, Intensity, Message, Mood, MoodEntry,
    NewMessage, NewResource, Resource, ResourceType, RiskLevel, SeedOutcome, UsageCounts, User,
    UserCredentials, UserPreference, UserSession,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, model files).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Classifier Outputs
//=========================================================================================

/// The text classifier's verdict on one preprocessed message.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrediction {
    pub condition: Condition,
    pub probabilities: BTreeMap<Condition, f64>,
    /// The highest class probability.
    pub confidence: f64,
}

/// The survey model's verdict on one set of answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskPrediction {
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Visitor Sessions ---
    /// Returns the session for `session_key`, creating it on first sight and
    /// refreshing `last_activity` otherwise.
    async fn get_or_create_session(
        &self,
        session_key: &str,
        user_id: Option<Uuid>,
    ) -> PortResult<UserSession>;

    async fn attach_user(&self, session_id: i64, user_id: Uuid) -> PortResult<()>;

    // --- Accounts ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Conversations and Messages ---
    async fn get_or_create_active_conversation(&self, session_id: i64)
        -> PortResult<Conversation>;

    async fn deactivate_conversations(&self, session_id: i64) -> PortResult<u64>;

    /// Newest first.
    async fn list_conversations(
        &self,
        session_id: i64,
        limit: i64,
        offset: i64,
    ) -> PortResult<Vec<Conversation>>;

    async fn count_conversations(&self, session_id: i64) -> PortResult<i64>;

    /// Fails with `NotFound` unless the conversation belongs to `session_id`.
    async fn get_conversation(&self, session_id: i64, conversation_id: i64)
        -> PortResult<Conversation>;

    async fn save_message(&self, message: NewMessage) -> PortResult<Message>;

    /// Oldest first, at most `limit` rows when given.
    async fn list_messages(
        &self,
        conversation_id: i64,
        limit: Option<i64>,
    ) -> PortResult<Vec<Message>>;

    // --- Mood Tracking ---
    async fn create_mood_entry(
        &self,
        session_id: i64,
        mood: Mood,
        intensity: Intensity,
        notes: &str,
    ) -> PortResult<MoodEntry>;

    /// Newest first.
    async fn recent_mood_entries(&self, session_id: i64, limit: i64) -> PortResult<Vec<MoodEntry>>;

    /// Oldest first.
    async fn mood_entries_since(
        &self,
        session_id: i64,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MoodEntry>>;

    // --- Assessments ---
    async fn create_assessment(
        &self,
        session_id: i64,
        total_score: i64,
        risk_level: RiskLevel,
        responses: &serde_json::Value,
        recommendations: &str,
    ) -> PortResult<Assessment>;

    // --- Resources ---
    /// Active resources only. `None` filters mean "any".
    async fn list_resources(
        &self,
        resource_type: Option<ResourceType>,
        crisis_only: bool,
    ) -> PortResult<Vec<Resource>>;

    /// Seeds every resource in one transaction, keyed by title.
    async fn seed_resources(
        &self,
        resources: &[NewResource],
        force: bool,
    ) -> PortResult<Vec<(String, SeedOutcome)>>;

    // --- Preferences ---
    async fn get_or_create_preferences(&self, session_id: i64) -> PortResult<UserPreference>;

    async fn update_preferences(&self, preferences: &UserPreference) -> PortResult<()>;

    async fn set_crisis_mode(&self, session_id: i64) -> PortResult<()>;

    // --- Maintenance and Reporting ---
    async fn usage_since(&self, cutoff: DateTime<Utc>) -> PortResult<UsageCounts>;

    async fn stale_anonymous_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<CleanupSummary>;

    /// Deletes stale anonymous sessions (and, by cascade, their data) in one
    /// transaction. Returns the number of sessions removed.
    async fn delete_stale_anonymous_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<u64>;
}

pub trait TextClassifier: Send + Sync {
    /// Classifies text that has already been through `preprocess_text`.
    fn classify(&self, processed_text: &str) -> PortResult<TextPrediction>;
}

pub trait RiskModel: Send + Sync {
    /// Predicts a risk tier from Likert answers already sized to the questionnaire.
    fn predict(&self, answers: &[u8]) -> PortResult<RiskPrediction>;
}
