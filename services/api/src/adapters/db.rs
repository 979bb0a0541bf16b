//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moodigo_core::domain::{
    Assessment, CleanupSummary, Condition, Conversation, Intensity, Message, Mood, MoodEntry,
    NewMessage, NewResource, Resource, ResourceType, RiskLevel, SeedOutcome, Sender, UsageCounts,
    User, UserCredentials, UserPreference, UserSession,
};
use moodigo_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Maps any driver error onto the generic port error.
fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Stored {} is invalid: {}", what, e))
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A private, migrated in-memory database. Every call gets a fresh one.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // A single long-lived connection: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let adapter = Self::new(pool);
        adapter.run_migrations().await?;
        Ok(adapter)
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
impl DbAdapter {
    /// Moves a session's timestamps `days` into the past.
    pub(crate) async fn backdate_session(&self, session_id: i64, days: i64) {
        let then = Utc::now() - chrono::Duration::days(days);
        sqlx::query("UPDATE user_sessions SET last_activity = ?, created_at = ? WHERE id = ?")
            .bind(then)
            .bind(then)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .expect("backdate session");
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: i64,
    session_key: String,
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    is_anonymous: bool,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<UserSession> {
        let user_id = self
            .user_id
            .map(|id| Uuid::parse_str(&id).map_err(|e| corrupt("user id", e)))
            .transpose()?;
        Ok(UserSession {
            id: self.id,
            session_key: self.session_key,
            user_id,
            created_at: self.created_at,
            last_activity: self.last_activity,
            is_anonymous: self.is_anonymous,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: String,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: Uuid::parse_str(&self.user_id).map_err(|e| corrupt("user id", e))?,
            email: self.email,
            hashed_password: self.hashed_password,
        })
    }
}

#[derive(FromRow)]
struct ConversationRecord {
    id: i64,
    session_id: i64,
    title: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}
impl ConversationRecord {
    fn to_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            session_id: self.session_id,
            title: self.title,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: i64,
    conversation_id: i64,
    sender: String,
    content: String,
    timestamp: DateTime<Utc>,
    predicted_condition: Option<String>,
    confidence_score: Option<f64>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        let predicted_condition = self
            .predicted_condition
            .map(|c| Condition::from_str(&c).map_err(|e| corrupt("condition", e)))
            .transpose()?;
        Ok(Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender: Sender::from_str(&self.sender).map_err(|e| corrupt("sender", e))?,
            content: self.content,
            timestamp: self.timestamp,
            predicted_condition,
            confidence_score: self.confidence_score,
        })
    }
}

#[derive(FromRow)]
struct MoodEntryRecord {
    id: i64,
    session_id: i64,
    mood: String,
    intensity: i64,
    notes: String,
    created_at: DateTime<Utc>,
}
impl MoodEntryRecord {
    fn to_domain(self) -> PortResult<MoodEntry> {
        Ok(MoodEntry {
            id: self.id,
            session_id: self.session_id,
            mood: Mood::from_str(&self.mood).map_err(|e| corrupt("mood", e))?,
            intensity: Intensity::new(self.intensity)
                .ok_or_else(|| corrupt("intensity", self.intensity))?,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AssessmentRecord {
    id: i64,
    session_id: i64,
    total_score: i64,
    risk_level: String,
    responses: String,
    recommendations: String,
    created_at: DateTime<Utc>,
}
impl AssessmentRecord {
    fn to_domain(self) -> PortResult<Assessment> {
        Ok(Assessment {
            id: self.id,
            session_id: self.session_id,
            total_score: self.total_score,
            risk_level: RiskLevel::from_str(&self.risk_level)
                .map_err(|e| corrupt("risk level", e))?,
            responses: serde_json::from_str(&self.responses)
                .map_err(|e| corrupt("responses", e))?,
            recommendations: self.recommendations,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ResourceRecord {
    id: i64,
    title: String,
    description: String,
    resource_type: String,
    url: String,
    phone_number: String,
    is_crisis: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}
impl ResourceRecord {
    fn to_domain(self) -> PortResult<Resource> {
        Ok(Resource {
            id: self.id,
            title: self.title,
            description: self.description,
            resource_type: ResourceType::from_str(&self.resource_type)
                .map_err(|e| corrupt("resource type", e))?,
            url: self.url,
            phone_number: self.phone_number,
            is_crisis: self.is_crisis,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct PreferenceRecord {
    session_id: i64,
    enable_mood_tracking: bool,
    daily_check_ins: bool,
    crisis_mode: bool,
    preferred_name: String,
    university: String,
    year_of_study: String,
}
impl PreferenceRecord {
    fn to_domain(self) -> UserPreference {
        UserPreference {
            session_id: self.session_id,
            enable_mood_tracking: self.enable_mood_tracking,
            daily_check_ins: self.daily_check_ins,
            crisis_mode: self.crisis_mode,
            preferred_name: self.preferred_name,
            university: self.university,
            year_of_study: self.year_of_study,
        }
    }
}

fn collect<R, T>(records: Vec<R>, f: impl Fn(R) -> PortResult<T>) -> PortResult<Vec<T>> {
    records.into_iter().map(f).collect()
}

const SESSION_COLUMNS: &str =
    "id, session_key, user_id, created_at, last_activity, is_anonymous";
const CONVERSATION_COLUMNS: &str = "id, session_id, title, is_active, created_at";
const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender, content, timestamp, predicted_condition, confidence_score";
const MOOD_COLUMNS: &str = "id, session_id, mood, intensity, notes, created_at";
const RESOURCE_COLUMNS: &str =
    "id, title, description, resource_type, url, phone_number, is_crisis, is_active, created_at";
const PREFERENCE_COLUMNS: &str = "session_id, enable_mood_tracking, daily_check_ins, crisis_mode, preferred_name, university, year_of_study";

const STALE_SESSIONS: &str =
    "SELECT id FROM user_sessions WHERE is_anonymous = 1 AND last_activity < ?";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_or_create_session(
        &self,
        session_key: &str,
        user_id: Option<Uuid>,
    ) -> PortResult<UserSession> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO user_sessions (session_key, user_id, created_at, last_activity, is_anonymous)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (session_key) DO UPDATE SET last_activity = excluded.last_activity",
        )
        .bind(session_key)
        .bind(user_id.map(|id| id.to_string()))
        .bind(now)
        .bind(now)
        .bind(user_id.is_none())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM user_sessions WHERE session_key = ?",
            SESSION_COLUMNS
        ))
        .bind(session_key)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn attach_user(&self, session_id: i64, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE user_sessions SET user_id = ?, is_anonymous = 0 WHERE id = ?",
        )
        .bind(user_id.to_string())
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Session {} not found", session_id)));
        }
        Ok(())
    }

    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (user_id, email, hashed_password, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.to_string())
        .bind(email)
        .bind(hashed_password)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                PortError::Invalid(format!("An account for {} already exists", email))
            }
            _ => unexpected(e),
        })?;

        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users
             WHERE email = ? AND hashed_password IS NOT NULL",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_or_create_active_conversation(
        &self,
        session_id: i64,
    ) -> PortResult<Conversation> {
        let existing = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {} FROM conversations WHERE session_id = ? AND is_active = 1
             ORDER BY created_at DESC, id DESC LIMIT 1",
            CONVERSATION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        if let Some(record) = existing {
            return Ok(record.to_domain());
        }

        let now = Utc::now();
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "INSERT INTO conversations (session_id, title, is_active, created_at)
             VALUES (?, ?, 1, ?) RETURNING {}",
            CONVERSATION_COLUMNS
        ))
        .bind(session_id)
        .bind(format!("Chat {}", now.format("%Y-%m-%d %H:%M")))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        debug!("Started conversation {} for session {}", record.id, session_id);
        Ok(record.to_domain())
    }

    async fn deactivate_conversations(&self, session_id: i64) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE conversations SET is_active = 0 WHERE session_id = ? AND is_active = 1",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn list_conversations(
        &self,
        session_id: i64,
        limit: i64,
        offset: i64,
    ) -> PortResult<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {} FROM conversations WHERE session_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            CONVERSATION_COLUMNS
        ))
        .bind(session_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn count_conversations(&self, session_id: i64) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn get_conversation(
        &self,
        session_id: i64,
        conversation_id: i64,
    ) -> PortResult<Conversation> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {} FROM conversations WHERE id = ? AND session_id = ?",
            CONVERSATION_COLUMNS
        ))
        .bind(conversation_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| {
            PortError::NotFound(format!("Conversation {} not found", conversation_id))
        })?;
        Ok(record.to_domain())
    }

    async fn save_message(&self, message: NewMessage) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages
                (conversation_id, sender, content, timestamp, predicted_condition, confidence_score)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(message.conversation_id)
        .bind(message.sender.as_str())
        .bind(&message.content)
        .bind(Utc::now())
        .bind(message.predicted_condition.map(|c| c.label()))
        .bind(message.confidence_score)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
        limit: Option<i64>,
    ) -> PortResult<Vec<Message>> {
        // SQLite treats a negative LIMIT as "no limit".
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {} FROM messages WHERE conversation_id = ?
             ORDER BY timestamp ASC, id ASC LIMIT ?",
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, MessageRecord::to_domain)
    }

    async fn create_mood_entry(
        &self,
        session_id: i64,
        mood: Mood,
        intensity: Intensity,
        notes: &str,
    ) -> PortResult<MoodEntry> {
        let record = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "INSERT INTO mood_entries (session_id, mood, intensity, notes, created_at)
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            MOOD_COLUMNS
        ))
        .bind(session_id)
        .bind(mood.as_str())
        .bind(i64::from(intensity.value()))
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn recent_mood_entries(&self, session_id: i64, limit: i64) -> PortResult<Vec<MoodEntry>> {
        let records = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "SELECT {} FROM mood_entries WHERE session_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ?",
            MOOD_COLUMNS
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, MoodEntryRecord::to_domain)
    }

    async fn mood_entries_since(
        &self,
        session_id: i64,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<MoodEntry>> {
        let records = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "SELECT {} FROM mood_entries WHERE session_id = ? AND created_at >= ?
             ORDER BY created_at ASC, id ASC",
            MOOD_COLUMNS
        ))
        .bind(session_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, MoodEntryRecord::to_domain)
    }

    async fn create_assessment(
        &self,
        session_id: i64,
        total_score: i64,
        risk_level: RiskLevel,
        responses: &serde_json::Value,
        recommendations: &str,
    ) -> PortResult<Assessment> {
        let record = sqlx::query_as::<_, AssessmentRecord>(
            "INSERT INTO assessments
                (session_id, total_score, risk_level, responses, recommendations, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, session_id, total_score, risk_level, responses, recommendations, created_at",
        )
        .bind(session_id)
        .bind(total_score)
        .bind(risk_level.as_str())
        .bind(responses.to_string())
        .bind(recommendations)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_resources(
        &self,
        resource_type: Option<ResourceType>,
        crisis_only: bool,
    ) -> PortResult<Vec<Resource>> {
        let mut sql = format!(
            "SELECT {} FROM resources WHERE is_active = 1",
            RESOURCE_COLUMNS
        );
        if resource_type.is_some() {
            sql.push_str(" AND resource_type = ?");
        }
        if crisis_only {
            sql.push_str(" AND is_crisis = 1");
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query_as::<_, ResourceRecord>(&sql);
        if let Some(resource_type) = resource_type {
            query = query.bind(resource_type.as_str());
        }
        let records = query.fetch_all(&self.pool).await.map_err(unexpected)?;
        collect(records, ResourceRecord::to_domain)
    }

    async fn seed_resources(
        &self,
        resources: &[NewResource],
        force: bool,
    ) -> PortResult<Vec<(String, SeedOutcome)>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut outcomes = Vec::with_capacity(resources.len());

        for resource in resources {
            let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM resources WHERE title = ?")
                .bind(resource.title)
                .fetch_optional(&mut *tx)
                .await
                .map_err(unexpected)?;

            let outcome = match existing {
                None => {
                    sqlx::query(
                        "INSERT INTO resources
                            (title, description, resource_type, url, phone_number, is_crisis, is_active, created_at)
                         VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
                    )
                    .bind(resource.title)
                    .bind(resource.description)
                    .bind(resource.resource_type.as_str())
                    .bind(resource.url)
                    .bind(resource.phone_number)
                    .bind(resource.is_crisis)
                    .bind(Utc::now())
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
                    SeedOutcome::Created
                }
                Some(id) if force => {
                    sqlx::query(
                        "UPDATE resources SET description = ?, resource_type = ?, url = ?,
                            phone_number = ?, is_crisis = ?
                         WHERE id = ?",
                    )
                    .bind(resource.description)
                    .bind(resource.resource_type.as_str())
                    .bind(resource.url)
                    .bind(resource.phone_number)
                    .bind(resource.is_crisis)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(unexpected)?;
                    SeedOutcome::Updated
                }
                Some(_) => SeedOutcome::Unchanged,
            };
            outcomes.push((resource.title.to_string(), outcome));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(outcomes)
    }

    async fn get_or_create_preferences(&self, session_id: i64) -> PortResult<UserPreference> {
        sqlx::query("INSERT OR IGNORE INTO user_preferences (session_id) VALUES (?)")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        let record = sqlx::query_as::<_, PreferenceRecord>(&format!(
            "SELECT {} FROM user_preferences WHERE session_id = ?",
            PREFERENCE_COLUMNS
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_preferences(&self, preferences: &UserPreference) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE user_preferences SET enable_mood_tracking = ?, daily_check_ins = ?,
                crisis_mode = ?, preferred_name = ?, university = ?, year_of_study = ?
             WHERE session_id = ?",
        )
        .bind(preferences.enable_mood_tracking)
        .bind(preferences.daily_check_ins)
        .bind(preferences.crisis_mode)
        .bind(&preferences.preferred_name)
        .bind(&preferences.university)
        .bind(&preferences.year_of_study)
        .bind(preferences.session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Preferences for session {} not found",
                preferences.session_id
            )));
        }
        Ok(())
    }

    async fn set_crisis_mode(&self, session_id: i64) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_preferences (session_id, crisis_mode) VALUES (?, 1)
             ON CONFLICT (session_id) DO UPDATE SET crisis_mode = 1",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        info!("Crisis mode enabled for session {}", session_id);
        Ok(())
    }

    async fn usage_since(&self, cutoff: DateTime<Utc>) -> PortResult<UsageCounts> {
        let count = |sql: &'static str| {
            sqlx::query_scalar::<_, i64>(sql)
                .bind(cutoff)
                .fetch_one(&self.pool)
        };
        let average = |sql: &'static str| {
            sqlx::query_scalar::<_, Option<f64>>(sql)
                .bind(cutoff)
                .fetch_one(&self.pool)
        };
        let distribution = |sql: &'static str| {
            sqlx::query_as::<_, (String, i64)>(sql)
                .bind(cutoff)
                .fetch_all(&self.pool)
        };

        Ok(UsageCounts {
            total_sessions: count("SELECT COUNT(*) FROM user_sessions WHERE created_at >= ?")
                .await
                .map_err(unexpected)?,
            total_conversations: count("SELECT COUNT(*) FROM conversations WHERE created_at >= ?")
                .await
                .map_err(unexpected)?,
            total_messages: count("SELECT COUNT(*) FROM messages WHERE timestamp >= ?")
                .await
                .map_err(unexpected)?,
            total_mood_entries: count("SELECT COUNT(*) FROM mood_entries WHERE created_at >= ?")
                .await
                .map_err(unexpected)?,
            avg_mood_intensity: average(
                "SELECT AVG(intensity) FROM mood_entries WHERE created_at >= ?",
            )
            .await
            .map_err(unexpected)?,
            mood_distribution: distribution(
                "SELECT mood, COUNT(*) FROM mood_entries WHERE created_at >= ?
                 GROUP BY mood ORDER BY mood",
            )
            .await
            .map_err(unexpected)?,
            prediction_distribution: distribution(
                "SELECT predicted_condition, COUNT(*) FROM messages
                 WHERE timestamp >= ? AND predicted_condition IS NOT NULL
                 GROUP BY predicted_condition ORDER BY predicted_condition",
            )
            .await
            .map_err(unexpected)?,
            total_assessments: count("SELECT COUNT(*) FROM assessments WHERE created_at >= ?")
                .await
                .map_err(unexpected)?,
            risk_distribution: distribution(
                "SELECT risk_level, COUNT(*) FROM assessments WHERE created_at >= ?
                 GROUP BY risk_level ORDER BY risk_level",
            )
            .await
            .map_err(unexpected)?,
            avg_assessment_score: average(
                "SELECT AVG(total_score) FROM assessments WHERE created_at >= ?",
            )
            .await
            .map_err(unexpected)?,
        })
    }

    async fn stale_anonymous_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<CleanupSummary> {
        let count = |sql: String| async move {
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)
        };

        Ok(CleanupSummary {
            sessions: count(format!("SELECT COUNT(*) FROM ({})", STALE_SESSIONS)).await?,
            conversations: count(format!(
                "SELECT COUNT(*) FROM conversations WHERE session_id IN ({})",
                STALE_SESSIONS
            ))
            .await?,
            messages: count(format!(
                "SELECT COUNT(*) FROM messages m
                 JOIN conversations c ON c.id = m.conversation_id
                 WHERE c.session_id IN ({})",
                STALE_SESSIONS
            ))
            .await?,
            mood_entries: count(format!(
                "SELECT COUNT(*) FROM mood_entries WHERE session_id IN ({})",
                STALE_SESSIONS
            ))
            .await?,
        })
    }

    async fn delete_stale_anonymous_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let result = sqlx::query(
            "DELETE FROM user_sessions WHERE is_anonymous = 1 AND last_activity < ?",
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    async fn db() -> DbAdapter {
        DbAdapter::in_memory().await.expect("in-memory database")
    }

    #[tokio::test]
    async fn session_is_created_once_and_touched_afterwards() {
        let db = db().await;
        let first = db.get_or_create_session("abc", None).await.unwrap();
        assert!(first.is_anonymous);
        assert_eq!(first.user_id, None);

        let again = db.get_or_create_session("abc", None).await.unwrap();
        assert_eq!(again.id, first.id);
        assert!(again.last_activity >= first.last_activity);
    }

    #[tokio::test]
    async fn attaching_a_user_makes_session_non_anonymous() {
        let db = db().await;
        let user = db.create_user_with_email("a@b.c", "hash").await.unwrap();
        let session = db.get_or_create_session("key", None).await.unwrap();
        db.attach_user(session.id, user.user_id).await.unwrap();

        let session = db.get_or_create_session("key", None).await.unwrap();
        assert!(!session.is_anonymous);
        assert_eq!(session.user_id, Some(user.user_id));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = db().await;
        db.create_user_with_email("a@b.c", "hash").await.unwrap();
        let err = db.create_user_with_email("a@b.c", "other").await.unwrap_err();
        assert!(matches!(err, PortError::Invalid(_)));
        assert!(matches!(
            db.get_user_by_email("nobody@b.c").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn active_conversation_is_reused_until_deactivated() {
        let db = db().await;
        let session = db.get_or_create_session("key", None).await.unwrap();
        let first = db.get_or_create_active_conversation(session.id).await.unwrap();
        assert!(first.title.starts_with("Chat "));
        let same = db.get_or_create_active_conversation(session.id).await.unwrap();
        assert_eq!(first.id, same.id);

        assert_eq!(db.deactivate_conversations(session.id).await.unwrap(), 1);
        let next = db.get_or_create_active_conversation(session.id).await.unwrap();
        assert_ne!(first.id, next.id);
        assert_eq!(db.count_conversations(session.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn conversations_are_scoped_to_their_session() {
        let db = db().await;
        let mine = db.get_or_create_session("mine", None).await.unwrap();
        let theirs = db.get_or_create_session("theirs", None).await.unwrap();
        let conversation = db.get_or_create_active_conversation(theirs.id).await.unwrap();

        let err = db.get_conversation(mine.id, conversation.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(db.get_conversation(theirs.id, conversation.id).await.is_ok());
    }

    #[tokio::test]
    async fn messages_keep_predictions_and_order() {
        let db = db().await;
        let session = db.get_or_create_session("key", None).await.unwrap();
        let conversation = db.get_or_create_active_conversation(session.id).await.unwrap();

        db.save_message(NewMessage::from_user(conversation.id, "hello"))
            .await
            .unwrap();
        db.save_message(NewMessage {
            conversation_id: conversation.id,
            sender: Sender::Bot,
            content: "hi".to_string(),
            predicted_condition: Some(Condition::PersonalityDisorder),
            confidence_score: Some(0.42),
        })
        .await
        .unwrap();

        let messages = db.list_messages(conversation.id, None).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].predicted_condition, Some(Condition::PersonalityDisorder));
        assert_eq!(messages[1].confidence_score, Some(0.42));

        let limited = db.list_messages(conversation.id, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].content, "hello");
    }

    #[tokio::test]
    async fn mood_entries_round_trip() {
        let db = db().await;
        let session = db.get_or_create_session("key", None).await.unwrap();
        let intensity = Intensity::new(7).unwrap();
        db.create_mood_entry(session.id, Mood::Anxious, intensity, "exam")
            .await
            .unwrap();
        db.create_mood_entry(session.id, Mood::Happy, intensity, "")
            .await
            .unwrap();

        let recent = db.recent_mood_entries(session.id, 30).await.unwrap();
        assert_eq!(recent[0].mood, Mood::Happy);
        let since = db
            .mood_entries_since(session.id, Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(since[0].mood, Mood::Anxious);
        assert_eq!(since[0].notes, "exam");
    }

    #[tokio::test]
    async fn assessment_keeps_raw_responses() {
        let db = db().await;
        let session = db.get_or_create_session("key", None).await.unwrap();
        let responses = json!({ "How often do you feel nervous or anxious?": 3 });
        let assessment = db
            .create_assessment(session.id, 3, RiskLevel::High, &responses, "a; b")
            .await
            .unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.responses, responses);
    }

    #[tokio::test]
    async fn crisis_mode_creates_preferences_when_missing() {
        let db = db().await;
        let session = db.get_or_create_session("key", None).await.unwrap();
        db.set_crisis_mode(session.id).await.unwrap();

        let preferences = db.get_or_create_preferences(session.id).await.unwrap();
        assert!(preferences.crisis_mode);
        assert!(preferences.enable_mood_tracking);
    }

    #[tokio::test]
    async fn seeding_is_idempotent_unless_forced() {
        let db = db().await;
        let seed = [NewResource {
            title: "Helpline",
            description: "Call us",
            resource_type: ResourceType::Crisis,
            url: "",
            phone_number: "988",
            is_crisis: true,
        }];

        let outcomes = db.seed_resources(&seed, false).await.unwrap();
        assert_eq!(outcomes[0].1, SeedOutcome::Created);
        let outcomes = db.seed_resources(&seed, false).await.unwrap();
        assert_eq!(outcomes[0].1, SeedOutcome::Unchanged);
        let outcomes = db.seed_resources(&seed, true).await.unwrap();
        assert_eq!(outcomes[0].1, SeedOutcome::Updated);

        let crisis = db.list_resources(None, true).await.unwrap();
        assert_eq!(crisis.len(), 1);
        let apps = db.list_resources(Some(ResourceType::App), false).await.unwrap();
        assert!(apps.is_empty());
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_anonymous_sessions_with_their_data() {
        let db = db().await;
        let stale = db.get_or_create_session("stale", None).await.unwrap();
        let fresh = db.get_or_create_session("fresh", None).await.unwrap();
        let user = db.create_user_with_email("u@x.y", "hash").await.unwrap();
        let owned = db.get_or_create_session("owned", None).await.unwrap();
        db.attach_user(owned.id, user.user_id).await.unwrap();

        let conversation = db.get_or_create_active_conversation(stale.id).await.unwrap();
        db.save_message(NewMessage::from_user(conversation.id, "old"))
            .await
            .unwrap();
        db.create_mood_entry(stale.id, Mood::Sad, Intensity::new(3).unwrap(), "")
            .await
            .unwrap();
        db.backdate_session(stale.id, 40).await;
        db.backdate_session(owned.id, 40).await;

        let cutoff = Utc::now() - Duration::days(30);
        let summary = db.stale_anonymous_sessions(cutoff).await.unwrap();
        assert_eq!(
            summary,
            CleanupSummary {
                sessions: 1,
                conversations: 1,
                messages: 1,
                mood_entries: 1,
            }
        );

        assert_eq!(db.delete_stale_anonymous_sessions(cutoff).await.unwrap(), 1);
        let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(db.get_conversation(fresh.id, conversation.id).await.is_err());
        assert_eq!(
            db.stale_anonymous_sessions(cutoff).await.unwrap(),
            CleanupSummary::default()
        );
    }

    #[tokio::test]
    async fn usage_counts_aggregate_the_window() {
        let db = db().await;
        let session = db.get_or_create_session("key", None).await.unwrap();
        let conversation = db.get_or_create_active_conversation(session.id).await.unwrap();
        db.save_message(NewMessage::from_user(conversation.id, "hey"))
            .await
            .unwrap();
        db.save_message(NewMessage {
            conversation_id: conversation.id,
            sender: Sender::Bot,
            content: "reply".to_string(),
            predicted_condition: Some(Condition::Stress),
            confidence_score: Some(0.6),
        })
        .await
        .unwrap();
        db.create_mood_entry(session.id, Mood::Sad, Intensity::new(4).unwrap(), "")
            .await
            .unwrap();
        db.create_mood_entry(session.id, Mood::Sad, Intensity::new(6).unwrap(), "")
            .await
            .unwrap();

        let usage = db
            .usage_since(Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(usage.total_sessions, 1);
        assert_eq!(usage.total_conversations, 1);
        assert_eq!(usage.total_messages, 2);
        assert_eq!(usage.avg_mood_intensity, Some(5.0));
        assert_eq!(usage.mood_distribution, vec![("sad".to_string(), 2)]);
        assert_eq!(usage.prediction_distribution, vec![("Stress".to_string(), 1)]);
        assert_eq!(usage.total_assessments, 0);
        assert_eq!(usage.avg_assessment_score, None);
    }
}
