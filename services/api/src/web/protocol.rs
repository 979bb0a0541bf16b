//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API server.
//! Domain types stay free of serialization concerns; these views are built from them.

use chrono::{DateTime, Utc};
use moodigo_core::domain::{Conversation, Message, MoodEntry, Resource, UserPreference};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Lenient Integers
//=========================================================================================

/// Form-style clients send numbers as strings; both `5` and `"5"` are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(i64),
    Text(String),
}

impl IntOrText {
    fn into_int<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            IntOrText::Int(n) => Ok(n),
            IntOrText::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("'{}' is not a whole number", text))),
        }
    }
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    IntOrText::deserialize(deserializer)?.into_int()
}

fn lenient_int_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, i64>, D::Error> {
    BTreeMap::<String, IntOrText>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| value.into_int().map(|n| (key, n)))
        .collect()
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ConversationView {
    pub id: i64,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationView {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            title: c.title,
            is_active: c.is_active,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageView {
    pub id: i64,
    /// `user` or `bot`.
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub predicted_condition: Option<String>,
    pub confidence_score: Option<f64>,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender: m.sender.as_str().to_string(),
            content: m.content,
            timestamp: m.timestamp,
            predicted_condition: m.predicted_condition.map(|c| c.label().to_string()),
            confidence_score: m.confidence_score,
        }
    }
}

/// The active conversation and its most recent messages.
#[derive(Serialize, ToSchema)]
pub struct ChatView {
    pub conversation: ConversationView,
    pub messages: Vec<MessageView>,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub bot_response: String,
    pub prediction: Option<String>,
    pub confidence: f64,
    pub is_crisis: bool,
    /// `HH:MM` of the stored bot message.
    pub timestamp: String,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// 1-based; anything unparsable means the first page.
    pub page: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryPage {
    pub conversations: Vec<ConversationView>,
    pub page: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ConversationDetail {
    pub conversation: ConversationView,
    pub messages: Vec<MessageView>,
}

//=========================================================================================
// Mood Tracking
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MoodEntryView {
    pub id: i64,
    pub mood: String,
    pub display_mood: String,
    pub intensity: u8,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<MoodEntry> for MoodEntryView {
    fn from(e: MoodEntry) -> Self {
        Self {
            id: e.id,
            mood: e.mood.as_str().to_string(),
            display_mood: e.mood.display().to_string(),
            intensity: e.intensity.value(),
            notes: e.notes,
            created_at: e.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Serialize, ToSchema)]
pub struct MoodTrackerView {
    pub entries: Vec<MoodEntryView>,
    pub insights: String,
    /// The moods a new entry can use.
    pub moods: Vec<Choice>,
}

#[derive(Deserialize, ToSchema)]
pub struct NewMoodEntryRequest {
    pub mood: String,
    #[serde(deserialize_with = "lenient_int")]
    pub intensity: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChartPoint {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub mood: String,
    pub intensity: u8,
    pub display_mood: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChartData {
    pub chart_data: Vec<ChartPoint>,
}

//=========================================================================================
// Assessment
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct QuestionView {
    /// The form key, `question_<index>`.
    pub key: String,
    pub text: String,
}

#[derive(Serialize, ToSchema)]
pub struct AssessmentForm {
    pub questions: Vec<QuestionView>,
    pub response_options: Vec<Choice>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssessmentRequest {
    /// `question_<index>` to an answer between 0 and 4. Missing answers count as 0.
    #[serde(default, deserialize_with = "lenient_int_map")]
    pub responses: BTreeMap<String, i64>,
}

#[derive(Serialize, ToSchema)]
pub struct AssessmentResult {
    pub id: i64,
    /// The stored key, e.g. `very_high`.
    pub risk_level: String,
    pub risk_label: String,
    pub confidence: f64,
    pub total_score: i64,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Resources
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ResourceView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub resource_type: String,
    pub url: String,
    pub phone_number: String,
    pub is_crisis: bool,
}

impl From<Resource> for ResourceView {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            resource_type: r.resource_type.as_str().to_string(),
            url: r.url,
            phone_number: r.phone_number,
            is_crisis: r.is_crisis,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ResourcesView {
    pub crisis_resources: Vec<ResourceView>,
    pub counseling_resources: Vec<ResourceView>,
    pub app_resources: Vec<ResourceView>,
    pub article_resources: Vec<ResourceView>,
}

#[derive(Serialize, ToSchema)]
pub struct CrisisHelpView {
    pub crisis_resources: Vec<ResourceView>,
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct PreferencesView {
    pub enable_mood_tracking: bool,
    pub daily_check_ins: bool,
    pub crisis_mode: bool,
    pub preferred_name: String,
    pub university: String,
    pub year_of_study: String,
}

impl From<UserPreference> for PreferencesView {
    fn from(p: UserPreference) -> Self {
        Self {
            enable_mood_tracking: p.enable_mood_tracking,
            daily_check_ins: p.daily_check_ins,
            crisis_mode: p.crisis_mode,
            preferred_name: p.preferred_name,
            university: p.university,
            year_of_study: p.year_of_study,
        }
    }
}

/// Partial update; omitted fields keep their value.
#[derive(Deserialize, ToSchema, Default)]
pub struct UpdatePreferencesRequest {
    pub enable_mood_tracking: Option<bool>,
    pub daily_check_ins: Option<bool>,
    pub crisis_mode: Option<bool>,
    pub preferred_name: Option<String>,
    pub university: Option<String>,
    pub year_of_study: Option<String>,
}
