//! crates/moodigo_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Raised when a stored or submitted string is not a member of a domain enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

//=========================================================================================
// Visitors and Accounts
//=========================================================================================

/// A visitor session, anonymous until it is attached to an account.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: i64,
    pub session_key: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_anonymous: bool,
}

// Represents a registered account - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Conversations
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: i64,
    pub session_id: i64,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

impl FromStr for Sender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "bot" => Ok(Sender::Bot),
            other => Err(UnknownVariant::new("sender", other)),
        }
    }
}

/// The labels the text classifier can assign to a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Condition {
    Normal,
    Depression,
    Suicidal,
    Anxiety,
    Bipolar,
    Stress,
    PersonalityDisorder,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::Normal,
        Condition::Depression,
        Condition::Suicidal,
        Condition::Anxiety,
        Condition::Bipolar,
        Condition::Stress,
        Condition::PersonalityDisorder,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Normal => "Normal",
            Condition::Depression => "Depression",
            Condition::Suicidal => "Suicidal",
            Condition::Anxiety => "Anxiety",
            Condition::Bipolar => "Bipolar",
            Condition::Stress => "Stress",
            Condition::PersonalityDisorder => "Personality disorder",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownVariant::new("condition", s))
    }
}

/// A single chat message, with the classifier's verdict on bot replies.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub predicted_condition: Option<Condition>,
    pub confidence_score: Option<f64>,
}

/// A message that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub sender: Sender,
    pub content: String,
    pub predicted_condition: Option<Condition>,
    pub confidence_score: Option<f64>,
}

impl NewMessage {
    pub fn from_user(conversation_id: i64, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            sender: Sender::User,
            content: content.into(),
            predicted_condition: None,
            confidence_score: None,
        }
    }
}

//=========================================================================================
// Mood Tracking
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mood {
    VeryHappy,
    Happy,
    Neutral,
    Sad,
    VerySad,
    Anxious,
    Stressed,
    Angry,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::VeryHappy,
        Mood::Happy,
        Mood::Neutral,
        Mood::Sad,
        Mood::VerySad,
        Mood::Anxious,
        Mood::Stressed,
        Mood::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::VeryHappy => "very_happy",
            Mood::Happy => "happy",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::VerySad => "very_sad",
            Mood::Anxious => "anxious",
            Mood::Stressed => "stressed",
            Mood::Angry => "angry",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Mood::VeryHappy => "😄 Very Happy",
            Mood::Happy => "😊 Happy",
            Mood::Neutral => "😐 Neutral",
            Mood::Sad => "😞 Sad",
            Mood::VerySad => "😢 Very Sad",
            Mood::Anxious => "😰 Anxious",
            Mood::Stressed => "😤 Stressed",
            Mood::Angry => "😠 Angry",
        }
    }
}

impl FromStr for Mood {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("mood", s))
    }
}

/// How strongly a mood is felt, on a 1..=10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Option<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct MoodEntry {
    pub id: i64,
    pub session_id: i64,
    pub mood: Mood,
    pub intensity: Intensity,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Assessments
//=========================================================================================

/// The four ordinal risk tiers a survey can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    /// The stored key, e.g. `very_high`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        }
    }

    /// The human label, e.g. `Very High Risk`. Model files use these labels.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::VeryHigh => "Very High Risk",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, UnknownVariant> {
        RiskLevel::ALL
            .into_iter()
            .find(|r| r.label() == label)
            .ok_or_else(|| UnknownVariant::new("risk label", label))
    }
}

impl FromStr for RiskLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("risk level", s))
    }
}

#[derive(Debug, Clone)]
pub struct Assessment {
    pub id: i64,
    pub session_id: i64,
    pub total_score: i64,
    pub risk_level: RiskLevel,
    pub responses: serde_json::Value,
    pub recommendations: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Resources and Preferences
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Crisis,
    Counseling,
    App,
    Article,
    Hotline,
    Exercise,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Crisis,
        ResourceType::Counseling,
        ResourceType::App,
        ResourceType::Article,
        ResourceType::Hotline,
        ResourceType::Exercise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Crisis => "crisis",
            ResourceType::Counseling => "counseling",
            ResourceType::App => "app",
            ResourceType::Article => "article",
            ResourceType::Hotline => "hotline",
            ResourceType::Exercise => "exercise",
        }
    }
}

impl FromStr for ResourceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("resource type", s))
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub resource_type: ResourceType,
    pub url: String,
    pub phone_number: String,
    pub is_crisis: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Seed data for a resource; the title is the natural key.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: &'static str,
    pub description: &'static str,
    pub resource_type: ResourceType,
    pub url: &'static str,
    pub phone_number: &'static str,
    pub is_crisis: bool,
}

/// What happened to a resource row during seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserPreference {
    pub session_id: i64,
    pub enable_mood_tracking: bool,
    pub daily_check_ins: bool,
    pub crisis_mode: bool,
    pub preferred_name: String,
    pub university: String,
    pub year_of_study: String,
}

//=========================================================================================
// Reporting
//=========================================================================================

/// Raw aggregate figures over a reporting window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageCounts {
    pub total_sessions: i64,
    pub total_conversations: i64,
    pub total_messages: i64,
    pub total_mood_entries: i64,
    pub avg_mood_intensity: Option<f64>,
    pub mood_distribution: Vec<(String, i64)>,
    pub prediction_distribution: Vec<(String, i64)>,
    pub total_assessments: i64,
    pub risk_distribution: Vec<(String, i64)>,
    pub avg_assessment_score: Option<f64>,
}

/// What a stale-session cleanup would remove.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub sessions: i64,
    pub conversations: i64,
    pub messages: i64,
    pub mood_entries: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_rejects_values_outside_scale() {
        assert!(Intensity::new(0).is_none());
        assert!(Intensity::new(11).is_none());
        assert_eq!(Intensity::new(1).map(|i| i.value()), Some(1));
        assert_eq!(Intensity::new(10).map(|i| i.value()), Some(10));
    }

    #[test]
    fn condition_labels_parse_back() {
        for condition in Condition::ALL {
            assert_eq!(condition.label().parse::<Condition>(), Ok(condition));
        }
        assert!("Happy".parse::<Condition>().is_err());
    }

    #[test]
    fn risk_level_has_key_and_label() {
        assert_eq!(RiskLevel::VeryHigh.as_str(), "very_high");
        assert_eq!(RiskLevel::from_label("Moderate Risk"), Ok(RiskLevel::Moderate));
        assert!(RiskLevel::from_label("moderate").is_err());
        assert_eq!("high".parse::<RiskLevel>(), Ok(RiskLevel::High));
    }

    #[test]
    fn mood_round_trips_through_storage_key() {
        assert_eq!("very_sad".parse::<Mood>(), Ok(Mood::VerySad));
        assert_eq!(Mood::Stressed.display(), "😤 Stressed");
        assert!("elated".parse::<Mood>().is_err());
    }
}
