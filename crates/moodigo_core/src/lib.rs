pub mod analysis;
pub mod domain;
pub mod ports;
pub mod preprocess;

pub use analysis::{Analyzer, MessageAnalysis, SurveyOutcome};
pub use domain::{
    Assessment, Condition, Conversation, Intensity, Message, Mood, MoodEntry, Resource,
    ResourceType, RiskLevel, Sender, User, UserCredentials, UserPreference, UserSession,
};
pub use ports::{DatabaseService, PortError, PortResult, RiskModel, TextClassifier};
pub use preprocess::preprocess_text;
