//! crates/moodigo_core/src/analysis.rs
//!
//! Turns classifier output into replies: confidence bucketing, crisis detection,
//! the canned reply table, survey recommendations and mood insights.
//!
//! `Analyzer` is the one service handlers talk to. It is built once at startup
//! with the two classifiers and shared through the application state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{Condition, MoodEntry, RiskLevel};
use crate::ports::{PortResult, RiskModel, TextClassifier};
use crate::preprocess::preprocess_text;

/// The ten Likert-scale questions of the self-assessment, in feature order.
pub const ASSESSMENT_QUESTIONS: [&str; 10] = [
    "How often do you feel nervous or anxious?",
    "How often do you feel depressed or down?",
    "How often do you have trouble sleeping?",
    "How often do you feel overwhelmed by daily tasks?",
    "How often do you feel hopeless about the future?",
    "How often do you have difficulty concentrating?",
    "How often do you feel tired or have little energy?",
    "How often do you feel bad about yourself?",
    "How often do you feel restless or fidgety?",
    "How often do you have thoughts of self-harm?",
];

/// Answer scale shared by every question.
pub const RESPONSE_OPTIONS: [(u8, &str); 5] = [
    (0, "Never"),
    (1, "Almost Never"),
    (2, "Sometimes"),
    (3, "Fairly Often"),
    (4, "Very Often"),
];

pub const MAX_ANSWER: u8 = 4;

const FALLBACK_REPLY: &str = "I'm here to listen. How can I help you today?";

const CRISIS_RESOURCES: &str = "\n\n🔗 Additional resources:\n• National Suicide Prevention Lifeline: 988\n• Crisis Text Line: Text HOME to 741741";

const DEPRESSION_CRISIS_CONFIDENCE: f64 = 0.8;

//=========================================================================================
// Confidence and Crisis Rules
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.7 {
            ConfidenceLevel::High
        } else if confidence >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// A message is a crisis when it reads as suicidal, or as depression with
/// confidence strictly above 0.8.
pub fn is_crisis(prediction: Option<Condition>, confidence: f64) -> bool {
    match prediction {
        Some(Condition::Suicidal) => true,
        Some(Condition::Depression) => confidence > DEPRESSION_CRISIS_CONFIDENCE,
        _ => false,
    }
}

fn reply_template(condition: Condition, level: ConfidenceLevel) -> &'static str {
    use ConfidenceLevel::*;
    match (condition, level) {
        (Condition::Normal, High) => "That's wonderful! You seem to be in a positive mental space. Keep up the great work! 😊",
        (Condition::Normal, Medium) => "It sounds like you're doing okay overall. That's good to hear! 😊",
        (Condition::Normal, Low) => "I'm getting some positive signals. How are you feeling overall?",

        (Condition::Anxiety, High) => "I can sense significant anxiety in your message. Try the 4-7-8 breathing technique: breathe in for 4, hold for 7, exhale for 8. 💙",
        (Condition::Anxiety, Medium) => "You seem anxious about something. Deep breathing and grounding exercises can help. 💙",
        (Condition::Anxiety, Low) => "I'm detecting some possible anxiety. Is there something specific worrying you?",

        (Condition::Depression, High) => "I'm very concerned about what you're sharing. These feelings are serious but treatable. Please consider reaching out to a mental health professional. 💜",
        (Condition::Depression, Medium) => "It sounds like you're going through a difficult time. You're not alone in this. 💜",
        (Condition::Depression, Low) => "I'm sensing some challenging emotions. How long have you been feeling this way?",

        (Condition::Stress, High) => "You seem to be under significant stress. Try to identify the main stressor and take breaks when possible. 💚",
        (Condition::Stress, Medium) => "Stress can be overwhelming. What's your biggest source of stress right now? 💚",
        (Condition::Stress, Low) => "I'm picking up on some possible stress. Are you feeling overwhelmed about anything?",

        (Condition::Suicidal, High) => "I'm extremely concerned about you. Please reach out for immediate help: 988 (US) or contact emergency services. Your life has value. 🆘",
        (Condition::Suicidal, Medium) => "I'm worried about you. Please talk to someone you trust or a crisis counselor: 988. 🆘",
        (Condition::Suicidal, Low) => "Some of your words concern me. Are you having thoughts of hurting yourself?",

        (Condition::Bipolar, High) => "The mood patterns you're describing suggest you should speak with a mental health professional about bipolar disorder. 🏥",
        (Condition::Bipolar, Medium) => "Your mood changes might benefit from professional evaluation. Are you seeing a doctor? 🏥",
        (Condition::Bipolar, Low) => "I'm noticing some mood-related patterns. How have your energy levels been?",

        (Condition::PersonalityDisorder, High) => "The relationship and identity patterns you mention could benefit from specialized therapy. DBT can be particularly helpful. 🤝",
        (Condition::PersonalityDisorder, Medium) => "These interpersonal patterns might be worth exploring with a therapist. 🤝",
        (Condition::PersonalityDisorder, Low) => "I'm noticing some relationship-related concerns. How are your relationships feeling lately?",
    }
}

/// Picks the canned reply for a prediction and appends crisis resources when needed.
pub fn generate_response(prediction: Option<Condition>, confidence: f64) -> String {
    let level = ConfidenceLevel::from_confidence(confidence);
    let mut response = match prediction {
        Some(condition) => reply_template(condition, level).to_string(),
        None => FALLBACK_REPLY.to_string(),
    };

    if is_crisis(prediction, confidence) {
        response.push_str(CRISIS_RESOURCES);
    }
    response
}

//=========================================================================================
// Survey Recommendations and Mood Insights
//=========================================================================================

pub fn recommendations(risk_level: RiskLevel) -> [&'static str; 3] {
    match risk_level {
        RiskLevel::Low => [
            "Continue maintaining healthy habits",
            "Regular exercise and good sleep schedule",
            "Stay connected with friends and family",
        ],
        RiskLevel::Moderate => [
            "Consider speaking with a counselor",
            "Practice stress management techniques",
            "Monitor your mental health regularly",
        ],
        RiskLevel::High => [
            "Strongly recommend professional counseling",
            "Reach out to mental health services",
            "Consider therapy or support groups",
        ],
        RiskLevel::VeryHigh => [
            "Seek immediate professional help",
            "Contact crisis support services",
            "Reach out to trusted friends or family",
        ],
    }
}

/// Summarizes the most frequent mood among the seven most recent entries.
///
/// `history` must be ordered newest first. Ties go to the mood seen first.
pub fn mood_insights(history: &[MoodEntry]) -> String {
    if history.is_empty() {
        return "Not enough data for mood insights.".to_string();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for entry in history.iter().take(7) {
        let key = entry.mood.as_str();
        let count = counts.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let mut most_common = order[0];
    for &key in &order {
        if counts[key] > counts[most_common] {
            most_common = key;
        }
    }

    let mut insights = format!(
        "Your most frequent mood this week has been {}. ",
        most_common.replace('_', " ")
    );
    if most_common.contains("sad") || most_common.contains("stressed") {
        insights.push_str("Consider practicing mindfulness or reaching out for support.");
    } else if most_common.contains("happy") {
        insights.push_str("Great to see you're feeling positive! Keep up the good habits.");
    } else {
        insights.push_str("Your moods seem balanced. Continue monitoring your emotional well-being.");
    }
    insights
}

/// Pads with zeros or truncates so the answers match the questionnaire length.
pub fn normalize_answers(answers: &[u8]) -> Vec<u8> {
    let mut normalized: Vec<u8> = answers
        .iter()
        .take(ASSESSMENT_QUESTIONS.len())
        .copied()
        .collect();
    normalized.resize(ASSESSMENT_QUESTIONS.len(), 0);
    normalized
}

//=========================================================================================
// The Analyzer Service
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MessageAnalysis {
    pub prediction: Option<Condition>,
    pub probabilities: BTreeMap<Condition, f64>,
    pub confidence: f64,
    pub response: String,
    pub is_crisis: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyOutcome {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub total_score: i64,
    pub recommendations: Vec<String>,
}

/// Combines the text classifier and the survey model behind one service.
#[derive(Clone)]
pub struct Analyzer {
    text_classifier: Arc<dyn TextClassifier>,
    risk_model: Arc<dyn RiskModel>,
}

impl Analyzer {
    pub fn new(text_classifier: Arc<dyn TextClassifier>, risk_model: Arc<dyn RiskModel>) -> Self {
        Self {
            text_classifier,
            risk_model,
        }
    }

    /// Classifies a chat message and chooses the reply.
    ///
    /// Text that is empty after preprocessing gets no prediction. A classifier
    /// failure falls back to `Normal` with full confidence.
    pub fn analyze_message(&self, message: &str) -> MessageAnalysis {
        let processed = preprocess_text(message);

        let (prediction, probabilities, confidence) = if processed.is_empty() {
            (None, BTreeMap::new(), 0.0)
        } else {
            match self.text_classifier.classify(&processed) {
                Ok(p) => (Some(p.condition), p.probabilities, p.confidence),
                Err(e) => {
                    warn!("Text classification failed, falling back to Normal: {}", e);
                    (
                        Some(Condition::Normal),
                        BTreeMap::from([(Condition::Normal, 1.0)]),
                        1.0,
                    )
                }
            }
        };
        debug!(?prediction, confidence, "Message analyzed");

        MessageAnalysis {
            prediction,
            probabilities,
            confidence,
            response: generate_response(prediction, confidence),
            is_crisis: is_crisis(prediction, confidence),
        }
    }

    /// Scores a completed questionnaire.
    pub fn analyze_survey(&self, answers: &[u8]) -> PortResult<SurveyOutcome> {
        let answers = normalize_answers(answers);
        let prediction = self.risk_model.predict(&answers)?;
        let total_score = answers.iter().map(|&a| i64::from(a)).sum();

        Ok(SurveyOutcome {
            risk_level: prediction.risk_level,
            confidence: prediction.confidence,
            total_score,
            recommendations: recommendations(prediction.risk_level)
                .iter()
                .map(|r| r.to_string())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Intensity, Mood};
    use crate::ports::{PortError, RiskPrediction, TextPrediction};
    use chrono::Utc;

    struct FixedClassifier(Option<(Condition, f64)>);

    impl TextClassifier for FixedClassifier {
        fn classify(&self, _processed_text: &str) -> PortResult<TextPrediction> {
            match self.0 {
                Some((condition, confidence)) => Ok(TextPrediction {
                    condition,
                    probabilities: BTreeMap::from([(condition, confidence)]),
                    confidence,
                }),
                None => Err(PortError::Unexpected("model missing".to_string())),
            }
        }
    }

    struct FixedRisk(RiskLevel);

    impl RiskModel for FixedRisk {
        fn predict(&self, answers: &[u8]) -> PortResult<RiskPrediction> {
            assert_eq!(answers.len(), ASSESSMENT_QUESTIONS.len());
            Ok(RiskPrediction {
                risk_level: self.0,
                confidence: 0.6,
            })
        }
    }

    fn analyzer(text: Option<(Condition, f64)>) -> Analyzer {
        Analyzer::new(
            Arc::new(FixedClassifier(text)),
            Arc::new(FixedRisk(RiskLevel::Moderate)),
        )
    }

    fn entry(mood: Mood) -> MoodEntry {
        MoodEntry {
            id: 0,
            session_id: 1,
            mood,
            intensity: Intensity::new(5).unwrap(),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn confidence_buckets_use_inclusive_lower_bounds() {
        assert_eq!(ConfidenceLevel::from_confidence(0.75), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.7), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.69), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.5), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.49), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_confidence(0.0), ConfidenceLevel::Low);
    }

    #[test]
    fn high_confidence_selects_high_template() {
        let reply = generate_response(Some(Condition::Anxiety), 0.75);
        assert!(reply.starts_with("I can sense significant anxiety"));
    }

    #[test]
    fn suicidal_is_always_a_crisis() {
        for confidence in [0.0, 0.3, 0.55, 0.99] {
            assert!(is_crisis(Some(Condition::Suicidal), confidence));
            assert!(generate_response(Some(Condition::Suicidal), confidence)
                .ends_with("Text HOME to 741741"));
        }
    }

    #[test]
    fn depression_is_a_crisis_only_above_point_eight() {
        assert!(!is_crisis(Some(Condition::Depression), 0.8));
        assert!(is_crisis(Some(Condition::Depression), 0.81));
        assert!(!is_crisis(Some(Condition::Anxiety), 0.99));
        assert!(!is_crisis(None, 1.0));

        let reply = generate_response(Some(Condition::Depression), 0.8);
        assert!(!reply.contains("Additional resources"));
    }

    #[test]
    fn missing_prediction_uses_fallback_reply() {
        assert_eq!(generate_response(None, 0.0), FALLBACK_REPLY);
    }

    #[test]
    fn empty_message_gets_no_prediction() {
        let analysis = analyzer(Some((Condition::Stress, 0.9))).analyze_message(" :) ");
        assert_eq!(analysis.prediction, None);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.response, FALLBACK_REPLY);
        assert!(!analysis.is_crisis);
    }

    #[test]
    fn classifier_failure_falls_back_to_normal() {
        let analysis = analyzer(None).analyze_message("hello there");
        assert_eq!(analysis.prediction, Some(Condition::Normal));
        assert_eq!(analysis.confidence, 1.0);
        assert!(analysis.response.starts_with("That's wonderful!"));
    }

    #[test]
    fn crisis_message_carries_flag_and_resources() {
        let analysis = analyzer(Some((Condition::Suicidal, 0.4))).analyze_message("i give up");
        assert!(analysis.is_crisis);
        assert!(analysis.response.starts_with("Some of your words concern me."));
        assert!(analysis.response.contains("988"));
    }

    #[test]
    fn survey_answers_are_padded_and_summed() {
        let outcome = analyzer(None).analyze_survey(&[4, 3, 2]).unwrap();
        assert_eq!(outcome.total_score, 9);
        assert_eq!(outcome.risk_level, RiskLevel::Moderate);
        assert_eq!(outcome.recommendations[0], "Consider speaking with a counselor");
    }

    #[test]
    fn survey_answers_beyond_questionnaire_are_dropped() {
        let answers = [1u8; 14];
        assert_eq!(normalize_answers(&answers), vec![1u8; 10]);
        let outcome = analyzer(None).analyze_survey(&answers).unwrap();
        assert_eq!(outcome.total_score, 10);
    }

    #[test]
    fn mood_insights_handle_empty_history() {
        assert_eq!(mood_insights(&[]), "Not enough data for mood insights.");
    }

    #[test]
    fn mood_insights_pick_most_frequent_recent_mood() {
        let history = vec![
            entry(Mood::VerySad),
            entry(Mood::Happy),
            entry(Mood::VerySad),
        ];
        assert_eq!(
            mood_insights(&history),
            "Your most frequent mood this week has been very sad. Consider practicing mindfulness or reaching out for support."
        );
    }

    #[test]
    fn mood_insights_only_look_at_seven_entries() {
        let mut history = vec![entry(Mood::Neutral); 7];
        history.extend(vec![entry(Mood::Happy); 10]);
        assert!(mood_insights(&history).ends_with("Continue monitoring your emotional well-being."));
    }

    #[test]
    fn mood_insights_break_ties_by_first_seen() {
        let history = vec![entry(Mood::Happy), entry(Mood::Stressed)];
        assert!(mood_insights(&history).contains("has been happy."));
    }
}
