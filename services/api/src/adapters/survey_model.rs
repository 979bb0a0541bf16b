//! services/api/src/adapters/survey_model.rs
//!
//! The questionnaire risk model. Implements the `RiskModel` port.

use super::linear::{SoftmaxRegression, TrainingOptions};
use super::{read_model, write_model};
use moodigo_core::analysis::{ASSESSMENT_QUESTIONS, MAX_ANSWER};
use moodigo_core::domain::RiskLevel;
use moodigo_core::ports::{PortError, PortResult, RiskModel, RiskPrediction};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const DEMO_ROWS: usize = 100;
const DEMO_SEED: u64 = 42;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyModel {
    pub model_name: String,
    pub accuracy: f64,
    /// The question order the answers are expected in.
    pub questions: Vec<String>,
    classifier: SoftmaxRegression,
}

fn features(answers: &[u8]) -> Vec<f64> {
    answers
        .iter()
        .map(|&a| f64::from(a) / f64::from(MAX_ANSWER))
        .collect()
}

impl SurveyModel {
    /// Trains on answer rows sized to the questionnaire. `accuracy` is measured
    /// on the training rows.
    pub fn train(rows: &[Vec<u8>], labels: &[RiskLevel], model_name: &str) -> PortResult<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != ASSESSMENT_QUESTIONS.len()) {
            return Err(PortError::Invalid(format!(
                "Survey rows need {} answers, found {}",
                ASSESSMENT_QUESTIONS.len(),
                row.len()
            )));
        }
        let matrix: Vec<Vec<f64>> = rows.iter().map(|row| features(row)).collect();
        let names: Vec<String> = labels.iter().map(|r| r.label().to_string()).collect();
        let classifier = SoftmaxRegression::fit(&matrix, &names, TrainingOptions::default())?;

        let correct = matrix
            .iter()
            .zip(&names)
            .filter(|(row, label)| {
                classifier
                    .predict(row)
                    .map(|(predicted, _)| predicted == label.as_str())
                    .unwrap_or(false)
            })
            .count();
        let accuracy = correct as f64 / matrix.len() as f64;
        info!(
            "Trained survey model '{}' on {} rows (training accuracy {:.2})",
            model_name,
            rows.len(),
            accuracy
        );

        Ok(Self {
            model_name: model_name.to_string(),
            accuracy,
            questions: ASSESSMENT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            classifier,
        })
    }

    /// A placeholder fitted to seeded random answers and labels.
    pub fn demo() -> PortResult<Self> {
        info!("Creating demo survey model");
        let mut rng = StdRng::seed_from_u64(DEMO_SEED);
        let rows: Vec<Vec<u8>> = (0..DEMO_ROWS)
            .map(|_| {
                (0..ASSESSMENT_QUESTIONS.len())
                    .map(|_| rng.gen_range(0..=MAX_ANSWER))
                    .collect()
            })
            .collect();
        let labels: Vec<RiskLevel> = (0..DEMO_ROWS)
            .map(|_| RiskLevel::ALL[rng.gen_range(0..RiskLevel::ALL.len())])
            .collect();

        let mut model = Self::train(&rows, &labels, "Softmax Regression (Demo)")?;
        model.accuracy = 0.85;
        Ok(model)
    }

    pub fn load(path: &Path) -> PortResult<Option<Self>> {
        read_model(path)
    }

    pub fn load_or_demo(path: &Path) -> PortResult<Self> {
        match Self::load(path)? {
            Some(model) => {
                info!(
                    "Loaded survey model '{}' from {}",
                    model.model_name,
                    path.display()
                );
                Ok(model)
            }
            None => Self::demo(),
        }
    }

    pub fn save(&self, path: &Path) -> PortResult<()> {
        write_model(path, self)
    }
}

impl RiskModel for SurveyModel {
    fn predict(&self, answers: &[u8]) -> PortResult<RiskPrediction> {
        if answers.len() != self.questions.len() {
            return Err(PortError::Invalid(format!(
                "Expected {} answers, got {}",
                self.questions.len(),
                answers.len()
            )));
        }
        let (label, confidence) = self.classifier.predict(&features(answers))?;
        let risk_level = RiskLevel::from_label(label)
            .map_err(|e| PortError::Unexpected(format!("Survey model label: {}", e)))?;
        Ok(RiskPrediction {
            risk_level,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_model_is_deterministic() {
        let first = SurveyModel::demo().unwrap();
        let second = SurveyModel::demo().unwrap();
        let answers = [2, 3, 1, 0, 4, 2, 1, 3, 0, 2];

        assert_eq!(first.model_name, "Softmax Regression (Demo)");
        assert_eq!(first.accuracy, 0.85);
        assert_eq!(
            first.predict(&answers).unwrap(),
            second.predict(&answers).unwrap()
        );
    }

    #[test]
    fn learns_a_score_threshold() {
        let rows: Vec<Vec<u8>> = (0..=4).map(|a| vec![a; 10]).collect();
        let labels = [
            RiskLevel::Low,
            RiskLevel::Low,
            RiskLevel::High,
            RiskLevel::High,
            RiskLevel::High,
        ];
        let model = SurveyModel::train(&rows, &labels, "threshold").unwrap();

        assert_eq!(model.predict(&[0; 10]).unwrap().risk_level, RiskLevel::Low);
        assert_eq!(model.predict(&[4; 10]).unwrap().risk_level, RiskLevel::High);
        assert!(model.accuracy > 0.5);
    }

    #[test]
    fn rejects_wrongly_sized_answers() {
        let model = SurveyModel::demo().unwrap();
        assert!(matches!(model.predict(&[1, 2]), Err(PortError::Invalid(_))));
        assert!(SurveyModel::train(&[vec![1, 2]], &[RiskLevel::Low], "short").is_err());
    }

    #[test]
    fn saved_model_keeps_its_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        SurveyModel::demo().unwrap().save(&path).unwrap();

        let loaded = SurveyModel::load_or_demo(&path).unwrap();
        assert_eq!(loaded.model_name, "Softmax Regression (Demo)");
        assert_eq!(loaded.questions.len(), ASSESSMENT_QUESTIONS.len());
    }
}
