//! services/api/src/commands/train.rs
//!
//! Builds the survey and text models and writes them to their configured paths.

use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::CommandError;
use crate::adapters::training_data::{load_survey_csv, load_text_csv};
use crate::adapters::{SurveyModel, TextModel};

const SURVEY_MODEL_NAME: &str = "Softmax Regression";

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub survey_data: Option<PathBuf>,
    pub nlp_data: Option<PathBuf>,
    pub retrain: bool,
    pub survey_model_path: PathBuf,
    pub text_model_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainResult {
    /// Both model files were present and `retrain` was not set.
    AlreadyTrained,
    Trained {
        survey_from_data: bool,
        text_from_data: bool,
    },
}

pub fn train_models<W: Write>(options: &TrainOptions, out: &mut W) -> Result<TrainResult, CommandError> {
    writeln!(out, "Starting ML model training...")?;

    if options.survey_model_path.exists() && options.text_model_path.exists() && !options.retrain {
        writeln!(out, "Models already exist. Use --retrain to force retraining.")?;
        return Ok(TrainResult::AlreadyTrained);
    }

    let survey_model = match &options.survey_data {
        Some(path) => {
            writeln!(out, "Training survey-based model...")?;
            let (rows, labels) = load_survey_csv(path)?;
            let model = SurveyModel::train(&rows, &labels, SURVEY_MODEL_NAME)?;
            writeln!(
                out,
                "Survey model training completed (training accuracy {:.2}).",
                model.accuracy
            )?;
            model
        }
        None => {
            writeln!(out, "No survey data provided. Creating demo survey model.")?;
            SurveyModel::demo()?
        }
    };

    let text_model = match &options.nlp_data {
        Some(path) => {
            writeln!(out, "Training NLP model...")?;
            let (texts, labels) = load_text_csv(path)?;
            let model = TextModel::train(&texts, &labels)?;
            writeln!(out, "NLP model training completed.")?;
            model
        }
        None => {
            writeln!(out, "No NLP data provided. Creating demo NLP model.")?;
            TextModel::demo()?
        }
    };

    // Nothing is written until both models are built.
    survey_model.save(&options.survey_model_path)?;
    info!("Saved survey model to {}", options.survey_model_path.display());
    text_model.save(&options.text_model_path)?;
    info!("Saved text model to {}", options.text_model_path.display());

    writeln!(out, "ML model setup completed successfully!")?;
    Ok(TrainResult::Trained {
        survey_from_data: options.survey_data.is_some(),
        text_from_data: options.nlp_data.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodigo_core::domain::{Condition, RiskLevel};
    use moodigo_core::ports::{RiskModel, TextClassifier};
    use moodigo_core::preprocess::preprocess_text;
    use std::path::Path;

    fn options_in(dir: &Path) -> TrainOptions {
        TrainOptions {
            survey_data: None,
            nlp_data: None,
            retrain: false,
            survey_model_path: dir.join("survey.json"),
            text_model_path: dir.join("text.json"),
        }
    }

    #[test]
    fn builds_demo_models_then_refuses_without_retrain() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_in(dir.path());

        let mut out: Vec<u8> = Vec::new();
        let result = train_models(&options, &mut out).unwrap();
        assert_eq!(
            result,
            TrainResult::Trained {
                survey_from_data: false,
                text_from_data: false
            }
        );
        let survey = SurveyModel::load(&options.survey_model_path).unwrap().unwrap();
        assert_eq!(survey.model_name, "Softmax Regression (Demo)");
        assert!(TextModel::load(&options.text_model_path).unwrap().is_some());

        let mut out: Vec<u8> = Vec::new();
        assert_eq!(train_models(&options, &mut out).unwrap(), TrainResult::AlreadyTrained);
        assert!(String::from_utf8(out).unwrap().contains("Use --retrain"));

        let retrain = TrainOptions {
            retrain: true,
            ..options
        };
        assert!(matches!(
            train_models(&retrain, &mut Vec::<u8>::new()).unwrap(),
            TrainResult::Trained { .. }
        ));
    }

    #[test]
    fn trains_from_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let survey_csv = dir.path().join("survey.csv");
        let mut survey = String::from("q1,q2,q3,q4,q5,q6,q7,q8,q9,q10,risk\n");
        for _ in 0..5 {
            survey.push_str("0,0,0,0,0,0,0,0,0,0,Low Risk\n");
            survey.push_str("4,4,4,4,4,4,4,4,4,4,High Risk\n");
        }
        std::fs::write(&survey_csv, survey).unwrap();

        let text_csv = dir.path().join("text.csv");
        std::fs::write(
            &text_csv,
            "statement,status\n\
             I feel calm and content today,Normal\n\
             Everything is going fine at work,Normal\n\
             I am so worried and panicking constantly,Anxiety\n\
             My heart races with worry and panic,Anxiety\n",
        )
        .unwrap();

        let options = TrainOptions {
            survey_data: Some(survey_csv),
            nlp_data: Some(text_csv),
            ..options_in(dir.path())
        };
        let result = train_models(&options, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(
            result,
            TrainResult::Trained {
                survey_from_data: true,
                text_from_data: true
            }
        );

        let survey = SurveyModel::load(&options.survey_model_path).unwrap().unwrap();
        assert_eq!(survey.model_name, SURVEY_MODEL_NAME);
        assert_eq!(survey.predict(&[4; 10]).unwrap().risk_level, RiskLevel::High);

        let text = TextModel::load(&options.text_model_path).unwrap().unwrap();
        let prediction = text
            .classify(&preprocess_text("so much worry and panic"))
            .unwrap();
        assert_eq!(prediction.condition, Condition::Anxiety);
    }

    #[test]
    fn bad_training_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "a,b\n1,2\n").unwrap();
        let options = TrainOptions {
            survey_data: Some(bad),
            ..options_in(dir.path())
        };
        assert!(matches!(
            train_models(&options, &mut Vec::<u8>::new()),
            Err(CommandError::Port(_))
        ));
        assert!(!options.survey_model_path.exists());
    }

    #[test]
    fn failed_text_training_leaves_existing_models_alone() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_in(dir.path());
        train_models(&options, &mut Vec::<u8>::new()).unwrap();
        let survey_before = std::fs::read(&options.survey_model_path).unwrap();
        let text_before = std::fs::read(&options.text_model_path).unwrap();

        let survey_csv = dir.path().join("survey.csv");
        let mut survey = String::from("q1,q2,q3,q4,q5,q6,q7,q8,q9,q10,risk\n");
        survey.push_str("0,0,0,0,0,0,0,0,0,0,Low Risk\n");
        survey.push_str("4,4,4,4,4,4,4,4,4,4,High Risk\n");
        std::fs::write(&survey_csv, survey).unwrap();
        let text_csv = dir.path().join("text.csv");
        std::fs::write(&text_csv, "sentence,label\nhello there,Normal\n").unwrap();

        let retrain = TrainOptions {
            survey_data: Some(survey_csv),
            nlp_data: Some(text_csv),
            retrain: true,
            ..options
        };
        assert!(train_models(&retrain, &mut Vec::<u8>::new()).is_err());
        assert_eq!(std::fs::read(&retrain.survey_model_path).unwrap(), survey_before);
        assert_eq!(std::fs::read(&retrain.text_model_path).unwrap(), text_before);
    }

    #[test]
    fn failed_text_training_writes_no_survey_model() {
        let dir = tempfile::tempdir().unwrap();
        let text_csv = dir.path().join("text.csv");
        std::fs::write(&text_csv, "a,b\n1,2\n").unwrap();
        let options = TrainOptions {
            nlp_data: Some(text_csv),
            ..options_in(dir.path())
        };
        assert!(train_models(&options, &mut Vec::<u8>::new()).is_err());
        assert!(!options.survey_model_path.exists());
        assert!(!options.text_model_path.exists());
    }
}
