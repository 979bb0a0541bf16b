//! services/api/src/adapters/training_data.rs
//!
//! CSV loaders for the two training sets.
//!
//! Survey files have one column per questionnaire answer followed by a final
//! risk column (`Low Risk` or `low` style). Text files need `statement` and
//! `status` columns; other columns are ignored.

use moodigo_core::analysis::{ASSESSMENT_QUESTIONS, MAX_ANSWER};
use moodigo_core::domain::{Condition, RiskLevel};
use moodigo_core::ports::{PortError, PortResult};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

fn invalid(path: &Path, e: impl std::fmt::Display) -> PortError {
    PortError::Invalid(format!("{}: {}", path.display(), e))
}

pub fn load_survey_csv(path: &Path) -> PortResult<(Vec<Vec<u8>>, Vec<RiskLevel>)> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| invalid(path, e))?;
    let expected = ASSESSMENT_QUESTIONS.len() + 1;
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = record.map_err(|e| invalid(path, e))?;
        if record.len() != expected {
            return Err(invalid(
                path,
                format!("line {} has {} columns, expected {}", line, record.len(), expected),
            ));
        }

        let answers = record
            .iter()
            .take(ASSESSMENT_QUESTIONS.len())
            .map(|field| match field.trim().parse::<u8>() {
                Ok(answer) if answer <= MAX_ANSWER => Ok(answer),
                _ => Err(invalid(
                    path,
                    format!("line {}: '{}' is not an answer between 0 and {}", line, field, MAX_ANSWER),
                )),
            })
            .collect::<PortResult<Vec<u8>>>()?;

        let label = record.get(ASSESSMENT_QUESTIONS.len()).unwrap_or("").trim();
        let risk_level = RiskLevel::from_label(label)
            .or_else(|_| RiskLevel::from_str(label))
            .map_err(|e| invalid(path, format!("line {}: {}", line, e)))?;

        rows.push(answers);
        labels.push(risk_level);
    }

    if rows.is_empty() {
        return Err(invalid(path, "no survey rows"));
    }
    info!("Loaded {} survey rows from {}", rows.len(), path.display());
    Ok((rows, labels))
}

pub fn load_text_csv(path: &Path) -> PortResult<(Vec<String>, Vec<Condition>)> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| invalid(path, e))?;
    let headers = reader.headers().map_err(|e| invalid(path, e))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| invalid(path, format!("missing '{}' column", name)))
    };
    let statement_column = column("statement")?;
    let status_column = column("status")?;

    let mut texts = Vec::new();
    let mut labels = Vec::new();
    let mut skipped = 0;

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| invalid(path, e))?;
        let statement = record.get(statement_column).unwrap_or("").trim();
        if statement.is_empty() {
            skipped += 1;
            continue;
        }
        let status = record.get(status_column).unwrap_or("").trim();
        let condition = Condition::from_str(status)
            .map_err(|e| invalid(path, format!("line {}: {}", index + 2, e)))?;
        texts.push(statement.to_string());
        labels.push(condition);
    }

    if skipped > 0 {
        warn!("Skipped {} rows with an empty statement", skipped);
    }
    if texts.is_empty() {
        return Err(invalid(path, "no statements"));
    }
    info!("Loaded {} statements from {}", texts.len(), path.display());
    Ok((texts, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_survey_rows_with_either_label_style() {
        let file = csv_file(
            "q1,q2,q3,q4,q5,q6,q7,q8,q9,q10,risk\n\
             0,0,0,0,0,0,0,0,0,0,Low Risk\n\
             4,4,4,4,4,4,4,4,4,4,very_high\n",
        );
        let (rows, labels) = load_survey_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![4; 10]);
        assert_eq!(labels, vec![RiskLevel::Low, RiskLevel::VeryHigh]);
    }

    #[test]
    fn rejects_out_of_range_answers() {
        let file = csv_file(
            "q1,q2,q3,q4,q5,q6,q7,q8,q9,q10,risk\n\
             5,0,0,0,0,0,0,0,0,0,Low Risk\n",
        );
        let err = load_survey_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn reads_statements_and_skips_blank_ones() {
        let file = csv_file(
            "id,statement,status\n\
             1,I can't sleep before exams,Anxiety\n\
             2,,Normal\n\
             3,\"I feel empty, lost\",Personality disorder\n",
        );
        let (texts, labels) = load_text_csv(file.path()).unwrap();
        assert_eq!(texts, vec!["I can't sleep before exams", "I feel empty, lost"]);
        assert_eq!(labels, vec![Condition::Anxiety, Condition::PersonalityDisorder]);
    }

    #[test]
    fn text_csv_needs_both_columns() {
        let file = csv_file("text,label\nhello,Normal\n");
        assert!(matches!(load_text_csv(file.path()), Err(PortError::Invalid(_))));
    }
}
