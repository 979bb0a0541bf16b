//! services/api/src/commands/export.rs
//!
//! Anonymized usage analytics, exported as a sectioned CSV report or as JSON.

use chrono::{DateTime, Duration, Utc};
use moodigo_core::ports::DatabaseService;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(CommandError::InvalidArgument(format!(
                "unknown format '{}', expected csv or json",
                other
            ))),
        }
    }
}

//=========================================================================================
// Report Structure
//=========================================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageStatistics {
    pub total_sessions: i64,
    pub total_conversations: i64,
    pub total_messages: i64,
    pub avg_messages_per_conversation: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoodTracking {
    pub total_mood_entries: i64,
    pub avg_mood_intensity: f64,
    pub mood_distribution: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AiPredictions {
    pub prediction_distribution: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssessmentStatistics {
    pub total_assessments: i64,
    pub risk_distribution: BTreeMap<String, i64>,
    pub avg_assessment_score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyticsReport {
    pub period_days: i64,
    pub generated_at: String,
    pub usage_statistics: UsageStatistics,
    pub mood_tracking: MoodTracking,
    pub ai_predictions: AiPredictions,
    pub assessments: AssessmentStatistics,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//=========================================================================================
// Gathering
//=========================================================================================

/// Aggregates everything created in the `days` before `now`.
pub async fn gather_analytics(
    db: &dyn DatabaseService,
    days: i64,
    now: DateTime<Utc>,
) -> Result<AnalyticsReport, CommandError> {
    if days < 0 {
        return Err(CommandError::InvalidArgument(format!(
            "--days must not be negative, got {}",
            days
        )));
    }
    let cutoff = now - Duration::days(days);
    let usage = db.usage_since(cutoff).await?;

    let avg_messages_per_conversation =
        usage.total_messages as f64 / usage.total_conversations.max(1) as f64;

    Ok(AnalyticsReport {
        period_days: (now - cutoff).num_days(),
        generated_at: now.to_rfc3339(),
        usage_statistics: UsageStatistics {
            total_sessions: usage.total_sessions,
            total_conversations: usage.total_conversations,
            total_messages: usage.total_messages,
            avg_messages_per_conversation: round2(avg_messages_per_conversation),
        },
        mood_tracking: MoodTracking {
            total_mood_entries: usage.total_mood_entries,
            avg_mood_intensity: round2(usage.avg_mood_intensity.unwrap_or(0.0)),
            mood_distribution: usage.mood_distribution.into_iter().collect(),
        },
        ai_predictions: AiPredictions {
            prediction_distribution: usage.prediction_distribution.into_iter().collect(),
        },
        assessments: AssessmentStatistics {
            total_assessments: usage.total_assessments,
            risk_distribution: usage.risk_distribution.into_iter().collect(),
            avg_assessment_score: round2(usage.avg_assessment_score.unwrap_or(0.0)),
        },
    })
}

//=========================================================================================
// Writers
//=========================================================================================

/// `total_sessions` -> `Total Sessions`.
fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

type Row = Vec<String>;

fn row<const N: usize>(fields: [&str; N]) -> Row {
    fields.iter().map(|f| f.to_string()).collect()
}

fn counts(distribution: &BTreeMap<String, i64>) -> Vec<Row> {
    distribution
        .iter()
        .map(|(key, count)| vec![key.clone(), count.to_string()])
        .collect()
}

/// The report as blocks of rows. Blocks are separated by a blank line.
fn csv_sections(report: &AnalyticsReport) -> Vec<Vec<Row>> {
    let usage = &report.usage_statistics;
    let mood = &report.mood_tracking;
    let assessments = &report.assessments;

    let mut usage_rows = vec![row(["Usage Statistics"])];
    for (key, value) in [
        ("total_sessions", usage.total_sessions.to_string()),
        ("total_conversations", usage.total_conversations.to_string()),
        ("total_messages", usage.total_messages.to_string()),
        (
            "avg_messages_per_conversation",
            usage.avg_messages_per_conversation.to_string(),
        ),
    ] {
        usage_rows.push(vec![title_case(key), value]);
    }

    let mut mood_distribution = vec![row(["Mood Distribution"])];
    mood_distribution.extend(counts(&mood.mood_distribution));
    let mut predictions = vec![row(["AI Predictions"])];
    predictions.extend(counts(&report.ai_predictions.prediction_distribution));
    let mut risk_distribution = vec![row(["Risk Distribution"])];
    risk_distribution.extend(counts(&assessments.risk_distribution));

    vec![
        vec![
            row(["Moodigo Analytics Report"]),
            row(["Generated:", report.generated_at.as_str()]),
            row(["Period:", format!("{} days", report.period_days).as_str()]),
        ],
        usage_rows,
        vec![
            row(["Mood Tracking"]),
            row(["Total Entries", mood.total_mood_entries.to_string().as_str()]),
            row(["Average Intensity", mood.avg_mood_intensity.to_string().as_str()]),
        ],
        mood_distribution,
        predictions,
        vec![
            row(["Mental Health Assessments"]),
            row(["Total Assessments", assessments.total_assessments.to_string().as_str()]),
            row(["Average Score", assessments.avg_assessment_score.to_string().as_str()]),
        ],
        risk_distribution,
    ]
}

/// Writes the sectioned report. Each block gets its own csv writer; the
/// blank separator lines go straight to `out` since csv writes an empty
/// record as `""`.
pub fn write_csv<W: Write>(report: &AnalyticsReport, mut out: W) -> Result<(), CommandError> {
    for (index, section) in csv_sections(report).iter().enumerate() {
        if index > 0 {
            out.write_all(b"\n")?;
        }
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut out);
        for record in section {
            writer.write_record(record)?;
        }
        writer.flush()?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(report: &AnalyticsReport, mut out: W) -> Result<(), CommandError> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}

//=========================================================================================
// Command Entry Point
//=========================================================================================

/// Gathers the report and writes it to `output`, or to `out` when no path is given.
pub async fn export_analytics<W: Write>(
    db: &dyn DatabaseService,
    format: ExportFormat,
    days: i64,
    output: Option<&Path>,
    out: &mut W,
) -> Result<AnalyticsReport, CommandError> {
    writeln!(out, "Generating analytics for last {} days...", days)?;
    let report = gather_analytics(db, days, Utc::now()).await?;

    match (format, output) {
        (ExportFormat::Csv, Some(path)) => write_csv(&report, File::create(path)?)?,
        (ExportFormat::Csv, None) => write_csv(&report, &mut *out)?,
        (ExportFormat::Json, Some(path)) => write_json(&report, File::create(path)?)?,
        (ExportFormat::Json, None) => write_json(&report, &mut *out)?,
    }

    let destination = output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    info!("Analytics exported to {}", destination);
    writeln!(out, "Analytics exported successfully to {}!", destination)?;
    Ok(report)
}
