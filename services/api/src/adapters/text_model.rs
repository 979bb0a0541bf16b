//! services/api/src/adapters/text_model.rs
//!
//! The chat text classifier: a TF-IDF vectorizer feeding a softmax regression.
//! Implements the `TextClassifier` port.

use super::linear::{SoftmaxRegression, SparseRow, TrainingOptions};
use super::{read_model, write_model};
use moodigo_core::domain::Condition;
use moodigo_core::ports::{PortError, PortResult, TextClassifier, TextPrediction};
use moodigo_core::preprocess_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Vocabulary cap, most frequent terms first.
pub const MAX_FEATURES: usize = 1000;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

const DEMO_CORPUS: [(&str, Condition); 7] = [
    ("I feel really anxious about my exams", Condition::Anxiety),
    ("I'm so depressed and nothing matters", Condition::Depression),
    ("Life is great and I'm feeling amazing", Condition::Normal),
    ("I'm stressed about work and studies", Condition::Stress),
    ("Sometimes I think about ending it all", Condition::Suicidal),
    ("My mood keeps changing rapidly", Condition::Bipolar),
    ("I feel empty and don't know who I am", Condition::PersonalityDisorder),
];

/// Unigrams followed by bigrams of adjacent tokens.
fn terms(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = TOKEN.find_iter(text).map(|m| m.as_str()).collect();
    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

//=========================================================================================
// TF-IDF Vectorizer
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term to column index; columns are in alphabetical term order.
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit(texts: &[String]) -> PortResult<Self> {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for text in texts {
            let doc_terms = terms(text);
            for term in &doc_terms {
                *term_counts.entry(term.clone()).or_default() += 1;
            }
            let mut unique = doc_terms;
            unique.sort();
            unique.dedup();
            for term in unique {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        if term_counts.is_empty() {
            return Err(PortError::Invalid(
                "Training texts contain no usable words".to_string(),
            ));
        }

        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(MAX_FEATURES);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n = texts.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term, i))
            .collect();

        Ok(Self { vocabulary, idf })
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// An L2-normalized TF-IDF row holding only the terms present in `text`.
    /// Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseRow {
        let mut row = SparseRow::from_pairs(
            terms(text)
                .iter()
                .filter_map(|term| self.vocabulary.get(term))
                .map(|&column| (column, self.idf[column])),
        );
        let norm = row.norm();
        if norm > 0.0 {
            row.scale(1.0 / norm);
        }
        row
    }
}

//=========================================================================================
// Text Model
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextModel {
    vectorizer: TfidfVectorizer,
    classifier: SoftmaxRegression,
}

impl TextModel {
    /// Trains on raw texts; each one goes through `preprocess_text` first.
    pub fn train(texts: &[String], labels: &[Condition]) -> PortResult<Self> {
        let processed: Vec<String> = texts.iter().map(|t| preprocess_text(t)).collect();
        let vectorizer = TfidfVectorizer::fit(&processed)?;
        let rows: Vec<SparseRow> = processed.iter().map(|t| vectorizer.transform(t)).collect();
        let labels: Vec<String> = labels.iter().map(|c| c.label().to_string()).collect();
        let classifier = SoftmaxRegression::fit_sparse(
            &rows,
            vectorizer.len(),
            &labels,
            TrainingOptions::default(),
        )?;
        info!(
            "Trained text model on {} texts with {} terms",
            texts.len(),
            vectorizer.len()
        );
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    /// The seven-sentence model used when no trained model is on disk.
    pub fn demo() -> PortResult<Self> {
        info!("Creating demo text model");
        let (texts, labels): (Vec<String>, Vec<Condition>) = DEMO_CORPUS
            .iter()
            .map(|(text, condition)| (text.to_string(), *condition))
            .unzip();
        Self::train(&texts, &labels)
    }

    pub fn load(path: &Path) -> PortResult<Option<Self>> {
        read_model(path)
    }

    pub fn load_or_demo(path: &Path) -> PortResult<Self> {
        match Self::load(path)? {
            Some(model) => {
                info!("Loaded text model from {}", path.display());
                Ok(model)
            }
            None => Self::demo(),
        }
    }

    pub fn save(&self, path: &Path) -> PortResult<()> {
        write_model(path, self)
    }
}

impl TextClassifier for TextModel {
    fn classify(&self, processed_text: &str) -> PortResult<TextPrediction> {
        let row = self.vectorizer.transform(processed_text);
        let probabilities = self.classifier.predict_proba_sparse(&row)?;

        let mut by_condition = BTreeMap::new();
        for (class, p) in self.classifier.classes().iter().zip(probabilities) {
            let condition = Condition::from_str(class)
                .map_err(|e| PortError::Unexpected(format!("Text model label: {}", e)))?;
            by_condition.insert(condition, p);
        }

        let (condition, confidence) = by_condition
            .iter()
            .fold(None, |best: Option<(Condition, f64)>, (&c, &p)| match best {
                Some((_, top)) if top >= p => best,
                _ => Some((c, p)),
            })
            .ok_or_else(|| PortError::Unexpected("Text model has no classes".to_string()))?;

        Ok(TextPrediction {
            condition,
            probabilities: by_condition,
            confidence,
        })
    }
}
