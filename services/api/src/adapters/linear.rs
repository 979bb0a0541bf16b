//! services/api/src/adapters/linear.rs
//!
//! A small multinomial logistic regression shared by the survey and text models.

use moodigo_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};

/// Gradient descent settings.
#[derive(Debug, Clone, Copy)]
pub struct TrainingOptions {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty applied to the weights (not the biases).
    pub l2: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            learning_rate: 1.0,
            epochs: 500,
            l2: 0.001,
        }
    }
}

/// A feature row the regression can read: dense slices or sparse rows.
pub trait FeatureRow {
    /// One past the highest column the row touches.
    fn span(&self) -> usize;
    /// Calls `f` for every stored `(column, value)`.
    fn for_each_value(&self, f: impl FnMut(usize, f64));
}

impl FeatureRow for [f64] {
    fn span(&self) -> usize {
        self.len()
    }

    fn for_each_value(&self, mut f: impl FnMut(usize, f64)) {
        self.iter().enumerate().for_each(|(column, &value)| f(column, value));
    }
}

impl FeatureRow for Vec<f64> {
    fn span(&self) -> usize {
        self.as_slice().span()
    }

    fn for_each_value(&self, f: impl FnMut(usize, f64)) {
        self.as_slice().for_each_value(f)
    }
}

/// Non-zero entries of a row, sorted by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRow(Vec<(usize, f64)>);

impl SparseRow {
    /// Builds a row from `(column, value)` pairs. Repeated columns are summed
    /// and zeros dropped.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut entries: Vec<(usize, f64)> = Vec::new();
        let mut pairs: Vec<(usize, f64)> = pairs.into_iter().collect();
        pairs.sort_by_key(|(column, _)| *column);
        for (column, value) in pairs {
            match entries.last_mut() {
                Some((last, total)) if *last == column => *total += value,
                _ => entries.push((column, value)),
            }
        }
        entries.retain(|(_, value)| *value != 0.0);
        Self(entries)
    }

    pub fn get(&self, column: usize) -> f64 {
        self.0
            .binary_search_by_key(&column, |(c, _)| *c)
            .map_or(0.0, |i| self.0[i].1)
    }

    pub fn nnz(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f64 {
        self.0.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    pub fn scale(&mut self, factor: f64) {
        self.0.iter_mut().for_each(|(_, v)| *v *= factor);
    }
}

impl FeatureRow for SparseRow {
    fn span(&self) -> usize {
        self.0.last().map_or(0, |(column, _)| column + 1)
    }

    fn for_each_value(&self, mut f: impl FnMut(usize, f64)) {
        self.0.iter().for_each(|&(column, value)| f(column, value));
    }
}

/// Softmax regression over feature rows. Classes are kept sorted so
/// probability vectors line up with `classes()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    classes: Vec<String>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl SoftmaxRegression {
    /// Fits the model on dense rows of equal length.
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[String],
        options: TrainingOptions,
    ) -> PortResult<Self> {
        let width = features.first().map_or(0, Vec::len);
        if let Some(row) = features.iter().position(|row| row.len() != width) {
            return Err(PortError::Invalid(format!(
                "Row {} has {} features, expected {}",
                row,
                features[row].len(),
                width
            )));
        }
        Self::fit_rows(features, width, labels, options)
    }

    /// Fits the model on sparse rows over `width` columns.
    pub fn fit_sparse(
        rows: &[SparseRow],
        width: usize,
        labels: &[String],
        options: TrainingOptions,
    ) -> PortResult<Self> {
        if let Some(row) = rows.iter().position(|row| row.span() > width) {
            return Err(PortError::Invalid(format!(
                "Row {} reaches column {}, expected at most {}",
                row,
                rows[row].span(),
                width
            )));
        }
        Self::fit_rows(rows, width, labels, options)
    }

    /// Full-batch gradient descent. Only stored values feed the weight
    /// gradients, so sparse rows cost their non-zero count per class.
    fn fit_rows<R: FeatureRow>(
        rows: &[R],
        width: usize,
        labels: &[String],
        options: TrainingOptions,
    ) -> PortResult<Self> {
        if rows.is_empty() {
            return Err(PortError::Invalid("No training rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(PortError::Invalid(format!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        let targets: Vec<usize> = labels
            .iter()
            .filter_map(|label| classes.binary_search(label).ok())
            .collect();

        let mut model = Self {
            weights: vec![vec![0.0; width]; classes.len()],
            bias: vec![0.0; classes.len()],
            classes,
        };

        let n = rows.len() as f64;
        for _ in 0..options.epochs {
            let mut grad_w = vec![vec![0.0; width]; model.classes.len()];
            let mut grad_b = vec![0.0; model.classes.len()];

            for (row, &target) in rows.iter().zip(&targets) {
                let probabilities = model.probabilities(row);
                for (class, p) in probabilities.iter().enumerate() {
                    let diff = p - if class == target { 1.0 } else { 0.0 };
                    grad_b[class] += diff;
                    let grad = &mut grad_w[class];
                    row.for_each_value(|column, x| grad[column] += diff * x);
                }
            }

            for class in 0..model.classes.len() {
                for (w, g) in model.weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= options.learning_rate * (g / n + options.l2 * *w);
                }
                model.bias[class] -= options.learning_rate * grad_b[class] / n;
            }
        }

        Ok(model)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Class probabilities for one dense row, in `classes()` order.
    pub fn predict_proba(&self, row: &[f64]) -> PortResult<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(PortError::Invalid(format!(
                "Expected {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        Ok(self.probabilities(row))
    }

    /// Class probabilities for one sparse row, in `classes()` order.
    pub fn predict_proba_sparse(&self, row: &SparseRow) -> PortResult<Vec<f64>> {
        if row.span() > self.n_features() {
            return Err(PortError::Invalid(format!(
                "Row reaches column {}, model has {} features",
                row.span(),
                self.n_features()
            )));
        }
        Ok(self.probabilities(row))
    }

    /// The most probable class and its probability.
    pub fn predict(&self, row: &[f64]) -> PortResult<(&str, f64)> {
        let probabilities = self.predict_proba(row)?;
        let (best, confidence) = probabilities
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
        let class = self
            .classes
            .get(best)
            .ok_or_else(|| PortError::Unexpected("Model has no classes".to_string()))?;
        Ok((class, confidence))
    }

    fn probabilities<R: FeatureRow + ?Sized>(&self, row: &R) -> Vec<f64> {
        let scores: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| {
                let mut score = *b;
                row.for_each_value(|column, x| score += w[column] * x);
                score
            })
            .collect();
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }
}
