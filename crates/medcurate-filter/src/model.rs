//! Text classification model interface
//!
//! The filter only needs one thing from a model: a score in `[0, 1]` for the
//! positive category of a normalized text. Models are loaded once and shared
//! read-only by every worker, hence `Send + Sync`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Scores normalized text for the positive category.
pub trait Classifier: Send + Sync {
    /// Score in `[0, 1]`
    fn score(&self, text: &str) -> Result<f64, ModelError>;
}

/// Any thread-safe scoring function is a classifier.
impl<F> Classifier for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn score(&self, text: &str) -> Result<f64, ModelError> {
        Ok(self(text))
    }
}

#[derive(Debug)]
pub enum ModelError {
    /// Model file missing or malformed
    Load { path: String, reason: String },
    /// Scoring produced no usable value
    Inference(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load { path, reason } => write!(f, "cannot load model {path}: {reason}"),
            Self::Inference(msg) => write!(f, "inference failed: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {}

/// On-disk form of [`LexiconModel`]
#[derive(Debug, Deserialize)]
struct LexiconFile {
    label: String,
    #[serde(default)]
    bias: f64,
    weights: FxHashMap<String, f64>,
}

/// Linear bag-of-words classifier.
///
/// `score = sigmoid(bias + Σ weight(token))` over whitespace tokens of the
/// normalized text; unknown tokens weigh 0. Loaded from JSON:
///
/// ```json
/// { "label": "POSITIVE_NUCL_MED", "bias": -4.0,
///   "weights": { "pet": 2.5, "tc-99m": 3.0, "radiotracer": 3.0 } }
/// ```
#[derive(Debug)]
pub struct LexiconModel {
    label: String,
    bias: f64,
    weights: FxHashMap<String, f64>,
}

impl LexiconModel {
    pub fn new(label: impl Into<String>, bias: f64, weights: FxHashMap<String, f64>) -> Self {
        Self {
            label: label.into(),
            bias,
            weights,
        }
    }

    /// Load a model from a JSON file
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let load_err = |reason: String| ModelError::Load {
            path: path.display().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
        let raw: LexiconFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| load_err(e.to_string()))?;

        if !raw.bias.is_finite() {
            return Err(load_err("bias is not finite".to_string()));
        }
        if let Some((token, _)) = raw.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(load_err(format!("weight for `{token}` is not finite")));
        }

        log::info!(
            "Loaded model `{}` ({} weighted tokens) from {}",
            raw.label,
            raw.weights.len(),
            path.display()
        );
        Ok(Self::new(raw.label, raw.bias, raw.weights))
    }

    /// Name of the positive category
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Classifier for LexiconModel {
    fn score(&self, text: &str) -> Result<f64, ModelError> {
        let logit = text
            .split_whitespace()
            .filter_map(|token| self.weights.get(token))
            .fold(self.bias, |acc, w| acc + w);
        let score = 1.0 / (1.0 + (-logit).exp());
        if score.is_nan() {
            return Err(ModelError::Inference(format!("NaN score (logit {logit})")));
        }
        Ok(score)
    }
}
