use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Result, classifier::Classifier, encoder::encode, record::PatientRecord};

const RESULT_DECIMALS: i32 = 5;

/// Estimates the probability of infection of a single patient.
pub fn estimate(classifier: &Classifier, record: &PatientRecord) -> Result<f64> {
    let feature = encode(record)?;
    let probability = classifier.probability(&feature)?;
    Ok(f64::from(probability))
}

/// An evaluation as submitted by a caller: the clinical fields plus where the patient is from.
///
/// `continent` and `country` are kept alongside the result, they never reach the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub continent: String,
    pub country: String,
    #[serde(flatten)]
    pub record: PatientRecord,
}

/// A request together with its estimated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(flatten)]
    pub request: EvaluationRequest,
    /// The probability of infection, rounded to 5 decimals.
    pub result: f64,
}

/// Read only access to a trained classifier, cheap to clone and share between threads.
#[derive(Debug, Clone)]
pub struct InferenceService {
    classifier: Arc<Classifier>,
}

impl InferenceService {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn estimate(&self, record: &PatientRecord) -> Result<f64> {
        estimate(&self.classifier, record)
    }

    /// Estimates a request and bundles the rounded result with its inputs.
    pub fn evaluate(&self, request: EvaluationRequest) -> Result<Evaluation> {
        let probability = self.estimate(&request.record)?;
        let result = round(probability, RESULT_DECIMALS);
        debug!(result = result; "evaluated patient from {}/{}", request.continent, request.country);

        Ok(Evaluation { request, result })
    }
}

fn round(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
