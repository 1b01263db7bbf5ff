//! Verdict type returned to callers
//!
//! Built once by the formatter and never mutated afterwards; fields are
//! private and exposed through accessors only.

use serde::{Deserialize, Serialize};
use umbrella_core::Metric;

/// Final safety determination for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    is_safe: bool,
    reason: String,
    /// Voice only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transcription: Option<String>,
    metrics: Vec<Metric>,
    confidence_score: f64,
    recommended_action: String,
    /// Verbatim stage 1 result, two-stage modalities only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_stage_analysis: Option<String>,
    /// Pretty JSON of every other field
    raw_analysis: String,
}

/// Fields a verdict is assembled from, before `rawAnalysis` exists
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerdictBody {
    pub is_safe: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    pub metrics: Vec<Metric>,
    pub confidence_score: f64,
    pub recommended_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_stage_analysis: Option<String>,
}

impl VerdictBody {
    /// Seal the body, recording its own serialization as `rawAnalysis`
    pub(crate) fn seal(self) -> Result<Verdict, serde_json::Error> {
        let raw_analysis = serde_json::to_string_pretty(&self)?;
        Ok(Verdict {
            is_safe: self.is_safe,
            reason: self.reason,
            transcription: self.transcription,
            metrics: self.metrics,
            confidence_score: self.confidence_score,
            recommended_action: self.recommended_action,
            first_stage_analysis: self.first_stage_analysis,
            raw_analysis,
        })
    }
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        self.is_safe
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn transcription(&self) -> Option<&str> {
        self.transcription.as_deref()
    }

    /// One entry per registry category, in registry order
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Look up a metric by its display name
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn recommended_action(&self) -> &str {
        &self.recommended_action
    }

    pub fn first_stage_analysis(&self) -> Option<&str> {
        self.first_stage_analysis.as_deref()
    }

    pub fn raw_analysis(&self) -> &str {
        &self.raw_analysis
    }

    /// Highest metric score, or 0 for an empty list
    pub fn peak_score(&self) -> f64 {
        self.metrics.iter().map(|m| m.value).fold(0.0, f64::max)
    }
}
