//! Insight payloads and the debt score.
//!
//! Two score formulas are in use by different insight forms and they are not
//! compatible with each other. Both are kept as [`ScoreFormula`] variants; the
//! service forwards whatever score a client submits and never recomputes it.

use serde::{Deserialize, Serialize};

/// Days an insight is assumed to have been open when the primary form scores it.
pub const DEFAULT_DAYS_OPEN: f64 = 5.0;

/// Inputs shared by both score formulas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    /// 1-5
    pub impact: u8,
    /// 1-5
    pub risk: u8,
    /// 0-100
    pub confidence: u8,
}

/// Debt score formula variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreFormula {
    /// `days_open * impact * risk * confidence / 100`
    DaysOpen { days_open: f64 },
    /// `impact * 10 + risk * 7 + (100 - confidence)`
    WeightedSum,
}

impl Default for ScoreFormula {
    fn default() -> Self {
        Self::DaysOpen {
            days_open: DEFAULT_DAYS_OPEN,
        }
    }
}

impl ScoreFormula {
    #[must_use]
    pub fn score(&self, inputs: ScoreInputs) -> f64 {
        let impact = f64::from(inputs.impact);
        let risk = f64::from(inputs.risk);
        let confidence = f64::from(inputs.confidence);
        match *self {
            Self::DaysOpen { days_open } => days_open * impact * risk * (confidence / 100.0),
            Self::WeightedSum => impact * 10.0 + risk * 7.0 + (100.0 - confidence),
        }
    }
}

/// Body of a `Decision_Insight__c` create request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewInsight {
    #[serde(rename = "Title__c")]
    pub title: String,
    #[serde(rename = "Description__c", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Impact__c")]
    pub impact: u8,
    #[serde(rename = "Risk__c")]
    pub risk: u8,
    #[serde(rename = "Confidence__c")]
    pub confidence: u8,
    #[serde(rename = "Status__c")]
    pub status: String,
    #[serde(rename = "Debt_Score__c")]
    pub debt_score: f64,
}

impl NewInsight {
    /// Build an insight with status `New`, scored with `formula`.
    #[must_use]
    pub fn new(title: impl Into<String>, inputs: ScoreInputs, formula: ScoreFormula) -> Self {
        Self {
            title: title.into(),
            description: None,
            impact: inputs.impact,
            risk: inputs.risk,
            confidence: inputs.confidence,
            status: "New".into(),
            debt_score: formula.score(inputs),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}
