use crate::domain::decision::{Decision, Verdict};
use anyhow::{bail, ensure};
use serde::Deserialize;

/// Loosely-typed parse target for model output. Structural rules are
/// enforced in [`LlmDecision::validate_and_into_decision`]; reasoning and
/// suggestion content is not semantically validated (the length caps in the
/// prompt are advisory to the model).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmDecision {
    pub decision: String,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub suggestion: String,
}

impl LlmDecision {
    pub fn validate_and_into_decision(self) -> anyhow::Result<Decision> {
        let verdict = match self.decision.as_str() {
            "BUY" => Verdict::Buy,
            "WAIT" => Verdict::Wait,
            "NO" => Verdict::No,
            other => bail!("decision must be one of BUY/WAIT/NO (got {other:?})"),
        };

        ensure!(
            self.confidence.is_finite() && (0.0..=100.0).contains(&self.confidence),
            "confidence must be between 0 and 100 (got {})",
            self.confidence
        );

        let suggestion = self.suggestion.trim().to_string();
        ensure!(!suggestion.is_empty(), "suggestion must be non-empty");

        Ok(Decision {
            decision: verdict,
            confidence: self.confidence.round() as u8,
            reasoning: self.reasoning,
            suggestion,
        })
    }
}
