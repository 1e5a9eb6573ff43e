//! Scoring configuration
//!
//! Every threshold and weight of the risk rule table lives here so the policy can be
//! audited and tuned without touching the aggregation code.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Attention score (percentage) below which a student is flagged
pub const DEFAULT_LOW_ATTENTION_THRESHOLD: f64 = 50.0;
pub const DEFAULT_LOW_ATTENTION_WEIGHT: u32 = 30;

/// Mean fatigue above which a student is flagged
pub const DEFAULT_HIGH_FATIGUE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_HIGH_FATIGUE_WEIGHT: u32 = 25;

/// Material clicks below which a student is flagged
pub const DEFAULT_MIN_CLICKS: u64 = 3;
pub const DEFAULT_FEW_CLICKS_WEIGHT: u32 = 25;

/// Dwell time (5 minutes) below which a student is flagged
pub const DEFAULT_MIN_DWELL_SECONDS: u64 = 300;
pub const DEFAULT_SHORT_DWELL_WEIGHT: u32 = 20;

pub const MAX_RISK_SCORE: u32 = 100;

pub const DEFAULT_HIGH_RISK_CUTOFF: u32 = 70;
pub const DEFAULT_MEDIUM_RISK_CUTOFF: u32 = 40;

/// Thresholds and weights for the risk rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub low_attention_threshold: f64,
    pub low_attention_weight: u32,
    pub high_fatigue_threshold: f64,
    pub high_fatigue_weight: u32,
    pub min_clicks: u64,
    pub few_clicks_weight: u32,
    pub min_dwell_seconds: u64,
    pub short_dwell_weight: u32,
    /// Risk at or above this is `RiskBand::High`
    pub high_risk_cutoff: u32,
    /// Risk at or above this is `RiskBand::Medium`
    pub medium_risk_cutoff: u32,
    /// Treat a student with no samples at all as an error instead of a neutral score
    pub strict_missing_data: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            low_attention_threshold: DEFAULT_LOW_ATTENTION_THRESHOLD,
            low_attention_weight: DEFAULT_LOW_ATTENTION_WEIGHT,
            high_fatigue_threshold: DEFAULT_HIGH_FATIGUE_THRESHOLD,
            high_fatigue_weight: DEFAULT_HIGH_FATIGUE_WEIGHT,
            min_clicks: DEFAULT_MIN_CLICKS,
            few_clicks_weight: DEFAULT_FEW_CLICKS_WEIGHT,
            min_dwell_seconds: DEFAULT_MIN_DWELL_SECONDS,
            short_dwell_weight: DEFAULT_SHORT_DWELL_WEIGHT,
            high_risk_cutoff: DEFAULT_HIGH_RISK_CUTOFF,
            medium_risk_cutoff: DEFAULT_MEDIUM_RISK_CUTOFF,
            strict_missing_data: false,
        }
    }
}

impl ScoringConfig {
    /// Parse a (possibly partial) JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, crate::error::ComputeError> {
        let config: ScoringConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject thresholds outside the domain of the metric they gate
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.low_attention_threshold) {
            return Err(ValidationError::InvalidConfig(format!(
                "low_attention_threshold must be within [0, 100], got {}",
                self.low_attention_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.high_fatigue_threshold) {
            return Err(ValidationError::InvalidConfig(format!(
                "high_fatigue_threshold must be within [0, 1], got {}",
                self.high_fatigue_threshold
            )));
        }
        if self.medium_risk_cutoff > self.high_risk_cutoff {
            return Err(ValidationError::InvalidConfig(format!(
                "medium_risk_cutoff ({}) exceeds high_risk_cutoff ({})",
                self.medium_risk_cutoff, self.high_risk_cutoff
            )));
        }
        if self.high_risk_cutoff > MAX_RISK_SCORE {
            return Err(ValidationError::InvalidConfig(format!(
                "high_risk_cutoff must be at most {MAX_RISK_SCORE}, got {}",
                self.high_risk_cutoff
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = ScoringConfig::from_json(r#"{ "min_clicks": 5, "strict_missing_data": true }"#)
            .unwrap();

        assert_eq!(config.min_clicks, 5);
        assert!(config.strict_missing_data);
        assert_eq!(config.min_dwell_seconds, DEFAULT_MIN_DWELL_SECONDS);
        assert_eq!(config.low_attention_weight, DEFAULT_LOW_ATTENTION_WEIGHT);
    }

    #[test]
    fn test_rejects_out_of_range_fatigue_threshold() {
        let result = ScoringConfig::from_json(r#"{ "high_fatigue_threshold": 1.5 }"#);
        assert!(matches!(
            result,
            Err(crate::error::ComputeError::Validation(ValidationError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_rejects_inverted_band_cutoffs() {
        let config = ScoringConfig {
            medium_risk_cutoff: 80,
            high_risk_cutoff: 70,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
