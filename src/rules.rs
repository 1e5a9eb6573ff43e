//! Risk rule table
//!
//! The attrition-risk score is a fixed, explainable rule table: an ordered list of
//! threshold rules, each adding its weight independently when its condition holds.
//! The sum is clamped to [`MAX_RISK_SCORE`].

use crate::config::{ScoringConfig, MAX_RISK_SCORE};
use crate::types::{RiskBand, RiskFactor};
use serde::{Deserialize, Serialize};

/// Metric a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMetric {
    AttentionScore,
    FatigueScore,
    ClicksTotal,
    DwellSecondsTotal,
}

/// Strict comparison applied against the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Below,
    Above,
}

/// Full-precision aggregates the rules are evaluated against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub attention_score: f64,
    pub fatigue_score: f64,
    pub clicks_total: u64,
    pub dwell_seconds_total: u64,
}

impl RiskInputs {
    fn metric(&self, metric: RiskMetric) -> f64 {
        match metric {
            RiskMetric::AttentionScore => self.attention_score,
            RiskMetric::FatigueScore => self.fatigue_score,
            RiskMetric::ClicksTotal => self.clicks_total as f64,
            RiskMetric::DwellSecondsTotal => self.dwell_seconds_total as f64,
        }
    }
}

/// A single (condition, weight) entry of the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRule {
    pub factor: RiskFactor,
    pub metric: RiskMetric,
    pub comparison: Comparison,
    pub threshold: f64,
    pub weight: u32,
}

impl RiskRule {
    pub fn triggers(&self, inputs: &RiskInputs) -> bool {
        let value = inputs.metric(self.metric);
        match self.comparison {
            Comparison::Below => value < self.threshold,
            Comparison::Above => value > self.threshold,
        }
    }
}

/// Result of evaluating the table
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Clamped sum of triggered weights
    pub score: u32,
    /// Triggered rules, in table order
    pub factors: Vec<RiskFactor>,
}

/// Ordered risk rule table plus band cut-offs
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRules {
    rules: Vec<RiskRule>,
    high_cutoff: u32,
    medium_cutoff: u32,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl RiskRules {
    /// Build the standard four-rule table from a config
    pub fn from_config(config: &ScoringConfig) -> Self {
        let rules = vec![
            RiskRule {
                factor: RiskFactor::LowAttention,
                metric: RiskMetric::AttentionScore,
                comparison: Comparison::Below,
                threshold: config.low_attention_threshold,
                weight: config.low_attention_weight,
            },
            RiskRule {
                factor: RiskFactor::HighFatigue,
                metric: RiskMetric::FatigueScore,
                comparison: Comparison::Above,
                threshold: config.high_fatigue_threshold,
                weight: config.high_fatigue_weight,
            },
            RiskRule {
                factor: RiskFactor::FewClicks,
                metric: RiskMetric::ClicksTotal,
                comparison: Comparison::Below,
                threshold: config.min_clicks as f64,
                weight: config.few_clicks_weight,
            },
            RiskRule {
                factor: RiskFactor::ShortDwell,
                metric: RiskMetric::DwellSecondsTotal,
                comparison: Comparison::Below,
                threshold: config.min_dwell_seconds as f64,
                weight: config.short_dwell_weight,
            },
        ];

        Self {
            rules,
            high_cutoff: config.high_risk_cutoff,
            medium_cutoff: config.medium_risk_cutoff,
        }
    }

    /// Evaluate every rule independently and clamp the sum
    pub fn evaluate(&self, inputs: &RiskInputs) -> RiskAssessment {
        let mut total: u32 = 0;
        let mut factors = Vec::new();

        for rule in &self.rules {
            if rule.triggers(inputs) {
                total = total.saturating_add(rule.weight);
                factors.push(rule.factor);
            }
        }

        RiskAssessment {
            score: total.min(MAX_RISK_SCORE),
            factors,
        }
    }

    pub fn band(&self, risk_score: u32) -> RiskBand {
        if risk_score >= self.high_cutoff {
            RiskBand::High
        } else if risk_score >= self.medium_cutoff {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engaged() -> RiskInputs {
        RiskInputs {
            attention_score: 90.0,
            fatigue_score: 0.1,
            clicks_total: 10,
            dwell_seconds_total: 1200,
        }
    }

    #[test]
    fn test_engaged_student_has_no_risk() {
        let assessment = RiskRules::default().evaluate(&engaged());
        assert_eq!(assessment.score, 0);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_each_rule_contributes_its_weight() {
        let rules = RiskRules::default();

        let low_attention = RiskInputs { attention_score: 49.99, ..engaged() };
        assert_eq!(rules.evaluate(&low_attention).score, 30);

        let fatigued = RiskInputs { fatigue_score: 0.71, ..engaged() };
        assert_eq!(rules.evaluate(&fatigued).score, 25);

        let few_clicks = RiskInputs { clicks_total: 2, ..engaged() };
        assert_eq!(rules.evaluate(&few_clicks).score, 25);

        let short_dwell = RiskInputs { dwell_seconds_total: 299, ..engaged() };
        assert_eq!(rules.evaluate(&short_dwell).score, 20);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let rules = RiskRules::default();
        let boundary = RiskInputs {
            attention_score: 50.0,
            fatigue_score: 0.7,
            clicks_total: 3,
            dwell_seconds_total: 300,
        };
        assert_eq!(rules.evaluate(&boundary).score, 0);
    }

    #[test]
    fn test_all_rules_sum_to_cap() {
        let inputs = RiskInputs {
            attention_score: 0.0,
            fatigue_score: 1.0,
            clicks_total: 0,
            dwell_seconds_total: 0,
        };
        let assessment = RiskRules::default().evaluate(&inputs);

        assert_eq!(assessment.score, 100);
        assert_eq!(
            assessment.factors,
            vec![
                RiskFactor::LowAttention,
                RiskFactor::HighFatigue,
                RiskFactor::FewClicks,
                RiskFactor::ShortDwell,
            ]
        );
    }

    #[test]
    fn test_sum_is_clamped_with_heavier_weights() {
        let config = ScoringConfig {
            low_attention_weight: 60,
            high_fatigue_weight: 60,
            ..Default::default()
        };
        let inputs = RiskInputs {
            attention_score: 10.0,
            fatigue_score: 0.9,
            ..engaged()
        };
        assert_eq!(RiskRules::from_config(&config).evaluate(&inputs).score, 100);
    }

    #[test]
    fn test_bands() {
        let rules = RiskRules::default();
        assert_eq!(rules.band(0), RiskBand::Low);
        assert_eq!(rules.band(39), RiskBand::Low);
        assert_eq!(rules.band(40), RiskBand::Medium);
        assert_eq!(rules.band(69), RiskBand::Medium);
        assert_eq!(rules.band(70), RiskBand::High);
        assert_eq!(rules.band(100), RiskBand::High);
    }
}
