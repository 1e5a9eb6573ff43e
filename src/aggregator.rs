//! Per-student score aggregation
//!
//! Folds one student's attention and interaction samples for a lesson into an
//! attention score, fatigue score, interaction totals and a composite risk score.

use crate::config::ScoringConfig;
use crate::error::ComputeError;
use crate::rules::{RiskInputs, RiskRules};
use crate::types::{AttentionSample, InteractionSample, StudentScore};

/// Round to 2 decimal places for presentation, ties to even
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `sum / count`, or 0 when `count` is zero
pub(crate) fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Aggregate a student's samples with the default rule table.
///
/// The rows are expected to belong to a single (student, lesson) pair; the
/// function does not filter them.
pub fn aggregate_student_score(
    attention: &[AttentionSample],
    interactions: &[InteractionSample],
) -> StudentScore {
    ScoreAggregator::default().aggregate(attention, interactions)
}

/// Full-precision totals before any rounding
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    attention_samples: usize,
    on_screen_samples: usize,
    fatigue_sum: f64,
    gaze_deviations: u64,
    interruptions: u64,
    dwell_seconds: u64,
    clicks: u64,
}

impl Totals {
    fn collect(attention: &[AttentionSample], interactions: &[InteractionSample]) -> Self {
        let mut totals = Totals {
            attention_samples: attention.len(),
            ..Default::default()
        };

        for sample in attention {
            if sample.on_screen {
                totals.on_screen_samples += 1;
            }
            totals.fatigue_sum += sample.fatigue;
            totals.gaze_deviations += u64::from(sample.gaze_deviations);
            totals.interruptions += u64::from(sample.interruptions);
        }

        for sample in interactions {
            totals.dwell_seconds += sample.dwell_seconds;
            totals.clicks += u64::from(sample.material_clicks);
        }

        totals
    }

    /// On-screen percentage (0 - 100)
    fn attention_score(&self) -> f64 {
        mean_or_zero(self.on_screen_samples as f64, self.attention_samples) * 100.0
    }

    fn fatigue_score(&self) -> f64 {
        mean_or_zero(self.fatigue_sum, self.attention_samples)
    }
}

/// Score aggregator bound to a rule table
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    rules: RiskRules,
    strict_missing_data: bool,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::with_config(&ScoringConfig::default())
    }
}

impl ScoreAggregator {
    pub fn with_config(config: &ScoringConfig) -> Self {
        Self {
            rules: RiskRules::from_config(config),
            strict_missing_data: config.strict_missing_data,
        }
    }

    /// Aggregate samples. No data yields a neutral zero reading for the
    /// attention and fatigue scores.
    pub fn aggregate(
        &self,
        attention: &[AttentionSample],
        interactions: &[InteractionSample],
    ) -> StudentScore {
        let totals = Totals::collect(attention, interactions);
        let attention_score = totals.attention_score();
        let fatigue_score = totals.fatigue_score();

        // Rules see full precision; only the presented values are rounded.
        let assessment = self.rules.evaluate(&RiskInputs {
            attention_score,
            fatigue_score,
            clicks_total: totals.clicks,
            dwell_seconds_total: totals.dwell_seconds,
        });

        StudentScore {
            attention_score: round2(attention_score),
            fatigue_score: round2(fatigue_score),
            gaze_deviation_total: totals.gaze_deviations,
            interruption_total: totals.interruptions,
            interaction_time_total: totals.dwell_seconds,
            interaction_clicks_total: totals.clicks,
            risk_score: assessment.score,
            risk_band: self.rules.band(assessment.score),
            triggered_factors: assessment.factors,
        }
    }

    /// Like [`aggregate`](Self::aggregate), but fails when strict missing-data
    /// handling is enabled and the student has no samples of either kind.
    pub fn aggregate_checked(
        &self,
        attention: &[AttentionSample],
        interactions: &[InteractionSample],
    ) -> Result<StudentScore, ComputeError> {
        if self.strict_missing_data && attention.is_empty() && interactions.is_empty() {
            return Err(ComputeError::InsufficientData(
                "no attention or interaction samples".to_string(),
            ));
        }
        Ok(self.aggregate(attention, interactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RiskBand, RiskFactor};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn attention(on_screen: bool, fatigue: f64) -> AttentionSample {
        AttentionSample {
            student_id: 1,
            lesson_id: 10,
            on_screen,
            fatigue,
            gaze_deviations: 2,
            interruptions: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        }
    }

    fn interaction(dwell_seconds: u64, material_clicks: u32) -> InteractionSample {
        InteractionSample {
            student_id: 1,
            lesson_id: 10,
            dwell_seconds,
            player_events: HashMap::from([("play".to_string(), 1)]),
            material_clicks,
            annotation: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 5).unwrap(),
        }
    }

    #[test]
    fn test_no_attention_samples_yield_zero_scores() {
        let score = aggregate_student_score(&[], &[interaction(600, 5)]);

        assert_eq!(score.attention_score, 0.0);
        assert_eq!(score.fatigue_score, 0.0);
        assert_eq!(score.gaze_deviation_total, 0);
        // Zero attention reads as low attention.
        assert_eq!(score.risk_score, 30);
    }

    #[test]
    fn test_attention_and_fatigue_scenario() {
        let samples = vec![attention(true, 0.2), attention(false, 0.9)];
        let score = aggregate_student_score(&samples, &[]);

        assert_eq!(score.attention_score, 50.0);
        assert_eq!(score.fatigue_score, 0.55);
        assert_eq!(score.gaze_deviation_total, 4);
        assert_eq!(score.interruption_total, 2);
    }

    #[test]
    fn test_low_interaction_contributions() {
        let attention_rows = vec![attention(true, 0.1), attention(true, 0.1)];
        let interactions = vec![interaction(100, 1), interaction(20, 0)];
        let score = aggregate_student_score(&attention_rows, &interactions);

        assert_eq!(score.interaction_clicks_total, 1);
        assert_eq!(score.interaction_time_total, 120);
        assert_eq!(score.risk_score, 45);
        assert_eq!(
            score.triggered_factors,
            vec![RiskFactor::FewClicks, RiskFactor::ShortDwell]
        );
        assert_eq!(score.risk_band, RiskBand::Medium);
    }

    #[test]
    fn test_risk_uses_full_precision() {
        // 0.704 rounds to 0.70 for display but still exceeds the 0.7 threshold.
        let samples = vec![attention(true, 0.704)];
        let score = aggregate_student_score(&samples, &[interaction(600, 5)]);

        assert_eq!(score.fatigue_score, 0.7);
        assert_eq!(score.triggered_factors, vec![RiskFactor::HighFatigue]);
        assert_eq!(score.risk_score, 25);
    }

    #[test]
    fn test_rounding_ties_go_to_even() {
        // (0.1 + 0.15) / 2 is exactly 0.125
        let samples = vec![attention(true, 0.1), attention(true, 0.15)];
        let score = aggregate_student_score(&samples, &[]);
        assert_eq!(score.fatigue_score, 0.12);

        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
    }

    #[test]
    fn test_attention_score_rounded_to_two_places() {
        let samples = vec![attention(true, 0.0), attention(false, 0.0), attention(false, 0.0)];
        let score = aggregate_student_score(&samples, &[]);
        assert_eq!(score.attention_score, 33.33);
    }

    #[test]
    fn test_fully_disengaged_student_is_capped() {
        let samples = vec![attention(false, 0.95)];
        let score = aggregate_student_score(&samples, &[]);

        assert_eq!(score.risk_score, 100);
        assert_eq!(score.risk_band, RiskBand::High);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let attention_rows = vec![attention(true, 0.3), attention(false, 0.8)];
        let interactions = vec![interaction(250, 2)];

        let first = aggregate_student_score(&attention_rows, &interactions);
        let second = aggregate_student_score(&attention_rows, &interactions);
        assert_eq!(first, second);
    }

    #[test]
    fn test_strict_missing_data() {
        let lenient = ScoreAggregator::default();
        assert!(lenient.aggregate_checked(&[], &[]).is_ok());

        let strict = ScoreAggregator::with_config(&ScoringConfig {
            strict_missing_data: true,
            ..Default::default()
        });
        assert!(matches!(
            strict.aggregate_checked(&[], &[]),
            Err(ComputeError::InsufficientData(_))
        ));
        assert!(strict.aggregate_checked(&[attention(true, 0.1)], &[]).is_ok());
    }

    #[test]
    fn test_custom_thresholds() {
        let aggregator = ScoreAggregator::with_config(&ScoringConfig {
            min_clicks: 10,
            ..Default::default()
        });
        let score = aggregator.aggregate(&[attention(true, 0.1)], &[interaction(600, 5)]);
        assert_eq!(score.triggered_factors, vec![RiskFactor::FewClicks]);
    }
}
