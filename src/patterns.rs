//! Lesson-wide interaction pattern analysis

use crate::aggregator::mean_or_zero;
use crate::types::{AttentionSample, InteractionLogEntry, InteractionSample, LessonPatternSummary};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Fold a lesson's interaction log and samples into frequency counts and averages.
///
/// `mean_attention` is the raw mean of the on-screen flag (0 - 1), unlike
/// `StudentScore::attention_score` which is a percentage. Averages are not rounded.
pub fn analyze_patterns(
    logs: &[InteractionLogEntry],
    attention: &[AttentionSample],
    interactions: &[InteractionSample],
) -> LessonPatternSummary {
    let mut interaction_type_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut students = HashSet::new();

    for entry in logs {
        *interaction_type_counts
            .entry(entry.interaction_type.as_str().to_string())
            .or_insert(0) += 1;
        students.insert(entry.student_id);
    }

    let on_screen = attention.iter().filter(|s| s.on_screen).count();
    let fatigue_sum: f64 = attention.iter().map(|s| s.fatigue).sum();
    let clicks_sum: u64 = interactions.iter().map(|s| u64::from(s.material_clicks)).sum();

    let mut player_event_totals: BTreeMap<String, u64> = BTreeMap::new();
    for sample in interactions {
        for (event, count) in &sample.player_events {
            *player_event_totals.entry(event.clone()).or_insert(0) += u64::from(*count);
        }
    }

    debug!(
        log_entries = logs.len(),
        attention_samples = attention.len(),
        interaction_samples = interactions.len(),
        "analyzed lesson patterns"
    );

    LessonPatternSummary {
        interaction_type_counts,
        distinct_student_count: students.len() as u32,
        mean_attention: mean_or_zero(on_screen as f64, attention.len()),
        mean_fatigue: mean_or_zero(fatigue_sum, attention.len()),
        total_interactions: logs.len() as u64,
        mean_clicks: mean_or_zero(clicks_sum as f64, interactions.len()),
        player_event_totals,
    }
}
