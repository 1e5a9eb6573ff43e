//! Class report construction
//!
//! Scores every student with any metric for a lesson and ranks them by risk.

use crate::aggregator::ScoreAggregator;
use crate::error::{ComputeError, EntityKind};
use crate::store::StudentLookup;
use crate::types::{
    AttentionSample, ClassReport, ClassSummary, InteractionSample, LessonId, RiskBand,
    StudentId, StudentRiskEntry,
};
use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

/// Build a class report with the default rule table
pub fn build_class_report<L: StudentLookup + ?Sized>(
    lesson_id: LessonId,
    attention: &[AttentionSample],
    interactions: &[InteractionSample],
    student_lookup: &L,
) -> Result<ClassReport, ComputeError> {
    ClassReportBuilder::default().build(lesson_id, attention, interactions, student_lookup)
}

/// Per-student rows grouped in first-encounter order
struct StudentRows {
    order: Vec<StudentId>,
    attention: HashMap<StudentId, Vec<AttentionSample>>,
    interactions: HashMap<StudentId, Vec<InteractionSample>>,
}

impl StudentRows {
    fn group(
        lesson_id: LessonId,
        attention: &[AttentionSample],
        interactions: &[InteractionSample],
    ) -> Self {
        let mut rows = StudentRows {
            order: Vec::new(),
            attention: HashMap::new(),
            interactions: HashMap::new(),
        };

        // Attention rows are encountered before interaction rows.
        for sample in attention.iter().filter(|s| s.lesson_id == lesson_id) {
            rows.note(sample.student_id);
            rows.attention
                .entry(sample.student_id)
                .or_default()
                .push(sample.clone());
        }
        for sample in interactions.iter().filter(|s| s.lesson_id == lesson_id) {
            rows.note(sample.student_id);
            rows.interactions
                .entry(sample.student_id)
                .or_default()
                .push(sample.clone());
        }

        rows
    }

    fn note(&mut self, student_id: StudentId) {
        if !self.attention.contains_key(&student_id)
            && !self.interactions.contains_key(&student_id)
        {
            self.order.push(student_id);
        }
    }
}

/// Builds ranked class reports with a configurable aggregator
#[derive(Debug, Clone, Default)]
pub struct ClassReportBuilder {
    aggregator: ScoreAggregator,
}

impl ClassReportBuilder {
    pub fn new(aggregator: ScoreAggregator) -> Self {
        Self { aggregator }
    }

    /// Score each distinct student in the lesson and rank by risk, highest first.
    ///
    /// Ties keep first-encounter order. Rows for other lessons are ignored. Fails
    /// with `NotFound` if any student id cannot be resolved.
    pub fn build<L: StudentLookup + ?Sized>(
        &self,
        lesson_id: LessonId,
        attention: &[AttentionSample],
        interactions: &[InteractionSample],
        student_lookup: &L,
    ) -> Result<ClassReport, ComputeError> {
        let mut rows = StudentRows::group(lesson_id, attention, interactions);

        let mut students = Vec::with_capacity(rows.order.len());
        for student_id in &rows.order {
            let student_name = student_lookup
                .display_name(*student_id)
                .ok_or_else(|| ComputeError::not_found(EntityKind::Student, *student_id))?;

            let attention_rows = rows.attention.remove(student_id).unwrap_or_default();
            let interaction_rows = rows.interactions.remove(student_id).unwrap_or_default();

            students.push(StudentRiskEntry {
                student_id: *student_id,
                student_name,
                score: self.aggregator.aggregate(&attention_rows, &interaction_rows),
            });
        }

        // `sort_by` is stable, so equal risk keeps encounter order.
        students.sort_by(|a, b| b.score.risk_score.cmp(&a.score.risk_score));

        let summary = summarize(&students);
        debug!(
            lesson_id,
            students = summary.student_count,
            at_risk = summary.at_risk_count,
            "built class report"
        );

        Ok(ClassReport {
            lesson_id,
            students,
            summary,
            generated_at: Utc::now(),
        })
    }
}

fn summarize(students: &[StudentRiskEntry]) -> ClassSummary {
    let at_risk_count = students
        .iter()
        .filter(|s| s.score.risk_band >= RiskBand::Medium)
        .count() as u32;
    let high_risk_student_ids = students
        .iter()
        .filter(|s| s.score.risk_band == RiskBand::High)
        .map(|s| s.student_id)
        .collect();

    ClassSummary {
        student_count: students.len() as u32,
        at_risk_count,
        engaged_count: students.len() as u32 - at_risk_count,
        high_risk_student_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn attention(student_id: StudentId, on_screen: bool, fatigue: f64) -> AttentionSample {
        AttentionSample {
            student_id,
            lesson_id: 10,
            on_screen,
            fatigue,
            gaze_deviations: 0,
            interruptions: 0,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        }
    }

    fn interaction(student_id: StudentId, dwell_seconds: u64, clicks: u32) -> InteractionSample {
        InteractionSample {
            student_id,
            lesson_id: 10,
            dwell_seconds,
            player_events: HashMap::new(),
            material_clicks: clicks,
            annotation: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        }
    }

    fn names() -> HashMap<StudentId, String> {
        HashMap::from([
            (1, "Ana Santos".to_string()),
            (2, "Bruno Oliveira".to_string()),
            (3, "Carla Pereira".to_string()),
            (4, "Daniel Souza".to_string()),
        ])
    }

    fn ids(report: &ClassReport) -> Vec<StudentId> {
        report.students.iter().map(|s| s.student_id).collect()
    }

    #[test]
    fn test_sorted_by_risk_descending() {
        let attention_rows = vec![
            attention(1, true, 0.1),  // engaged on attention
            attention(2, false, 0.9), // low attention, high fatigue
        ];
        let interaction_rows = vec![
            interaction(1, 900, 10),
            interaction(2, 900, 10),
            interaction(3, 100, 0), // no attention rows at all
        ];

        let report = build_class_report(10, &attention_rows, &interaction_rows, &names()).unwrap();

        assert_eq!(report.lesson_id, 10);
        // 3: 30 + 25 + 20 = 75, 2: 30 + 25 = 55, 1: 0
        assert_eq!(ids(&report), vec![3, 2, 1]);
        let risks: Vec<u32> = report.students.iter().map(|s| s.score.risk_score).collect();
        assert_eq!(risks, vec![75, 55, 0]);
        assert_eq!(report.students[1].student_name, "Bruno Oliveira");
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        // Students 3 and 1 tie at 30, students 4 and 2 tie at 0.
        let attention_rows = vec![
            attention(4, true, 0.1),
            attention(2, true, 0.1),
            attention(3, false, 0.1),
        ];
        let interaction_rows = vec![
            interaction(1, 600, 5),
            interaction(4, 600, 5),
            interaction(2, 600, 5),
            interaction(3, 600, 5),
        ];

        let report = build_class_report(10, &attention_rows, &interaction_rows, &names()).unwrap();

        // Student 1 has no attention rows, so it reads as low attention (30).
        let risks: Vec<u32> = report.students.iter().map(|s| s.score.risk_score).collect();
        assert_eq!(risks, vec![30, 30, 0, 0]);
        assert_eq!(ids(&report), vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_equal_scores_preserve_first_seen_order() {
        let attention_rows = vec![
            attention(2, true, 0.1),
            attention(4, true, 0.1),
            attention(1, true, 0.1),
        ];
        let report = build_class_report(10, &attention_rows, &[], &names()).unwrap();

        // All three: few clicks + short dwell = 45
        assert!(report.students.iter().all(|s| s.score.risk_score == 45));
        assert_eq!(ids(&report), vec![2, 4, 1]);
    }

    #[test]
    fn test_unknown_student_is_not_found() {
        let attention_rows = vec![attention(1, true, 0.1), attention(42, true, 0.1)];
        let result = build_class_report(10, &attention_rows, &[], &names());

        assert!(matches!(
            result,
            Err(ComputeError::NotFound {
                entity: EntityKind::Student,
                id: 42
            })
        ));
    }

    #[test]
    fn test_other_lessons_ignored() {
        let mut foreign = attention(2, false, 0.9);
        foreign.lesson_id = 11;
        let attention_rows = vec![attention(1, true, 0.1), foreign];

        let report = build_class_report(10, &attention_rows, &[], &names()).unwrap();
        assert_eq!(ids(&report), vec![1]);
    }

    #[test]
    fn test_empty_lesson() {
        let report = build_class_report(10, &[], &[], &names()).unwrap();

        assert!(report.students.is_empty());
        assert_eq!(report.summary.student_count, 0);
        assert_eq!(report.summary.at_risk_count, 0);
    }

    #[test]
    fn test_summary_counts() {
        let attention_rows = vec![
            attention(1, false, 0.9), // 30 + 25 + (no interactions: 25 + 20) = 100
            attention(2, true, 0.1),  // 45
            attention(3, true, 0.1),
        ];
        let interaction_rows = vec![interaction(3, 900, 10)]; // 0

        let report = build_class_report(10, &attention_rows, &interaction_rows, &names()).unwrap();

        assert_eq!(
            report.summary,
            ClassSummary {
                student_count: 3,
                at_risk_count: 2,
                engaged_count: 1,
                high_risk_student_ids: vec![1],
            }
        );
    }

    #[test]
    fn test_rows_grouped_per_student() {
        let attention_rows = vec![
            attention(1, true, 0.2),
            attention(2, true, 0.5),
            attention(1, false, 0.9),
        ];
        let report = build_class_report(10, &attention_rows, &[], &names()).unwrap();

        let ana = report.students.iter().find(|s| s.student_id == 1).unwrap();
        assert_eq!(ana.score.attention_score, 50.0);
        assert_eq!(ana.score.fatigue_score, 0.55);
    }
}
