//! Engagement processor
//!
//! Ties the store boundary to the scoring functions: fetch a lesson's rows, then
//! compute. The scoring functions themselves stay pure.

use crate::aggregator::ScoreAggregator;
use crate::config::ScoringConfig;
use crate::encoder::ReportEncoder;
use crate::error::{ComputeError, EntityKind};
use crate::grader::grade_submission;
use crate::patterns::analyze_patterns;
use crate::report::ClassReportBuilder;
use crate::schema::{MetricRecord, NewAttentionSample, NewInteractionSample, NewLogEntry, QuizSubmission};
use crate::store::{InMemoryMetricStore, MetricSource, StudentLookup};
use crate::types::{
    ClassReport, Instructor, Lesson, LessonId, LessonPatternSummary, Quiz, QuizId,
    QuizResponse, QuizScoreResult, Student, StudentId, StudentScore,
};
use tracing::{debug, info};

/// Build a class report from a store snapshot (stateless, one-shot)
pub fn class_report_json(snapshot_json: &str, lesson_id: LessonId) -> Result<String, ComputeError> {
    let processor = EngagementProcessor::from_snapshot(snapshot_json)?;
    let report = processor.class_report(lesson_id)?;
    ReportEncoder::new().encode_to_json(&report)
}

/// Analyze lesson patterns from a store snapshot (stateless, one-shot)
pub fn lesson_patterns_json(
    snapshot_json: &str,
    lesson_id: LessonId,
) -> Result<String, ComputeError> {
    let processor = EngagementProcessor::from_snapshot(snapshot_json)?;
    let summary = processor.lesson_patterns(lesson_id)?;
    ReportEncoder::new().encode_to_json(&summary)
}

/// Counts of records applied by [`EngagementProcessor::ingest`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub applied: usize,
    pub graded_submissions: usize,
}

/// Stateful processor owning a metric store and a scoring policy
pub struct EngagementProcessor {
    store: InMemoryMetricStore,
    config: ScoringConfig,
    report_builder: ClassReportBuilder,
    aggregator: ScoreAggregator,
}

impl Default for EngagementProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EngagementProcessor {
    /// Create a processor with an empty store and the default policy
    pub fn new() -> Self {
        Self::with_store(InMemoryMetricStore::new())
    }

    pub fn with_store(store: InMemoryMetricStore) -> Self {
        let config = ScoringConfig::default();
        Self {
            store,
            report_builder: ClassReportBuilder::new(ScoreAggregator::with_config(&config)),
            aggregator: ScoreAggregator::with_config(&config),
            config,
        }
    }

    pub fn from_snapshot(snapshot_json: &str) -> Result<Self, ComputeError> {
        let store = InMemoryMetricStore::from_json(snapshot_json)?;
        Ok(Self::with_store(store))
    }

    /// Replace the scoring policy
    pub fn with_config(mut self, config: ScoringConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        self.aggregator = ScoreAggregator::with_config(&config);
        self.report_builder = ClassReportBuilder::new(self.aggregator.clone());
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn store(&self) -> &InMemoryMetricStore {
        &self.store
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn register_student(&mut self, student: Student) {
        self.store.add_student(student);
    }

    pub fn register_instructor(&mut self, instructor: Instructor) {
        self.store.add_instructor(instructor);
    }

    pub fn register_lesson(&mut self, lesson: Lesson) {
        self.store.add_lesson(lesson);
    }

    pub fn record_attention(&mut self, sample: NewAttentionSample) -> Result<(), ComputeError> {
        self.store.append_attention(sample)?;
        Ok(())
    }

    pub fn record_interaction(&mut self, sample: NewInteractionSample) -> Result<(), ComputeError> {
        self.store.append_interaction(sample)?;
        Ok(())
    }

    pub fn record_log(&mut self, entry: NewLogEntry) -> Result<(), ComputeError> {
        self.store.append_log(entry)?;
        Ok(())
    }

    pub fn create_quiz(&mut self, quiz: Quiz) -> Result<QuizId, ComputeError> {
        Ok(self.store.add_quiz(quiz)?)
    }

    /// Grade a submission and persist it. The score is always computed here,
    /// never taken from the caller.
    pub fn submit_quiz(
        &mut self,
        submission: QuizSubmission,
    ) -> Result<(QuizScoreResult, QuizResponse), ComputeError> {
        let (result, response) = self.store.record_quiz_response(submission)?;
        let response = response.clone();
        debug!(
            quiz_id = result.quiz_id,
            student_id = response.student_id,
            score = result.score,
            "graded quiz submission"
        );
        Ok((result, response))
    }

    /// Apply a batch of records in order, stopping at the first failure
    pub fn ingest(&mut self, records: Vec<MetricRecord>) -> Result<IngestSummary, ComputeError> {
        let mut summary = IngestSummary::default();
        for record in records {
            match record {
                MetricRecord::Student(student) => self.register_student(student),
                MetricRecord::Instructor(instructor) => self.register_instructor(instructor),
                MetricRecord::Lesson(lesson) => self.register_lesson(lesson),
                MetricRecord::Attention(sample) => self.record_attention(sample)?,
                MetricRecord::Interaction(sample) => self.record_interaction(sample)?,
                MetricRecord::Log(entry) => self.record_log(entry)?,
                MetricRecord::Quiz(quiz) => {
                    self.create_quiz(quiz)?;
                }
                MetricRecord::QuizSubmission(submission) => {
                    self.submit_quiz(submission)?;
                    summary.graded_submissions += 1;
                }
            }
            summary.applied += 1;
        }
        info!(applied = summary.applied, "ingested records");
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Score one student for one lesson
    pub fn student_score(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
    ) -> Result<StudentScore, ComputeError> {
        self.store.require_lesson(lesson_id)?;
        if self.store.display_name(student_id).is_none() {
            return Err(ComputeError::not_found(EntityKind::Student, student_id));
        }

        let attention = self.store.attention_for_student(student_id, lesson_id);
        let interactions = self.store.interactions_for_student(student_id, lesson_id);
        self.aggregator.aggregate_checked(&attention, &interactions)
    }

    pub fn class_report(&self, lesson_id: LessonId) -> Result<ClassReport, ComputeError> {
        self.store.require_lesson(lesson_id)?;
        let attention = self.store.attention_for_lesson(lesson_id);
        let interactions = self.store.interactions_for_lesson(lesson_id);
        self.report_builder
            .build(lesson_id, &attention, &interactions, &self.store)
    }

    pub fn lesson_patterns(&self, lesson_id: LessonId) -> Result<LessonPatternSummary, ComputeError> {
        self.store.require_lesson(lesson_id)?;
        let logs = self.store.logs_for_lesson(lesson_id);
        let attention = self.store.attention_for_lesson(lesson_id);
        let interactions = self.store.interactions_for_lesson(lesson_id);
        Ok(analyze_patterns(&logs, &attention, &interactions))
    }

    pub fn grade(
        &self,
        quiz_id: QuizId,
        answers: &std::collections::HashMap<String, String>,
    ) -> Result<QuizScoreResult, ComputeError> {
        grade_submission(&self.store, quiz_id, answers)
    }

    /// Save store state to JSON for persistence
    pub fn save_snapshot(&self) -> Result<String, ComputeError> {
        self.store.to_json().map_err(ComputeError::JsonError)
    }

    /// Load store state from JSON
    pub fn load_snapshot(&mut self, json: &str) -> Result<(), ComputeError> {
        self.store = InMemoryMetricStore::from_json(json)?;
        Ok(())
    }
}
