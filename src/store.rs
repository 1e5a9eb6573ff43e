//! Metric store boundary
//!
//! The scoring engine never touches persistence directly. It consumes the read
//! capabilities defined here, and [`InMemoryMetricStore`] provides a reference
//! implementation with JSON snapshot persistence.

use crate::error::{ComputeError, EntityKind, ValidationError};
use crate::grader::grade_submission;
use crate::schema::{
    validate_fatigue, NewAttentionSample, NewInteractionSample, NewLogEntry, QuizSubmission,
};
use crate::types::{
    AttentionSample, Instructor, InteractionLogEntry, InteractionSample, Lesson, LessonId, Quiz,
    QuizId, QuizResponse, QuizScoreResult, Student, StudentId,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use uuid::Uuid;

/// Read access to telemetry rows, keyed by lesson or (student, lesson)
pub trait MetricSource {
    fn attention_for_lesson(&self, lesson_id: LessonId) -> Vec<AttentionSample>;

    fn interactions_for_lesson(&self, lesson_id: LessonId) -> Vec<InteractionSample>;

    fn logs_for_lesson(&self, lesson_id: LessonId) -> Vec<InteractionLogEntry>;

    fn attention_for_student(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
    ) -> Vec<AttentionSample> {
        self.attention_for_lesson(lesson_id)
            .into_iter()
            .filter(|s| s.student_id == student_id)
            .collect()
    }

    fn interactions_for_student(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
    ) -> Vec<InteractionSample> {
        self.interactions_for_lesson(lesson_id)
            .into_iter()
            .filter(|s| s.student_id == student_id)
            .collect()
    }
}

/// Resolves a student id to a display name
pub trait StudentLookup {
    fn display_name(&self, student_id: StudentId) -> Option<String>;
}

/// Resolves a quiz id to its definition
pub trait QuizLookup {
    fn quiz(&self, quiz_id: QuizId) -> Option<&Quiz>;
}

impl StudentLookup for HashMap<StudentId, String> {
    fn display_name(&self, student_id: StudentId) -> Option<String> {
        self.get(&student_id).cloned()
    }
}

impl StudentLookup for HashMap<StudentId, Student> {
    fn display_name(&self, student_id: StudentId) -> Option<String> {
        self.get(&student_id).map(|s| s.name.clone())
    }
}

impl QuizLookup for HashMap<QuizId, Quiz> {
    fn quiz(&self, quiz_id: QuizId) -> Option<&Quiz> {
        self.get(&quiz_id)
    }
}

/// In-memory store with write-time timestamps and referential checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryMetricStore {
    #[serde(default)]
    students: BTreeMap<StudentId, Student>,
    #[serde(default)]
    instructors: BTreeMap<u64, Instructor>,
    #[serde(default)]
    lessons: BTreeMap<LessonId, Lesson>,
    #[serde(default)]
    attention: Vec<AttentionSample>,
    #[serde(default)]
    interactions: Vec<InteractionSample>,
    #[serde(default)]
    logs: Vec<InteractionLogEntry>,
    #[serde(default)]
    quizzes: BTreeMap<QuizId, Quiz>,
    #[serde(default)]
    quiz_responses: Vec<QuizResponse>,
    /// Last timestamp handed out; later writes always get a strictly later one
    #[serde(default)]
    last_timestamp: Option<DateTime<Utc>>,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store snapshot from JSON.
    ///
    /// Rows are checked with the same rules as live appends, and the write clock
    /// resumes after the newest stored timestamp.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let mut store: Self = serde_json::from_str(json)?;
        store.validate_snapshot()?;
        store.last_timestamp = store.newest_timestamp().max(store.last_timestamp);
        Ok(store)
    }

    /// Serialize the store snapshot to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Strictly increasing write timestamp, even if the wall clock stalls or steps back
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_timestamp {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        stamp
    }

    fn validate_snapshot(&self) -> Result<(), ValidationError> {
        for sample in &self.attention {
            validate_fatigue(sample.fatigue)?;
            self.ensure_refs(sample.student_id, sample.lesson_id)?;
        }
        for sample in &self.interactions {
            self.ensure_refs(sample.student_id, sample.lesson_id)?;
        }
        for entry in &self.logs {
            self.ensure_refs(entry.student_id, entry.lesson_id)?;
        }
        for quiz in self.quizzes.values() {
            quiz.validate()?;
            if !self.lessons.contains_key(&quiz.lesson_id) {
                return Err(ValidationError::UnknownLesson(quiz.lesson_id));
            }
        }
        for response in &self.quiz_responses {
            if !self.quizzes.contains_key(&response.quiz_id) {
                return Err(ValidationError::UnknownQuiz(response.quiz_id));
            }
            if !self.students.contains_key(&response.student_id) {
                return Err(ValidationError::UnknownStudent(response.student_id));
            }
            if !(0.0..=100.0).contains(&response.score) {
                return Err(ValidationError::QuizScoreOutOfRange(response.score));
            }
        }
        Ok(())
    }

    fn newest_timestamp(&self) -> Option<DateTime<Utc>> {
        let attention = self.attention.iter().map(|s| s.timestamp);
        let interactions = self.interactions.iter().map(|s| s.timestamp);
        let logs = self.logs.iter().map(|e| e.timestamp);
        let responses = self.quiz_responses.iter().map(|r| r.timestamp);
        attention.chain(interactions).chain(logs).chain(responses).max()
    }

    fn ensure_refs(&self, student_id: StudentId, lesson_id: LessonId) -> Result<(), ValidationError> {
        if !self.students.contains_key(&student_id) {
            warn!(student_id, "rejected row for unknown student");
            return Err(ValidationError::UnknownStudent(student_id));
        }
        if !self.lessons.contains_key(&lesson_id) {
            warn!(lesson_id, "rejected row for unknown lesson");
            return Err(ValidationError::UnknownLesson(lesson_id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Insert a student; existing ids are left untouched
    pub fn add_student(&mut self, student: Student) {
        self.students.entry(student.id).or_insert(student);
    }

    pub fn add_instructor(&mut self, instructor: Instructor) {
        self.instructors.entry(instructor.id).or_insert(instructor);
    }

    pub fn add_lesson(&mut self, lesson: Lesson) {
        self.lessons.entry(lesson.id).or_insert(lesson);
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    /// Require that a lesson exists
    pub fn require_lesson(&self, lesson_id: LessonId) -> Result<&Lesson, ComputeError> {
        self.lessons
            .get(&lesson_id)
            .ok_or_else(|| ComputeError::not_found(EntityKind::Lesson, lesson_id))
    }

    // ------------------------------------------------------------------
    // Appends
    // ------------------------------------------------------------------

    pub fn append_attention(
        &mut self,
        sample: NewAttentionSample,
    ) -> Result<&AttentionSample, ValidationError> {
        sample.validate()?;
        self.ensure_refs(sample.student_id, sample.lesson_id)?;

        let timestamp = self.next_timestamp();
        self.attention.push(AttentionSample {
            student_id: sample.student_id,
            lesson_id: sample.lesson_id,
            on_screen: sample.on_screen,
            fatigue: sample.fatigue,
            gaze_deviations: sample.gaze_deviations,
            interruptions: sample.interruptions,
            timestamp,
        });
        Ok(&self.attention[self.attention.len() - 1])
    }

    pub fn append_interaction(
        &mut self,
        sample: NewInteractionSample,
    ) -> Result<&InteractionSample, ValidationError> {
        self.ensure_refs(sample.student_id, sample.lesson_id)?;

        let timestamp = self.next_timestamp();
        self.interactions.push(InteractionSample {
            student_id: sample.student_id,
            lesson_id: sample.lesson_id,
            dwell_seconds: sample.dwell_seconds,
            player_events: sample.player_events,
            material_clicks: sample.material_clicks,
            annotation: sample.annotation,
            timestamp,
        });
        Ok(&self.interactions[self.interactions.len() - 1])
    }

    pub fn append_log(
        &mut self,
        entry: NewLogEntry,
    ) -> Result<&InteractionLogEntry, ValidationError> {
        self.ensure_refs(entry.student_id, entry.lesson_id)?;

        let timestamp = self.next_timestamp();
        self.logs.push(InteractionLogEntry {
            student_id: entry.student_id,
            lesson_id: entry.lesson_id,
            interaction_type: entry.interaction_type,
            detail: entry.detail,
            timestamp,
        });
        Ok(&self.logs[self.logs.len() - 1])
    }

    /// Register a quiz. The answer key cannot be replaced afterwards.
    pub fn add_quiz(&mut self, quiz: Quiz) -> Result<QuizId, ValidationError> {
        quiz.validate()?;
        if !self.lessons.contains_key(&quiz.lesson_id) {
            return Err(ValidationError::UnknownLesson(quiz.lesson_id));
        }
        if self.quizzes.contains_key(&quiz.id) {
            return Err(ValidationError::DuplicateQuiz(quiz.id));
        }

        let id = quiz.id;
        debug!(quiz_id = id, lesson_id = quiz.lesson_id, "registered quiz");
        self.quizzes.insert(id, quiz);
        Ok(id)
    }

    /// Grade a submission against the stored key and persist it as an immutable
    /// response. Unknown quizzes fail with `NotFound`.
    pub fn record_quiz_response(
        &mut self,
        submission: QuizSubmission,
    ) -> Result<(QuizScoreResult, &QuizResponse), ComputeError> {
        let result = grade_submission(&*self, submission.quiz_id, &submission.answers)?;
        if !self.students.contains_key(&submission.student_id) {
            return Err(ValidationError::UnknownStudent(submission.student_id).into());
        }

        let timestamp = self.next_timestamp();
        self.quiz_responses.push(QuizResponse {
            id: Uuid::new_v4().to_string(),
            quiz_id: submission.quiz_id,
            student_id: submission.student_id,
            answers: submission.answers,
            score: result.score,
            response_time_seconds: submission.response_time_seconds,
            timestamp,
        });
        Ok((result, &self.quiz_responses[self.quiz_responses.len() - 1]))
    }

    pub fn quiz_responses(&self, quiz_id: QuizId) -> Vec<&QuizResponse> {
        self.quiz_responses
            .iter()
            .filter(|r| r.quiz_id == quiz_id)
            .collect()
    }

    /// Most recent log entries of a lesson, newest first
    pub fn recent_logs(&self, lesson_id: LessonId, limit: usize) -> Vec<&InteractionLogEntry> {
        let mut entries: Vec<&InteractionLogEntry> = self
            .logs
            .iter()
            .filter(|e| e.lesson_id == lesson_id)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }
}

impl MetricSource for InMemoryMetricStore {
    fn attention_for_lesson(&self, lesson_id: LessonId) -> Vec<AttentionSample> {
        self.attention
            .iter()
            .filter(|s| s.lesson_id == lesson_id)
            .cloned()
            .collect()
    }

    fn interactions_for_lesson(&self, lesson_id: LessonId) -> Vec<InteractionSample> {
        self.interactions
            .iter()
            .filter(|s| s.lesson_id == lesson_id)
            .cloned()
            .collect()
    }

    fn logs_for_lesson(&self, lesson_id: LessonId) -> Vec<InteractionLogEntry> {
        self.logs
            .iter()
            .filter(|e| e.lesson_id == lesson_id)
            .cloned()
            .collect()
    }
}

impl StudentLookup for InMemoryMetricStore {
    fn display_name(&self, student_id: StudentId) -> Option<String> {
        self.students.get(&student_id).map(|s| s.name.clone())
    }
}

impl QuizLookup for InMemoryMetricStore {
    fn quiz(&self, quiz_id: QuizId) -> Option<&Quiz> {
        self.quizzes.get(&quiz_id)
    }
}
