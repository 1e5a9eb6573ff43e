//! Core types for Lesson Pulse
//!
//! This module defines the telemetry rows captured during a lesson and the derived
//! records produced by the scoring engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub type StudentId = u64;
pub type LessonId = u64;
pub type InstructorId = u64;
pub type QuizId = u64;

// ============================================================================
// Entities
// ============================================================================

/// A student enrolled in one or more lessons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Display name shown in class reports
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Lesson owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// An online lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Owning instructor
    pub instructor_id: InstructorId,
}

// ============================================================================
// Telemetry rows
// ============================================================================

/// One observation tick from the gaze/attention tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionSample {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    /// True if the student was looking at the screen
    pub on_screen: bool,
    /// Fatigue estimate (0.0 - 1.0)
    pub fatigue: f64,
    /// Gaze deviations counted during the tick
    pub gaze_deviations: u32,
    /// Absences counted during the tick
    pub interruptions: u32,
    /// Assigned by the store at write time
    pub timestamp: DateTime<Utc>,
}

/// Engagement-with-content metrics for one reporting interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSample {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    /// Time spent on the lesson page, in seconds
    pub dwell_seconds: u64,
    /// Player event counts ({"play": 1, "pause": 2, "seek": 1})
    #[serde(default)]
    pub player_events: HashMap<String, u32>,
    /// Clicks on supporting material
    pub material_clicks: u32,
    /// Free-text annotation written by the student
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Interaction type recorded in the lesson log
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Click,
    Play,
    Pause,
    Seek,
    Note,
    Quiz,
    /// Any type not known ahead of time
    #[serde(untagged)]
    Other(String),
}

impl InteractionType {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionType::Click => "click",
            InteractionType::Play => "play",
            InteractionType::Pause => "pause",
            InteractionType::Seek => "seek",
            InteractionType::Note => "note",
            InteractionType::Quiz => "quiz",
            InteractionType::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry in the lesson's interaction log, used for pattern mining only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub interaction_type: InteractionType,
    /// Free-form details (element id, seek target, ...)
    #[serde(default)]
    pub detail: serde_json::Map<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Quizzes
// ============================================================================

/// A quiz question with its selectable options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    /// Option keys in display order
    pub options: Vec<String>,
}

/// A quiz attached to a lesson. The answer key is immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub lesson_id: LessonId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<QuizQuestion>,
    /// Question id -> correct option
    pub answer_key: HashMap<String, String>,
}

/// A graded quiz submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub id: String,
    pub quiz_id: QuizId,
    pub student_id: StudentId,
    /// Question id -> chosen option
    pub answers: HashMap<String, String>,
    /// Derived by the grader (0 - 100), never supplied by the caller
    pub score: f64,
    pub response_time_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of grading one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizScoreResult {
    pub quiz_id: QuizId,
    pub correct_count: u32,
    pub total_questions: u32,
    /// Percentage of the answer key answered correctly (0 - 100)
    pub score: f64,
}

// ============================================================================
// Derived records
// ============================================================================

/// Named contribution to the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    LowAttention,
    HighFatigue,
    FewClicks,
    ShortDwell,
}

/// Coarse risk classification shown on the instructor dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

/// Per-student engagement metrics for one lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentScore {
    /// Percentage of attention samples with the student on screen (0 - 100)
    pub attention_score: f64,
    /// Mean fatigue across attention samples (0 - 1)
    pub fatigue_score: f64,
    pub gaze_deviation_total: u64,
    pub interruption_total: u64,
    /// Total dwell time in seconds
    pub interaction_time_total: u64,
    pub interaction_clicks_total: u64,
    /// Composite attrition risk (0 - 100)
    pub risk_score: u32,
    /// Rules that contributed to `risk_score`, in rule order
    pub triggered_factors: Vec<RiskFactor>,
    pub risk_band: RiskBand,
}

/// One row of a class report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRiskEntry {
    pub student_id: StudentId,
    pub student_name: String,
    #[serde(flatten)]
    pub score: StudentScore,
}

/// Headline counts for a class report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub student_count: u32,
    /// Students at or above the medium risk cut-off
    pub at_risk_count: u32,
    /// Students below the medium risk cut-off
    pub engaged_count: u32,
    /// Students at or above the high risk cut-off, in report order
    pub high_risk_student_ids: Vec<StudentId>,
}

/// Ranked per-student scores for one lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub lesson_id: LessonId,
    /// Sorted by risk score, highest first
    pub students: Vec<StudentRiskEntry>,
    pub summary: ClassSummary,
    pub generated_at: DateTime<Utc>,
}

/// Lesson-wide frequency and average statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPatternSummary {
    /// Interaction type -> occurrence count
    pub interaction_type_counts: BTreeMap<String, u64>,
    pub distinct_student_count: u32,
    /// Mean of the on-screen flag as 0/1 (0 - 1)
    pub mean_attention: f64,
    pub mean_fatigue: f64,
    pub total_interactions: u64,
    pub mean_clicks: f64,
    /// Player event name -> total across interaction samples
    pub player_event_totals: BTreeMap<String, u64>,
}
