//! Lesson Pulse - Engagement and attrition-risk scoring for online lessons
//!
//! Pulse turns per-student lesson telemetry into actionable signals through pure,
//! deterministic computations over rows already fetched from a metric store:
//! per-student score aggregation → class report ranking, plus quiz grading and
//! lesson-wide pattern analysis.
//!
//! ## Modules
//!
//! - **Scoring**: [`aggregator`], [`rules`], [`config`] fold attention and interaction
//!   samples into a risk score using a fixed, auditable rule table
//! - **Reports**: [`report`] ranks every student of a lesson, [`patterns`] summarizes
//!   the lesson's interaction log
//! - **Quizzes**: [`grader`] scores submissions against an answer key
//! - **Boundary**: [`schema`] and [`store`] validate and hold incoming rows

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod grader;
pub mod patterns;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod schema;
pub mod store;
pub mod types;

pub use aggregator::{aggregate_student_score, ScoreAggregator};
pub use config::ScoringConfig;
pub use error::{ComputeError, EntityKind, ValidationError};
pub use grader::{grade_quiz, grade_submission};
pub use patterns::analyze_patterns;
pub use pipeline::{class_report_json, lesson_patterns_json, EngagementProcessor};
pub use report::{build_class_report, ClassReportBuilder};
pub use store::{InMemoryMetricStore, MetricSource, QuizLookup, StudentLookup};

// Schema exports
pub use schema::{MetricRecord, RecordAdapter};

/// Pulse version embedded in all output envelopes
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for output envelopes
pub const PRODUCER_NAME: &str = "lesson-pulse";
