//! Input records accepted at the store boundary
//!
//! Callers submit `New*` records without timestamps; the store stamps them at write
//! time. Every record is validated here, before any value reaches the scoring code.

use crate::error::ValidationError;
use crate::types::{
    Instructor, InteractionType, Lesson, LessonId, Quiz, QuizId, Student, StudentId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Attention observation as submitted by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttentionSample {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub on_screen: bool,
    pub fatigue: f64,
    #[serde(default)]
    pub gaze_deviations: u32,
    #[serde(default)]
    pub interruptions: u32,
}

impl NewAttentionSample {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fatigue(self.fatigue)
    }
}

/// Interaction metrics as submitted by the lesson page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInteractionSample {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub dwell_seconds: u64,
    #[serde(default)]
    pub player_events: HashMap<String, u32>,
    #[serde(default)]
    pub material_clicks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// Interaction log entry as submitted by the lesson page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub interaction_type: InteractionType,
    #[serde(default)]
    pub detail: serde_json::Map<String, serde_json::Value>,
}

/// A student's quiz answers awaiting grading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub quiz_id: QuizId,
    pub student_id: StudentId,
    /// Question id -> chosen option
    pub answers: HashMap<String, String>,
    #[serde(default)]
    pub response_time_seconds: u64,
}

/// Any record that can be ingested, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricRecord {
    Student(Student),
    Instructor(Instructor),
    Lesson(Lesson),
    Attention(NewAttentionSample),
    Interaction(NewInteractionSample),
    Log(NewLogEntry),
    Quiz(Quiz),
    QuizSubmission(QuizSubmission),
}

impl MetricRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            MetricRecord::Student(_) => "student",
            MetricRecord::Instructor(_) => "instructor",
            MetricRecord::Lesson(_) => "lesson",
            MetricRecord::Attention(_) => "attention",
            MetricRecord::Interaction(_) => "interaction",
            MetricRecord::Log(_) => "log",
            MetricRecord::Quiz(_) => "quiz",
            MetricRecord::QuizSubmission(_) => "quiz_submission",
        }
    }

    /// Checks that need no store context (value ranges, quiz key consistency)
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            MetricRecord::Attention(sample) => sample.validate(),
            MetricRecord::Quiz(quiz) => quiz.validate(),
            _ => Ok(()),
        }
    }
}

impl Quiz {
    /// Every key entry must name a known question and one of its options
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(ValidationError::DuplicateQuestion(question.id.clone()));
            }
        }

        for (question_id, option) in &self.answer_key {
            let question = self
                .questions
                .iter()
                .find(|q| &q.id == question_id)
                .ok_or_else(|| ValidationError::UnknownQuestion(question_id.clone()))?;

            if !question.options.is_empty() && !question.options.contains(option) {
                return Err(ValidationError::UnknownOption {
                    question_id: question_id.clone(),
                    option: option.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Fatigue must lie within [0, 1]; NaN is rejected too
pub fn validate_fatigue(fatigue: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&fatigue) {
        Ok(())
    } else {
        Err(ValidationError::FatigueOutOfRange(fatigue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuizQuestion;

    fn quiz() -> Quiz {
        Quiz {
            id: 1,
            lesson_id: 10,
            title: "HTML basics".to_string(),
            description: String::new(),
            questions: vec![
                QuizQuestion {
                    id: "q1".to_string(),
                    prompt: "Which tag makes a link?".to_string(),
                    options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                },
                QuizQuestion {
                    id: "q2".to_string(),
                    prompt: "Which tag makes bold text?".to_string(),
                    options: vec!["a".to_string(), "b".to_string()],
                },
            ],
            answer_key: HashMap::from([
                ("q1".to_string(), "a".to_string()),
                ("q2".to_string(), "b".to_string()),
            ]),
        }
    }

    #[test]
    fn test_fatigue_range() {
        assert!(validate_fatigue(0.0).is_ok());
        assert!(validate_fatigue(1.0).is_ok());
        assert_eq!(
            validate_fatigue(1.2),
            Err(ValidationError::FatigueOutOfRange(1.2))
        );
        assert!(validate_fatigue(-0.1).is_err());
        assert!(validate_fatigue(f64::NAN).is_err());
    }

    #[test]
    fn test_quiz_key_must_reference_questions() {
        assert!(quiz().validate().is_ok());

        let mut bad = quiz();
        bad.answer_key.insert("q9".to_string(), "a".to_string());
        assert_eq!(
            bad.validate(),
            Err(ValidationError::UnknownQuestion("q9".to_string()))
        );
    }

    #[test]
    fn test_quiz_key_must_reference_options() {
        let mut bad = quiz();
        bad.answer_key.insert("q2".to_string(), "z".to_string());
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_duplicate_question_ids() {
        let mut bad = quiz();
        let first = bad.questions[0].clone();
        bad.questions.push(first);
        assert_eq!(
            bad.validate(),
            Err(ValidationError::DuplicateQuestion("q1".to_string()))
        );
    }

    #[test]
    fn test_record_tagging() {
        let json = r#"{"kind":"attention","student_id":1,"lesson_id":10,"on_screen":true,"fatigue":0.3}"#;
        let record: MetricRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.kind(), "attention");
        match record {
            MetricRecord::Attention(sample) => {
                assert_eq!(sample.gaze_deviations, 0);
                assert!(sample.on_screen);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_record_validation_dispatch() {
        let record = MetricRecord::Attention(NewAttentionSample {
            student_id: 1,
            lesson_id: 10,
            on_screen: false,
            fatigue: 3.0,
            gaze_deviations: 0,
            interruptions: 0,
        });
        assert!(record.validate().is_err());
    }
}
