//! Quiz grading
//!
//! Compares a submitted answer set against a quiz's answer key. Unanswered and
//! extraneous question ids are ignored rather than penalized: only keyed questions
//! answered with the correct option count.

use crate::aggregator::round2;
use crate::error::{ComputeError, EntityKind};
use crate::store::QuizLookup;
use crate::types::{Quiz, QuizId, QuizScoreResult};
use std::collections::HashMap;

/// Grade a submission against a quiz's answer key.
///
/// `score = correct / keyed questions * 100`, or 0 when the key is empty.
pub fn grade_quiz(quiz: &Quiz, submitted_answers: &HashMap<String, String>) -> QuizScoreResult {
    let total_questions = quiz.answer_key.len() as u32;
    let correct_count = quiz
        .answer_key
        .iter()
        .filter(|(question_id, correct)| {
            submitted_answers
                .get(question_id.as_str())
                .is_some_and(|chosen| chosen == *correct)
        })
        .count() as u32;

    let score = if total_questions == 0 {
        0.0
    } else {
        correct_count as f64 / total_questions as f64 * 100.0
    };

    QuizScoreResult {
        quiz_id: quiz.id,
        correct_count,
        total_questions,
        score: round2(score),
    }
}

/// Resolve a quiz by id and grade the submission against it
pub fn grade_submission<Q: QuizLookup + ?Sized>(
    quizzes: &Q,
    quiz_id: QuizId,
    submitted_answers: &HashMap<String, String>,
) -> Result<QuizScoreResult, ComputeError> {
    let quiz = quizzes
        .quiz(quiz_id)
        .ok_or_else(|| ComputeError::not_found(EntityKind::Quiz, quiz_id))?;
    Ok(grade_quiz(quiz, submitted_answers))
}
