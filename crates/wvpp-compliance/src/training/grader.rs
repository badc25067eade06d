use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::domain::{OptionId, QuestionId, QuestionType, SubmittedAnswer, TrainingModule, TrainingQuestion};
use super::progress::QuestionResult;

/// Result of grading one submission against a module's question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeOutcome {
    /// Percentage of available points earned, rounded half up.
    pub score: u8,
    pub passed: bool,
    pub correct_count: u32,
    pub earned_points: u32,
    pub total_points: u32,
    /// One entry per bank question in bank order, then unknown submitted questions.
    pub results: Vec<QuestionResult>,
}

/// Grade a submission. Unknown question ids and unanswered questions count as incorrect.
pub fn grade(
    module: &TrainingModule,
    bank: &[TrainingQuestion],
    answers: &[SubmittedAnswer],
) -> GradeOutcome {
    let mut submitted: HashMap<&QuestionId, &[OptionId]> = HashMap::new();
    for answer in answers {
        submitted
            .entry(&answer.question_id)
            .or_insert(answer.selected_option_ids.as_slice());
    }

    let mut results = Vec::with_capacity(bank.len());
    let mut earned_points = 0u32;
    let mut total_points = 0u32;
    let mut correct_count = 0u32;

    for question in bank {
        total_points = total_points.saturating_add(question.points);
        let correct = submitted
            .get(&question.id)
            .map(|selected| is_correct(question, selected))
            .unwrap_or(false);
        let points_awarded = if correct { question.points } else { 0 };
        if correct {
            correct_count += 1;
            earned_points = earned_points.saturating_add(points_awarded);
        }
        results.push(QuestionResult {
            question_id: question.id.clone(),
            correct,
            points_awarded,
        });
    }

    let known: HashSet<&QuestionId> = bank.iter().map(|question| &question.id).collect();
    let mut seen_unknown = HashSet::new();
    for answer in answers {
        if !known.contains(&answer.question_id) && seen_unknown.insert(&answer.question_id) {
            results.push(QuestionResult {
                question_id: answer.question_id.clone(),
                correct: false,
                points_awarded: 0,
            });
        }
    }

    let score = percentage(earned_points, total_points);

    GradeOutcome {
        score,
        passed: score >= module.passing_score,
        correct_count,
        earned_points,
        total_points,
        results,
    }
}

fn is_correct(question: &TrainingQuestion, selected: &[OptionId]) -> bool {
    let correct = question.correct_options();
    match question.question_type {
        QuestionType::SelectAll => {
            let chosen: BTreeSet<&OptionId> = selected.iter().collect();
            chosen == correct
        }
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            selected.len() == 1 && correct.contains(&selected[0])
        }
    }
}

fn percentage(earned: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let earned = u64::from(earned.min(total));
    let total = u64::from(total);
    ((200 * earned + total) / (2 * total)) as u8
}
