use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OptionId(pub String);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform-wide curriculum entry pairing a video with a quiz.
///
/// Modules are never deleted; retired content is deactivated instead so historical
/// progress keeps resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingModule {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Dense, unique curriculum position starting at 1.
    pub order: u32,
    pub is_required: bool,
    pub is_active: bool,
    /// Minimum percentage needed to pass the quiz.
    pub passing_score: u8,
    /// Zero means unlimited attempts.
    pub max_attempts: u32,
    pub video_duration_minutes: u32,
}

impl TrainingModule {
    pub fn attempt_limit(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    pub fn attempts_remaining(&self, used: usize) -> Option<u32> {
        self.attempt_limit()
            .map(|limit| limit.saturating_sub(u32::try_from(used).unwrap_or(u32::MAX)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    SelectAll,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::SelectAll => "select_all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

/// Quiz question belonging to exactly one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingQuestion {
    pub id: QuestionId,
    pub module_id: ModuleId,
    pub prompt: String,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
    pub points: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl TrainingQuestion {
    pub fn correct_options(&self) -> BTreeSet<&OptionId> {
        self.options
            .iter()
            .filter(|option| option.is_correct)
            .map(|option| &option.id)
            .collect()
    }

    /// Learner-facing projection without correctness flags.
    pub fn public_view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            prompt: self.prompt.clone(),
            question_type: self.question_type,
            points: self.points,
            options: self
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    text: option.text.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub question_type: QuestionType,
    pub points: u32,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
}

/// One answered question as submitted by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    #[serde(default)]
    pub selected_option_ids: Vec<OptionId>,
}
