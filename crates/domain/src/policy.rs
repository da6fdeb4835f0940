//! Content policy: Telegram size limits and safety constraints

use crate::model::{GeneratedContent, QuizPost};

/// Maximum length of a text message
pub const MESSAGE_MAX_CHARS: usize = 4096;
/// Maximum length of a photo caption
pub const CAPTION_MAX_CHARS: usize = 1024;
/// Maximum length of a poll question
pub const POLL_QUESTION_MAX_CHARS: usize = 300;
/// Maximum length of a single poll option
pub const POLL_OPTION_MAX_CHARS: usize = 100;
/// Maximum length of a quiz poll explanation
pub const POLL_EXPLANATION_MAX_CHARS: usize = 200;

/// Policy configuration
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Maximum characters for text posts
    pub max_text_chars: usize,
    /// Forbidden words in output (for safety)
    pub forbidden_patterns: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_text_chars: MESSAGE_MAX_CHARS,
            forbidden_patterns: vec![],
        }
    }
}

/// Validator applied to generated content before it becomes a draft
#[derive(Debug, Clone, Default)]
pub struct ContentPolicy {
    config: PolicyConfig,
}

impl ContentPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Validate and sanitize generated content
    pub fn validate(&self, content: &GeneratedContent) -> Result<GeneratedContent, PolicyViolation> {
        match content {
            GeneratedContent::Text { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(PolicyViolation::EmptyText);
                }
                self.check_forbidden(text, "text")?;
                Ok(GeneratedContent::Text {
                    text: truncate_chars(text, self.config.max_text_chars.min(MESSAGE_MAX_CHARS)),
                })
            }
            GeneratedContent::Quiz(quiz) => self.validate_quiz(quiz).map(GeneratedContent::Quiz),
        }
    }

    fn validate_quiz(&self, quiz: &QuizPost) -> Result<QuizPost, PolicyViolation> {
        let question = quiz.question.trim();
        if question.is_empty() {
            return Err(PolicyViolation::EmptyText);
        }
        self.check_forbidden(question, "question")?;
        self.check_forbidden(&quiz.explanation, "explanation")?;

        let mut options = quiz.options.clone();
        for (index, option) in options.iter_mut().enumerate() {
            let trimmed = option.trim();
            if trimmed.is_empty() {
                return Err(PolicyViolation::EmptyOption { index });
            }
            self.check_forbidden(trimmed, "option")?;
            *option = truncate_chars(trimmed, POLL_OPTION_MAX_CHARS);
        }

        for (i, a) in options.iter().enumerate() {
            if options[i + 1..].iter().any(|b| b == a) {
                return Err(PolicyViolation::DuplicateOption(a.clone()));
            }
        }

        if usize::from(quiz.correct_index) >= QuizPost::OPTION_COUNT {
            return Err(PolicyViolation::AnswerOutOfRange(quiz.correct_index));
        }

        Ok(QuizPost {
            question: truncate_chars(question, POLL_QUESTION_MAX_CHARS),
            options,
            correct_index: quiz.correct_index,
            explanation: truncate_chars(quiz.explanation.trim(), MESSAGE_MAX_CHARS),
        })
    }

    fn check_forbidden(&self, text: &str, context: &str) -> Result<(), PolicyViolation> {
        let lower = text.to_lowercase();
        for pattern in &self.config.forbidden_patterns {
            if lower.contains(&pattern.to_lowercase()) {
                return Err(PolicyViolation::ForbiddenPattern {
                    pattern: pattern.clone(),
                    context: context.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Whether a text fits in a photo caption
pub fn fits_caption(text: &str) -> bool {
    text.chars().count() <= CAPTION_MAX_CHARS
}

/// Truncate to at most `max` characters, ending with "..." when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Forbidden pattern '{pattern}' found in {context}")]
    ForbiddenPattern { pattern: String, context: String },
    #[error("Generated text is empty")]
    EmptyText,
    #[error("Quiz option {index} is empty")]
    EmptyOption { index: usize },
    #[error("Quiz option '{0}' appears more than once")]
    DuplicateOption(String),
    #[error("Quiz answer index {0} is out of range")]
    AnswerOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quiz() -> QuizPost {
        QuizPost {
            question: "Which keyword defines a function?".to_string(),
            options: [
                "def".to_string(),
                "fn".to_string(),
                "func".to_string(),
                "lambda".to_string(),
            ],
            correct_index: 0,
            explanation: "Python uses def.".to_string(),
        }
    }

    #[test]
    fn test_policy_truncates_long_text() {
        let policy = ContentPolicy::new(PolicyConfig {
            max_text_chars: 50,
            ..Default::default()
        });

        let result = policy
            .validate(&GeneratedContent::Text {
                text: "A".repeat(200),
            })
            .unwrap();

        let GeneratedContent::Text { text } = result else {
            panic!("expected text");
        };
        assert_eq!(text.chars().count(), 50);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_policy_rejects_empty_text() {
        let policy = ContentPolicy::default();
        let result = policy.validate(&GeneratedContent::Text {
            text: "   ".to_string(),
        });
        assert_eq!(result, Err(PolicyViolation::EmptyText));
    }

    #[test]
    fn test_policy_forbidden_patterns() {
        let policy = ContentPolicy::new(PolicyConfig {
            forbidden_patterns: vec!["casino".to_string()],
            ..Default::default()
        });

        let result = policy.validate(&GeneratedContent::Text {
            text: "Visit our CASINO today".to_string(),
        });
        assert!(matches!(
            result,
            Err(PolicyViolation::ForbiddenPattern { .. })
        ));
    }

    #[test]
    fn test_policy_rejects_duplicate_options() {
        let mut quiz = sample_quiz();
        quiz.options[3] = "def".to_string();

        let result = ContentPolicy::default().validate(&GeneratedContent::Quiz(quiz));
        assert_eq!(
            result,
            Err(PolicyViolation::DuplicateOption("def".to_string()))
        );
    }

    #[test]
    fn test_policy_rejects_empty_option() {
        let mut quiz = sample_quiz();
        quiz.options[2] = " ".to_string();

        let result = ContentPolicy::default().validate(&GeneratedContent::Quiz(quiz));
        assert_eq!(result, Err(PolicyViolation::EmptyOption { index: 2 }));
    }

    #[test]
    fn test_policy_truncates_long_options_and_question() {
        let mut quiz = sample_quiz();
        quiz.question = "Q".repeat(400);
        quiz.options[1] = "x".repeat(150);

        let GeneratedContent::Quiz(result) = ContentPolicy::default()
            .validate(&GeneratedContent::Quiz(quiz))
            .unwrap()
        else {
            panic!("expected quiz");
        };

        assert_eq!(result.question.chars().count(), POLL_QUESTION_MAX_CHARS);
        assert_eq!(result.options[1].chars().count(), POLL_OPTION_MAX_CHARS);
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        let text = "Salam dünýä! ".repeat(10);
        let out = truncate_chars(&text, 20);
        assert_eq!(out.chars().count(), 20);
        assert!(fits_caption(&out));
    }
}
