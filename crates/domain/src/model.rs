//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// A content slot the pipeline cycles through every day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Morning,
    Noon,
    Evening,
    Quiz,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] = [
        Category::Morning,
        Category::Noon,
        Category::Evening,
        Category::Quiz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Morning => "morning",
            Category::Noon => "noon",
            Category::Evening => "evening",
            Category::Quiz => "quiz",
        }
    }

    /// Whether drafts in this category carry a structured quiz payload
    pub fn is_quiz(&self) -> bool {
        matches!(self, Category::Quiz)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category '{0}', expected one of: morning, noon, evening, quiz")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(Category::Morning),
            "noon" => Ok(Category::Noon),
            "evening" => Ok(Category::Evening),
            "quiz" => Ok(Category::Quiz),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Free-form post body with an optional illustrative image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPost {
    pub text: String,
    pub image_url: Option<String>,
}

/// Structured multiple-choice quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPost {
    pub question: String,
    pub options: [String; 4],
    pub correct_index: u8,
    pub explanation: String,
}

impl QuizPost {
    pub const OPTION_COUNT: usize = 4;

    /// Check the structural invariants of a quiz payload
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.question.trim().is_empty() {
            return Err(DraftError::InvalidQuiz("question is empty".to_string()));
        }
        if usize::from(self.correct_index) >= Self::OPTION_COUNT {
            return Err(DraftError::InvalidQuiz(format!(
                "correct_index {} is out of range 0..=3",
                self.correct_index
            )));
        }
        Ok(())
    }

    /// The text of the correct option
    pub fn correct_option(&self) -> &str {
        &self.options[usize::from(self.correct_index).min(Self::OPTION_COUNT - 1)]
    }
}

/// Payload of a draft, selected by category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftContent {
    Text(TextPost),
    Quiz(QuizPost),
}

/// Errors raised when building a draft
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Category {category} cannot hold {kind} content")]
    CategoryMismatch {
        category: Category,
        kind: &'static str,
    },
    #[error("Invalid quiz: {0}")]
    InvalidQuiz(String),
}

/// The single pending, not-yet-published content item for a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Revision id, new on every write
    pub id: Uuid,
    pub category: Category,
    pub content: DraftContent,
    /// Curriculum topic used to generate the draft
    pub topic: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Draft {
    /// Create a new draft revision, checking that the content fits the category
    pub fn new(
        category: Category,
        content: DraftContent,
        topic: Option<String>,
        created_at: OffsetDateTime,
    ) -> Result<Self, DraftError> {
        match (&content, category.is_quiz()) {
            (DraftContent::Quiz(quiz), true) => quiz.validate()?,
            (DraftContent::Text(_), false) => {}
            (DraftContent::Quiz(_), false) => {
                return Err(DraftError::CategoryMismatch {
                    category,
                    kind: "quiz",
                });
            }
            (DraftContent::Text(_), true) => {
                return Err(DraftError::CategoryMismatch {
                    category,
                    kind: "text",
                });
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            category,
            content,
            topic,
            created_at,
        })
    }

    /// Rendered text body: the post copy, or the explanation for quizzes
    pub fn text_content(&self) -> &str {
        match &self.content {
            DraftContent::Text(post) => &post.text,
            DraftContent::Quiz(quiz) => &quiz.explanation,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.content {
            DraftContent::Text(post) => post.image_url.as_deref(),
            DraftContent::Quiz(_) => None,
        }
    }

    pub fn quiz(&self) -> Option<&QuizPost> {
        match &self.content {
            DraftContent::Quiz(quiz) => Some(quiz),
            DraftContent::Text(_) => None,
        }
    }
}

/// Fixed ordered list of lesson topics and the categories that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    topics: Vec<String>,
    linked: Vec<Category>,
}

impl Curriculum {
    pub fn new(topics: Vec<String>, linked: Vec<Category>) -> Self {
        let mut linked = linked;
        linked.sort();
        linked.dedup();
        Self { topics, linked }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn linked_categories(&self) -> &[Category] {
        &self.linked
    }

    /// Whether the category picks its topic from the curriculum
    pub fn is_linked(&self, category: Category) -> bool {
        self.linked.contains(&category)
    }

    /// Position in the curriculum for a cursor value (wraps around)
    pub fn position(&self, cursor: u64) -> Option<usize> {
        if self.topics.is_empty() {
            return None;
        }
        let len = self.topics.len() as u64;
        usize::try_from(cursor % len).ok()
    }

    /// Topic selected by a cursor value
    pub fn topic_at(&self, cursor: u64) -> Option<&str> {
        self.position(cursor)
            .and_then(|index| self.topics.get(index))
            .map(String::as_str)
    }
}

/// Request handed to the content generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub category: Category,
    /// Required for curriculum-linked categories, ignored otherwise
    pub topic: Option<String>,
}

/// Output of the content generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratedContent {
    Text { text: String },
    Quiz(QuizPost),
}

/// A poll as delivered to Telegram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSpec {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub explanation: Option<String>,
    pub anonymous: bool,
}

/// Content ready for delivery to the public channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelPost {
    Text {
        text: String,
        image_url: Option<String>,
    },
    Poll(PollSpec),
}

/// Operator action bound to an inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminAction {
    Create,
    Regen,
    Publish,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Create => "create",
            AdminAction::Regen => "regen",
            AdminAction::Publish => "publish",
        }
    }
}

/// Inline button payload of the form `action_category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackCommand {
    pub action: AdminAction,
    pub category: Category,
}

impl CallbackCommand {
    pub fn new(action: AdminAction, category: Category) -> Self {
        Self { action, category }
    }

    /// Parse callback data such as `regen_quiz`
    pub fn parse(data: &str) -> Option<Self> {
        let (action, category) = data.split_once('_')?;
        let action = match action {
            "create" => AdminAction::Create,
            "regen" => AdminAction::Regen,
            "publish" => AdminAction::Publish,
            _ => return None,
        };
        let category = category.parse().ok()?;
        Some(Self { action, category })
    }

    pub fn to_data(&self) -> String {
        format!("{}_{}", self.action.as_str(), self.category.as_str())
    }
}

/// Operator-facing preview of a freshly stored draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub category: Category,
    pub text: String,
    pub image_url: Option<String>,
    /// Interactive mirror of a quiz draft
    pub poll: Option<PollSpec>,
    pub actions: Vec<CallbackCommand>,
}

/// Chat that receives previews and notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRef(pub i64);

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What caused a draft pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftTrigger {
    Scheduled,
    Manual,
    Regenerate,
}

impl DraftTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftTrigger::Scheduled => "scheduled",
            DraftTrigger::Manual => "manual",
            DraftTrigger::Regenerate => "regenerate",
        }
    }
}

/// Result of a draft pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// Draft stored; `previewed` is false when the preview could not be delivered
    Prepared {
        category: Category,
        topic: Option<String>,
        draft_id: Uuid,
        previewed: bool,
    },
    /// Generation or content policy failed; nothing was stored
    GenerationFailed { error: String },
    /// The draft could not be written
    StoreUnavailable { error: String },
}

impl PrepareOutcome {
    pub fn is_prepared(&self) -> bool {
        matches!(self, PrepareOutcome::Prepared { .. })
    }
}

/// Result of a publish pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Delivered; `cursor` holds the advanced topic cursor when one moved
    Published {
        category: Category,
        message_id: String,
        cursor: Option<u64>,
    },
    /// No draft stored for the category
    MissingDraft,
    /// The channel rejected or never received the post
    DeliveryFailed { error: String },
    /// The draft could not be read
    StoreUnavailable { error: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// Registered bot user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUser {
    pub user_id: i64,
    pub username: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quiz() -> QuizPost {
        QuizPost {
            question: "What does len([1, 2]) return?".to_string(),
            options: [
                "1".to_string(),
                "2".to_string(),
                "3".to_string(),
                "Error".to_string(),
            ],
            correct_index: 1,
            explanation: "len counts the list items.".to_string(),
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(" Quiz ".parse::<Category>().unwrap(), Category::Quiz);
        assert_eq!("NOON".parse::<Category>().unwrap(), Category::Noon);
        assert!("lunch".parse::<Category>().is_err());
    }

    #[test]
    fn test_callback_command_parse() {
        let cmd = CallbackCommand::parse("regen_quiz").unwrap();
        assert_eq!(cmd.action, AdminAction::Regen);
        assert_eq!(cmd.category, Category::Quiz);

        let cmd = CallbackCommand::parse("publish_noon").unwrap();
        assert_eq!(cmd.to_data(), "publish_noon");

        assert!(CallbackCommand::parse("create_lunch").is_none());
        assert!(CallbackCommand::parse("delete_morning").is_none());
        assert!(CallbackCommand::parse("morning").is_none());
    }

    #[test]
    fn test_draft_rejects_mismatched_content() {
        let now = OffsetDateTime::now_utc();
        let result = Draft::new(
            Category::Morning,
            DraftContent::Quiz(sample_quiz()),
            None,
            now,
        );
        assert!(matches!(result, Err(DraftError::CategoryMismatch { .. })));

        let result = Draft::new(
            Category::Quiz,
            DraftContent::Text(TextPost {
                text: "hello".to_string(),
                image_url: None,
            }),
            None,
            now,
        );
        assert!(matches!(result, Err(DraftError::CategoryMismatch { .. })));
    }

    #[test]
    fn test_quiz_draft_text_content_is_explanation() {
        let draft = Draft::new(
            Category::Quiz,
            DraftContent::Quiz(sample_quiz()),
            Some("Lists".to_string()),
            OffsetDateTime::now_utc(),
        )
        .unwrap();

        assert_eq!(draft.text_content(), "len counts the list items.");
        assert_eq!(draft.quiz().unwrap().correct_option(), "2");
        assert!(draft.image_url().is_none());
    }

    #[test]
    fn test_quiz_rejects_out_of_range_answer() {
        let mut quiz = sample_quiz();
        quiz.correct_index = 4;
        assert!(matches!(quiz.validate(), Err(DraftError::InvalidQuiz(_))));
    }

    #[test]
    fn test_curriculum_wraps_cursor() {
        let curriculum = Curriculum::new(
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec![Category::Quiz, Category::Noon, Category::Quiz],
        );

        assert_eq!(curriculum.topic_at(2), Some("C"));
        assert_eq!(curriculum.topic_at(3), Some("A"));
        assert_eq!(curriculum.position(7), Some(1));
        assert_eq!(curriculum.linked_categories(), &[Category::Noon, Category::Quiz]);
        assert!(curriculum.is_linked(Category::Noon));
        assert!(!curriculum.is_linked(Category::Morning));
    }

    #[test]
    fn test_empty_curriculum_has_no_topic() {
        let curriculum = Curriculum::new(vec![], vec![Category::Noon]);
        assert_eq!(curriculum.topic_at(0), None);
    }
}
