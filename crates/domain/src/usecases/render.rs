//! Rendering use case - turns drafts into operator previews, channel posts and notices

use crate::model::{
    AdminAction, CallbackCommand, Category, ChannelPost, Draft, DraftContent, PollSpec, Preview,
    QuizPost,
};
use crate::policy::{
    CAPTION_MAX_CHARS, MESSAGE_MAX_CHARS, POLL_EXPLANATION_MAX_CHARS, truncate_chars,
};

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Whether previews mention the curriculum topic
    pub include_topic: bool,
    /// Whether channel polls carry the explanation
    pub poll_explanation: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            include_topic: true,
            poll_explanation: true,
        }
    }
}

/// Renderer for drafts and operator notices
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the operator preview of a draft
    pub fn preview(&self, draft: &Draft) -> Preview {
        let header = self.preview_header(draft);
        let actions = vec![
            CallbackCommand::new(AdminAction::Regen, draft.category),
            CallbackCommand::new(AdminAction::Publish, draft.category),
        ];

        match &draft.content {
            DraftContent::Text(post) => {
                let limit = if post.image_url.is_some() {
                    CAPTION_MAX_CHARS
                } else {
                    MESSAGE_MAX_CHARS
                };
                Preview {
                    category: draft.category,
                    text: truncate_chars(&format!("{}\n\n{}", header, post.text), limit),
                    image_url: post.image_url.clone(),
                    poll: None,
                    actions,
                }
            }
            DraftContent::Quiz(quiz) => Preview {
                category: draft.category,
                text: truncate_chars(
                    &format!("{}\n\n{}", header, format_quiz_summary(quiz)),
                    MESSAGE_MAX_CHARS,
                ),
                image_url: None,
                poll: Some(self.poll(quiz, false)),
                actions,
            },
        }
    }

    /// Render the public channel post of a draft
    pub fn channel_post(&self, draft: &Draft) -> ChannelPost {
        match &draft.content {
            DraftContent::Text(post) => ChannelPost::Text {
                text: post.text.clone(),
                image_url: post.image_url.clone(),
            },
            DraftContent::Quiz(quiz) => ChannelPost::Poll(self.poll(quiz, true)),
        }
    }

    fn poll(&self, quiz: &QuizPost, anonymous: bool) -> PollSpec {
        let explanation = if self.config.poll_explanation && !quiz.explanation.trim().is_empty() {
            Some(truncate_chars(&quiz.explanation, POLL_EXPLANATION_MAX_CHARS))
        } else {
            None
        };

        PollSpec {
            question: quiz.question.clone(),
            options: quiz.options.to_vec(),
            correct_index: quiz.correct_index,
            explanation,
            anonymous,
        }
    }

    fn preview_header(&self, draft: &Draft) -> String {
        let icon = category_icon(draft.category);
        let mut header = format!("{} {} draft", icon, capitalize(draft.category.as_str()));
        if self.config.include_topic {
            if let Some(topic) = &draft.topic {
                header.push_str(&format!(" · Topic: {}", topic));
            }
        }
        header
    }

    pub fn draft_failed(&self, category: Category, error: &str) -> String {
        format!("❌ Could not prepare the {} draft.\n\n{}", category, error)
    }

    pub fn missing_draft(&self, category: Category) -> String {
        format!(
            "⚠️ Nothing to publish for {}: no draft has been prepared.",
            category
        )
    }

    pub fn delivery_failed(&self, category: Category, error: &str) -> String {
        format!("❌ Publishing {} to the channel failed.\n\n{}", category, error)
    }

    pub fn published(&self, draft: &Draft, cursor: Option<u64>) -> String {
        let mut text = format!("✅ {} published to the channel.", capitalize(draft.category.as_str()));
        if let Some(topic) = &draft.topic {
            text.push_str(&format!("\nTopic: {}", topic));
        }
        if let Some(cursor) = cursor {
            text.push_str(&format!("\nTopic cursor is now {}.", cursor));
        }
        text
    }

    pub fn cursor_not_advanced(&self, category: Category, error: &str) -> String {
        format!(
            "⚠️ {} was published but the topic cursor could not be advanced.\n\n{}",
            capitalize(category.as_str()),
            error
        )
    }
}

/// Question, numbered options with the answer marked, and the explanation
pub fn format_quiz_summary(quiz: &QuizPost) -> String {
    let mut text = format!("❓ {}\n", quiz.question);
    for (index, option) in quiz.options.iter().enumerate() {
        let mark = if index == usize::from(quiz.correct_index) {
            " ✅"
        } else {
            ""
        };
        text.push_str(&format!("\n{}. {}{}", index + 1, option, mark));
    }
    if !quiz.explanation.trim().is_empty() {
        text.push_str(&format!("\n\n💡 {}", quiz.explanation));
    }
    text
}

fn category_icon(category: Category) -> &'static str {
    match category {
        Category::Morning => "🌅",
        Category::Noon => "📘",
        Category::Evening => "🌙",
        Category::Quiz => "🧩",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
