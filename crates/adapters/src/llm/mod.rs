//! LLM content generator adapters

pub mod gemini;
pub mod stub;

pub use gemini::GeminiGenerator;
pub use stub::StubGenerator;

use quizcast_domain::{Category, GenerateError, GenerateRequest, QuizPost};
use serde::{Deserialize, Serialize};

const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Temperature (0.0-2.0)
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Fixes the output language and register for every category
    pub system_instruction: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.8,
            max_output_tokens: 1024,
            timeout_secs: 45,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You write posts for a Telegram channel that teaches Python programming to beginners. \
Write in English, in a friendly and clear tone. Use plain text with a few emoji; never use Markdown or HTML markup.";

/// Prompt template per category; `{topic}` is replaced with the curriculum topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub morning: String,
    pub noon: String,
    pub evening: String,
    pub quiz: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            morning: "Write a short, upbeat good-morning post for Python learners. \
Include one practical tip or motivating thought for the day. Keep it under 600 characters."
                .to_string(),
            noon: "Write a concise lesson about the Python topic: {topic}. \
Explain the idea, show a small code example and end with one key takeaway. Keep it under 900 characters."
                .to_string(),
            evening: "Write a short evening post for Python learners: a fun fact about programming, \
a reflection on the day's learning or a tiny challenge to try. Keep it under 600 characters."
                .to_string(),
            quiz: "Create one multiple-choice question that checks understanding of the Python topic: {topic}. \
Give exactly 4 distinct options with exactly one correct answer, the zero-based index of the correct option, \
and a one-sentence explanation of the answer."
                .to_string(),
        }
    }
}

impl PromptSet {
    pub fn template(&self, category: Category) -> &str {
        match category {
            Category::Morning => &self.morning,
            Category::Noon => &self.noon,
            Category::Evening => &self.evening,
            Category::Quiz => &self.quiz,
        }
    }

    /// Whether the category's template needs a curriculum topic
    pub fn needs_topic(&self, category: Category) -> bool {
        self.template(category).contains(TOPIC_PLACEHOLDER)
    }

    /// Fill the category template from the request
    pub fn build_prompt(&self, request: &GenerateRequest) -> Result<String, GenerateError> {
        let template = self.template(request.category);
        if !template.contains(TOPIC_PLACEHOLDER) {
            return Ok(template.to_string());
        }

        let topic = request
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GenerateError::MissingTopic(request.category))?;

        Ok(template.replace(TOPIC_PLACEHOLDER, topic))
    }
}

/// Validate a free-text response
pub fn parse_text_response(response: &str) -> Result<String, GenerateError> {
    let text = response.trim();
    if text.is_empty() {
        return Err(GenerateError::InvalidFormat("Empty response".to_string()));
    }
    Ok(text.to_string())
}

#[derive(Deserialize)]
struct RawQuiz {
    question: String,
    options: Vec<String>,
    correct_index: i64,
    #[serde(default)]
    explanation: String,
}

/// Parse a quiz JSON response
pub fn parse_quiz_response(response: &str) -> Result<QuizPost, GenerateError> {
    let json_str = extract_json(response);

    let raw: RawQuiz = serde_json::from_str(json_str)
        .map_err(|e| GenerateError::InvalidFormat(format!("Failed to parse JSON: {}", e)))?;

    let options: [String; QuizPost::OPTION_COUNT] = raw.options.try_into().map_err(|o: Vec<String>| {
        GenerateError::InvalidFormat(format!(
            "Expected {} options, got {}",
            QuizPost::OPTION_COUNT,
            o.len()
        ))
    })?;

    let correct_index = u8::try_from(raw.correct_index)
        .ok()
        .filter(|i| usize::from(*i) < QuizPost::OPTION_COUNT)
        .ok_or_else(|| {
            GenerateError::InvalidFormat(format!(
                "correct_index {} is out of range 0..=3",
                raw.correct_index
            ))
        })?;

    Ok(QuizPost {
        question: raw.question,
        options,
        correct_index,
        explanation: raw.explanation,
    })
}

/// Extract JSON from response (handles markdown code blocks)
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with('{') {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    trimmed
}
