//! Configuration loading and management

use anyhow::{Context, Result};
use quizcast_adapters::llm::{
    DEFAULT_SYSTEM_INSTRUCTION, LlmConfig as AdapterLlmConfig, PromptSet,
    gemini::DEFAULT_BASE_URL,
};
use quizcast_domain::policy::{MESSAGE_MAX_CHARS, PolicyConfig as DomainPolicyConfig};
use quizcast_domain::usecases::{DraftConfig, ImageConfig, RenderConfig, Schedule};
use quizcast_domain::{Category, ChatRef, Curriculum};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Time, UtcOffset};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub prompts: PromptSet,

    #[serde(default)]
    pub curriculum: CurriculumConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub dry_run: bool,

    /// Fixed UTC offset of the schedule, e.g. "+05:00"
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Telegram user id of the operator
    #[serde(default)]
    pub operator_id: i64,

    /// Public channel: "@username" or numeric chat id
    #[serde(default)]
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumConfig {
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    #[serde(default = "default_linked_categories")]
    pub linked_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_image_url_template")]
    pub url_template: String,

    /// Keywords per category name
    #[serde(default = "default_image_keywords")]
    pub keywords: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub prepare: String,
    pub publish: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_morning_slot")]
    pub morning: SlotConfig,

    #[serde(default = "default_noon_slot")]
    pub noon: SlotConfig,

    #[serde(default = "default_evening_slot")]
    pub evening: SlotConfig,

    #[serde(default = "default_quiz_slot")]
    pub quiz: SlotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    #[serde(default)]
    pub forbidden_patterns: Vec<String>,

    /// Mention the curriculum topic in previews
    #[serde(default = "default_true")]
    pub preview_topic: bool,

    /// Attach the explanation to channel quiz polls
    #[serde(default = "default_true")]
    pub poll_explanation: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid timezone offset '{0}', expected e.g. +05:00 or UTC")]
    InvalidOffset(String),
    #[error("Invalid time '{value}' for {field}, expected HH:MM")]
    InvalidTime { field: String, value: String },
    #[error("Unknown category '{0}' in {1}")]
    UnknownCategory(String, &'static str),
    #[error("telegram.operator_id is not set")]
    MissingOperator,
    #[error("telegram.channel is not set")]
    MissingChannel,
    #[error("prompts.{category} and curriculum.linked_categories disagree: {reason}")]
    TopicMismatch {
        category: Category,
        reason: &'static str,
    },
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./quizcast.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "+05:00".to_string()
}

fn default_true() -> bool {
    true
}

fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    AdapterLlmConfig::default().model
}

fn default_temperature() -> f64 {
    AdapterLlmConfig::default().temperature
}

fn default_timeout() -> u64 {
    AdapterLlmConfig::default().timeout_secs
}

fn default_max_output_tokens() -> u32 {
    AdapterLlmConfig::default().max_output_tokens
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_gemini_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_topics() -> Vec<String> {
    [
        "Variables and data types",
        "Strings and f-strings",
        "Numbers and arithmetic operators",
        "Conditionals: if, elif, else",
        "for loops and range()",
        "while loops, break and continue",
        "Lists and list methods",
        "Tuples and unpacking",
        "Dictionaries",
        "Sets",
        "List comprehensions",
        "Functions and return values",
        "Default and keyword arguments",
        "*args and **kwargs",
        "Scope and the global keyword",
        "Lambda functions",
        "Exceptions: try, except, finally",
        "Reading and writing files",
        "Modules and imports",
        "Classes and objects",
        "Inheritance",
        "Iterators and generators",
        "Decorators",
        "Context managers and with",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_linked_categories() -> Vec<String> {
    vec!["noon".to_string(), "quiz".to_string()]
}

fn default_image_url_template() -> String {
    ImageConfig::default().url_template
}

fn default_image_keywords() -> HashMap<String, String> {
    ImageConfig::default()
        .keywords
        .into_iter()
        .map(|(category, words)| (category.as_str().to_string(), words))
        .collect()
}

fn slot(prepare: &str, publish: &str) -> SlotConfig {
    SlotConfig {
        prepare: prepare.to_string(),
        publish: publish.to_string(),
    }
}

fn default_morning_slot() -> SlotConfig {
    slot("07:00", "08:00")
}

fn default_noon_slot() -> SlotConfig {
    slot("11:00", "12:00")
}

fn default_evening_slot() -> SlotConfig {
    slot("19:00", "20:00")
}

fn default_quiz_slot() -> SlotConfig {
    slot("17:00", "18:00")
}

fn default_max_text_chars() -> usize {
    MESSAGE_MAX_CHARS
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
            dry_run: false,
            timezone: default_timezone(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            operator_id: 0,
            channel: String::new(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            max_output_tokens: default_max_output_tokens(),
            system_instruction: default_system_instruction(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_api_key_env(),
            base_url: default_gemini_base_url(),
        }
    }
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            linked_categories: default_linked_categories(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url_template: default_image_url_template(),
            keywords: default_image_keywords(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            morning: default_morning_slot(),
            noon: default_noon_slot(),
            evening: default_evening_slot(),
            quiz: default_quiz_slot(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            forbidden_patterns: vec![],
            preview_topic: true,
            poll_explanation: true,
        }
    }
}

impl ScheduleConfig {
    fn slot(&self, category: Category) -> &SlotConfig {
        match category {
            Category::Morning => &self.morning,
            Category::Noon => &self.noon,
            Category::Evening => &self.evening,
            Category::Quiz => &self.quiz,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        builder = builder.add_source(
            config::Environment::with_prefix("QUIZCAST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn timezone_offset(&self) -> Result<UtcOffset, ConfigError> {
        parse_offset(&self.general.timezone)
    }

    /// Target channel as configured; blank is an error
    pub fn channel(&self) -> Result<&str, ConfigError> {
        let channel = self.telegram.channel.trim();
        if channel.is_empty() {
            return Err(ConfigError::MissingChannel);
        }
        Ok(channel)
    }

    pub fn operator(&self) -> Result<ChatRef, ConfigError> {
        if self.telegram.operator_id == 0 {
            return Err(ConfigError::MissingOperator);
        }
        Ok(ChatRef(self.telegram.operator_id))
    }

    pub fn curriculum(&self) -> Result<Curriculum, ConfigError> {
        let linked = self
            .curriculum
            .linked_categories
            .iter()
            .map(|name| {
                name.parse::<Category>()
                    .map_err(|_| ConfigError::UnknownCategory(name.clone(), "curriculum.linked_categories"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // A linked category must consume the topic it advances the cursor for
        for category in Category::ALL {
            let reason = match (self.prompts.needs_topic(category), linked.contains(&category)) {
                (true, false) => "the template uses {topic} but the category is not linked",
                (false, true) => "the category is linked but its template has no {topic}",
                _ => continue,
            };
            return Err(ConfigError::TopicMismatch { category, reason });
        }

        let topics = self
            .curriculum
            .topics
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Curriculum::new(topics, linked))
    }

    /// Daily slots; validation errors name the offending category
    pub fn schedule(&self) -> Result<Schedule> {
        let mut schedule = Schedule::new(self.timezone_offset()?);
        for category in Category::ALL {
            let slot = self.schedule.slot(category);
            let prepare = parse_time(&format!("schedule.{}.prepare", category), &slot.prepare)?;
            let publish = parse_time(&format!("schedule.{}.publish", category), &slot.publish)?;
            schedule.add_slot(category, prepare, publish)?;
        }
        Ok(schedule)
    }

    pub fn draft_config(&self) -> Result<DraftConfig, ConfigError> {
        let mut keywords = HashMap::new();
        for (name, words) in &self.images.keywords {
            let category = name
                .parse::<Category>()
                .map_err(|_| ConfigError::UnknownCategory(name.clone(), "images.keywords"))?;
            keywords.insert(category, words.clone());
        }

        Ok(DraftConfig {
            policy: DomainPolicyConfig {
                max_text_chars: self.policy.max_text_chars,
                forbidden_patterns: self.policy.forbidden_patterns.clone(),
            },
            images: ImageConfig {
                enabled: self.images.enabled,
                url_template: self.images.url_template.clone(),
                keywords,
            },
            render: self.render_config(),
        })
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            include_topic: self.policy.preview_topic,
            poll_explanation: self.policy.poll_explanation,
        }
    }

    pub fn adapter_llm_config(&self) -> AdapterLlmConfig {
        AdapterLlmConfig {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_output_tokens: self.llm.max_output_tokens,
            timeout_secs: self.llm.timeout_secs,
            system_instruction: self.llm.system_instruction.clone(),
        }
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# quizcast configuration
# Every key can be overridden from the environment, e.g.
# QUIZCAST__TELEGRAM__OPERATOR_ID=123456789

[general]
state_db_path = "./quizcast.sqlite"
log_level = "info"
# Send channel posts to the outbox file instead of Telegram
dry_run = false
# Fixed UTC offset used by the schedule
timezone = "+05:00"

[telegram]
bot_token_env = "TELEGRAM_BOT_TOKEN"
# Your Telegram user id; only this user can manage drafts
operator_id = 0
# "@channel_username" or numeric id like -1001234567890
channel = ""

[llm]
provider = "gemini"  # gemini, stub
model = "gemini-2.0-flash"
temperature = 0.8
timeout_secs = 45
max_output_tokens = 1024
# system_instruction = "You write posts for a Telegram channel that teaches Python..."

[llm.gemini]
api_key_env = "GEMINI_API_KEY"
base_url = "https://generativelanguage.googleapis.com"

# Prompt templates; {topic} is replaced with the current curriculum topic
# [prompts]
# morning = "Write a short, upbeat good-morning post for Python learners..."
# noon = "Write a concise lesson about the Python topic: {topic}..."
# evening = "Write a short evening post for Python learners..."
# quiz = "Create one multiple-choice question about the Python topic: {topic}..."

[curriculum]
linked_categories = ["noon", "quiz"]
topics = [
    "Variables and data types",
    "Strings and f-strings",
    "Conditionals: if, elif, else",
    "for loops and range()",
    "Lists and list methods",
    "Dictionaries",
    "Functions and return values",
]

[images]
enabled = false
url_template = "https://image.pollinations.ai/prompt/{keywords}"

[images.keywords]
morning = "sunrise coffee laptop code"
noon = "python programming"
evening = "night city desk code"

# Local times (HH:MM); prepare must come before publish
[schedule]
enabled = true

[schedule.morning]
prepare = "07:00"
publish = "08:00"

[schedule.noon]
prepare = "11:00"
publish = "12:00"

[schedule.quiz]
prepare = "17:00"
publish = "18:00"

[schedule.evening]
prepare = "19:00"
publish = "20:00"

[policy]
max_text_chars = 4096
forbidden_patterns = []
preview_topic = true
poll_explanation = true
"#
        .to_string()
    }
}

fn parse_offset(value: &str) -> Result<UtcOffset, ConfigError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        trimmed,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| ConfigError::InvalidOffset(value.to_string()))
}

fn parse_time(field: &str, value: &str) -> Result<Time, ConfigError> {
    Time::parse(value.trim(), format_description!("[hour]:[minute]")).map_err(|_| {
        ConfigError::InvalidTime {
            field: field.to_string(),
            value: value.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizcast_domain::usecases::JobKind;
    use time::macros::{offset, time};

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.curriculum.topics.len(), 7);
        assert_eq!(config.timezone_offset().unwrap(), offset!(+5));

        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.entries().len(), 8);
        let quiz_publish = schedule
            .entries()
            .iter()
            .find(|e| e.category == Category::Quiz && e.kind == JobKind::Publish)
            .unwrap();
        assert_eq!(quiz_publish.at, time!(18:00));
    }

    #[test]
    fn test_defaults_are_complete() {
        let config: AppConfig = toml::from_str("").unwrap();

        let curriculum = config.curriculum().unwrap();
        assert!(!curriculum.is_empty());
        assert_eq!(curriculum.linked_categories(), &[Category::Noon, Category::Quiz]);
        assert!(config.schedule().is_ok());
        assert!(matches!(config.operator(), Err(ConfigError::MissingOperator)));
        assert_eq!(config.draft_config().unwrap().images.keywords.len(), 3);
    }

    #[test]
    fn test_schedule_rejects_publish_before_prepare() {
        let config: AppConfig = toml::from_str(
            r#"
            [schedule.noon]
            prepare = "12:30"
            publish = "12:00"
            "#,
        )
        .unwrap();

        let err = config.schedule().unwrap_err().to_string();
        assert!(err.contains("noon"), "{}", err);
    }

    #[test]
    fn test_schedule_rejects_bad_time() {
        let config: AppConfig = toml::from_str(
            r#"
            [schedule.quiz]
            prepare = "5pm"
            publish = "18:00"
            "#,
        )
        .unwrap();

        let err = config.schedule().unwrap_err().to_string();
        assert!(err.contains("schedule.quiz.prepare"), "{}", err);
    }

    #[test]
    fn test_offset_parsing() {
        assert_eq!(parse_offset("UTC").unwrap(), UtcOffset::UTC);
        assert_eq!(parse_offset("-03:30").unwrap(), offset!(-3:30));
        assert!(parse_offset("Asia/Tashkent").is_err());
    }

    #[test]
    fn test_unknown_linked_category() {
        let config: AppConfig = toml::from_str(
            r#"
            [curriculum]
            linked_categories = ["lunch"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.curriculum(),
            Err(ConfigError::UnknownCategory(_, _))
        ));
    }

    #[test]
    fn test_linked_categories_must_match_topic_templates() {
        let config: AppConfig = toml::from_str(
            r#"
            [curriculum]
            linked_categories = ["noon"]
            "#,
        )
        .unwrap();
        let err = config.curriculum().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TopicMismatch {
                category: Category::Quiz,
                ..
            }
        ));
        assert!(err.to_string().contains("prompts.quiz"), "{}", err);

        let config: AppConfig = toml::from_str(
            r#"
            [curriculum]
            linked_categories = ["morning", "noon", "quiz"]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.curriculum(),
            Err(ConfigError::TopicMismatch {
                category: Category::Morning,
                ..
            })
        ));
    }

    #[test]
    fn test_linking_follows_custom_templates() {
        let config: AppConfig = toml::from_str(
            r#"
            [prompts]
            morning = "Start the day with a word about {topic}."

            [curriculum]
            linked_categories = ["morning", "noon", "quiz"]
            "#,
        )
        .unwrap();
        let curriculum = config.curriculum().unwrap();
        assert!(curriculum.is_linked(Category::Morning));
    }

    #[test]
    fn test_blank_channel_is_missing() {
        let mut config = AppConfig::default();
        config.telegram.channel = "  ".to_string();
        assert!(matches!(config.channel(), Err(ConfigError::MissingChannel)));

        config.telegram.channel = "@pydaily".to_string();
        assert_eq!(config.channel().unwrap(), "@pydaily");
    }
}
