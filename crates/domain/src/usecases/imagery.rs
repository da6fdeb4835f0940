//! Illustrative image links synthesized from category keywords

use std::collections::HashMap;

use url::form_urlencoded;

use crate::model::Category;

/// Image linker configuration
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub enabled: bool,
    /// URL with a `{keywords}` placeholder
    pub url_template: String,
    /// Keyword string per category
    pub keywords: HashMap<Category, String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        let keywords = [
            (Category::Morning, "sunrise coffee laptop code"),
            (Category::Noon, "python programming"),
            (Category::Evening, "night city desk code"),
        ]
        .into_iter()
        .map(|(category, words)| (category, words.to_string()))
        .collect();

        Self {
            enabled: false,
            url_template: "https://image.pollinations.ai/prompt/{keywords}".to_string(),
            keywords,
        }
    }
}

/// Builds image URLs without touching the network; the messaging
/// platform fetches them lazily
#[derive(Debug, Clone, Default)]
pub struct ImageLinker {
    config: ImageConfig,
}

impl ImageLinker {
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    pub fn link(&self, category: Category, topic: Option<&str>) -> Option<String> {
        if !self.config.enabled || category.is_quiz() {
            return None;
        }

        let base = self.config.keywords.get(&category)?.trim();
        let keywords = match topic.map(str::trim).filter(|t| !t.is_empty()) {
            Some(topic) if base.is_empty() => topic.to_string(),
            Some(topic) => format!("{} {}", base, topic),
            None if base.is_empty() => return None,
            None => base.to_string(),
        };

        let encoded: String = form_urlencoded::byte_serialize(keywords.as_bytes()).collect();
        Some(self.config.url_template.replace("{keywords}", &encoded))
    }
}
