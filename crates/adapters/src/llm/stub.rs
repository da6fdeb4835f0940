//! Stub generator for testing and offline mode

use async_trait::async_trait;
use quizcast_domain::{ContentGenerator, GenerateError, GenerateRequest, GeneratedContent, QuizPost};

use super::PromptSet;

/// Stub generator that returns deterministic canned content
pub struct StubGenerator {
    prompts: PromptSet,
    error: Option<GenerateError>,
}

impl StubGenerator {
    pub fn new(prompts: PromptSet) -> Self {
        Self {
            prompts,
            error: None,
        }
    }

    /// Create a stub that always returns an error
    pub fn with_error(error: GenerateError) -> Self {
        Self {
            prompts: PromptSet::default(),
            error: Some(error),
        }
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new(PromptSet::default())
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedContent, GenerateError> {
        if let Some(ref error) = self.error {
            return Err(match error {
                GenerateError::Api(msg) => GenerateError::Api(msg.clone()),
                GenerateError::InvalidFormat(msg) => GenerateError::InvalidFormat(msg.clone()),
                GenerateError::RateLimited => GenerateError::RateLimited,
                GenerateError::Timeout => GenerateError::Timeout,
                GenerateError::MissingTopic(category) => GenerateError::MissingTopic(*category),
                GenerateError::Config(msg) => GenerateError::Config(msg.clone()),
            });
        }

        // Same topic rules as a real provider
        self.prompts.build_prompt(request)?;
        let topic = request
            .topic
            .as_deref()
            .filter(|_| self.prompts.needs_topic(request.category));

        if request.category.is_quiz() {
            let subject = topic.unwrap_or("Python");
            return Ok(GeneratedContent::Quiz(QuizPost {
                question: format!("[stub] Which statement about {} is correct?", subject),
                options: [
                    "It cannot be used in functions".to_string(),
                    format!("{} is part of everyday Python", subject),
                    "It only works in Python 2".to_string(),
                    "It needs a third-party library".to_string(),
                ],
                correct_index: 1,
                explanation: format!("[stub] {} is covered in the basics.", subject),
            }));
        }

        let text = match topic {
            Some(topic) => format!("[stub] {} post about {}", request.category, topic),
            None => format!("[stub] {} post", request.category),
        };
        Ok(GeneratedContent::Text { text })
    }
}
