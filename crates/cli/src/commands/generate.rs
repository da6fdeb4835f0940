//! Generate command - one-shot content generation

use anyhow::{Context, Result, bail};
use quizcast_adapters::llm::{GeminiGenerator, StubGenerator};
use quizcast_adapters::store::SqliteContentStore;
use quizcast_domain::usecases::render::format_quiz_summary;
use quizcast_domain::{Category, ContentGenerator, ContentStore, GenerateRequest, GeneratedContent};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::GenerateArgs;
use crate::config::AppConfig;

pub async fn execute(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let category: Category = args.category.parse()?;
    let curriculum = config.curriculum()?;

    let topic = match args.topic {
        Some(topic) => Some(topic),
        None if curriculum.is_linked(category) => {
            let store = SqliteContentStore::new(&config.general.state_db_path)
                .await
                .context("Failed to open state database")?;
            let cursor = store.topic_cursor().await?;
            let Some(topic) = curriculum.topic_at(cursor) else {
                bail!("The curriculum has no topics; pass --topic");
            };
            Some(topic.to_string())
        }
        None => None,
    };

    tracing::info!(category = %category, topic = ?topic, "Generating content");

    let generator = build_generator(&config)?;
    let request = GenerateRequest { category, topic };
    let content = generator
        .generate(&request)
        .await
        .context("Generation failed")?;

    if args.json {
        let output = serde_json::json!({
            "category": category,
            "topic": request.topic,
            "content": content,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Category: {}", category);
        if let Some(topic) = &request.topic {
            println!("Topic: {}", topic);
        }
        println!();
        match &content {
            GeneratedContent::Text { text } => println!("{}", text),
            GeneratedContent::Quiz(quiz) => println!("{}", format_quiz_summary(quiz)),
        }
    }

    Ok(())
}

pub(crate) fn build_generator(config: &AppConfig) -> Result<Arc<dyn ContentGenerator>> {
    let prompts = config.prompts.clone();

    match config.llm.provider.as_str() {
        "gemini" => {
            let api_key = load_secret(&config.llm.gemini.api_key_env, "gemini")?;
            let generator = GeminiGenerator::new(api_key, config.adapter_llm_config(), prompts)
                .context("Failed to configure Gemini provider")?;
            let base_url = config.llm.gemini.base_url.trim();
            if base_url.is_empty() {
                Ok(Arc::new(generator))
            } else {
                Ok(Arc::new(generator.with_base_url(base_url)))
            }
        }
        "stub" => Ok(Arc::new(StubGenerator::new(prompts))),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

/// Read a secret from the environment variable named in the config
pub(crate) fn load_secret(env_var: &str, purpose: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No env var configured for {}", purpose);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} for {}", env_var, purpose))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty for {}", env_var, purpose);
    }

    Ok(SecretString::new(value.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_generator_stub() {
        let mut config = AppConfig::default();
        config.llm.provider = "stub".to_string();
        assert!(build_generator(&config).is_ok());
    }

    #[test]
    fn test_build_generator_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "openai".to_string();
        let err = build_generator(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_load_secret_missing() {
        let err = load_secret("QUIZCAST_TEST_SURELY_UNSET_VAR", "gemini").unwrap_err();
        assert!(err.to_string().contains("QUIZCAST_TEST_SURELY_UNSET_VAR"));
    }

    #[tokio::test]
    async fn test_stub_generates_quiz() {
        let mut config = AppConfig::default();
        config.llm.provider = "stub".to_string();
        let generator = build_generator(&config).unwrap();

        let content = generator
            .generate(&GenerateRequest {
                category: Category::Quiz,
                topic: Some("Dictionaries".to_string()),
            })
            .await
            .unwrap();

        assert!(matches!(content, GeneratedContent::Quiz(_)));
    }
}
