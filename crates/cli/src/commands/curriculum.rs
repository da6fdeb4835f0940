//! Curriculum command - show topics and the cursor position

use anyhow::{Context, Result};
use quizcast_adapters::store::SqliteContentStore;
use quizcast_domain::ContentStore;
use std::path::PathBuf;

use crate::args::{CurriculumArgs, CurriculumCommands};
use crate::config::AppConfig;

pub async fn execute(args: CurriculumArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    match args.command {
        CurriculumCommands::List { json } => list(&config, json).await,
    }
}

async fn list(config: &AppConfig, json: bool) -> Result<()> {
    let curriculum = config.curriculum()?;
    let store = SqliteContentStore::new(&config.general.state_db_path)
        .await
        .context("Failed to initialize SQLite state store")?;
    let cursor = store.topic_cursor().await?;
    let current = curriculum.position(cursor);

    if json {
        let output = serde_json::json!({
            "cursor": cursor,
            "current": current,
            "linked_categories": curriculum.linked_categories(),
            "topics": curriculum.topics(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if curriculum.is_empty() {
        println!("No topics configured.");
        return Ok(());
    }

    let linked: Vec<_> = curriculum
        .linked_categories()
        .iter()
        .map(|c| c.as_str())
        .collect();
    println!("Curriculum ({} topics, cursor {})", curriculum.len(), cursor);
    println!("Linked categories: {}", linked.join(", "));
    println!();

    for (index, topic) in curriculum.topics().iter().enumerate() {
        let marker = if Some(index) == current { "→" } else { " " };
        println!("{} {:>3}. {}", marker, index + 1, topic);
    }

    Ok(())
}
