//! Config command - write a starter configuration

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    write_example(&path, force).await?;

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set telegram.operator_id and telegram.channel");
    println!("  2. Export TELEGRAM_BOT_TOKEN and GEMINI_API_KEY");
    println!("  3. Run 'quizcast doctor' to validate your setup");
    println!("  4. Run 'quizcast draft prepare noon --dry-run' to try a draft");

    Ok(())
}

async fn write_example(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(path, AppConfig::example_toml())
        .await
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_example_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_example(&path, false).await.unwrap();
        let err = write_example(&path, false).await.unwrap_err();
        assert!(err.to_string().contains("--force"));

        write_example(&path, true).await.unwrap();
        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.telegram.bot_token_env, "TELEGRAM_BOT_TOKEN");
    }
}
