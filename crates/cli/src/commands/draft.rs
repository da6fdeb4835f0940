//! Draft command - inspect, prepare and publish drafts from the shell

use anyhow::{Context, Result, bail};
use quizcast_adapters::{
    llm::StubGenerator,
    outbox::{OutboxNotifier, OutboxPublisher, OutboxWriter},
    store::SqliteContentStore,
    telegram::{TelegramNotifier, TelegramPublisher, parse_channel},
};
use quizcast_domain::usecases::render::format_quiz_summary;
use quizcast_domain::{
    Category, ChatRef, ContentStore, Draft, DraftContent, OperatorNotifier, PrepareOutcome,
    PublishOutcome, Publisher,
};
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::Bot;

use crate::args::{DraftArgs, DraftCommands};
use crate::commands::generate::{build_generator, load_secret};
use crate::commands::run::{build_workflow, default_outbox_path};
use crate::config::AppConfig;

pub async fn execute(args: DraftArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    match args.command {
        DraftCommands::Show { category, json } => show(&config, category.as_deref(), json).await,
        DraftCommands::Prepare {
            category,
            dry_run,
            outbox,
        } => prepare(&config, &category, dry_run, outbox).await,
        DraftCommands::Publish {
            category,
            dry_run,
            outbox,
        } => publish(&config, &category, dry_run, outbox).await,
    }
}

async fn open_store(config: &AppConfig) -> Result<Arc<SqliteContentStore>> {
    let store = SqliteContentStore::new(&config.general.state_db_path)
        .await
        .context("Failed to initialize SQLite state store")?;
    Ok(Arc::new(store))
}

async fn show(config: &AppConfig, category: Option<&str>, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let drafts = match category {
        Some(name) => {
            let category: Category = name.parse()?;
            store.get_draft(category).await?.into_iter().collect()
        }
        None => store.list_drafts().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!("No drafts stored.");
        return Ok(());
    }

    for draft in &drafts {
        print_draft(draft);
        println!();
    }
    Ok(())
}

fn print_draft(draft: &Draft) {
    println!("[{}] {} ({})", draft.category, draft.id, draft.created_at);
    if let Some(topic) = &draft.topic {
        println!("Topic: {}", topic);
    }
    match &draft.content {
        DraftContent::Text(post) => {
            if let Some(url) = &post.image_url {
                println!("Image: {}", url);
            }
            println!("{}", post.text);
        }
        DraftContent::Quiz(quiz) => println!("{}", format_quiz_summary(quiz)),
    }
}

/// Publisher and notifier for shell-driven runs
struct Delivery {
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn OperatorNotifier>,
    operator: ChatRef,
}

async fn build_delivery(
    config: &AppConfig,
    dry_run: bool,
    outbox: Option<PathBuf>,
) -> Result<Delivery> {
    if dry_run || config.general.dry_run {
        let path = outbox.unwrap_or_else(default_outbox_path);
        let writer = OutboxWriter::new(path.clone())
            .await
            .context("Failed to initialize outbox writer")?;
        tracing::info!(outbox = %path.display(), "Writing to outbox");

        return Ok(Delivery {
            publisher: Arc::new(OutboxPublisher::new(
                writer.clone(),
                config.telegram.channel.clone(),
            )),
            notifier: Arc::new(OutboxNotifier::new(writer)),
            operator: config.operator().unwrap_or(ChatRef(0)),
        });
    }

    if outbox.is_some() {
        tracing::warn!("--outbox is ignored without --dry-run");
    }

    let token = load_secret(&config.telegram.bot_token_env, "telegram")?;
    let bot = Bot::new(token.expose_secret());
    let channel = parse_channel(config.channel()?)?;

    Ok(Delivery {
        publisher: Arc::new(TelegramPublisher::new(bot.clone(), channel)),
        notifier: Arc::new(TelegramNotifier::new(bot)),
        operator: config.operator()?,
    })
}

async fn prepare(
    config: &AppConfig,
    category: &str,
    dry_run: bool,
    outbox: Option<PathBuf>,
) -> Result<()> {
    let category: Category = category.parse()?;
    let delivery = build_delivery(config, dry_run, outbox).await?;
    let store = open_store(config).await?;

    let workflow = build_workflow(
        config,
        build_generator(config)?,
        store,
        delivery.publisher,
        delivery.notifier,
        Arc::new(config.curriculum()?),
        delivery.operator,
    )?;

    match workflow.prepare(category, delivery.operator).await {
        PrepareOutcome::Prepared {
            topic,
            draft_id,
            previewed,
            ..
        } => {
            println!("Prepared {} draft {}", category, draft_id);
            if let Some(topic) = topic {
                println!("Topic: {}", topic);
            }
            if !previewed {
                println!("Preview could not be delivered");
            }
            Ok(())
        }
        PrepareOutcome::GenerationFailed { error } => {
            bail!("Generation failed for {}: {}", category, error)
        }
        PrepareOutcome::StoreUnavailable { error } => {
            bail!("Could not store the {} draft: {}", category, error)
        }
    }
}

async fn publish(
    config: &AppConfig,
    category: &str,
    dry_run: bool,
    outbox: Option<PathBuf>,
) -> Result<()> {
    let category: Category = category.parse()?;
    let delivery = build_delivery(config, dry_run, outbox).await?;
    let store = open_store(config).await?;

    // Publishing never generates, so no provider credentials are needed
    let workflow = build_workflow(
        config,
        Arc::new(StubGenerator::default()),
        store,
        delivery.publisher,
        delivery.notifier,
        Arc::new(config.curriculum()?),
        delivery.operator,
    )?;

    match workflow.publish(category).await {
        PublishOutcome::Published {
            message_id, cursor, ..
        } => {
            println!("Published {} as message {}", category, message_id);
            if let Some(cursor) = cursor {
                println!("Topic cursor advanced to {}", cursor);
            }
            Ok(())
        }
        PublishOutcome::MissingDraft => bail!("No {} draft to publish", category),
        PublishOutcome::DeliveryFailed { error } => {
            bail!("Delivery failed for {}: {}", category, error)
        }
        PublishOutcome::StoreUnavailable { error } => {
            bail!("Could not read the {} draft: {}", category, error)
        }
    }
}
