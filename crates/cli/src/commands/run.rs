//! Run command - bot dispatcher plus the daily draft/publish schedule

use anyhow::{Context, Result};
use quizcast_adapters::{
    outbox::{OutboxPublisher, OutboxWriter},
    store::SqliteContentStore,
    telegram::{
        TelegramNotifier, TelegramPublisher,
        bot::{AdminStorage, BotDeps, Command, schema},
        parse_channel,
    },
};
use quizcast_domain::{
    ChatRef, ContentGenerator, ContentStore, Curriculum, OperatorNotifier, Publisher, SystemClock,
    UserRegistry,
    usecases::{ContentWorkflow, DraftPipeline, PublishPipeline, Scheduler},
};
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::args::RunArgs;
use crate::commands::generate::{build_generator, load_secret};
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;
    let outbox_path = dry_run.then(|| args.outbox.clone().unwrap_or_else(default_outbox_path));

    if args.outbox.is_some() && !dry_run {
        tracing::warn!("--outbox is ignored without --dry-run");
    }

    let operator = config.operator()?;
    let curriculum = Arc::new(config.curriculum()?);
    let schedule = config.schedule()?;

    tracing::info!(
        dry_run = dry_run,
        outbox = ?outbox_path,
        operator = %operator,
        topics = curriculum.len(),
        timezone = %schedule.offset(),
        "Starting quizcast"
    );

    if curriculum.is_empty() {
        tracing::warn!("Curriculum is empty; linked categories will fail to draft");
    }

    let token = load_secret(&config.telegram.bot_token_env, "telegram")?;
    let bot = Bot::new(token.expose_secret());

    let store = Arc::new(
        SqliteContentStore::new(&config.general.state_db_path)
            .await
            .context("Failed to initialize SQLite state store")?,
    );
    let generator = build_generator(&config)?;

    let publisher: Arc<dyn Publisher> = match outbox_path {
        Some(path) => {
            let writer = OutboxWriter::new(path.clone())
                .await
                .context("Failed to initialize outbox writer")?;
            tracing::info!(outbox = %path.display(), "Writing channel posts to outbox");
            Arc::new(OutboxPublisher::new(writer, config.telegram.channel.clone()))
        }
        None => {
            let channel = parse_channel(config.channel()?)?;
            Arc::new(TelegramPublisher::new(bot.clone(), channel))
        }
    };
    let notifier: Arc<dyn OperatorNotifier> = Arc::new(TelegramNotifier::new(bot.clone()));

    let workflow = build_workflow(
        &config,
        generator,
        store.clone(),
        publisher,
        notifier,
        curriculum.clone(),
        operator,
    )?;

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    let scheduler = if args.no_schedule || !config.schedule.enabled {
        tracing::info!("Schedule disabled; serving operator commands only");
        None
    } else {
        let runner = workflow.clone();
        Some(Scheduler::new(schedule, runner, Arc::new(SystemClock)).start())
    };

    let users: Arc<dyn UserRegistry> = store.clone();
    let content_store: Arc<dyn ContentStore> = store;
    let deps = BotDeps {
        workflow,
        store: content_store,
        users,
        curriculum,
        operator,
    };

    let mut dispatcher = Dispatcher::builder(bot, schema(deps))
        .dependencies(dptree::deps![AdminStorage::new()])
        .default_handler(|update| async move {
            tracing::trace!(update = ?update.id, "Unhandled update");
        })
        .build();

    // Set up graceful shutdown
    let shutdown_token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                if let Ok(done) = shutdown_token.shutdown() {
                    done.await;
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    dispatcher.dispatch().await;
    tracing::info!("Dispatcher stopped");

    if let Some(handle) = scheduler {
        handle.stop().await;
    }

    tracing::info!("quizcast run completed");
    Ok(())
}

/// Wire the draft and publish pipelines behind one per-category workflow
pub(crate) fn build_workflow(
    config: &AppConfig,
    generator: Arc<dyn ContentGenerator>,
    store: Arc<dyn ContentStore>,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn OperatorNotifier>,
    curriculum: Arc<Curriculum>,
    operator: ChatRef,
) -> Result<Arc<ContentWorkflow>> {
    let drafts = DraftPipeline::new(
        generator,
        store.clone(),
        notifier.clone(),
        Arc::new(SystemClock),
        curriculum.clone(),
        config.draft_config()?,
    );
    let publishing = PublishPipeline::new(
        store,
        publisher,
        notifier,
        curriculum,
        config.render_config(),
        operator,
    );

    Ok(Arc::new(ContentWorkflow::new(drafts, publishing, operator)))
}

pub(crate) fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}
