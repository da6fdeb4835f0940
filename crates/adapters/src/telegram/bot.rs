//! Interactive bot surface: commands, admin menu and inline callbacks

use std::sync::Arc;

use quizcast_domain::usecases::ContentWorkflow;
use quizcast_domain::{
    AdminAction, BotUser, CallbackCommand, Category, ChatRef, ContentStore, Curriculum, Draft,
    UserRegistry,
};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, UserId};
use teloxide::utils::command::BotCommands;
use time::OffsetDateTime;
use time::macros::format_description;

use super::broadcast::{BROADCAST_PACE, CANCEL_WORD, broadcast, is_cancel};
use super::keyboards::{ADMIN_BUTTON, admin_menu, operator_keyboard};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "register and show the main menu")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "open the admin panel")]
    Admin,
    #[command(description = "prepare a draft: /draft <category>")]
    Draft(String),
    #[command(description = "publish the current draft: /publish <category>")]
    Publish(String),
    #[command(description = "topic cursor and pending drafts")]
    Status,
    #[command(description = "number of registered users")]
    Stats,
    #[command(description = "send your next message to every registered user")]
    Broadcast,
}

/// Per-chat state of the operator conversation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AdminState {
    #[default]
    Idle,
    AwaitingBroadcast,
}

pub type AdminStorage = InMemStorage<AdminState>;
pub type AdminDialogue = Dialogue<AdminState, AdminStorage>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct BotDeps {
    pub workflow: Arc<ContentWorkflow>,
    pub store: Arc<dyn ContentStore>,
    pub users: Arc<dyn UserRegistry>,
    pub curriculum: Arc<Curriculum>,
    pub operator: ChatRef,
}

impl BotDeps {
    fn is_operator(&self, user: Option<UserId>) -> bool {
        is_operator(self.operator, user)
    }
}

/// Whether the sender is the configured operator
pub fn is_operator(operator: ChatRef, user: Option<UserId>) -> bool {
    user.and_then(|id| i64::try_from(id.0).ok()) == Some(operator.0)
}

/// /start is open to everyone; every other command is operator-only
pub fn command_allowed(cmd: &Command, operator: ChatRef, user: Option<UserId>) -> bool {
    *cmd == Command::Start || is_operator(operator, user)
}

/// Chat that receives the result of an admin button press: the chat holding
/// the button, or the presser's private chat when that message is gone
pub fn invoking_chat(message_chat: Option<ChatId>, from: UserId) -> Result<ChatRef, HandlerError> {
    match message_chat {
        Some(chat) => Ok(ChatRef(chat.0)),
        None => Ok(ChatRef(i64::try_from(from.0)?)),
    }
}

fn sender(msg: &Message) -> Option<UserId> {
    msg.from.as_ref().map(|u| u.id)
}

/// Build the dispatcher handler tree; the dispatcher must provide an
/// `Arc<AdminStorage>` dependency
pub fn schema(deps: BotDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(admin_button_handler(deps.clone()))
        .branch(broadcast_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn command_handler(deps: BotDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command, storage: Arc<AdminStorage>| {
            let deps = deps.clone();
            async move { handle_command(bot, msg, cmd, storage, deps).await }
        },
    ))
}

fn broadcast_handler(deps: BotDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .enter_dialogue::<Message, AdminStorage, AdminState>()
        .branch(dptree::case![AdminState::AwaitingBroadcast].endpoint(
            move |bot: Bot, msg: Message, dialogue: AdminDialogue| {
                let deps = deps.clone();
                async move { handle_broadcast(bot, msg, dialogue, deps).await }
            },
        ))
}

fn admin_button_handler(deps: BotDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text() == Some(ADMIN_BUTTON))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if deps.is_operator(sender(&msg)) {
                    send_admin_menu(&bot, msg.chat.id).await?;
                }
                Ok::<(), HandlerError>(())
            }
        })
}

fn callback_handler(deps: BotDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_callback(bot, q, deps).await }
    })
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    storage: Arc<AdminStorage>,
    deps: BotDeps,
) -> Result<(), HandlerError> {
    // Non-operators get no reply at all
    if !command_allowed(&cmd, deps.operator, sender(&msg)) {
        tracing::debug!(chat = msg.chat.id.0, "Ignoring command from non-operator");
        return Ok(());
    }
    tracing::info!(command = ?cmd, chat = msg.chat.id.0, "Received command");

    if cmd == Command::Start {
        return handle_start(&bot, &msg, &deps).await;
    }

    let chat = ChatRef(msg.chat.id.0);
    match cmd {
        Command::Start => {}
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Admin => send_admin_menu(&bot, msg.chat.id).await?,
        Command::Draft(arg) => match parse_category_arg(&arg) {
            Ok(category) => {
                bot.send_message(msg.chat.id, format!("⏳ Preparing the {} draft...", category))
                    .await?;
                spawn_action(&deps, AdminAction::Create, category, chat);
            }
            Err(usage) => {
                bot.send_message(msg.chat.id, usage).await?;
            }
        },
        Command::Publish(arg) => match parse_category_arg(&arg) {
            Ok(category) => spawn_action(&deps, AdminAction::Publish, category, chat),
            Err(usage) => {
                bot.send_message(msg.chat.id, usage).await?;
            }
        },
        Command::Status => {
            let cursor = deps.store.topic_cursor().await?;
            let drafts = deps.store.list_drafts().await?;
            bot.send_message(msg.chat.id, status_text(cursor, &deps.curriculum, &drafts))
                .await?;
        }
        Command::Stats => {
            let users = deps.users.count_users().await?;
            bot.send_message(msg.chat.id, format!("👥 Registered users: {}", users))
                .await?;
        }
        Command::Broadcast => {
            AdminDialogue::new(storage, msg.chat.id)
                .update(AdminState::AwaitingBroadcast)
                .await?;
            bot.send_message(
                msg.chat.id,
                format!(
                    "📢 Send the message to broadcast (text, photo or file). Reply '{}' to abort.",
                    CANCEL_WORD
                ),
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_broadcast(
    bot: Bot,
    msg: Message,
    dialogue: AdminDialogue,
    deps: BotDeps,
) -> Result<(), HandlerError> {
    // Other members of a group chat cannot answer for the operator
    if !deps.is_operator(sender(&msg)) {
        return Ok(());
    }
    dialogue.exit().await?;

    if is_cancel(msg.text()) {
        bot.send_message(msg.chat.id, "Broadcast cancelled.").await?;
        return Ok(());
    }

    let recipients = deps.users.list_user_ids().await?;
    tracing::info!(recipients = recipients.len(), "Starting broadcast");
    let status = bot
        .send_message(
            msg.chat.id,
            format!("📢 Sending to {} users...", recipients.len()),
        )
        .await?;

    let report = broadcast(&recipients, BROADCAST_PACE, |user_id| {
        let request = bot.copy_message(ChatId(user_id), msg.chat.id, msg.id);
        async move { request.await.map(|_| ()) }
    })
    .await;

    bot.edit_message_text(msg.chat.id, status.id, report.summary())
        .await?;
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, deps: BotDeps) -> Result<(), HandlerError> {
    let answer = if !deps.is_operator(Some(q.from.id)) {
        None
    } else {
        match q.data.as_deref().and_then(CallbackCommand::parse) {
            Some(command) => {
                tracing::info!(data = %command.to_data(), "Admin callback");
                let chat = q.message.as_ref().map(|m| m.chat().id);
                let recipient = invoking_chat(chat, q.from.id)?;
                spawn_action(&deps, command.action, command.category, recipient);
                Some(callback_answer(&command))
            }
            None => {
                tracing::warn!(data = ?q.data, "Unknown callback data");
                Some("Unknown action".to_string())
            }
        }
    };

    // Always answer so the client stops its loading indicator
    let mut request = bot.answer_callback_query(q.id.clone());
    if let Some(text) = answer {
        request = request.text(text);
    }
    request.await?;
    Ok(())
}

async fn handle_start(bot: &Bot, msg: &Message, deps: &BotDeps) -> Result<(), HandlerError> {
    if let Some(user) = msg.from.as_ref() {
        let record = BotUser {
            user_id: i64::try_from(user.id.0)?,
            username: user.username.clone(),
            joined_at: OffsetDateTime::now_utc(),
        };
        match deps.users.register_user(&record).await {
            Ok(true) => tracing::info!(user_id = record.user_id, "Registered new user"),
            Ok(false) => {}
            Err(e) => tracing::error!(user_id = record.user_id, error = %e, "Failed to register user"),
        }
    }

    let greeting = "👋 Welcome! This bot runs a daily Python learning channel.";
    if deps.is_operator(sender(&msg)) {
        bot.send_message(msg.chat.id, format!("{}\n\nUse the Admin button to manage drafts.", greeting))
            .reply_markup(operator_keyboard())
            .await?;
    } else {
        bot.send_message(msg.chat.id, greeting).await?;
    }
    Ok(())
}

async fn send_admin_menu(bot: &Bot, chat: ChatId) -> Result<(), HandlerError> {
    bot.send_message(chat, "⚙️ Admin panel: create a draft or publish the current one.")
        .reply_markup(admin_menu())
        .await?;
    Ok(())
}

/// Run a workflow action in the background; results reach the operator
/// through the notifier
fn spawn_action(deps: &BotDeps, action: AdminAction, category: Category, recipient: ChatRef) {
    let workflow = Arc::clone(&deps.workflow);
    tokio::spawn(async move {
        match action {
            AdminAction::Create => {
                workflow.prepare(category, recipient).await;
            }
            AdminAction::Regen => {
                workflow.regenerate(category, recipient).await;
            }
            AdminAction::Publish => {
                workflow.publish(category).await;
            }
        }
    });
}

fn callback_answer(command: &CallbackCommand) -> String {
    match command.action {
        AdminAction::Create => format!("Preparing {}...", command.category),
        AdminAction::Regen => format!("Regenerating {}...", command.category),
        AdminAction::Publish => format!("Publishing {}...", command.category),
    }
}

/// Parse the category argument of /draft and /publish
pub fn parse_category_arg(arg: &str) -> Result<Category, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err("Usage: /draft <category> or /publish <category>, where category is morning, noon, evening or quiz".to_string());
    }
    arg.parse().map_err(|e: quizcast_domain::UnknownCategory| e.to_string())
}

/// Operator status report
pub fn status_text(cursor: u64, curriculum: &Curriculum, drafts: &[Draft]) -> String {
    let mut text = String::from("📊 Status\n\n");

    match (curriculum.position(cursor), curriculum.topic_at(cursor)) {
        (Some(position), Some(topic)) => text.push_str(&format!(
            "Topic cursor: {} (topic {}/{}: {})\n",
            cursor,
            position + 1,
            curriculum.len(),
            topic
        )),
        _ => text.push_str(&format!("Topic cursor: {} (curriculum is empty)\n", cursor)),
    }

    text.push_str("\nDrafts:\n");
    let format = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    for category in Category::ALL {
        match drafts.iter().find(|d| d.category == category) {
            Some(draft) => {
                let created = draft
                    .created_at
                    .to_offset(time::UtcOffset::UTC)
                    .format(&format)
                    .unwrap_or_else(|_| draft.created_at.to_string());
                let topic = draft
                    .topic
                    .as_deref()
                    .map(|t| format!(", topic: {}", t))
                    .unwrap_or_default();
                text.push_str(&format!("• {}: ready since {}{}\n", category, created, topic));
            }
            None => text.push_str(&format!("• {}: none\n", category)),
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizcast_domain::{DraftContent, TextPost};
    use time::macros::datetime;

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            Command::parse("/draft quiz", "quizcast_bot").unwrap(),
            Command::Draft("quiz".to_string())
        );
        assert_eq!(Command::parse("/status", "quizcast_bot").unwrap(), Command::Status);
    }

    #[test]
    fn test_parse_category_arg() {
        assert_eq!(parse_category_arg(" Noon ").unwrap(), Category::Noon);
        assert!(parse_category_arg("").unwrap_err().starts_with("Usage"));
        assert!(parse_category_arg("lunch").unwrap_err().contains("Unknown category"));
    }

    #[test]
    fn test_status_text() {
        let curriculum = Curriculum::new(
            vec!["Variables".to_string(), "Loops".to_string(), "Functions".to_string()],
            vec![Category::Noon, Category::Quiz],
        );
        let draft = Draft::new(
            Category::Noon,
            DraftContent::Text(TextPost {
                text: "Loops lesson".to_string(),
                image_url: None,
            }),
            Some("Loops".to_string()),
            datetime!(2026-03-02 12:00 +5),
        )
        .unwrap();

        let text = status_text(4, &curriculum, &[draft]);

        assert!(text.contains("Topic cursor: 4 (topic 2/3: Loops)"));
        assert!(text.contains("• noon: ready since 2026-03-02 07:00 UTC, topic: Loops"));
        assert!(text.contains("• quiz: none"));
    }

    #[test]
    fn test_status_text_empty_curriculum() {
        let text = status_text(0, &Curriculum::new(vec![], vec![]), &[]);
        assert!(text.contains("curriculum is empty"));
    }

    const OPERATOR: ChatRef = ChatRef(4242);

    #[test]
    fn test_operator_matches_configured_id() {
        assert!(is_operator(OPERATOR, Some(UserId(4242))));
        assert!(!is_operator(OPERATOR, Some(UserId(4243))));
        assert!(!is_operator(OPERATOR, None));
    }

    #[test]
    fn test_admin_commands_are_operator_only() {
        let admin_commands = [
            Command::Help,
            Command::Admin,
            Command::Draft("quiz".to_string()),
            Command::Publish("noon".to_string()),
            Command::Status,
            Command::Stats,
            Command::Broadcast,
        ];
        for cmd in &admin_commands {
            assert!(command_allowed(cmd, OPERATOR, Some(UserId(4242))), "{:?}", cmd);
            assert!(!command_allowed(cmd, OPERATOR, Some(UserId(7))), "{:?}", cmd);
            assert!(!command_allowed(cmd, OPERATOR, None), "{:?}", cmd);
        }
    }

    #[test]
    fn test_start_is_open_to_everyone() {
        assert!(command_allowed(&Command::Start, OPERATOR, Some(UserId(7))));
        assert!(command_allowed(&Command::Start, OPERATOR, None));
    }

    #[test]
    fn test_callback_result_goes_to_invoking_chat() {
        let group = ChatId(-100_123);
        assert_eq!(
            invoking_chat(Some(group), UserId(4242)).unwrap(),
            ChatRef(-100_123)
        );
        assert_eq!(invoking_chat(None, UserId(4242)).unwrap(), ChatRef(4242));
    }

    #[test]
    fn test_broadcast_command_parses() {
        assert_eq!(
            Command::parse("/broadcast", "quizcast_bot").unwrap(),
            Command::Broadcast
        );
        assert_eq!(AdminState::default(), AdminState::Idle);
    }

    #[test]
    fn test_callback_answer() {
        let command = CallbackCommand::new(AdminAction::Regen, Category::Quiz);
        assert_eq!(callback_answer(&command), "Regenerating quiz...");
    }
}
