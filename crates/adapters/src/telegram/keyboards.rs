//! Inline and reply keyboards shown to the operator

use quizcast_domain::{AdminAction, CallbackCommand, Category};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

/// Text of the reply-keyboard button that opens the admin menu
pub const ADMIN_BUTTON: &str = "⚙️ Admin";

fn action_label(command: &CallbackCommand) -> String {
    match command.action {
        AdminAction::Create => format!("📝 Create {}", command.category),
        AdminAction::Regen => "🔄 Regenerate".to_string(),
        AdminAction::Publish => "🚀 Publish now".to_string(),
    }
}

fn button(command: CallbackCommand) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(action_label(&command), command.to_data())
}

/// Controls attached to a draft preview
pub fn draft_actions(actions: &[CallbackCommand]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![actions.iter().copied().map(button).collect::<Vec<_>>()])
}

/// One row per category: create a draft, publish the current one
pub fn admin_menu() -> InlineKeyboardMarkup {
    let rows = Category::ALL.iter().map(|category| {
        vec![
            button(CallbackCommand::new(AdminAction::Create, *category)),
            InlineKeyboardButton::callback(
                format!("🚀 Publish {}", category),
                CallbackCommand::new(AdminAction::Publish, *category).to_data(),
            ),
        ]
    });
    InlineKeyboardMarkup::new(rows)
}

/// Persistent reply keyboard for the operator
pub fn operator_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(ADMIN_BUTTON)]]).resize_keyboard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        other => panic!("unexpected button kind {:?}", other),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_draft_actions_single_row() {
        let markup = draft_actions(&[
            CallbackCommand::new(AdminAction::Regen, Category::Quiz),
            CallbackCommand::new(AdminAction::Publish, Category::Quiz),
        ]);
        assert_eq!(
            callback_data(&markup),
            vec![vec!["regen_quiz".to_string(), "publish_quiz".to_string()]]
        );
    }

    #[test]
    fn test_admin_menu_covers_every_category() {
        let data = callback_data(&admin_menu());
        assert_eq!(data.len(), Category::ALL.len());
        assert_eq!(data[0], vec!["create_morning", "publish_morning"]);
        assert_eq!(data[3], vec!["create_quiz", "publish_quiz"]);
        for row in data.iter().flatten() {
            assert!(CallbackCommand::parse(row).is_some());
        }
    }
}
