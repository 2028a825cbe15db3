//! Bot initialization and the command surface
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Telegram-side command registration

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::flow::Trigger;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "الأوامر المتاحة:")]
pub enum Command {
    #[command(description = "التسجيل والقائمة الرئيسية")]
    Start,
    #[command(description = "بيع الكوينز")]
    Sell,
    #[command(description = "ملفك الشخصي")]
    Profile,
    #[command(description = "مسح الملف الشخصي نهائياً")]
    Delete,
    #[command(description = "إلغاء العملية الحالية")]
    Cancel,
    #[command(description = "المساعدة")]
    Help,
    #[command(description = "لوحة الإدارة (للمشرفين فقط)")]
    Admin,
}

impl Command {
    /// Every command maps onto one decoded trigger; the flow layer never
    /// sees the teloxide type.
    pub fn into_trigger(self) -> Trigger {
        match self {
            Command::Start => Trigger::Start,
            Command::Sell => Trigger::Sell,
            Command::Profile => Trigger::Profile,
            Command::Delete => Trigger::Delete,
            Command::Cancel => Trigger::Cancel,
            Command::Help => Trigger::Help,
            Command::Admin => Trigger::Admin,
        }
    }
}

/// Creates a Bot instance from the configured token.
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.as_str();
    if token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }
    Ok(Bot::new(token))
}

/// Sets up bot commands in the Telegram UI. The /admin command is left
/// unlisted on purpose — it still works, it is just not advertised.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "التسجيل والقائمة الرئيسية"),
        BotCommand::new("sell", "بيع الكوينز"),
        BotCommand::new("profile", "ملفك الشخصي"),
        BotCommand::new("delete", "مسح الملف الشخصي نهائياً"),
        BotCommand::new("cancel", "إلغاء العملية الحالية"),
        BotCommand::new("help", "المساعدة"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions_present() {
        let commands = Command::descriptions();
        let command_list = format!("{}", commands);

        assert!(command_list.contains("start"));
        assert!(command_list.contains("sell"));
        assert!(command_list.contains("cancel"));
    }

    #[test]
    fn test_every_command_maps_to_a_trigger() {
        assert_eq!(Command::Start.into_trigger(), Trigger::Start);
        assert_eq!(Command::Sell.into_trigger(), Trigger::Sell);
        assert_eq!(Command::Admin.into_trigger(), Trigger::Admin);
    }
}
