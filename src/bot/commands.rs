use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::util::cover_list_keyboard;
use super::AppState;
use crate::config::DEFAULT_COVER_NAME;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum BotCommand {
    #[command(description = "Welcome & quick start")]
    Start,
    #[command(description = "Show all commands")]
    Help,
    #[command(description = "Save the replied-to photo as a cover")]
    Save(String),
    #[command(description = "List saved covers")]
    List,
    #[command(description = "Show usage statistics")]
    Stats,
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    state: AppState,
) -> anyhow::Result<()> {
    match cmd {
        BotCommand::Start => handle_start(bot, msg, state).await,
        BotCommand::Help => handle_help(bot, msg, state).await,
        BotCommand::Save(name) => handle_save(bot, msg, state, &name).await,
        BotCommand::List => handle_list(bot, msg, state).await,
        BotCommand::Stats => handle_stats(bot, msg, state).await,
    }
}

async fn register_sender(msg: &Message, state: &AppState) -> anyhow::Result<()> {
    if let Some(user) = msg.from.as_ref() {
        state
            .store
            .lock()
            .await
            .register_user(user.id, &user.full_name())
            .await?;
    }
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message, state: AppState) -> anyhow::Result<()> {
    register_sender(&msg, &state).await?;

    bot.send_message(
        msg.chat.id,
        "Welcome to Coverbot!\n\n\
        Send me a video and I'll help you change its cover image, \
        extract its metadata, or pull out its embedded cover.\n\
        Send me a photo to save it as a reusable cover or re-host it.\n\n\
        Type /help for all commands.",
    )
    .await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message, state: AppState) -> anyhow::Result<()> {
    register_sender(&msg, &state).await?;

    bot.send_message(
        msg.chat.id,
        "\u{1f4d6} Coverbot Commands\n\n\
        \u{1f4be} Covers:\n\
        /save [name] - Reply to a photo to save it as a cover\n\
        /list - List saved covers\n\n\
        \u{1f4ca} Info:\n\
        /stats - Show usage statistics\n\
        /help - Show this message\n\n\
        \u{1f4a1} Tips:\n\
        \u{2022} Send a video \u{2192} cover & metadata menu\n\
        \u{2022} Send a photo \u{2192} save or re-host menu\n\
        \u{2022} /save without a name stores the default cover",
    )
    .await?;
    Ok(())
}

async fn handle_save(
    bot: Bot,
    msg: Message,
    state: AppState,
    arg: &str,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    let photo = msg
        .reply_to_message()
        .and_then(|m| m.photo())
        .and_then(|p| p.last());

    let Some(photo) = photo else {
        bot.send_message(
            msg.chat.id,
            "Usage: reply to a photo with /save [name]\n\
            Without a name the photo becomes your default cover.",
        )
        .await?;
        return Ok(());
    };

    let name = arg
        .split_whitespace()
        .next()
        .unwrap_or(DEFAULT_COVER_NAME);

    state
        .store
        .lock()
        .await
        .put_cover(user.id, name, photo.file.id.clone())
        .await?;

    bot.send_message(msg.chat.id, format!("Saved cover \"{name}\"."))
        .await?;
    Ok(())
}

async fn handle_list(bot: Bot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    let covers = state.store.lock().await.covers(user.id).await;

    if covers.is_empty() {
        bot.send_message(msg.chat.id, "No saved covers yet. Reply to a photo with /save.")
            .await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        format!("\u{1f4be} Saved covers ({}):", covers.len()),
    )
    .reply_markup(cover_list_keyboard(&covers))
    .await?;
    Ok(())
}

async fn handle_stats(bot: Bot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    let counters = state.store.lock().await.counters(user.id).await;

    bot.send_message(
        msg.chat.id,
        format!(
            "\u{1f4ca} Your stats:\n\
            - Videos processed: {}\n\
            - Covers changed: {}",
            counters.videos, counters.covers_changed,
        ),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save_with_name() {
        let cmd = BotCommand::parse("/save sunset", "coverbot").unwrap();
        assert!(matches!(cmd, BotCommand::Save(name) if name == "sunset"));
    }

    #[test]
    fn test_parse_save_without_name() {
        let cmd = BotCommand::parse("/save", "coverbot").unwrap();
        assert!(matches!(cmd, BotCommand::Save(name) if name.is_empty()));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(BotCommand::parse("/frobnicate", "coverbot").is_err());
        assert!(BotCommand::parse("plain text", "coverbot").is_err());
    }

    #[test]
    fn test_parse_with_bot_mention() {
        let cmd = BotCommand::parse("/stats@coverbot", "coverbot").unwrap();
        assert!(matches!(cmd, BotCommand::Stats));
    }
}
