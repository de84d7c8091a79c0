use teloxide::prelude::*;
use teloxide::types::{InputFile, ReplyParameters, User};
use teloxide::utils::command::BotCommands;

use super::commands::{self, BotCommand};
use super::util::{photo_menu, video_menu};
use super::AppState;
use crate::flow::Pending;

pub async fn handle_message(bot: Bot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    if msg.video().is_some() {
        handle_video(bot, msg, state, user).await
    } else if msg.photo().is_some() {
        handle_photo(bot, msg, state, user).await
    } else if msg.text().is_some() {
        handle_text(bot, msg, state, user).await
    } else {
        Ok(())
    }
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    state: AppState,
    user: User,
) -> anyhow::Result<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    // A pending name prompt wins over command parsing: whatever the user
    // typed is the cover name.
    let pending = state.flow.lock().await.take_cover_name(user.id);
    if let Some(Pending::CoverName {
        photo,
        chat,
        prompt,
    }) = pending
    {
        let name = text.trim();
        state
            .store
            .lock()
            .await
            .put_cover(user.id, name, photo)
            .await?;

        let _ = bot
            .edit_message_text(chat, prompt, format!("Saved cover \"{name}\"."))
            .await;
        return Ok(());
    }

    match BotCommand::parse(&text, &state.bot_username) {
        Ok(cmd) => commands::handle_command(bot, msg, cmd, state).await,
        // Ordinary text, nothing to do.
        Err(_) => Ok(()),
    }
}

async fn handle_video(
    bot: Bot,
    msg: Message,
    state: AppState,
    user: User,
) -> anyhow::Result<()> {
    let count = state.store.lock().await.bump_videos(user.id).await?;
    tracing::info!(user = user.id.0, count, "Video received");

    bot.send_message(msg.chat.id, "What should we do with this video?")
        .reply_markup(video_menu())
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

async fn handle_photo(
    bot: Bot,
    msg: Message,
    state: AppState,
    user: User,
) -> anyhow::Result<()> {
    let pending = state.flow.lock().await.take_new_cover(user.id);
    if let Some(pending) = pending {
        return complete_new_cover(bot, msg, state, user, pending).await;
    }

    bot.send_message(msg.chat.id, "What should we do with this image?")
        .reply_markup(photo_menu())
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Finishes a "set new cover" interaction: the photo just sent becomes the
/// cover of the video held in flow state.
async fn complete_new_cover(
    bot: Bot,
    msg: Message,
    state: AppState,
    user: User,
    pending: Pending,
) -> anyhow::Result<()> {
    let Pending::NewCover {
        video,
        caption,
        chat,
        prompt,
    } = pending
    else {
        return Ok(());
    };
    let Some(photo) = msg.photo().and_then(|p| p.last()) else {
        return Ok(());
    };
    let cover = photo.file.id.clone();

    state
        .store
        .lock()
        .await
        .bump_covers_changed(user.id)
        .await?;

    let _ = bot.delete_message(msg.chat.id, msg.id).await;
    let _ = bot.delete_message(chat, prompt).await;

    let notice = bot
        .send_message(msg.chat.id, "\u{1f504} Applying the new cover...")
        .await?;

    let mut request = bot
        .send_video(msg.chat.id, InputFile::file_id(video))
        .cover(InputFile::file_id(cover));
    if let Some(caption) = caption {
        request = request.caption(caption);
    }
    request.await?;

    let _ = bot.delete_message(msg.chat.id, notice.id).await;
    Ok(())
}
