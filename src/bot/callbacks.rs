use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};

use super::util::{
    apply_cover_keyboard, confirm_delete_keyboard, download_file, format_duration,
    format_file_size, save_choice_menu,
};
use super::AppState;
use crate::config::DEFAULT_COVER_NAME;
use crate::flow::Pending;

/// Everything a button in this bot can ask for. Callback data is decoded
/// into this once, at the dispatch boundary; handlers never see raw
/// prefix strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    SendCover(String),
    ConfirmDelete(String),
    DeleteCover(String),
    Cancel,
    PasteImage,
    SaveCover,
    SaveDefault,
    SaveWithName,
    ExtractMetadata,
    ExtractMedia,
    SetCover,
    UseSavedCover,
    ApplyCover(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(name) = data.strip_prefix("send_cover_") {
            return Some(Self::SendCover(name.to_string()));
        }
        if let Some(name) = data.strip_prefix("confirm_delete_") {
            return Some(Self::ConfirmDelete(name.to_string()));
        }
        if let Some(name) = data.strip_prefix("delete_cover_") {
            return Some(Self::DeleteCover(name.to_string()));
        }
        if let Some(name) = data.strip_prefix("apply_cover_") {
            return Some(Self::ApplyCover(name.to_string()));
        }

        match data {
            "cancel" => Some(Self::Cancel),
            "paste_image" => Some(Self::PasteImage),
            "save_cover" => Some(Self::SaveCover),
            "save_default" => Some(Self::SaveDefault),
            "save_with_name" => Some(Self::SaveWithName),
            "extract_metadata" => Some(Self::ExtractMetadata),
            "extract_media" => Some(Self::ExtractMedia),
            "set_cover" => Some(Self::SetCover),
            "use_saved_cover" => Some(Self::UseSavedCover),
            _ => None,
        }
    }

    pub fn as_data(&self) -> String {
        match self {
            Self::SendCover(name) => format!("send_cover_{name}"),
            Self::ConfirmDelete(name) => format!("confirm_delete_{name}"),
            Self::DeleteCover(name) => format!("delete_cover_{name}"),
            Self::Cancel => "cancel".to_string(),
            Self::PasteImage => "paste_image".to_string(),
            Self::SaveCover => "save_cover".to_string(),
            Self::SaveDefault => "save_default".to_string(),
            Self::SaveWithName => "save_with_name".to_string(),
            Self::ExtractMetadata => "extract_metadata".to_string(),
            Self::ExtractMedia => "extract_media".to_string(),
            Self::SetCover => "set_cover".to_string(),
            Self::UseSavedCover => "use_saved_cover".to_string(),
            Self::ApplyCover(name) => format!("apply_cover_{name}"),
        }
    }
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        // Unknown button, just clear the loading indicator.
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match action {
        CallbackAction::SendCover(name) => handle_send_cover(bot, q, state, &name).await,
        CallbackAction::ConfirmDelete(name) => handle_confirm_delete(bot, q, &name).await,
        CallbackAction::DeleteCover(name) => handle_delete_cover(bot, q, state, &name).await,
        CallbackAction::Cancel => handle_cancel(bot, q).await,
        CallbackAction::PasteImage => handle_paste_image(bot, q, state).await,
        CallbackAction::SaveCover => handle_save_cover(bot, q).await,
        CallbackAction::SaveDefault => handle_save_default(bot, q, state).await,
        CallbackAction::SaveWithName => handle_save_with_name(bot, q, state).await,
        CallbackAction::ExtractMetadata => handle_extract_metadata(bot, q).await,
        CallbackAction::ExtractMedia => handle_extract_media(bot, q, state).await,
        CallbackAction::SetCover => handle_set_cover(bot, q, state).await,
        CallbackAction::UseSavedCover => handle_use_saved_cover(bot, q, state).await,
        CallbackAction::ApplyCover(name) => handle_apply_cover(bot, q, state, &name).await,
    }
}

async fn ack(bot: &Bot, q: &CallbackQuery) -> anyhow::Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn ack_alert(bot: &Bot, q: &CallbackQuery, text: &str) -> anyhow::Result<()> {
    bot.answer_callback_query(q.id.clone())
        .text(text)
        .show_alert(true)
        .await?;
    Ok(())
}

fn query_message(q: &CallbackQuery) -> Option<&Message> {
    q.message.as_ref().and_then(|m| m.regular_message())
}

/// The photo the pressed button's message replies to.
fn replied_photo(q: &CallbackQuery) -> Option<(ChatId, FileId)> {
    let msg = query_message(q)?;
    let photo = msg.reply_to_message()?.photo()?.last()?;
    Some((msg.chat.id, photo.file.id.clone()))
}

/// The video-bearing message the pressed button's message replies to.
fn replied_video(q: &CallbackQuery) -> Option<(ChatId, Message)> {
    let msg = query_message(q)?;
    let reply = msg.reply_to_message()?;
    reply.video()?;
    Some((msg.chat.id, reply.clone()))
}

async fn handle_send_cover(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
    name: &str,
) -> anyhow::Result<()> {
    let covers = state.store.lock().await.covers(q.from.id).await;
    let Some(file_id) = covers.get(name).cloned() else {
        return ack_alert(&bot, &q, &format!("Cover \"{name}\" no longer exists.")).await;
    };

    if let Some(msg) = query_message(&q) {
        bot.send_photo(msg.chat.id, InputFile::file_id(file_id))
            .caption(name.to_string())
            .await?;
    }
    ack(&bot, &q).await
}

async fn handle_confirm_delete(bot: Bot, q: CallbackQuery, name: &str) -> anyhow::Result<()> {
    if let Some(msg) = query_message(&q) {
        bot.edit_message_text(msg.chat.id, msg.id, format!("Delete cover \"{name}\"?"))
            .reply_markup(confirm_delete_keyboard(name))
            .await?;
    }
    ack(&bot, &q).await
}

async fn handle_delete_cover(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
    name: &str,
) -> anyhow::Result<()> {
    let removed = state
        .store
        .lock()
        .await
        .delete_cover(q.from.id, name)
        .await?;

    if let Some(msg) = query_message(&q) {
        let text = if removed {
            format!("Deleted cover \"{name}\".")
        } else {
            format!("Cover \"{name}\" was not found.")
        };
        let _ = bot.edit_message_text(msg.chat.id, msg.id, text).await;
    }
    ack(&bot, &q).await
}

async fn handle_cancel(bot: Bot, q: CallbackQuery) -> anyhow::Result<()> {
    if let Some(msg) = query_message(&q) {
        let _ = bot
            .edit_message_text(msg.chat.id, msg.id, "Cancelled.")
            .await;
    }
    ack(&bot, &q).await
}

async fn handle_paste_image(bot: Bot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some((chat, photo)) = replied_photo(&q) else {
        return ack_alert(&bot, &q, "That button needs the original photo.").await;
    };
    ack(&bot, &q).await?;

    let bytes = match download_file(&bot, &state.config.telegram_token, photo).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Photo download failed: {e:#}");
            bot.send_message(chat, "Could not fetch the image from Telegram.")
                .await?;
            return Ok(());
        }
    };

    match state.image_host.rehost(bytes, "image.jpg").await {
        Ok(url) => {
            bot.send_message(chat, url).await?;
        }
        Err(e) => {
            tracing::warn!("Image re-host failed: {e}");
            bot.send_message(chat, "Could not re-host the image, please try again later.")
                .await?;
        }
    }
    Ok(())
}

async fn handle_save_cover(bot: Bot, q: CallbackQuery) -> anyhow::Result<()> {
    if replied_photo(&q).is_none() {
        return ack_alert(&bot, &q, "That button needs the original photo.").await;
    }

    if let Some(msg) = query_message(&q) {
        bot.edit_message_text(msg.chat.id, msg.id, "Save this cover how?")
            .reply_markup(save_choice_menu())
            .await?;
    }
    ack(&bot, &q).await
}

async fn handle_save_default(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some((_, photo)) = replied_photo(&q) else {
        return ack_alert(&bot, &q, "That button needs the original photo.").await;
    };

    state
        .store
        .lock()
        .await
        .put_cover(q.from.id, DEFAULT_COVER_NAME, photo)
        .await?;

    if let Some(msg) = query_message(&q) {
        let _ = bot
            .edit_message_text(msg.chat.id, msg.id, "Saved as the default cover.")
            .await;
    }
    ack(&bot, &q).await
}

async fn handle_save_with_name(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some((chat, photo)) = replied_photo(&q) else {
        return ack_alert(&bot, &q, "That button needs the original photo.").await;
    };
    let Some(prompt) = query_message(&q).map(|m| m.id) else {
        return ack(&bot, &q).await;
    };

    state.flow.lock().await.set(
        q.from.id,
        Pending::CoverName {
            photo,
            chat,
            prompt,
        },
    );

    bot.edit_message_text(chat, prompt, "Send the name for this cover as a message.")
        .await?;
    ack(&bot, &q).await
}

async fn handle_extract_metadata(bot: Bot, q: CallbackQuery) -> anyhow::Result<()> {
    let Some((chat, reply)) = replied_video(&q) else {
        return ack_alert(&bot, &q, "That button needs the original video.").await;
    };
    let Some(video) = reply.video() else {
        return ack(&bot, &q).await;
    };

    let mime = video
        .mime_type
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let file_name = video.file_name.as_deref().unwrap_or("(none)");

    bot.send_message(
        chat,
        format!(
            "\u{1f4cb} Video metadata:\n\
            - Duration: {}\n\
            - Dimensions: {}x{}\n\
            - Size: {}\n\
            - MIME type: {mime}\n\
            - Filename: {file_name}",
            format_duration(video.duration.seconds()),
            video.width,
            video.height,
            format_file_size(video.file.size as u64),
        ),
    )
    .await?;
    ack(&bot, &q).await
}

async fn handle_extract_media(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some((chat, reply)) = replied_video(&q) else {
        return ack_alert(&bot, &q, "That button needs the original video.").await;
    };
    let (cover_id, thumb_id) = {
        let Some(video) = reply.video() else {
            return ack(&bot, &q).await;
        };
        (
            video.cover.as_ref().and_then(|c| c.last()).map(|p| p.file.id.clone()),
            video.thumbnail.as_ref().map(|t| t.file.id.clone()),
        )
    };
    ack(&bot, &q).await?;

    let mut sent_any = false;

    if let Some(id) = cover_id {
        bot.send_photo(chat, InputFile::file_id(id))
            .caption("Embedded cover")
            .await?;
        sent_any = true;
    }

    if let Some(id) = thumb_id {
        // Thumbnails cannot be re-sent by reference, fetch the bytes.
        match download_file(&bot, &state.config.telegram_token, id).await {
            Ok(bytes) => {
                bot.send_photo(chat, InputFile::memory(bytes).file_name("thumbnail.jpg"))
                    .caption("Thumbnail")
                    .await?;
                sent_any = true;
            }
            Err(e) => tracing::warn!("Thumbnail download failed: {e:#}"),
        }
    }

    if !sent_any {
        bot.send_message(chat, "This video has no embedded cover or thumbnail.")
            .await?;
    }
    Ok(())
}

async fn handle_set_cover(bot: Bot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some((chat, reply)) = replied_video(&q) else {
        return ack_alert(&bot, &q, "That button needs the original video.").await;
    };
    let Some(prompt) = query_message(&q).map(|m| m.id) else {
        return ack(&bot, &q).await;
    };
    let Some(video) = reply.video() else {
        return ack(&bot, &q).await;
    };

    state.flow.lock().await.set(
        q.from.id,
        Pending::NewCover {
            video: video.file.id.clone(),
            caption: reply.caption().map(str::to_string),
            chat,
            prompt,
        },
    );

    bot.edit_message_text(chat, prompt, "Send the new cover image as a photo.")
        .await?;
    ack(&bot, &q).await
}

async fn handle_use_saved_cover(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let Some((chat, reply)) = replied_video(&q) else {
        return ack_alert(&bot, &q, "That button needs the original video.").await;
    };

    let covers = state.store.lock().await.covers(q.from.id).await;

    match covers.len() {
        0 => {
            ack_alert(
                &bot,
                &q,
                "You have no saved covers yet. Reply to a photo with /save.",
            )
            .await
        }
        1 => {
            let Some((name, file_id)) = covers.iter().next().map(|(n, f)| (n.clone(), f.clone()))
            else {
                return ack(&bot, &q).await;
            };

            state
                .store
                .lock()
                .await
                .bump_covers_changed(q.from.id)
                .await?;
            send_with_cover(&bot, chat, &reply, file_id).await?;

            if let Some(msg) = query_message(&q) {
                let _ = bot
                    .edit_message_text(msg.chat.id, msg.id, format!("Applied cover \"{name}\"."))
                    .await;
            }
            ack(&bot, &q).await
        }
        _ => {
            if let Some(msg) = query_message(&q) {
                bot.edit_message_text(msg.chat.id, msg.id, "Pick a cover to apply:")
                    .reply_markup(apply_cover_keyboard(&covers))
                    .await?;
            }
            ack(&bot, &q).await
        }
    }
}

async fn handle_apply_cover(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
    name: &str,
) -> anyhow::Result<()> {
    let Some((chat, reply)) = replied_video(&q) else {
        return ack_alert(&bot, &q, "That button needs the original video.").await;
    };

    let covers = state.store.lock().await.covers(q.from.id).await;
    let Some(file_id) = covers.get(name).cloned() else {
        return ack_alert(&bot, &q, &format!("Cover \"{name}\" no longer exists.")).await;
    };

    state
        .store
        .lock()
        .await
        .bump_covers_changed(q.from.id)
        .await?;
    send_with_cover(&bot, chat, &reply, file_id).await?;

    if let Some(msg) = query_message(&q) {
        let _ = bot
            .edit_message_text(msg.chat.id, msg.id, format!("Applied cover \"{name}\"."))
            .await;
    }
    ack(&bot, &q).await
}

/// Re-sends the video from `video_msg` with `cover` as its cover image,
/// keeping the original caption.
async fn send_with_cover(
    bot: &Bot,
    chat: ChatId,
    video_msg: &Message,
    cover: FileId,
) -> anyhow::Result<()> {
    let Some(video) = video_msg.video() else {
        return Ok(());
    };

    let mut request = bot
        .send_video(chat, InputFile::file_id(video.file.id.clone()))
        .cover(InputFile::file_id(cover));
    if let Some(caption) = video_msg.caption() {
        request = request.caption(caption.to_string());
    }
    request.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_actions() {
        assert_eq!(
            CallbackAction::parse("send_cover_sunset"),
            Some(CallbackAction::SendCover("sunset".to_string()))
        );
        assert_eq!(
            CallbackAction::parse("confirm_delete_sunset"),
            Some(CallbackAction::ConfirmDelete("sunset".to_string()))
        );
        assert_eq!(
            CallbackAction::parse("delete_cover_sunset"),
            Some(CallbackAction::DeleteCover("sunset".to_string()))
        );
        assert_eq!(
            CallbackAction::parse("apply_cover_sunset"),
            Some(CallbackAction::ApplyCover("sunset".to_string()))
        );
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(CallbackAction::parse("cancel"), Some(CallbackAction::Cancel));
        assert_eq!(
            CallbackAction::parse("save_cover"),
            Some(CallbackAction::SaveCover)
        );
        assert_eq!(
            CallbackAction::parse("use_saved_cover"),
            Some(CallbackAction::UseSavedCover)
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("save_cover_"), None);
        assert_eq!(CallbackAction::parse("something_else"), None);
    }

    #[test]
    fn test_data_survives_parse() {
        let actions = [
            CallbackAction::SendCover("my cover".to_string()),
            CallbackAction::ApplyCover("a_b_c".to_string()),
            CallbackAction::SetCover,
            CallbackAction::PasteImage,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.as_data()), Some(action));
        }
    }
}
