use std::collections::HashMap;

use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup};

use super::callbacks::CallbackAction;

fn button(label: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.as_data())
}

pub fn video_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button("\u{1f4cb} Metadata", CallbackAction::ExtractMetadata),
            button("\u{1f5bc} Extract cover", CallbackAction::ExtractMedia),
        ],
        vec![
            button("\u{2728} New cover", CallbackAction::SetCover),
            button("\u{1f4be} Use saved cover", CallbackAction::UseSavedCover),
        ],
    ])
}

pub fn photo_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("\u{1f517} Re-host image", CallbackAction::PasteImage),
        button("\u{1f4be} Save as cover", CallbackAction::SaveCover),
    ]])
}

pub fn save_choice_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("Save as default", CallbackAction::SaveDefault),
        button("Pick a name", CallbackAction::SaveWithName),
    ]])
}

pub fn confirm_delete_keyboard(name: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(
            "Yes, delete",
            CallbackAction::DeleteCover(name.to_string()),
        ),
        button("Cancel", CallbackAction::Cancel),
    ]])
}

/// One row per saved cover: send it, or start deleting it.
pub fn cover_list_keyboard(covers: &HashMap<String, FileId>) -> InlineKeyboardMarkup {
    let mut names: Vec<&String> = covers.keys().collect();
    names.sort();

    let keyboard = names
        .into_iter()
        .map(|name| {
            vec![
                button(name, CallbackAction::SendCover(name.clone())),
                button(
                    "\u{1f5d1} Delete",
                    CallbackAction::ConfirmDelete(name.clone()),
                ),
            ]
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(keyboard)
}

/// One row per saved cover name, applying it to the pending video.
pub fn apply_cover_keyboard(covers: &HashMap<String, FileId>) -> InlineKeyboardMarkup {
    let mut names: Vec<&String> = covers.keys().collect();
    names.sort();

    let keyboard = names
        .into_iter()
        .map(|name| vec![button(name, CallbackAction::ApplyCover(name.clone()))])
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(keyboard)
}

/// Fetches a file's raw bytes through the Bot API file-download
/// indirection: getFile for the path, then the file endpoint.
pub async fn download_file(bot: &Bot, token: &str, file_id: FileId) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let file_url = format!("https://api.telegram.org/file/bot{token}/{}", file.path);

    let response = reqwest::get(&file_url).await?;
    if !response.status().is_success() {
        anyhow::bail!("file download returned {}", response.status());
    }
    Ok(response.bytes().await?.to_vec())
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

pub fn format_duration(secs: u32) -> String {
    let mins = secs / 60;
    let rest = secs % 60;
    format!("{mins}:{rest:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covers(names: &[&str]) -> HashMap<String, FileId> {
        names
            .iter()
            .map(|n| (n.to_string(), FileId(format!("file-{n}"))))
            .collect()
    }

    #[test]
    fn test_cover_list_keyboard_one_row_per_cover() {
        let markup = cover_list_keyboard(&covers(&["a", "b", "c"]));
        assert_eq!(markup.inline_keyboard.len(), 3);
        // Each row carries the send and delete affordances.
        assert_eq!(markup.inline_keyboard[0].len(), 2);
    }

    #[test]
    fn test_apply_cover_keyboard_cardinality() {
        let markup = apply_cover_keyboard(&covers(&["x", "y"]));
        assert_eq!(markup.inline_keyboard.len(), 2);

        let empty = apply_cover_keyboard(&covers(&[]));
        assert!(empty.inline_keyboard.is_empty());
    }

    #[test]
    fn test_apply_cover_keyboard_sorted() {
        let markup = apply_cover_keyboard(&covers(&["zebra", "apple"]));
        assert_eq!(markup.inline_keyboard[0][0].text, "apple");
        assert_eq!(markup.inline_keyboard[1][0].text, "zebra");
    }

    #[test]
    fn test_format_file_size_units() {
        assert_eq!(format_file_size(500), "500B");
        assert_eq!(format_file_size(2048), "2.0KB");
        assert_eq!(format_file_size(1048576), "1.0MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3600), "60:00");
    }
}
