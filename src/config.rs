use std::path::PathBuf;

use crate::error::CoverBotError;

pub const DEFAULT_COVER_NAME: &str = "default";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub image_host_primary: String,
    pub image_host_fallback: String,
}

pub fn load_config() -> Result<Config, CoverBotError> {
    dotenvy::dotenv().ok();

    let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if telegram_token.is_empty() {
        return Err(CoverBotError::Config(
            "TELEGRAM_BOT_TOKEN is required. Set it in .env file.".into(),
        ));
    }

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));

    let data_dir = std::env::var("COVERBOT_DATA_DIR")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(stripped) = s.strip_prefix('~') {
                home.join(stripped.trim_start_matches('/'))
            } else {
                PathBuf::from(s)
            }
        })
        .unwrap_or_else(|| home.join(".coverbot").join("data"));

    let bind_addr = std::env::var("BIND_ADDR")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    let webhook_url = std::env::var("WEBHOOK_URL")
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty());

    let webhook_secret = std::env::var("WEBHOOK_SECRET")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let image_host_primary = std::env::var("IMAGE_HOST_PRIMARY")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "https://telegra.ph/upload".to_string());

    let image_host_fallback = std::env::var("IMAGE_HOST_FALLBACK")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "https://0x0.st".to_string());

    Ok(Config {
        telegram_token,
        data_dir,
        bind_addr,
        webhook_url,
        webhook_secret,
        image_host_primary,
        image_host_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_missing_token() {
        // Clear the token to test missing token error
        std::env::remove_var("TELEGRAM_BOT_TOKEN");
        let result = load_config();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }
}
