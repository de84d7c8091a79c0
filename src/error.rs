use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image host error: {0}")]
    ImageHost(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
