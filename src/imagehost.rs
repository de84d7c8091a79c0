use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;

use crate::error::CoverBotError;

#[derive(Deserialize)]
struct UploadedFile {
    src: String,
}

/// External image re-hosting collaborator. One primary host, one fallback,
/// no retries beyond that.
pub struct ImageHost {
    client: reqwest::Client,
    primary: String,
    fallback: String,
}

impl ImageHost {
    pub fn new(primary: String, fallback: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            primary,
            fallback,
        }
    }

    pub async fn rehost(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<String, CoverBotError> {
        match self.upload_primary(bytes.clone(), filename).await {
            Ok(url) => Ok(url),
            Err(e) => {
                tracing::warn!("Primary image host failed, trying fallback: {e}");
                self.upload_fallback(bytes, filename).await.map_err(|e2| {
                    CoverBotError::ImageHost(format!(
                        "primary failed ({e}), fallback failed ({e2})"
                    ))
                })
            }
        }
    }

    // telegra.ph-style endpoint: multipart "file", JSON [{"src": "/file/..."}]
    async fn upload_primary(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<String, CoverBotError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| CoverBotError::ImageHost(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.primary)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoverBotError::ImageHost(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoverBotError::ImageHost(format!(
                "upload returned {}",
                response.status()
            )));
        }

        let uploaded: Vec<UploadedFile> = response
            .json()
            .await
            .map_err(|e| CoverBotError::ImageHost(e.to_string()))?;

        let src = uploaded
            .first()
            .map(|f| f.src.as_str())
            .ok_or_else(|| CoverBotError::ImageHost("empty upload response".into()))?;

        resolve_src(&self.primary, src)
    }

    // 0x0.st-style endpoint: multipart "file", plain-text URL response
    async fn upload_fallback(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<String, CoverBotError> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.fallback)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoverBotError::ImageHost(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoverBotError::ImageHost(format!(
                "upload returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CoverBotError::ImageHost(e.to_string()))?;

        let url = body.trim();
        if url.starts_with("http") {
            Ok(url.to_string())
        } else {
            Err(CoverBotError::ImageHost(format!(
                "unexpected upload response: {url}"
            )))
        }
    }
}

fn resolve_src(upload_url: &str, src: &str) -> Result<String, CoverBotError> {
    let base = Url::parse(upload_url).map_err(|e| CoverBotError::ImageHost(e.to_string()))?;
    let resolved = base
        .join(src)
        .map_err(|e| CoverBotError::ImageHost(e.to_string()))?;
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_src() {
        let url = resolve_src("https://telegra.ph/upload", "/file/abc.jpg").unwrap();
        assert_eq!(url, "https://telegra.ph/file/abc.jpg");
    }

    #[test]
    fn test_resolve_absolute_src() {
        let url = resolve_src("https://telegra.ph/upload", "https://cdn.example/x.jpg").unwrap();
        assert_eq!(url, "https://cdn.example/x.jpg");
    }
}
