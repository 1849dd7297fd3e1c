pub mod errors;

pub use errors::MediaError;

use reqwest::{Client, ClientBuilder, header::CONTENT_TYPE};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::capture::types::CapturedItem;

const MAX_MEDIA_SIZE: u64 = 25 * 1024 * 1024; // 25MB
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Downloads an item's media so later passes can work from a local file.
#[derive(Clone)]
pub struct MediaDownloader {
    client: Client,
    dir: PathBuf,
}

impl MediaDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| MediaError::Client(e.to_string()))?;

        Ok(Self {
            client,
            dir: dir.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch the item's media URL into `dir`. `Ok(None)` when it has no media.
    #[instrument(skip_all, fields(identifier = %item.identifier))]
    pub async fn download(&self, item: &CapturedItem) -> Result<Option<PathBuf>, MediaError> {
        let Some(url) = &item.auxiliary.media_url else {
            return Ok(None);
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(MediaError::from_reqwest_error)?;

        if let Some(content_length) = response.content_length()
            && content_length > MAX_MEDIA_SIZE
        {
            return Err(MediaError::BodyTooLarge(content_length));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Http {
                status,
                retriable: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(MediaError::from_reqwest_error)?;

        if body.len() as u64 > MAX_MEDIA_SIZE {
            return Err(MediaError::BodyTooLarge(body.len() as u64));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!(
            "{}.{}",
            sanitize_file_stem(&item.identifier),
            extension_for(&content_type, url.path())
        ));
        tokio::fs::write(&path, &body).await?;

        debug!("Saved {} bytes to {}", body.len(), path.display());
        Ok(Some(path))
    }
}

fn sanitize_file_stem(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn extension_for(content_type: &str, url_path: &str) -> String {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let known = match mime.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    Path::new(url_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}
