/// Cover images: loading them for the grid and asking the external cover
/// service to regenerate them.
use std::time::Duration;

use image::imageops::FilterType;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Covers are scaled down to at most this size before display (px)
const COVER_MAX_WIDTH: u32 = 600;
const COVER_MAX_HEIGHT: u32 = 338;

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cover service rejected the request ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("failed to read cover: {0}")]
    Io(#[from] std::io::Error),

    #[error("cover is not a valid image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("cover decoder stopped: {0}")]
    Worker(String),
}

/// A decoded cover, ready to become an image handle
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, row-major
    pub pixels: Vec<u8>,
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// HTTP client shared by every cover request
fn http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        log::warn!("⚠️  Could not configure the HTTP client ({e}), using defaults");
        Client::new()
    })
}

/// Fetch a cover (HTTP URL or local path) and decode it.
///
/// Only a successful decode counts as loaded, matching what the grid can
/// actually show.
async fn load_cover(client: &Client, url: &str) -> Result<CoverImage, CoverError> {
    let bytes = if is_remote(url) {
        client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    } else {
        tokio::fs::read(url.strip_prefix("file://").unwrap_or(url)).await?
    };

    // Spawn blocking because decoding and resizing are CPU-intensive
    tokio::task::spawn_blocking(move || decode_cover(&bytes))
        .await
        .map_err(|e| CoverError::Worker(e.to_string()))?
}

fn decode_cover(bytes: &[u8]) -> Result<CoverImage, CoverError> {
    let img = image::load_from_memory(bytes)?;

    // Resize to cover size, keeping the aspect ratio
    let img = if img.width() > COVER_MAX_WIDTH || img.height() > COVER_MAX_HEIGHT {
        img.resize(COVER_MAX_WIDTH, COVER_MAX_HEIGHT, FilterType::Triangle)
    } else {
        img
    };

    let rgba = img.to_rgba8();
    Ok(CoverImage {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateCoverRequest<'a> {
    file_key: &'a str,
    timestamp: &'a str,
    force: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateCoverResponse {
    cover_url: Option<String>,
}

/// Loads covers and talks to the external cover generation service.
/// Clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CoverService {
    client: Client,
    base_url: String,
    timestamp: String,
}

impl CoverService {
    pub fn new(base_url: &str, timestamp: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/generate-cover", self.base_url)
    }

    pub async fn load_cover(&self, url: &str) -> Result<CoverImage, CoverError> {
        load_cover(&self.client, url).await
    }

    /// Ask the service to (re)generate the cover of `id`.
    /// Returns the new cover URL, if the service reported one.
    pub async fn regenerate(&self, id: &str, force: bool) -> Result<Option<String>, CoverError> {
        let request = GenerateCoverRequest {
            file_key: id,
            timestamp: &self.timestamp,
            force,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CoverError::Service {
                status: status.as_u16(),
                message: if message.is_empty() {
                    "cover generation failed".to_string()
                } else {
                    message
                },
            });
        }

        let body: GenerateCoverResponse = response.json().await?;
        log::info!("🖼️  Cover regenerated for {id}");
        Ok(body.cover_url)
    }
}
