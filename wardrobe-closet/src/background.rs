//! Background removal via remove.bg
//!
//! The service returns the subject on a transparent background; the result is
//! flattened onto solid white and re-encoded as PNG.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use thiserror::Error;

const REMOVE_BG_URL: &str = "https://api.remove.bg/v1.0/removebg";
const USER_AGENT: &str = concat!("wardrobe-closet/", env!("CARGO_PKG_VERSION"));

/// Background removal errors
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("Background removal failed: {0}")]
    RequestFailed(String),

    #[error("Background removal returned an unreadable image: {0}")]
    Decode(String),
}

/// Something that can replace an image's background with white
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Returns PNG bytes of the processed image
    async fn remove_background(
        &self,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<Vec<u8>, BackgroundError>;
}

/// remove.bg API client
pub struct RemoveBgClient {
    http_client: reqwest::Client,
    api_key: String,
    url: String,
}

impl RemoveBgClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, BackgroundError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BackgroundError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            url: REMOVE_BG_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (proxies, tests)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(
        &self,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<Vec<u8>, BackgroundError> {
        let part = reqwest::multipart::Part::bytes(image).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto");

        tracing::debug!(file_name = %file_name, "Requesting background removal");

        let response = self
            .http_client
            .post(&self.url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackgroundError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackgroundError::RequestFailed(format!(
                "service returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackgroundError::RequestFailed(e.to_string()))?;

        composite_on_white_blocking(bytes.to_vec()).await
    }
}

/// Run `composite_on_white` on the blocking pool
pub async fn composite_on_white_blocking(bytes: Vec<u8>) -> Result<Vec<u8>, BackgroundError> {
    tokio::task::spawn_blocking(move || composite_on_white(&bytes))
        .await
        .map_err(|e| BackgroundError::Decode(format!("compositing task failed: {}", e)))?
}

/// Flatten an image with transparency onto a white canvas, encoded as PNG
pub fn composite_on_white(bytes: &[u8]) -> Result<Vec<u8>, BackgroundError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| BackgroundError::Decode(e.to_string()))?
        .to_rgba8();

    let (width, height) = rgba.dimensions();
    let mut flat = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        flat.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(flat)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| BackgroundError::Decode(e.to_string()))?;
    Ok(out.into_inner())
}
