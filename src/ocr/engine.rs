use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::OcrError;

const IMAGE_NAME: &str = "temp_image";
const SECRET_HEADER: &str = "X-OCR-SECRET";

pub type OcrFuture = Pin<Box<dyn Future<Output = Result<Value, OcrError>> + Send>>;

/// A vision OCR backend returning its raw JSON response for one image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: OcrImage) -> OcrFuture;
}

#[derive(Debug, Clone)]
pub struct OcrImage {
    pub format: String,
    pub bytes: Vec<u8>,
}

impl OcrImage {
    /// Decodes `data:image/<format>;base64,<payload>`.
    pub fn from_data_url(data: &str) -> Result<Self, OcrError> {
        let (header, encoded) = data
            .split_once(',')
            .ok_or_else(|| OcrError::InvalidImage("expected a data URL".to_string()))?;
        let mime = header.split(';').next().unwrap_or_default();
        let format = mime.rsplit('/').next().unwrap_or_default().trim();
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|err| OcrError::InvalidImage(err.to_string()))?;
        if bytes.is_empty() {
            return Err(OcrError::InvalidImage("image payload is empty".to_string()));
        }
        Ok(Self {
            format: format.to_string(),
            bytes,
        })
    }
}

/// Naver Clova General OCR (V2 multipart API).
#[derive(Debug, Clone)]
pub struct ClovaOcr {
    client: reqwest::Client,
    url: Option<String>,
    secret: Option<String>,
}

impl ClovaOcr {
    pub fn new(url: Option<String>, secret: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "failed to build OCR http client")?;
        Ok(Self {
            client,
            url: url.filter(|value| !value.trim().is_empty()),
            secret: secret.filter(|value| !value.trim().is_empty()),
        })
    }
}

impl OcrEngine for ClovaOcr {
    fn recognize(&self, image: OcrImage) -> OcrFuture {
        let client = self.client.clone();
        let url = self.url.clone();
        let secret = self.secret.clone();
        Box::pin(async move {
            let url = url.ok_or(OcrError::NotConfigured("CLOVA_OCR_URL"))?;
            let secret = secret.ok_or(OcrError::NotConfigured("CLOVA_OCR_SECRET"))?;
            call_clova(&client, &url, &secret, image).await
        })
    }
}

async fn call_clova(
    client: &reqwest::Client,
    url: &str,
    secret: &str,
    image: OcrImage,
) -> Result<Value, OcrError> {
    let message = request_message(&image.format, &uuid::Uuid::new_v4().to_string(), now_millis());
    let file_name = format!("{}.{}", IMAGE_NAME, image.format);
    let form = reqwest::multipart::Form::new()
        .text("message", message.to_string())
        .part(
            "file",
            reqwest::multipart::Part::bytes(image.bytes).file_name(file_name),
        );

    debug!("clova: sending OCR request (format={})", image.format);
    let response = client
        .post(url)
        .header(SECRET_HEADER, secret)
        .multipart(form)
        .send()
        .await
        .map_err(|err| OcrError::Transport(err.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| OcrError::Transport(err.to_string()))?;
    if !status.is_success() {
        warn!("clova: OCR request rejected with status {}", status);
        return Err(OcrError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|err| {
        OcrError::MalformedUpstreamResponse(format!("response is not JSON: {}", err))
    })
}

fn request_message(format: &str, request_id: &str, timestamp: u128) -> Value {
    json!({
        "images": [{ "format": format, "name": IMAGE_NAME }],
        "requestId": request_id,
        "version": "V2",
        "timestamp": timestamp as u64,
    })
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
