//! Backend Client
//!
//! Capability wrapper around one Stable Diffusion WebUI endpoint: switch the active
//! checkpoint and run txt2img. The dispatcher only sees the `BackendClient` trait, so
//! tests and alternative servers plug in through `BackendConnector`.

use crate::config::HttpConfig;
use crate::error::BackendError;
use crate::generation::output::model_stem;
use crate::generation::settings::GenerationParams;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const OPTIONS_PATH: &str = "/sdapi/v1/options";
const TXT2IMG_PATH: &str = "/sdapi/v1/txt2img";
const CHECKPOINT_KEY: &str = "sd_model_checkpoint";

/// txt2img request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Txt2ImgRequest {
    pub seed: u64,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f64,
    pub steps: u32,
    pub sampler_name: String,
    pub negative_prompt: String,
}

impl Txt2ImgRequest {
    pub fn new(prompt: &str, seed: u64, params: &GenerationParams) -> Self {
        Self {
            seed,
            prompt: prompt.to_string(),
            width: params.width,
            height: params.height,
            cfg_scale: params.cfg_scale,
            steps: params.steps,
            sampler_name: params.sampler_name.clone(),
            negative_prompt: params.negative_prompt.clone(),
        }
    }
}

#[derive(Deserialize)]
struct Txt2ImgResponse {
    images: Vec<String>,
}

/// Outcome of a model switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub requested: String,
    /// Checkpoint active before the switch
    pub previous: Option<String>,
    /// Checkpoint reported after the switch
    pub active: Option<String>,
}

impl ModelSelection {
    /// The backend reports the requested checkpoint. A ` [hash]` suffix on either side is
    /// ignored, and a request without extension matches the checkpoint's stem.
    pub fn confirmed(&self) -> bool {
        let requested = without_hash(&self.requested);
        self.active
            .as_deref()
            .map(without_hash)
            .map(|active| active == requested || model_stem(active) == requested)
            .unwrap_or(false)
    }
}

fn without_hash(checkpoint: &str) -> &str {
    let trimmed = checkpoint.trim_end();
    match trimmed.rfind(" [") {
        Some(start) if trimmed.ends_with(']') => trimmed[..start].trim_end(),
        _ => trimmed,
    }
}

/// One generation backend endpoint
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Base URI this client is bound to
    fn endpoint(&self) -> &str;

    /// Make `model_identifier` the active checkpoint
    async fn select_model(&self, model_identifier: &str) -> Result<ModelSelection, BackendError>;

    /// Run one txt2img call and return the decoded images
    async fn generate(&self, request: &Txt2ImgRequest) -> Result<Vec<Vec<u8>>, BackendError>;
}

/// Builds one client per endpoint for the dispatcher
pub trait BackendConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn BackendClient>, BackendError>;
}

/// Connector for real WebUI servers
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    http: HttpConfig,
}

impl HttpConnector {
    pub fn new(http: HttpConfig) -> Self {
        Self { http }
    }
}

impl BackendConnector for HttpConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn BackendClient>, BackendError> {
        Ok(Arc::new(SdWebUiClient::new(endpoint, &self.http)?))
    }
}

fn map_http_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Unavailable(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        BackendError::Unavailable(format!("Connection error: {}", error))
    } else {
        BackendError::Unavailable(format!("HTTP error: {}", error))
    }
}

fn build_backend_http_client(http: &HttpConfig) -> Result<Client, BackendError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(http.connect_timeout())
        .timeout(http.request_timeout())
        .build()
        .map_err(|e| BackendError::Client(e.to_string()))
}

/// Decode one image; tolerates a `data:image/png;base64,` prefix
fn decode_image(encoded: &str) -> Result<Vec<u8>, BackendError> {
    let payload = match encoded.strip_prefix("data:") {
        Some(rest) => rest
            .split_once("base64,")
            .map(|(_, data)| data)
            .unwrap_or(rest),
        None => encoded,
    };
    BASE64
        .decode(payload.trim())
        .map_err(|e| BackendError::InvalidResponse(format!("Image is not valid base64: {}", e)))
}

/// Stable Diffusion WebUI (AUTOMATIC1111 / Forge) REST client
pub struct SdWebUiClient {
    client: Client,
    endpoint: String,
}

impl SdWebUiClient {
    pub fn new(endpoint: &str, http: &HttpConfig) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_backend_http_client(http)?,
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn fetch_options(&self) -> Result<Map<String, Value>, BackendError> {
        let response = self
            .client
            .get(self.url(OPTIONS_PATH))
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "GET {} returned status {}",
                OPTIONS_PATH,
                response.status()
            )));
        }

        let options: Value = response.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse options: {}", e))
        })?;
        match options {
            Value::Object(map) => Ok(map),
            other => Err(BackendError::InvalidResponse(format!(
                "Options must be a JSON object, got {}",
                other
            ))),
        }
    }
}

fn checkpoint_of(options: &Map<String, Value>) -> Option<String> {
    options
        .get(CHECKPOINT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl BackendClient for SdWebUiClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn select_model(&self, model_identifier: &str) -> Result<ModelSelection, BackendError> {
        let mut options = self.fetch_options().await?;
        let previous = checkpoint_of(&options);
        debug!(
            endpoint = %self.endpoint,
            current = previous.as_deref().unwrap_or("<unset>"),
            "Current model"
        );

        options.insert(
            CHECKPOINT_KEY.to_string(),
            Value::String(model_identifier.to_string()),
        );

        let response = self
            .client
            .post(self.url(OPTIONS_PATH))
            .json(&options)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Unavailable(format!(
                "POST {} returned status {}: {}",
                OPTIONS_PATH, status, error_text
            )));
        }

        let active = checkpoint_of(&self.fetch_options().await?);
        let selection = ModelSelection {
            requested: model_identifier.to_string(),
            previous,
            active,
        };

        if selection.confirmed() {
            info!(
                endpoint = %self.endpoint,
                model = %model_identifier,
                "Model selected"
            );
        } else {
            warn!(
                endpoint = %self.endpoint,
                requested = %model_identifier,
                active = selection.active.as_deref().unwrap_or("<unset>"),
                "Backend reports a different model after selection"
            );
        }

        Ok(selection)
    }

    async fn generate(&self, request: &Txt2ImgRequest) -> Result<Vec<Vec<u8>>, BackendError> {
        let response = self
            .client
            .post(self.url(TXT2IMG_PATH))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Generation {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: Txt2ImgResponse = response.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse txt2img response: {}", e))
        })?;

        body.images.iter().map(|image| decode_image(image)).collect()
    }
}
