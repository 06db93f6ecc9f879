use base64::Engine;
use reqwest::Client;
use serde_json::json;

use super::{EditService, extract_image};
use crate::error::{Error, Result};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiEditService {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl GeminiEditService {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different API base URL (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Request body: one user turn with the prompt and the inline image.
fn build_body(prompt: &str, image_base64: &str, mime_type: &str) -> serde_json::Value {
    json!({
        "contents": [
            {
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": mime_type,
                            "data": image_base64
                        }
                    }
                ]
            }
        ]
    })
}

#[async_trait::async_trait]
impl EditService for GeminiEditService {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn request_edit(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Option<Vec<u8>>> {
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image);
        let body = build_body(prompt, &image_base64, mime_type);

        log::debug!(
            "Gemini request: model={}, {} image bytes ({mime_type}), prompt {} chars",
            self.model,
            image.len(),
            prompt.len()
        );

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::EditService(format!(
                "Gemini API error ({status}): {}",
                text.trim()
            )));
        }

        extract_image(&text)
    }
}
