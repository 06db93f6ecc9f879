mod gemini;

pub use gemini::GeminiEditService;

use base64::Engine;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Trait for generative image-edit services.
///
/// The library ships with [`GeminiEditService`]. Every call is independent:
/// the prompt and image passed in are the only context the service sees.
///
/// # Example
///
/// ```rust,no_run
/// use dewatermark::ai::{EditService, GeminiEditService};
///
/// # async fn example() -> dewatermark::error::Result<()> {
/// let service = GeminiEditService::new("key".into(), "gemini-2.5-flash-image".into());
/// let original = std::fs::read("input/photo.jpg").unwrap();
/// match service.request_edit("Remove the watermark", &original, "image/jpeg").await? {
///     Some(edited) => println!("got {} bytes", edited.len()),
///     None => println!("model returned no image"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait EditService: Send + Sync {
    /// The display name of this service (e.g., "Gemini").
    fn name(&self) -> &str;
    /// Send one edit request and return the first image in the answer, if any.
    ///
    /// * `prompt` - The full instruction text for this call
    /// * `image` - Raw image bytes (encoded for transport by the service)
    /// * `mime_type` - The MIME type of `image` (e.g., `"image/jpeg"`)
    ///
    /// `Ok(None)` means the service answered but produced no image.
    async fn request_edit(&self, prompt: &str, image: &[u8], mime_type: &str)
    -> Result<Option<Vec<u8>>>;
}

/// `generateContent` response envelope. Only the fields needed to find an
/// inline image are modelled; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// One content part of a candidate.
///
/// Parts that are neither inline data nor text decode as [`ResponsePart::Other`]
/// instead of failing the whole response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ResponsePart {
    InlineImage {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

/// Base64 payload of an inline part.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    pub data: String,
}

impl EditResponse {
    /// First inline payload of the first candidate, in part order.
    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| match part {
                ResponsePart::InlineImage { inline_data } => Some(inline_data),
                _ => None,
            })
    }

    /// Concatenated text parts of the first candidate, for diagnostics.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: Vec<&str> = parts
            .iter()
            .filter_map(|part| match part {
                ResponsePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if text.is_empty() { None } else { Some(text.join("\n")) }
    }
}

/// Decode the first returned image of a raw JSON response body.
///
/// A body without any inline image is `Ok(None)`; a body that is not a JSON
/// object, or an inline payload that is not valid base64, is an error.
pub fn extract_image(body: &str) -> Result<Option<Vec<u8>>> {
    let response: EditResponse = serde_json::from_str(body)
        .map_err(|e| Error::EditService(format!("invalid response JSON: {e}")))?;

    let Some(inline) = response.first_inline_image() else {
        if let Some(text) = response.text() {
            log::debug!("Edit service answered with text only: {text}");
        }
        return Ok(None);
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.trim())
        .map_err(|e| Error::EditService(format!("invalid base64 image data: {e}")))?;
    Ok(Some(bytes))
}
