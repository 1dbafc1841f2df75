use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, Result};

/// Prefix that classifies a flattened chunk string as an image payload.
pub const IMAGE_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Encode raw bytes as a `data:` URL with the given mime type.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode the base64 payload of a `data:` URL back into raw bytes.
/// Accepts a bare base64 string as well, since OCR providers return both forms.
pub fn decode_data_url(value: &str) -> Result<Vec<u8>> {
    let payload = match value.split_once(',') {
        Some((_, payload)) => payload,
        None => value,
    };
    STANDARD
        .decode(payload)
        .map_err(|e| AppError::invalid_input(format!("Invalid base64 payload: {e}")))
}
