//! Picture payload checks and inline encoding.
//!
//! Inline data URLs are the canonical asset form: encoding cannot fail halfway
//! through a multi-step edit, at the cost of a larger shared document.

use crate::error::{KennelError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest accepted picture. Inline pictures grow by a third when encoded,
/// and the whole document has to stay under GitHub's 100 MB file limit.
pub const MAX_ASSET_BYTES: usize = 10 * 1024 * 1024;

/// How uploaded pictures are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetMode {
    /// Encode into the document as a data URL.
    #[default]
    Inline,
    /// Commit the bytes as a file in the repository and reference its raw URL.
    Commit,
}

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

/// Mime type for an image file name, or `None` when it is not a picture.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

pub fn validate(bytes: &[u8], mime: &str, name: &str) -> Result<()> {
    if !mime.starts_with("image/") {
        return Err(KennelError::InvalidAsset(format!(
            "\"{name}\" is not an image (use JPEG, PNG or WebP)"
        )));
    }
    if bytes.is_empty() {
        return Err(KennelError::InvalidAsset(format!("\"{name}\" is empty")));
    }
    if bytes.len() > MAX_ASSET_BYTES {
        return Err(KennelError::InvalidAsset(format!(
            "\"{name}\" is too large ({:.2} MB, max {} MB)",
            bytes.len() as f64 / 1024.0 / 1024.0,
            MAX_ASSET_BYTES / 1024 / 1024
        )));
    }
    Ok(())
}

pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
