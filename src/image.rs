//! Request-side image handling: class labels and data-URL payloads.

use base64::{
    Engine as _, alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
};
use std::fmt;

use crate::errors::ApiError;

/// Extension written for every stored image, whatever the decoded format.
pub const IMAGE_EXTENSION: &str = "png";

/// Standard alphabet, padding required, non-zero trailing bits tolerated.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A caller-supplied label, used as the file name prefix of its images.
///
/// Because the label becomes part of a path it must be non-empty and may
/// not contain path separators or be a relative path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassName(String);

impl ClassName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ApiError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ApiError::BadRequest("className must not be empty".into()));
        }
        if raw == "." || raw == ".." || raw.contains(['/', '\\', '\0']) {
            return Err(ApiError::BadRequest(format!(
                "className {raw:?} is not a valid file name prefix"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{className}_{sequence}.png`
    pub fn file_name(&self, sequence: usize) -> String {
        format!("{}_{}.{}", self.0, sequence, IMAGE_EXTENSION)
    }

    /// Exact, case-sensitive prefix match: `cat` also counts `cats_1.png`.
    pub fn prefixes(&self, entry_name: &str) -> bool {
        entry_name.starts_with(&self.0)
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits `<header>,<payload>` on the first comma and base64-decodes the
/// payload. The header is ignored and ASCII whitespace anywhere in the
/// payload is skipped, so line-wrapped encodings are accepted.
pub fn decode_data_url(image: &str) -> Result<Vec<u8>, ApiError> {
    let (_header, encoded) = image.split_once(',').ok_or_else(|| {
        ApiError::BadRequest("image must be a data URL of the form `<header>,<base64>`".into())
    })?;
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(PAYLOAD_ENGINE.decode(compact)?)
}
