//! Encoded image payloads as they arrive from clients: raw base64, or a data URL
//! (`data:image/png;base64,<payload>`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported image format")]
    UnsupportedFormat,
}

/// Client-supplied image, kept as received until a handler decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

/// Decoded, validated image ready to hand to the provider (base64 data plus mime type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Encode raw image bytes (e.g. a file read by the CLI) as a plain base64 payload.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    /// Treat blank strings as "no image".
    pub fn from_optional(raw: Option<String>) -> Option<Self> {
        raw.filter(|s| !s.trim().is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Data-URL header (everything before the first `,`), if any.
    pub fn header(&self) -> Option<&str> {
        self.0.split_once(',').map(|(h, _)| h)
    }

    /// Everything after the first `,`, or the whole string when there is no separator.
    pub fn payload(&self) -> &str {
        match self.0.split_once(',') {
            Some((_, p)) => p,
            None => &self.0,
        }
    }

    /// Base64-decode the payload and determine its mime type from magic bytes,
    /// falling back to an `image/*` type named in the data-URL header.
    pub fn decode(&self) -> Result<ImagePart, ImageError> {
        let compact: String = self
            .payload()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if compact.is_empty() {
            return Err(ImageError::Empty);
        }
        let bytes = STANDARD.decode(compact.as_bytes())?;
        let mime_type = sniff_mime(&bytes)
            .map(str::to_string)
            .or_else(|| self.header_mime())
            .ok_or(ImageError::UnsupportedFormat)?;
        Ok(ImagePart {
            mime_type,
            data: compact,
        })
    }

    fn header_mime(&self) -> Option<String> {
        let header = self.header()?;
        let rest = header.trim().strip_prefix("data:")?;
        let mime = rest.split(';').next()?.trim().to_ascii_lowercase();
        mime.starts_with("image/").then_some(mime)
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn payload_is_everything_after_first_comma() {
        let img = EncodedImage::new("data:image/png;base64,AAA,BBB");
        assert_eq!(img.header(), Some("data:image/png;base64"));
        assert_eq!(img.payload(), "AAA,BBB");
    }

    #[test]
    fn payload_without_separator_is_whole_string() {
        let img = EncodedImage::new("iVBORw0KGgo=");
        assert_eq!(img.header(), None);
        assert_eq!(img.payload(), "iVBORw0KGgo=");
    }

    #[test]
    fn decode_sniffs_png_from_bytes() {
        let img = EncodedImage::from_bytes(PNG_SIGNATURE);
        let part = img.decode().unwrap();
        assert_eq!(part.mime_type, "image/png");
        assert_eq!(part.data, STANDARD.encode(PNG_SIGNATURE));
    }

    #[test]
    fn decode_strips_data_url_header_and_whitespace() {
        let encoded = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4]);
        let (a, b) = encoded.split_at(4);
        let img = EncodedImage::new(format!("data:image/jpeg;base64,{}\n{}", a, b));
        let part = img.decode().unwrap();
        assert_eq!(part.mime_type, "image/jpeg");
        assert_eq!(part.data, encoded);
    }

    #[test]
    fn decode_falls_back_to_header_mime() {
        let encoded = STANDARD.encode(b"not-a-known-magic");
        let img = EncodedImage::new(format!("data:image/tiff;base64,{}", encoded));
        assert_eq!(img.decode().unwrap().mime_type, "image/tiff");
    }

    #[test]
    fn decode_rejects_non_image_bytes() {
        let img = EncodedImage::from_bytes(b"plain text, nothing else");
        assert!(matches!(img.decode(), Err(ImageError::UnsupportedFormat)));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        let img = EncodedImage::new("data:image/png;base64,@@@@");
        assert!(matches!(img.decode(), Err(ImageError::Base64(_))));
    }

    #[test]
    fn blank_strings_are_no_image() {
        assert!(EncodedImage::from_optional(Some("   ".to_string())).is_none());
        assert!(EncodedImage::from_optional(None).is_none());
        assert!(EncodedImage::from_optional(Some("abc".to_string())).is_some());
    }
}
