use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::ai::InlineMedia;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A file packed as `data:{mime};base64,{payload}`, the form the OCR
/// prompt receives uploads in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl DataUri {
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        let mime_type = mime_type.trim();
        Self {
            mime_type: if mime_type.is_empty() {
                FALLBACK_MIME.to_string()
            } else {
                mime_type.to_string()
            },
            data: STANDARD.encode(bytes),
        }
    }

    pub fn into_media(self) -> InlineMedia {
        InlineMedia {
            mime_type: self.mime_type,
            data: self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_mime_and_base64_payload() {
        let media = DataUri::encode(" text/plain ", b"hi").into_media();
        assert_eq!(media.mime_type, "text/plain");
        assert_eq!(media.data, "aGk=");
    }

    #[test]
    fn test_missing_mime_falls_back() {
        assert_eq!(DataUri::encode("", b"x").mime_type, FALLBACK_MIME);
    }
}
