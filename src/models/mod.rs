use serde::Serialize;

/// Declared format of an upload. Anything else is rejected before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".png") {
            Some(ImageKind::Png)
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Some(ImageKind::Jpeg)
        } else {
            None
        }
    }
}

/// Raw bytes of the meal photo held for the current session.
/// Cleared on reset or when the process exits; never written to disk.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub file_name: String,
}

/// Base64 text of a PNG re-encoding of the last upload, with the final
/// pixel dimensions. Derived from [`UploadedImage`], never persisted.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub png_base64: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Inline data URL form embedded in the chat-completion payload.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.png_base64)
    }
}
