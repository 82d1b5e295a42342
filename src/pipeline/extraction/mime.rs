use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document formats the extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentMime {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "text/plain")]
    PlainText,
    #[serde(rename = "application/vnd.openxmlformats-officedocument.wordprocessingml.document")]
    WordDocument,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MimeError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("File content does not look like {0}")]
    ContentMismatch(&'static str),
}

const OCTET_STREAM: &str = "application/octet-stream";

impl DocumentMime {
    pub const ALL: [DocumentMime; 3] = [Self::Pdf, Self::PlainText, Self::WordDocument];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
            Self::WordDocument => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == mime)
    }

    fn content_matches(&self, bytes: &[u8]) -> bool {
        match self {
            Self::Pdf => bytes.starts_with(b"%PDF"),
            // DOCX is a zip container
            Self::WordDocument => bytes.starts_with(b"PK\x03\x04"),
            Self::PlainText => std::str::from_utf8(bytes).is_ok() && !bytes.contains(&0),
        }
    }
}

impl std::fmt::Display for DocumentMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type without parameters, lowercased.
fn essence(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Decide the format of an upload.
///
/// The declared content type is used unless it is missing or generic, in
/// which case the filename extension decides. The bytes must then agree with
/// the chosen format.
pub fn detect(declared: Option<&str>, filename: &str, bytes: &[u8]) -> Result<DocumentMime, MimeError> {
    if bytes.is_empty() {
        return Err(MimeError::Empty);
    }

    let declared = declared.map(essence).filter(|m| !m.is_empty() && m != OCTET_STREAM);
    let mime = match declared {
        Some(mime) => mime,
        None => mime_guess::from_path(filename)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    };

    let format = DocumentMime::from_mime(&mime).ok_or(MimeError::Unsupported(mime))?;
    if !format.content_matches(bytes) {
        return Err(MimeError::ContentMismatch(format.as_str()));
    }
    Ok(format)
}
