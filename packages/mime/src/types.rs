//! Core data types for decomposition.

use serde::{Deserialize, Serialize};

/// Role of a part within its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartRole {
    /// The displayable body of the message.
    Body,

    /// A regular attachment.
    Attachment,

    /// An attached `message/rfc822`, kept as one opaque part.
    NestedMessage,
}

impl PartRole {
    /// Get the string value used in logs and CLI output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Attachment => "attachment",
            Self::NestedMessage => "nested_message",
        }
    }

    /// Whether this part is numbered as an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        !matches!(self, Self::Body)
    }
}

/// Which textual representation was chosen for the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    Html,
    Text,
}

impl BodyFormat {
    /// File extension for the body in this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "txt",
        }
    }
}

/// A logical unit extracted from a container.
///
/// Parts are produced once by [`crate::decompose`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Position in decomposition order: 1 is the body, attachments follow.
    pub ordinal: usize,

    /// Role of this part.
    pub role: PartRole,

    /// Decoded payload.
    #[serde(skip)]
    pub content: Vec<u8>,

    /// Sanitised filename suggested for this part, including its extension.
    pub filename: String,

    /// Declared MIME type (`type/subtype`), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Part {
    /// 1-based index among attachments, `None` for the body.
    #[must_use]
    pub fn attachment_index(&self) -> Option<usize> {
        if self.role.is_attachment() {
            Some(self.ordinal.saturating_sub(1))
        } else {
            None
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Lower-cased extension of the suggested filename, if it has one.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}
