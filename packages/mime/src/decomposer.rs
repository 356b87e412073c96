//! Decompose a message into its body and attachments.
//!
//! The body is always the first part. It uses the richest textual
//! rendering available: the first `text/html` leaf that is not an
//! attachment, else the first such `text/plain` leaf, else an empty text
//! part. Attachments follow in encounter order.
//!
//! A leaf is an attachment when it has `Content-Disposition: attachment`,
//! declares a filename, is a nested message, or is any non-text leaf
//! other than the body. Text leaves that are neither the body nor named
//! are alternative renderings of the body and are not emitted.
//!
//! Nested `message/rfc822` attachments are not recursed into. Each becomes
//! one [`PartRole::NestedMessage`] part holding the complete nested message.

use crate::config::{
    BODY_FILE_STEM, FALLBACK_CONTENT_TYPE, NESTED_MESSAGE_EXTENSION, NESTED_MESSAGE_FILE_STEM,
};
use crate::encoding::decode_body_text;
use crate::error::Result;
use crate::filename::{attachment_filename, sanitize_filename};
use crate::header::read_header_block;
use crate::parser::{parse_entity, Entity};
use crate::types::{BodyFormat, Part, PartRole};

/// Single-pass sequence of parts: the body, then each attachment.
#[derive(Debug)]
pub struct Decomposition {
    body: Option<Part>,
    attachments: std::vec::IntoIter<Entity>,
    next_ordinal: usize,
    body_format: BodyFormat,
    subject: Option<String>,
}

impl Decomposition {
    /// Which rendering was chosen for the body.
    #[must_use]
    pub fn body_format(&self) -> BodyFormat {
        self.body_format
    }

    /// Decoded `Subject` of the container, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl Iterator for Decomposition {
    type Item = Part;

    fn next(&mut self) -> Option<Part> {
        if let Some(body) = self.body.take() {
            return Some(body);
        }
        let entity = self.attachments.next()?;
        self.next_ordinal += 1;
        Some(attachment_part(entity, self.next_ordinal))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.body.is_some()) + self.attachments.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Decomposition {}

/// Decompose the raw bytes of a message.
///
/// Never fails because of missing attachments or a missing body: a
/// message with neither still yields one empty text body part.
///
/// # Errors
///
/// Returns an error if `raw` is empty or does not start with a header section.
pub fn decompose(raw: &[u8]) -> Result<Decomposition> {
    let root = parse_entity(raw)?;
    let subject = root.headers.subject();
    let leaves = into_leaves(root);

    let body_index = find_body(&leaves, "html")
        .map(|i| (i, BodyFormat::Html))
        .or_else(|| find_body(&leaves, "plain").map(|i| (i, BodyFormat::Text)));

    let (body, body_format) = match body_index {
        Some((i, format)) => (body_part(Some(&leaves[i]), format), format),
        None => (body_part(None, BodyFormat::Text), BodyFormat::Text),
    };

    let attachments: Vec<Entity> = leaves
        .into_iter()
        .enumerate()
        .filter(|(i, leaf)| Some(*i) != body_index.map(|(b, _)| b) && is_attachment(leaf))
        .map(|(_, leaf)| leaf)
        .collect();

    tracing::debug!(
        body_format = ?body_format,
        attachments = attachments.len(),
        "message decomposed"
    );

    Ok(Decomposition {
        body: Some(body),
        attachments: attachments.into_iter(),
        next_ordinal: 1,
        body_format,
        subject,
    })
}

fn into_leaves(entity: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut stack = vec![entity];
    while let Some(mut e) = stack.pop() {
        if e.is_leaf() {
            out.push(e);
        } else {
            let children = std::mem::take(&mut e.children);
            stack.extend(children.into_iter().rev());
        }
    }
    out
}

fn is_explicit_attachment(leaf: &Entity) -> bool {
    leaf.disposition.as_ref().is_some_and(|cd| cd.is_attachment())
        || leaf.content_type.is_message()
        || leaf.declared_filename().is_some()
}

fn is_attachment(leaf: &Entity) -> bool {
    if is_explicit_attachment(leaf) {
        return true;
    }
    !leaf.content_type.is_text() && !leaf.body.is_empty()
}

fn find_body(leaves: &[Entity], sub_type: &str) -> Option<usize> {
    leaves
        .iter()
        .position(|leaf| leaf.content_type.is("text", sub_type) && !is_explicit_attachment(leaf))
}

fn body_part(leaf: Option<&Entity>, format: BodyFormat) -> Part {
    let content = leaf
        .map(|l| decode_body_text(&l.body, l.content_type.param("charset")))
        .unwrap_or_default();
    let content_type = match format {
        BodyFormat::Html => "text/html",
        BodyFormat::Text => "text/plain",
    };
    Part {
        ordinal: 1,
        role: PartRole::Body,
        content,
        filename: format!("{BODY_FILE_STEM}.{}", format.extension()),
        content_type: Some(content_type.to_string()),
    }
}

fn attachment_part(leaf: Entity, ordinal: usize) -> Part {
    let mime_type = leaf.content_type.mime_type();
    let (role, filename) = if leaf.content_type.is_message() {
        (PartRole::NestedMessage, nested_message_filename(&leaf))
    } else {
        let name = attachment_filename(leaf.declared_filename(), &mime_type);
        (PartRole::Attachment, name)
    };

    let content_type = if mime_type.is_empty() {
        FALLBACK_CONTENT_TYPE.to_string()
    } else {
        mime_type
    };

    Part {
        ordinal,
        role,
        content: leaf.body,
        filename,
        content_type: Some(content_type),
    }
}

fn nested_message_filename(leaf: &Entity) -> String {
    if let Some(declared) = leaf.declared_filename() {
        return attachment_filename(Some(declared), "message/rfc822");
    }
    read_header_block(&leaf.body)
        .headers
        .subject()
        .and_then(|subject| sanitize_filename(&format!("{subject}.{NESTED_MESSAGE_EXTENSION}")))
        .unwrap_or_else(|| format!("{NESTED_MESSAGE_FILE_STEM}.{NESTED_MESSAGE_EXTENSION}"))
}
