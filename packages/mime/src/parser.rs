//! MIME entity tree parser.
//!
//! Multipart containers are split on their boundary delimiter lines and
//! parsed recursively; every other entity becomes a leaf whose body has
//! its Content-Transfer-Encoding removed. `message/rfc822` entities are
//! leaves too: the nested message is kept intact as the leaf body.

use crate::config::MAX_NESTING_DEPTH;
use crate::encoding::decode_transfer_encoding;
use crate::error::{MimeError, Result};
use crate::header::{
    default_child_type, parse_content_type, read_header_block, trim_line_ending,
    ContentDisposition, ContentType, Headers,
};

/// A parsed MIME entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub headers: Headers,
    pub content_type: ContentType,
    pub disposition: Option<ContentDisposition>,
    /// Decoded body for leaves; empty for multipart containers.
    pub body: Vec<u8>,
    /// Child entities of a multipart container, in encounter order.
    pub children: Vec<Entity>,
}

impl Entity {
    /// Whether this entity has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first iterator over all leaves, in encounter order.
    pub fn leaves(&self) -> Vec<&Entity> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// `filename` from Content-Disposition, else `name` from Content-Type.
    #[must_use]
    pub fn declared_filename(&self) -> Option<&str> {
        self.disposition
            .as_ref()
            .and_then(|cd| cd.param("filename"))
            .or_else(|| self.content_type.param("name"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn collect_leaves<'a>(entity: &'a Entity, out: &mut Vec<&'a Entity>) {
    if entity.is_leaf() {
        out.push(entity);
    } else {
        for child in &entity.children {
            collect_leaves(child, out);
        }
    }
}

/// Parse a complete message.
///
/// # Errors
///
/// * [`MimeError::EmptyMessage`] if `raw` has no bytes
/// * [`MimeError::MalformedHeader`] if the message does not start with a header section
pub fn parse_entity(raw: &[u8]) -> Result<Entity> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(MimeError::EmptyMessage);
    }

    let block = read_header_block(raw);
    if block.headers.is_empty() {
        if let Some((line, text)) = block.first_invalid {
            return Err(MimeError::MalformedHeader { line, text });
        }
    }

    Ok(build_entity(block.headers, block.body, None, 0))
}

fn parse_child(raw: &[u8], parent: &ContentType, depth: usize) -> Entity {
    let block = read_header_block(raw);
    if let Some((line, text)) = &block.first_invalid {
        tracing::debug!(line, text = %text, "ignoring invalid header line in body part");
    }
    build_entity(block.headers, block.body, Some(parent), depth)
}

fn build_entity(
    headers: Headers,
    body: &[u8],
    parent: Option<&ContentType>,
    depth: usize,
) -> Entity {
    let mut content_type = headers.content_type_or(default_child_type(parent));
    let disposition = headers.content_disposition();

    if content_type.is_multipart() {
        if depth >= MAX_NESTING_DEPTH {
            tracing::warn!(depth, "multipart nesting too deep, keeping entity opaque");
        } else if let Some(boundary) = content_type.param("boundary").map(str::to_string) {
            let children: Vec<Entity> = split_multipart(body, &boundary)
                .into_iter()
                .map(|part| parse_child(part, &content_type, depth + 1))
                .collect();
            if !children.is_empty() {
                return Entity {
                    headers,
                    content_type,
                    disposition,
                    body: Vec::new(),
                    children,
                };
            }
            tracing::debug!(boundary = %boundary, "no body parts found for boundary");
        }
        // Unusable multipart: expose the raw text instead of dropping it
        if let Some(plain) = parse_content_type("text/plain") {
            content_type = plain;
        }
    }

    let encoding = headers.get("content-transfer-encoding");
    let body = decode_transfer_encoding(encoding, body);

    Entity {
        headers,
        content_type,
        disposition,
        body,
        children: Vec::new(),
    }
}

/// Split a multipart body into the raw bytes of each body part.
///
/// The preamble and epilogue are discarded. The line break before a
/// delimiter belongs to the delimiter. A missing close delimiter ends the
/// last part at end of input.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(body.len());
        let line = trim_line_ending(&body[pos..line_end]);

        if let Some(rest) = line.strip_prefix(delimiter) {
            let is_close = rest.starts_with(b"--");
            let tail = if is_close { &rest[2..] } else { rest };
            if tail.iter().all(|b| *b == b' ' || *b == b'\t') {
                if let Some(start) = part_start {
                    parts.push(strip_final_line_break(&body[start..pos]));
                }
                if is_close {
                    return parts;
                }
                part_start = Some(line_end);
            }
        }

        pos = line_end;
    }

    if let Some(start) = part_start {
        tracing::debug!(boundary, "multipart has no close delimiter");
        if start < body.len() {
            parts.push(&body[start..]);
        }
    }

    parts
}

fn strip_final_line_break(part: &[u8]) -> &[u8] {
    if let Some(p) = part.strip_suffix(b"\r\n") {
        p
    } else if let Some(p) = part.strip_suffix(b"\n") {
        p
    } else {
        part
    }
}
