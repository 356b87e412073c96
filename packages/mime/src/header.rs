//! Header sections and structured header values.
//!
//! Covers the parts of RFC 5322 / RFC 2045 / RFC 2183 / RFC 2231 needed to
//! decompose a message: unfolding, `Content-Type`, `Content-Disposition`
//! and their parameters.

use percent_encoding::percent_decode_str;

use crate::config::DEFAULT_CONTENT_TYPE;
use crate::encoding::decode_charset;
use crate::rfc2047::decode_encoded_words;

/// An unfolded header section, in original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Value of the first field with this name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the section has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parsed `Content-Type`, falling back to `default` when absent or invalid.
    #[must_use]
    pub fn content_type_or(&self, default: &str) -> ContentType {
        self.get("content-type")
            .and_then(parse_content_type)
            .or_else(|| parse_content_type(default))
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Parsed `Content-Disposition`, if present and valid.
    #[must_use]
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        self.get("content-disposition")
            .and_then(parse_content_disposition)
    }

    /// Decoded `Subject`, if present.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.get("subject")
            .map(decode_encoded_words)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Outcome of reading a header section line by line.
#[derive(Debug)]
pub(crate) struct HeaderBlock<'a> {
    pub headers: Headers,
    pub body: &'a [u8],
    /// First line that is neither a field nor a continuation (1-based).
    pub first_invalid: Option<(usize, String)>,
}

/// Split `raw` into its header section and body.
///
/// The header section ends at the first empty line. A leading mbox
/// `From ` separator line is skipped.
pub(crate) fn read_header_block(raw: &[u8]) -> HeaderBlock<'_> {
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut first_invalid = None;
    let mut pos = 0;
    let mut line_no = 0;

    while pos < raw.len() {
        let end = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(raw.len());
        let line = trim_line_ending(&raw[pos..end]);
        line_no += 1;
        pos = end;

        if line.is_empty() {
            return HeaderBlock {
                headers: Headers { fields },
                body: &raw[pos..],
                first_invalid,
            };
        }

        if line_no == 1 && line.starts_with(b"From ") {
            continue;
        }

        if line[0] == b' ' || line[0] == b'\t' {
            if let Some((_, value)) = fields.last_mut() {
                let continuation = bytes_to_string(line);
                value.push(' ');
                value.push_str(continuation.trim());
                continue;
            }
        }

        match split_field(line) {
            Some((name, value)) => fields.push((name, value)),
            None => {
                if first_invalid.is_none() {
                    first_invalid = Some((line_no, bytes_to_string(line)));
                }
            }
        }
    }

    HeaderBlock {
        headers: Headers { fields },
        body: &raw[raw.len()..],
        first_invalid,
    }
}

fn split_field(line: &[u8]) -> Option<(String, String)> {
    let colon = line.iter().position(|&b| b == b':')?;
    let name = &line[..colon];
    if name.is_empty() || !name.iter().all(|&b| b.is_ascii_graphic()) {
        return None;
    }
    let value = bytes_to_string(&line[colon + 1..]);
    Some((bytes_to_string(name), value.trim().to_string()))
}

pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Header bytes as text: UTF-8 when valid, ISO-8859-1 otherwise.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => decode_charset(bytes, Some("iso-8859-1")),
    }
}

/// Parsed `Content-Type` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    primary: String,
    sub: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    fn text_plain() -> Self {
        Self {
            primary: "text".to_string(),
            sub: "plain".to_string(),
            params: Vec::new(),
        }
    }

    /// Lower-cased `type/subtype`.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.primary, self.sub)
    }

    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    #[must_use]
    pub fn sub(&self) -> &str {
        &self.sub
    }

    #[must_use]
    pub fn is(&self, primary: &str, sub: &str) -> bool {
        self.primary.eq_ignore_ascii_case(primary) && self.sub.eq_ignore_ascii_case(sub)
    }

    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.primary == "multipart"
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.primary == "text"
    }

    #[must_use]
    pub fn is_message(&self) -> bool {
        self.is("message", "rfc822") || self.is("message", "global")
    }

    /// Parameter value (case-insensitive name), RFC 2231 already applied.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.params, name)
    }
}

/// Parsed `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    kind: String,
    params: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Lower-cased disposition type (`inline`, `attachment`, ...).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.params, name)
    }
}

fn lookup<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse a `Content-Type` value such as `text/html; charset="utf-8"`.
#[must_use]
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let (type_part, params_part) = value.split_once(';').unwrap_or((value, ""));
    let (primary, sub) = type_part.trim().split_once('/')?;
    let primary = primary.trim().to_ascii_lowercase();
    let sub = sub.trim().to_ascii_lowercase();
    if !is_token(&primary) || !is_token(&sub) {
        return None;
    }
    Some(ContentType {
        primary,
        sub,
        params: parse_parameters(params_part),
    })
}

/// Parse a `Content-Disposition` value such as `attachment; filename=a.pdf`.
#[must_use]
pub fn parse_content_disposition(value: &str) -> Option<ContentDisposition> {
    let (kind, params_part) = value.split_once(';').unwrap_or((value, ""));
    let kind = kind.trim().to_ascii_lowercase();
    if !is_token(&kind) {
        return None;
    }
    Some(ContentDisposition {
        kind,
        params: parse_parameters(params_part),
    })
}

/// RFC 2045 token: non-empty, no spaces, controls or tspecials.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b)
        })
}

/// Parse a parameter list and resolve RFC 2231 extended and continued values.
/// Plain values have RFC 2047 encoded-words expanded.
#[must_use]
pub fn parse_parameters(s: &str) -> Vec<(String, String)> {
    let raw = split_parameters(s);

    let mut names: Vec<String> = Vec::new();
    for (name, _) in &raw {
        let base = base_name(name).to_string();
        if !names.contains(&base) {
            names.push(base);
        }
    }

    names
        .into_iter()
        .filter_map(|base| resolve_parameter(&base, &raw).map(|v| (base, v)))
        .collect()
}

fn base_name(name: &str) -> &str {
    name.split('*').next().unwrap_or(name)
}

/// Resolve one parameter: `name*` beats `name*0..` beats plain `name`.
fn resolve_parameter(base: &str, raw: &[(String, String)]) -> Option<String> {
    let extended = format!("{base}*");
    if let Some((_, v)) = raw.iter().find(|(n, _)| *n == extended) {
        return Some(decode_extended(v, true).0);
    }

    let mut segments: Vec<(u32, bool, &str)> = raw
        .iter()
        .filter_map(|(n, v)| {
            let rest = n.strip_prefix(base)?.strip_prefix('*')?;
            let (index, is_extended) = match rest.strip_suffix('*') {
                Some(i) => (i, true),
                None => (rest, false),
            };
            index.parse::<u32>().ok().map(|i| (i, is_extended, v.as_str()))
        })
        .collect();

    if !segments.is_empty() {
        segments.sort_by_key(|(i, _, _)| *i);
        let mut charset: Option<String> = None;
        let mut bytes: Vec<u8> = Vec::new();
        for (i, is_extended, value) in segments {
            if is_extended {
                let (decoded, cs) = decode_extended_bytes(value, i == 0);
                if cs.is_some() {
                    charset = cs;
                }
                bytes.extend_from_slice(&decoded);
            } else {
                bytes.extend_from_slice(value.as_bytes());
            }
        }
        return Some(decode_charset(&bytes, charset.as_deref()));
    }

    raw.iter()
        .find(|(n, _)| n == base)
        .map(|(_, v)| decode_encoded_words(v))
}

/// Decode `charset'language'percent-encoded` (RFC 2231 §4).
fn decode_extended(value: &str, has_charset: bool) -> (String, Option<String>) {
    let (bytes, charset) = decode_extended_bytes(value, has_charset);
    (decode_charset(&bytes, charset.as_deref()), charset)
}

fn decode_extended_bytes(value: &str, has_charset: bool) -> (Vec<u8>, Option<String>) {
    let mut charset = None;
    let mut encoded = value;
    if has_charset {
        let mut pieces = value.splitn(3, '\'');
        if let (Some(cs), Some(_lang), Some(rest)) = (pieces.next(), pieces.next(), pieces.next())
        {
            if !cs.is_empty() {
                charset = Some(cs.to_string());
            }
            encoded = rest;
        }
    }
    (percent_decode_str(encoded).collect(), charset)
}

/// Split `; name=value; name="quoted"` into lower-cased names and raw values.
fn split_parameters(s: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ';' || c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if chars.next() != Some('=') {
            continue;
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ';' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        let name = name.trim().to_ascii_lowercase();
        if !name.is_empty() {
            params.push((name, value));
        }
    }

    params
}

/// Default content type for a child of the given multipart container.
pub(crate) fn default_child_type(parent: Option<&ContentType>) -> &'static str {
    match parent {
        Some(ct) if ct.is("multipart", "digest") => crate::config::DIGEST_CONTENT_TYPE,
        _ => DEFAULT_CONTENT_TYPE,
    }
}
