//! Content-Transfer-Encoding and charset decoding.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use encoding_rs::{Encoding, UTF_8};

/// Base64 engine that accepts missing padding and stray trailing bits,
/// both of which are common in mail produced by real-world clients.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode an entity body according to its Content-Transfer-Encoding.
///
/// `7bit`, `8bit`, `binary` and unknown encodings pass the bytes through.
#[must_use]
pub fn decode_transfer_encoding(encoding: Option<&str>, body: &[u8]) -> Vec<u8> {
    match encoding.map(str::trim) {
        Some(e) if e.eq_ignore_ascii_case("base64") => decode_base64(body),
        Some(e) if e.eq_ignore_ascii_case("quoted-printable") => decode_quoted_printable(body),
        _ => body.to_vec(),
    }
}

/// Decode base64, ignoring whitespace and any character outside the alphabet.
///
/// A damaged tail is dropped rather than failing the whole payload.
#[must_use]
pub fn decode_base64(src: &[u8]) -> Vec<u8> {
    let mut clean: Vec<u8> = src
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();
    if clean.len() % 4 == 1 {
        clean.pop();
    }

    match LENIENT_BASE64.decode(&clean) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!(error = %e, "base64 payload damaged, decoding whole quanta only");
            let whole = clean.len() / 4 * 4;
            LENIENT_BASE64.decode(&clean[..whole]).unwrap_or_default()
        }
    }
}

/// Decode quoted-printable. Handles `=XX` escapes and soft line breaks
/// (`=CRLF`, `=LF`); a malformed `=` is kept literally.
#[must_use]
pub fn decode_quoted_printable(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut pos = 0;

    while pos < src.len() {
        let b = src[pos];
        if b != b'=' {
            out.push(b);
            pos += 1;
            continue;
        }

        match (src.get(pos + 1), src.get(pos + 2)) {
            (Some(b'\r'), Some(b'\n')) => pos += 3,
            (Some(b'\n'), _) => pos += 2,
            (Some(&h1), Some(&h2)) => match (hex_value(h1), hex_value(h2)) {
                (Some(v1), Some(v2)) => {
                    out.push((v1 << 4) | v2);
                    pos += 3;
                }
                _ => {
                    out.push(b);
                    pos += 1;
                }
            },
            _ => {
                out.push(b);
                pos += 1;
            }
        }
    }

    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Convert header text in the given charset to a `String`.
///
/// A missing or unknown label is read as UTF-8 with replacement characters.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Transcode a text body to UTF-8 bytes.
///
/// The raw bytes are kept when the charset is missing or unknown, or when
/// they are not valid in the declared charset.
#[must_use]
pub fn decode_body_text(bytes: &[u8], charset: Option<&str>) -> Vec<u8> {
    let Some(label) = charset.map(str::trim).filter(|l| !l.is_empty()) else {
        return bytes.to_vec();
    };
    let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
        tracing::debug!(charset = label, "unknown body charset, keeping raw bytes");
        return bytes.to_vec();
    };

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(charset = label, "body is not valid in its charset, keeping raw bytes");
        return bytes.to_vec();
    }
    text.into_owned().into_bytes()
}
