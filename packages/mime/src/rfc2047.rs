//! RFC 2047 encoded-word decoding (e.g. `=?utf-8?q?caf=C3=A9?=`).
//!
//! Used for `Subject` and for filename parameters written by clients that
//! ignore RFC 2231.

use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};

/// Expand every encoded-word in `s`.
///
/// Whitespace between two adjacent encoded-words is dropped, as RFC 2047
/// §6.2 requires. Anything that does not parse as an encoded-word is kept
/// verbatim.
#[must_use]
pub fn decode_encoded_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    let mut previous_was_word = false;

    while let Some(start) = rest.find("=?") {
        let literal = &rest[..start];
        match decode_one(&rest[start..]) {
            Some((decoded, consumed)) => {
                if !(previous_was_word && literal.chars().all(char::is_whitespace)) {
                    out.push_str(literal);
                }
                out.push_str(&decoded);
                rest = &rest[start + consumed..];
                previous_was_word = true;
            }
            None => {
                out.push_str(literal);
                out.push_str("=?");
                rest = &rest[start + 2..];
                previous_was_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode one encoded-word at the start of `s`.
/// Returns the decoded text and the number of bytes consumed.
fn decode_one(s: &str) -> Option<(String, usize)> {
    let body = s.strip_prefix("=?")?;
    let (charset, body) = body.split_once('?')?;
    let (encoding, body) = body.split_once('?')?;
    let end = body.find("?=")?;
    let payload = &body[..end];

    if charset.is_empty() || payload.contains(char::is_whitespace) {
        return None;
    }

    // RFC 2231 §5 allows a language suffix: charset*language
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload.as_bytes()),
        "Q" | "q" => decode_q(payload.as_bytes()),
        _ => return None,
    };

    let consumed = 2 + charset_len(s) + 1 + encoding.len() + 1 + end + 2;
    Some((decode_charset(&bytes, Some(charset)), consumed))
}

/// Length of the raw charset token (including any `*language` suffix).
fn charset_len(s: &str) -> usize {
    s[2..].find('?').unwrap_or(0)
}

/// Q encoding: `_` is a space, the rest is quoted-printable.
fn decode_q(payload: &[u8]) -> Vec<u8> {
    let replaced: Vec<u8> = payload
        .iter()
        .map(|&b| if b == b'_' { b' ' } else { b })
        .collect();
    decode_quoted_printable(&replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_b() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_decode_q() {
        assert_eq!(decode_encoded_words("=?utf-8?q?caf=C3=A9_au_lait?="), "café au lait");
    }

    #[test]
    fn test_decode_mixed_literal() {
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?B?V29ybGQ=?= again"),
            "Re: World again"
        );
    }

    #[test]
    fn test_adjacent_words_join() {
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?r=E9sum=E9?= =?ISO-8859-1?Q?.pdf?="),
            "résumé.pdf"
        );
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(decode_encoded_words("=?utf-8*en?q?hi?="), "hi");
    }

    #[test]
    fn test_not_an_encoded_word() {
        assert_eq!(decode_encoded_words("a =? b"), "a =? b");
        assert_eq!(decode_encoded_words("=?utf-8?x?abc?="), "=?utf-8?x?abc?=");
    }
}
