//! XML entity decoding
//!
//! Handles the predefined entities (&lt; &gt; &amp; &quot; &apos;) and
//! numeric character references (&#123; &#x7B;).
//!
//! Uses Cow for zero-copy when no references are present.

use crate::error::{Error, Result};
use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references.
///
/// Returns Borrowed if no references are present (zero-copy), Owned
/// otherwise. `base` is the byte offset of `input` in the source document,
/// used for error positions. Any reference outside the predefined set, an
/// unterminated reference, and a character reference that does not denote a
/// valid Unicode scalar all fail with `MalformedXml`.
pub fn decode_text(input: &str, base: usize) -> Result<Cow<'_, str>> {
    let bytes = input.as_bytes();
    if memchr(b'&', bytes).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        match memchr(b'&', &bytes[pos..]) {
            Some(amp) => {
                result.push_str(&input[pos..pos + amp]);
                pos += amp;

                let semi = memchr(b';', &bytes[pos..]).ok_or_else(|| {
                    Error::malformed("unterminated entity reference", base + pos)
                })?;
                let entity = &input[pos + 1..pos + semi];
                let decoded = decode_entity(entity).ok_or_else(|| {
                    Error::malformed(format!("unknown entity reference '&{entity};'"), base + pos)
                })?;
                result.push(decoded);
                pos += semi + 1;
            }
            None => {
                result.push_str(&input[pos..]);
                break;
            }
        }
    }

    Ok(Cow::Owned(result))
}

/// Decode a single entity body (without the surrounding & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference body (decimal, or hex after 'x')
fn decode_numeric_entity(body: &str) -> Option<char> {
    let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_is_borrowed() {
        let decoded = decode_text("plain text", 0).unwrap();
        assert!(matches!(decoded, Cow::Borrowed("plain text")));
    }

    #[test]
    fn test_predefined_entities() {
        let decoded = decode_text("a &lt; b &amp; c &gt; d", 0).unwrap();
        assert_eq!(decoded, "a < b & c > d");
    }

    #[test]
    fn test_quote_entities() {
        assert_eq!(decode_text("&quot;hi&quot;", 0).unwrap(), "\"hi\"");
        assert_eq!(decode_text("&apos;hi&apos;", 0).unwrap(), "'hi'");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_text("&#65;&#x42;", 0).unwrap(), "AB");
        assert_eq!(decode_text("&#x20AC;", 0).unwrap(), "\u{20AC}");
    }

    #[test]
    fn test_unknown_entity_fails() {
        let err = decode_text("x &nbsp; y", 10).unwrap_err();
        assert!(matches!(err, Error::MalformedXml { position: 12, .. }));
    }

    #[test]
    fn test_unterminated_reference_fails() {
        assert!(decode_text("a & b", 0).is_err());
    }

    #[test]
    fn test_invalid_codepoint_fails() {
        assert!(decode_text("&#xD800;", 0).is_err());
    }
}
