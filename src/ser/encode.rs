use std::borrow::Cow;
use std::fmt::Write;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::config::{Charset, Format};

/// The characters left alone by RFC 3986: ASCII alphanumerics and `-._~`.
///
/// Everything else, including the querystring control characters `&`, `=`,
/// `[`, `]` and `+`, is percent-encoded.
const UNRESERVED_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// RFC 1738 additionally allows `(` and `)` through unescaped.
const RFC1738_SET: &AsciiSet = &UNRESERVED_SET.remove(b'(').remove(b')');

/// Percent-encodes a key or value.
///
/// With ISO-8859-1, characters above `U+00FF` cannot be represented and are
/// written as a numeric entity (`&#9786;`), which is then percent-encoded
/// like any other text. With [`Format::Rfc1738`], spaces become `+`.
///
/// ```
/// use qs_tree::{encode, Charset, Format};
///
/// assert_eq!(encode("a b&c", Charset::Utf8, Format::Rfc3986), "a%20b%26c");
/// assert_eq!(encode("a b(c)", Charset::Utf8, Format::Rfc1738), "a+b(c)");
/// assert_eq!(encode("☺", Charset::Iso88591, Format::Rfc3986), "%26%239786%3B");
/// ```
pub fn encode(text: &str, charset: Charset, format: Format) -> Cow<'_, str> {
    if text.is_empty() {
        return Cow::Borrowed(text);
    }
    apply_format(percent_encode_text(text, charset, format), format)
}

/// Percent-encodes without rewriting spaces.
pub(crate) fn percent_encode_text(text: &str, charset: Charset, format: Format) -> Cow<'_, str> {
    let set = match format {
        Format::Rfc1738 => RFC1738_SET,
        Format::Rfc3986 => UNRESERVED_SET,
    };
    match charset {
        Charset::Utf8 => percent_encoding::utf8_percent_encode(text, set).into(),
        Charset::Iso88591 => {
            let bytes = latin1_bytes(text);
            Cow::Owned(percent_encoding::percent_encode(&bytes, set).to_string())
        }
    }
}

/// Rewrites encoded spaces for RFC 1738.
pub(crate) fn apply_format<'a>(text: Cow<'a, str>, format: Format) -> Cow<'a, str> {
    match format {
        Format::Rfc1738 if text.contains("%20") => Cow::Owned(text.replace("%20", "+")),
        _ => text,
    }
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut entity = String::new();
    for c in text.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(byte) => bytes.push(byte),
            Err(_) => {
                entity.clear();
                // writing into a String cannot fail
                let _ = write!(entity, "&#{};", u32::from(c));
                bytes.extend_from_slice(entity.as_bytes());
            }
        }
    }
    bytes
}
