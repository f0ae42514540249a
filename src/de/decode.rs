use std::borrow::Cow;

use crate::config::Charset;

#[inline(always)]
fn char_to_digit(c: u8) -> Option<u8> {
    char::from(c).to_digit(16).map(|d| d as u8)
}

/// Decodes a percent-encoded key or value.
///
/// - Replaces `+` with a space
/// - Decodes `%XX` sequences as bytes of the given charset
///
/// With UTF-8, a string containing a malformed escape (`%GG`, a truncated
/// `%2`) or escapes that do not form valid UTF-8 is returned with only the
/// `+` replacement applied. With ISO-8859-1, every well-formed `%XX` becomes
/// the code point of the same value and anything else is kept literally.
/// `%uXXXX` is never recognised.
///
/// ```
/// use qs_tree::{decode, Charset};
///
/// assert_eq!(decode("a+b%20c", Charset::Utf8), "a b c");
/// assert_eq!(decode("%E2%9C%93", Charset::Utf8), "✓");
/// assert_eq!(decode("%A2", Charset::Iso88591), "¢");
/// assert_eq!(decode("100%GG", Charset::Utf8), "100%GG");
/// ```
pub fn decode(input: &str, charset: Charset) -> Cow<'_, str> {
    if !input.bytes().any(|b| b == b'+' || b == b'%') {
        return Cow::Borrowed(input);
    }

    let spaced = replace_plus(input);
    match charset {
        Charset::Utf8 => match decode_utf8(&spaced) {
            Some(decoded) => Cow::Owned(decoded),
            None => spaced,
        },
        Charset::Iso88591 => Cow::Owned(decode_latin1(&spaced)),
    }
}

fn replace_plus(input: &str) -> Cow<'_, str> {
    if input.contains('+') {
        Cow::Owned(input.replace('+', " "))
    } else {
        Cow::Borrowed(input)
    }
}

/// Returns `None` if any escape is malformed or the bytes are not UTF-8.
fn decode_utf8(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let b = bytes[idx];
        if b == b'%' {
            let h = bytes.get(idx + 1).copied().and_then(char_to_digit)?;
            let l = bytes.get(idx + 2).copied().and_then(char_to_digit)?;
            decoded.push(h * 0x10 + l);
            idx += 3;
        } else {
            decoded.push(b);
            idx += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

fn decode_latin1(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = String::with_capacity(input.len());
    let mut last_segment = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let pair = bytes
                .get(idx + 1)
                .copied()
                .and_then(char_to_digit)
                .zip(bytes.get(idx + 2).copied().and_then(char_to_digit));
            if let Some((h, l)) = pair {
                decoded.push_str(&input[last_segment..idx]);
                decoded.push(char::from(h * 0x10 + l));
                idx += 3;
                last_segment = idx;
                continue;
            }
        }
        idx += 1;
    }
    decoded.push_str(&input[last_segment..]);
    decoded
}

/// Replaces decimal numeric entities (`&#9786;`) with the characters they
/// name. Entities that do not name a valid character are left as they are.
pub(crate) fn interpret_numeric_entities(input: &str) -> Cow<'_, str> {
    if !input.contains("&#") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        let entity = (digits > 0 && tail.as_bytes().get(digits) == Some(&b';'))
            .then(|| tail[..digits].parse::<u32>().ok().and_then(char::from_u32))
            .flatten();
        match entity {
            Some(c) => {
                out.push(c);
                rest = &tail[digits + 1..];
            }
            None => {
                out.push_str("&#");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
