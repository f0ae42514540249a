//! Cuts raw input into parameters.

use std::borrow::Cow;

use tracing::debug;

use crate::config::{Charset, Delimiter, ParseOptions};
use crate::error::{Error, Result};
use crate::utils::{ISO_SENTINEL, SENTINEL_PREFIX, UTF8_SENTINEL};

/// Strips the optional `?` prefix and turns percent-encoded brackets
/// (`%5B`, `%5D`, either case) into literal ones.
pub(crate) fn normalize<'a>(input: &'a str, options: &ParseOptions) -> Cow<'a, str> {
    let input = if options.ignore_query_prefix {
        input.strip_prefix('?').unwrap_or(input)
    } else {
        input
    };

    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut last_segment = 0;
    let mut idx = 0;
    while idx + 2 < bytes.len() {
        if bytes[idx] == b'%' && bytes[idx + 1] == b'5' {
            let bracket = match bytes[idx + 2] {
                b'B' | b'b' => Some('['),
                b'D' | b'd' => Some(']'),
                _ => None,
            };
            if let Some(bracket) = bracket {
                out.push_str(&input[last_segment..idx]);
                out.push(bracket);
                idx += 3;
                last_segment = idx;
                continue;
            }
        }
        idx += 1;
    }
    if last_segment == 0 {
        return Cow::Borrowed(input);
    }
    out.push_str(&input[last_segment..]);
    Cow::Owned(out)
}

/// Splits on the delimiter, keeping at most `parameter_limit` pieces and
/// discarding the rest.
pub(crate) fn split<'a>(input: &'a str, options: &ParseOptions) -> Result<Vec<&'a str>> {
    let limit = options.parameter_limit_value();
    let bound = if options.throw_on_limit_exceeded {
        limit.saturating_add(1)
    } else {
        limit
    };

    let pieces: Vec<&str> = match &options.delimiter {
        Delimiter::Str(delimiter) => input.split(delimiter.as_ref()).take(bound).collect(),
        Delimiter::Pattern(pattern) => pattern.split(input).take(bound).collect(),
    };

    if pieces.len() > limit {
        return Err(Error::ParameterLimitExceeded { limit });
    }
    if !options.throw_on_limit_exceeded && pieces.len() == limit {
        debug!(limit, "parameter limit reached, ignoring remaining input");
    }
    Ok(pieces)
}

/// Looks for the first `utf8=` piece. A recognised sentinel is removed and
/// its charset returned; anything else is left alone.
pub(crate) fn take_sentinel(pieces: &mut Vec<&str>) -> Option<Charset> {
    let position = pieces.iter().position(|p| p.starts_with(SENTINEL_PREFIX))?;
    let charset = match pieces[position] {
        UTF8_SENTINEL => Charset::Utf8,
        ISO_SENTINEL => Charset::Iso88591,
        _ => return None,
    };
    pieces.remove(position);
    debug!(%charset, "charset sentinel found");
    Some(charset)
}

/// Splits a piece into its raw key and raw value.
///
/// The separator is the first `=`, except that `]=` takes precedence so that
/// `a[b=c]=d` splits after the bracket.
pub(crate) fn split_pair(piece: &str) -> (&str, Option<&str>) {
    let pos = match piece.find("]=") {
        Some(bracket) => Some(bracket + 1),
        None => piece.find('='),
    };
    match pos {
        Some(pos) => (&piece[..pos], Some(&piece[pos + 1..])),
        None => (piece, None),
    }
}
