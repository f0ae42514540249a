//! Turns one parameter's key text into a path of segments.

use std::borrow::Cow;

use tracing::trace;

use crate::config::ParseOptions;
use crate::error::{Error, Result};

/// What a path segment addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// A plain object key.
    Ident,
    /// An array position, e.g. `[3]`.
    Index(u32),
    /// An empty bracket, `[]`: append to an array.
    Empty,
    /// Key text that is not split any further: the whole key when nesting
    /// is disabled, or everything past the depth limit.
    Literal,
}

/// How a segment was written in the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notation {
    /// The leading part of the key, before any bracket.
    Root,
    /// `[segment]`
    Bracket,
    /// `.segment`
    Dot,
}

/// One step of a key path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSegment {
    pub kind: SegmentKind,
    /// The segment text without its surrounding brackets.
    pub raw: String,
    pub notation: Notation,
}

impl PathSegment {
    fn new(kind: SegmentKind, raw: impl Into<String>, notation: Notation) -> Self {
        PathSegment {
            kind,
            raw: raw.into(),
            notation,
        }
    }

    /// True for the tail folded together once the depth limit is reached.
    pub fn is_overflow(&self) -> bool {
        self.kind == SegmentKind::Literal && self.notation != Notation::Root
    }
}

/// A key after dot notation has been rewritten into brackets, remembering
/// which brackets came from dots.
struct Rewritten<'a> {
    text: Cow<'a, str>,
    dots: Vec<usize>,
}

/// Rewrites `a.b` into `a[b]`: a `.` followed by one or more characters
/// other than `.` and `[` becomes a bracket segment.
fn rewrite_dots(key: &str) -> Rewritten<'_> {
    if !key.contains('.') {
        return Rewritten {
            text: Cow::Borrowed(key),
            dots: Vec::new(),
        };
    }

    let mut text = String::with_capacity(key.len() + 2);
    let mut dots = Vec::new();
    let mut rest = key;
    while let Some(dot) = rest.find('.') {
        text.push_str(&rest[..dot]);
        let after = &rest[dot + 1..];
        let run = after.find(['.', '[']).unwrap_or(after.len());
        if run == 0 {
            text.push('.');
        } else {
            dots.push(text.len());
            text.push('[');
            text.push_str(&after[..run]);
            text.push(']');
        }
        rest = &after[run..];
    }
    text.push_str(rest);
    Rewritten {
        text: Cow::Owned(text),
        dots,
    }
}

/// Finds the next `[...]` group at or after `from` whose content holds no
/// other bracket. Returns the byte range including both brackets.
fn next_group(key: &str, from: usize) -> Option<(usize, usize)> {
    #[derive(Clone, Copy)]
    enum State {
        Ident,
        Bracket(usize),
    }

    let mut state = State::Ident;
    for (idx, b) in key.bytes().enumerate().skip(from) {
        state = match (state, b) {
            (_, b'[') => State::Bracket(idx),
            (State::Bracket(open), b']') => return Some((open, idx + 1)),
            (state, _) => state,
        };
    }
    None
}

/// Splits a decoded key into path segments.
///
/// ```
/// use qs_tree::{split_key, ParseOptions, SegmentKind};
///
/// let path = split_key("a[b][0][]", &ParseOptions::new()).unwrap();
/// let kinds: Vec<_> = path.iter().map(|s| s.kind).collect();
/// assert_eq!(
///     kinds,
///     [SegmentKind::Ident, SegmentKind::Ident, SegmentKind::Index(0), SegmentKind::Empty]
/// );
/// ```
pub fn split_key(key: &str, options: &ParseOptions) -> Result<Vec<PathSegment>> {
    let depth = options.depth_limit();
    if depth == 0 {
        return Ok(vec![PathSegment::new(SegmentKind::Literal, key, Notation::Root)]);
    }

    let rewritten = if options.dots() {
        rewrite_dots(key)
    } else {
        Rewritten {
            text: Cow::Borrowed(key),
            dots: Vec::new(),
        }
    };
    let key: &str = &rewritten.text;

    let mut segments = Vec::new();
    let first = next_group(key, 0);
    let parent = first.map_or(key, |(start, _)| &key[..start]);
    if !parent.is_empty() {
        let raw = decode_dots(parent, options);
        segments.push(PathSegment::new(SegmentKind::Ident, raw, Notation::Root));
    }

    // the leading key counts towards the depth, so `depth` is the maximum
    // number of segments before the rest is folded into a literal
    let mut from = 0;
    let mut overflow = None;
    while let Some((start, end)) = next_group(key, from) {
        if segments.len() >= depth {
            overflow = Some(start);
            break;
        }
        let notation = if rewritten.dots.contains(&start) {
            Notation::Dot
        } else {
            Notation::Bracket
        };
        let content = decode_dots(&key[start + 1..end - 1], options);
        let kind = classify(&content, options)?;
        segments.push(PathSegment::new(kind, content, notation));
        from = end;
    }

    if let Some(start) = overflow {
        if options.strict_depth {
            return Err(Error::DepthLimitExceeded { depth });
        }
        let raw = decode_dots(&key[start..], options);
        segments.push(PathSegment::new(SegmentKind::Literal, raw, Notation::Bracket));
    }

    trace!(key, segments = segments.len(), "split key");
    Ok(segments)
}

fn decode_dots<'a>(text: &'a str, options: &ParseOptions) -> Cow<'a, str> {
    if options.decode_dot_in_keys && text.contains("%2E") {
        Cow::Owned(text.replace("%2E", "."))
    } else {
        Cow::Borrowed(text)
    }
}

/// Decides whether bracket content is an array index, an append, or a key.
fn classify(content: &str, options: &ParseOptions) -> Result<SegmentKind> {
    if content.is_empty() {
        return Ok(SegmentKind::Empty);
    }
    if !options.arrays() || !content.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(SegmentKind::Ident);
    }
    // leading zeros make this a key: `[01]` is not `[1]`
    let canonical = content == "0" || !content.starts_with('0');
    let Some(index) = content.parse::<u32>().ok().filter(|_| canonical) else {
        return Ok(SegmentKind::Ident);
    };

    let limit = options.array_limit_value();
    if (index as usize) <= limit {
        Ok(SegmentKind::Index(index))
    } else if options.throw_on_limit_exceeded {
        Err(Error::ArrayLimitExceeded { limit })
    } else {
        Ok(SegmentKind::Ident)
    }
}
