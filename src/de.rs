//! Parsing querystrings into value trees.
//!
//! ### An overview of the design of the parser
//!
//! Parsing runs in two passes. The first pass cuts the input into
//! parameters and decodes each key and value, collecting them into a flat,
//! insertion-ordered map keyed by the full decoded key. Repeated keys are
//! resolved here according to the [`Duplicates`] policy.
//!
//! The second pass walks the flat map in order. Each key is split into a
//! path of [`PathSegment`]s (see [`split_key`]), the value is wrapped into a
//! subtree following that path, and the subtree is [`merge`]d into the
//! result. Arrays are finally compacted so that gaps left by indices such as
//! `a[1]=b&a[5]=c` disappear, unless sparse arrays were requested.
//!
//! [`merge`]: crate::merge

mod build;
mod decode;
mod key;
mod split;

pub use decode::decode;
pub use key::{split_key, Notation, PathSegment, SegmentKind};

use indexmap::map::Entry;
use tracing::trace;

use crate::config::{Charset, Duplicates, Kind, ParseOptions};
use crate::error::{Error, Result};
use crate::merge::{combine, compact, merge_with};
use crate::value::{Map, Value};

/// Parses a querystring into an ordered map.
///
/// ```
/// use qs_tree::{parse, ParseOptions, Value};
///
/// let map = parse("a[b]=c&a[d]=e&f", &ParseOptions::new()).unwrap();
/// let a = map.get("a").unwrap();
/// assert_eq!(a.get("b"), Some(&Value::from("c")));
/// assert_eq!(a.get("d"), Some(&Value::from("e")));
/// assert_eq!(map.get("f"), Some(&Value::from("")));
/// ```
pub fn parse(input: &str, options: &ParseOptions) -> Result<Map> {
    let normalized = split::normalize(input, options);
    if normalized.is_empty() {
        return Ok(Map::new());
    }

    let flat = parse_values(&normalized, options)?;

    let mut root = Value::object();
    for (key, value) in flat {
        if let Some(tree) = build::parse_keys(&key, value, options)? {
            root = merge_with(root, tree, options.prototypes_allowed());
        }
    }

    let root = if options.allow_sparse { root } else { compact(root) };
    match root {
        Value::Object(map) => Ok(map),
        // merging objects into an object always yields an object
        _ => Ok(Map::new()),
    }
}

/// First pass: decoded keys mapped to decoded values, duplicates resolved.
fn parse_values(input: &str, options: &ParseOptions) -> Result<Map> {
    let mut pieces = split::split(input, options)?;
    let mut charset = options.charset;
    if options.charset_sentinel {
        if let Some(detected) = split::take_sentinel(&mut pieces) {
            charset = detected;
        }
    }

    let mut flat = Map::with_capacity(pieces.len());
    for piece in pieces {
        if piece.is_empty() {
            continue;
        }

        let (raw_key, raw_value) = split::split_pair(piece);
        let key = decode_part(raw_key, charset, Kind::Key, options)?;
        if key.is_empty() {
            continue;
        }

        let mut value = match raw_value {
            None if options.strict_null_handling => Value::Null,
            None => Value::String(String::new()),
            Some(raw) => parse_value(raw, charset, options)?,
        };

        if options.interpret_numeric_entities && charset == Charset::Iso88591 {
            value = map_strings(value, |s| {
                if s.contains("&#") {
                    decode::interpret_numeric_entities(&s).into_owned()
                } else {
                    s
                }
            });
        }

        if piece.contains("[]=") {
            if let Value::Array(_) = value {
                value = Value::Array(vec![value]);
            }
        }

        trace!(key = %key, "parsed parameter");
        match flat.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => match options.duplicates {
                Duplicates::Combine => {
                    let existing = std::mem::take(entry.get_mut());
                    let combined = combine(existing, value);
                    check_array_limit(&combined, options)?;
                    *entry.get_mut() = combined;
                }
                Duplicates::First => {}
                Duplicates::Last => {
                    entry.insert(value);
                }
            },
        }
    }
    Ok(flat)
}

/// Decodes one value, splitting on `,` first when the comma option is on.
fn parse_value(raw: &str, charset: Charset, options: &ParseOptions) -> Result<Value> {
    if options.comma && raw.contains(',') {
        let items = raw
            .split(',')
            .map(|item| decode_part(item, charset, Kind::Value, options).map(Value::String))
            .collect::<Result<Vec<_>>>()?;
        let value = Value::Array(items);
        check_array_limit(&value, options)?;
        return Ok(value);
    }
    decode_part(raw, charset, Kind::Value, options).map(Value::String)
}

fn decode_part(raw: &str, charset: Charset, kind: Kind, options: &ParseOptions) -> Result<String> {
    match &options.decoder {
        Some(decoder) => decoder(raw, charset, kind).map_err(Error::DecoderFailure),
        None => Ok(decode(raw, charset).into_owned()),
    }
}

fn check_array_limit(value: &Value, options: &ParseOptions) -> Result<()> {
    if !options.throw_on_limit_exceeded {
        return Ok(());
    }
    let limit = options.array_limit_value();
    match value {
        Value::Array(items) if items.len() > limit => Err(Error::ArrayLimitExceeded { limit }),
        _ => Ok(()),
    }
}

fn map_strings(value: Value, f: impl Fn(String) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(f(s)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}
