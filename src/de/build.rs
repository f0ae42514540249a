//! Builds the subtree for one parameter.

use tracing::debug;

use crate::config::ParseOptions;
use crate::merge::combine;
use crate::utils::{self, PROTO_KEY};
use crate::value::{Map, Value};

use super::key::{PathSegment, SegmentKind};

/// Returns true if any segment names a prototype key that must not be
/// written. The folded overflow tail is never inspected.
pub(crate) fn is_denied(path: &[PathSegment], options: &ParseOptions) -> bool {
    path.iter().filter(|s| !s.is_overflow()).any(|segment| {
        segment.raw == PROTO_KEY
            || (!options.prototypes_allowed() && utils::is_prototype_key(&segment.raw))
    })
}

/// Wraps `leaf` in containers for each segment of `path`, innermost first.
///
/// A path `a[0][b]` with leaf `c` becomes `{a: [{b: c}]}`; an index past
/// zero leaves holes in front of the value, which merging and compaction
/// deal with later.
pub(crate) fn build(path: &[PathSegment], leaf: Value, options: &ParseOptions) -> Value {
    path.iter().rev().fold(leaf, |leaf, segment| match segment.kind {
        SegmentKind::Empty if options.arrays() => {
            let empty = match &leaf {
                Value::String(s) => s.is_empty(),
                Value::Null => options.strict_null_handling,
                _ => false,
            };
            if options.allow_empty_arrays && empty {
                Value::Array(Vec::new())
            } else {
                combine(Value::Array(Vec::new()), leaf)
            }
        }
        SegmentKind::Empty => single_entry("0".to_owned(), leaf),
        SegmentKind::Index(index) => {
            let mut items = vec![Value::Hole; index as usize];
            items.push(leaf);
            Value::Array(items)
        }
        SegmentKind::Ident | SegmentKind::Literal => single_entry(segment.raw.clone(), leaf),
    })
}

fn single_entry(key: String, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(key, value);
    Value::Object(map)
}

/// Splits `key` and builds its subtree, or returns `None` if the parameter
/// is discarded.
pub(crate) fn parse_keys(
    key: &str,
    value: Value,
    options: &ParseOptions,
) -> crate::Result<Option<Value>> {
    if key.is_empty() {
        return Ok(None);
    }
    let path = super::key::split_key(key, options)?;
    if is_denied(&path, options) {
        debug!(key, "discarding parameter with a prototype key");
        return Ok(None);
    }
    Ok(Some(build(&path, value, options)))
}
