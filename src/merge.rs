//! Combinators over value trees: [`merge`] and [`compact`].

use std::mem;

use crate::utils;
use crate::value::{Map, Value};

/// Merges `source` into `target`, returning the combined value.
///
/// The rules follow how repeated querystring keys combine:
///
/// - a null `source` leaves `target` untouched
/// - two scalars become a two-element array, a scalar is appended to an array
/// - a scalar merged into an object becomes a key mapped to `true`, unless
///   its text is empty
/// - arrays merge by position, recursing where both sides hold a composite
///   and appending otherwise
/// - objects merge key by key; an array merged with an object contributes
///   its positions as string keys
///
/// ```
/// use qs_tree::{merge, Value};
///
/// let merged = merge(Value::from("a"), Value::from("b"));
/// assert_eq!(merged, Value::from(vec!["a".into(), "b".into()]));
/// ```
pub fn merge(target: Value, source: Value) -> Value {
    merge_with(target, source, false)
}

pub(crate) fn merge_with(target: Value, source: Value, allow_prototypes: bool) -> Value {
    let target = resolve(target);
    let source = resolve(source);
    if source.is_null() || source.is_hole() {
        return target;
    }

    if !source.is_composite() {
        return match target {
            Value::Array(mut items) => {
                items.push(source);
                Value::Array(items)
            }
            Value::Object(mut map) => {
                if let Some(key) = source.primitive_text().filter(|key| !key.is_empty()) {
                    let denied = key == utils::PROTO_KEY
                        || (!allow_prototypes && utils::is_prototype_key(&key));
                    if !denied {
                        map.insert(key.into_owned(), Value::Bool(true));
                    }
                }
                Value::Object(map)
            }
            scalar => Value::Array(vec![scalar, source]),
        };
    }

    match (target, source) {
        (Value::Array(target), Value::Array(source)) => {
            Value::Array(merge_arrays(target, source, allow_prototypes))
        }
        (Value::Array(target), Value::Object(source)) => Value::Object(merge_maps(
            array_to_map(target),
            source,
            allow_prototypes,
        )),
        (Value::Object(target), Value::Array(source)) => Value::Object(merge_maps(
            target,
            array_to_map(source),
            allow_prototypes,
        )),
        (Value::Object(target), Value::Object(source)) => {
            Value::Object(merge_maps(target, source, allow_prototypes))
        }
        (scalar, source) => combine(scalar, source),
    }
}

fn merge_arrays(mut target: Vec<Value>, source: Vec<Value>, allow_prototypes: bool) -> Vec<Value> {
    for (i, item) in source.into_iter().enumerate() {
        if item.is_hole() {
            continue;
        }
        match target.get_mut(i) {
            Some(existing) if !existing.is_hole() => {
                if existing.is_composite() && item.is_composite() {
                    let current = mem::take(existing);
                    *existing = merge_with(current, item, allow_prototypes);
                } else {
                    target.push(item);
                }
            }
            Some(slot) => *slot = item,
            None => {
                target.resize(i, Value::Hole);
                target.push(item);
            }
        }
    }
    target
}

fn merge_maps(mut target: Map, source: Map, allow_prototypes: bool) -> Map {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => {
                let current = mem::take(existing);
                *existing = merge_with(current, value, allow_prototypes);
            }
            None => {
                target.insert(key, value);
            }
        }
    }
    target
}

fn array_to_map(items: Vec<Value>) -> Map {
    let mut buffer = itoa::Buffer::new();
    items
        .into_iter()
        .enumerate()
        .filter(|(_, item)| !item.is_hole())
        .map(|(i, item)| (buffer.format(i).to_owned(), item))
        .collect()
}

fn resolve(value: Value) -> Value {
    match value {
        Value::Shared(shared) => shared.read().clone(),
        other => other,
    }
}

/// Concatenates two values into one array, flattening either side that is
/// already an array.
pub(crate) fn combine(a: Value, b: Value) -> Value {
    let mut items = match a {
        Value::Array(items) => items,
        other => vec![other],
    };
    match b {
        Value::Array(more) => items.extend(more),
        other => items.push(other),
    }
    Value::Array(items)
}

/// Removes holes from every array in the tree.
///
/// Explicit `Null` values are kept; only the gaps left behind by
/// out-of-order or skipped indices disappear. Shared handles are not
/// followed.
///
/// ```
/// use qs_tree::{compact, Value};
///
/// let sparse = Value::from(vec![Value::Hole, "b".into(), Value::Null]);
/// assert_eq!(compact(sparse), Value::from(vec!["b".into(), Value::Null]));
/// ```
pub fn compact(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|item| !item.is_hole())
                .map(compact)
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, compact(value)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn arr(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn merge_scalars() {
        assert_eq!(merge("a".into(), "b".into()), arr(&["a", "b"]));
    }

    #[test]
    fn merge_null_source_keeps_target() {
        let target = Value::from_iter([("b", "c")]);
        assert_eq!(merge(target.clone(), Value::Null), target);
        assert_eq!(merge(target.clone(), Value::Hole), target);
        // an empty flag is not a key
        assert_eq!(merge(target.clone(), "".into()), target);
    }

    #[test]
    fn merge_empty_scalars_are_still_scalars() {
        assert_eq!(merge("x".into(), "".into()), arr(&["x", ""]));
        assert_eq!(merge("".into(), "y".into()), arr(&["", "y"]));
        assert_eq!(merge(arr(&["x"]), "".into()), arr(&["x", ""]));
        assert_eq!(
            merge(Value::Bool(false), Value::Int(0)),
            Value::Array(vec![Value::Bool(false), Value::Int(0)])
        );

        let left = merge(merge("x".into(), "".into()), "y".into());
        let right = merge("x".into(), merge("".into(), "y".into()));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_scalar_into_array_appends() {
        assert_eq!(merge(arr(&["a"]), "b".into()), arr(&["a", "b"]));
    }

    #[test]
    fn merge_scalar_into_object_adds_flag() {
        let merged = merge(Value::from_iter([("a", "b")]), "c".into());
        assert_eq!(
            merged,
            Value::from_iter([("a", Value::from("b")), ("c", Value::Bool(true))])
        );
    }

    #[test]
    fn merge_prototype_scalar_into_object_is_dropped() {
        let merged = merge(Value::object(), "hasOwnProperty".into());
        assert_eq!(merged, Value::object());

        let merged = merge_with(Value::object(), "hasOwnProperty".into(), true);
        assert_eq!(merged, Value::from_iter([("hasOwnProperty", true)]));

        let merged = merge_with(Value::object(), "__proto__".into(), true);
        assert_eq!(merged, Value::object());
    }

    #[test]
    fn merge_scalar_with_array_prepends() {
        assert_eq!(merge("a".into(), arr(&["b", "c"])), arr(&["a", "b", "c"]));
    }

    #[test]
    fn merge_arrays_by_position() {
        let target = Value::Array(vec![Value::Hole, "c".into()]);
        assert_eq!(merge(target, arr(&["b"])), arr(&["b", "c"]));

        // occupied scalar positions append instead of overwriting
        assert_eq!(merge(arr(&["a"]), arr(&["b"])), arr(&["a", "b"]));
    }

    #[test]
    fn merge_arrays_recurse_into_objects() {
        let target = Value::Array(vec![Value::from_iter([("a", "1")])]);
        let source = Value::Array(vec![Value::from_iter([("b", "2")])]);
        assert_eq!(
            merge(target, source),
            Value::Array(vec![Value::from_iter([("a", "1"), ("b", "2")])])
        );
    }

    #[test]
    fn merge_array_past_end_pads_with_holes() {
        let source = Value::Array(vec![Value::Hole, Value::Hole, "c".into()]);
        assert_eq!(
            merge(Value::Array(vec![]), source),
            Value::Array(vec![Value::Hole, Value::Hole, "c".into()])
        );
    }

    #[test]
    fn merge_object_with_array_uses_index_keys() {
        let target = Value::from_iter([("a", "x")]);
        let source = Value::Array(vec![Value::Hole, "y".into()]);
        assert_eq!(
            merge(target, source),
            Value::from_iter([("a", "x"), ("1", "y")])
        );

        let merged = merge(arr(&["x"]), Value::from_iter([("k", "v")]));
        assert_eq!(merged, Value::from_iter([("0", "x"), ("k", "v")]));
    }

    #[test]
    fn merge_objects_recursively_in_order() {
        let target = Value::from_iter([("a", Value::from_iter([("b", "1")])), ("z", "9".into())]);
        let source = Value::from_iter([("a", Value::from_iter([("c", "2")])), ("m", "3".into())]);
        let merged = merge(target, source);
        assert_eq!(
            merged,
            Value::from_iter([
                ("a", Value::from_iter([("b", "1"), ("c", "2")])),
                ("z", "9".into()),
                ("m", "3".into()),
            ])
        );
    }

    #[test]
    fn combine_flattens_one_level() {
        assert_eq!(combine(arr(&["a"]), "b".into()), arr(&["a", "b"]));
        assert_eq!(combine("a".into(), arr(&["b", "c"])), arr(&["a", "b", "c"]));
    }

    #[test]
    fn compact_removes_holes_only() {
        let value = Value::from_iter([(
            "a",
            Value::Array(vec![
                Value::Hole,
                Value::Null,
                Value::Array(vec![Value::Hole, "x".into()]),
            ]),
        )]);
        assert_eq!(
            compact(value),
            Value::from_iter([(
                "a",
                Value::Array(vec![Value::Null, arr(&["x"])]),
            )])
        );
    }
}
