//! The dynamically-typed value tree shared by the parse and stringify engines.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, Serialize, Serializer};

/// An insertion-ordered map from keys to values.
///
/// Order is significant: merging and stringifying both walk keys in the order
/// they were first inserted.
pub type Map = IndexMap<String, Value>;

/// A node of the value tree.
///
/// Parsing only ever produces `Null`, `Hole`, `String`, `Array` and `Object`.
/// The remaining variants exist so that callers can hand richer data to the
/// stringifier.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// An explicit absence of a value, distinct from the empty string.
    #[default]
    Null,
    /// A positional gap in an array, left behind when an index skips ahead
    /// of the current length. Holes are removed by [`compact`](crate::compact).
    Hole,
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Map),
    /// A composite with identity. Sharing the same handle in several places
    /// of a tree is allowed; reaching a handle from inside itself is a cycle.
    Shared(Shared),
}

impl Value {
    /// Creates an empty object.
    pub fn object() -> Self {
        Value::Object(Map::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_hole(&self) -> bool {
        matches!(self, Value::Hole)
    }

    /// Returns true for arrays, objects and shared handles.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_) | Value::Shared(_))
    }

    /// Returns true for leaf values that render as `key=value`.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::String(_) | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Date(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up `key` if this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Canonical text of a primitive; `None` for nulls, holes and composites.
    pub(crate) fn primitive_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Bool(true) => Some(Cow::Borrowed("true")),
            Value::Bool(false) => Some(Cow::Borrowed("false")),
            Value::Int(i) => Some(Cow::Owned(itoa::Buffer::new().format(*i).to_owned())),
            Value::Float(f) => Some(Cow::Owned(float_text(*f))),
            Value::Date(d) => Some(Cow::Owned(d.to_rfc3339_opts(SecondsFormat::Millis, true))),
            _ => None,
        }
    }
}

/// Integral floats below `1e21` print in full without a fraction, `1.0` as
/// `1`; anything else uses the shortest round-trip form.
fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_owned()
    } else if f == f64::INFINITY {
        "Infinity".to_owned()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e18 {
        itoa::Buffer::new().format(f as i64).to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        // f64 `Display` never switches to exponent notation
        format!("{f}")
    } else {
        ryu::Buffer::new().format_finite(f).to_owned()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_eq(self, other, &mut Vec::new())
    }
}

/// Structural equality. Object key order is not significant. Pairs of
/// shared handles already being compared further up count as equal, so
/// cyclic trees compare without recursing forever.
fn values_eq(a: &Value, b: &Value, visiting: &mut Vec<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) | (Value::Hole, Value::Hole) => true,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_eq(a, b, visiting))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, a)| {
                    b.get(key).is_some_and(|b| values_eq(a, b, visiting))
                })
        }
        (Value::Shared(a), Value::Shared(b)) => shared_eq(a, b, visiting),
        _ => false,
    }
}

fn shared_eq(a: &Shared, b: &Shared, visiting: &mut Vec<(usize, usize)>) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    let pair = (a.addr(), b.addr());
    if visiting.contains(&pair) {
        return true;
    }
    visiting.push(pair);
    let equal = values_eq(&a.read(), &b.read(), visiting);
    visiting.pop();
    equal
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Object(m)
    }
}

impl From<Shared> for Value {
    fn from(s: Shared) -> Self {
        Value::Shared(s)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A reference-counted handle giving a composite value an identity.
///
/// Two handles are the same node when they point at the same allocation;
/// this is what cycle detection in the stringifier compares.
#[derive(Clone, Default)]
pub struct Shared(Arc<RwLock<Value>>);

impl Shared {
    pub fn new(value: Value) -> Self {
        Shared(Arc::new(RwLock::new(value)))
    }

    /// Locks the handle for reading. A poisoned lock still yields its value.
    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the handle for writing, e.g. to close a cycle.
    pub fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ptr_eq(&self, other: &Shared) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Shared {
    // the contents may refer back to this handle, so only the address is shown
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:#x})", self.addr())
    }
}

impl PartialEq for Shared {
    fn eq(&self, other: &Self) -> bool {
        shared_eq(self, other, &mut Vec::new())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let active = RefCell::new(Vec::new());
        Guarded {
            value: self,
            active: &active,
        }
        .serialize(serializer)
    }
}

/// A value being serialized, together with the shared handles on the path
/// from the root. Reaching an active handle again is a cycle.
struct Guarded<'a> {
    value: &'a Value,
    active: &'a RefCell<Vec<usize>>,
}

impl Guarded<'_> {
    fn child<'c>(&'c self, value: &'c Value) -> Guarded<'c> {
        Guarded {
            value,
            active: self.active,
        }
    }
}

impl Serialize for Guarded<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Null | Value::Hole => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Date(d) => {
                serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Array(a) => serializer.collect_seq(a.iter().map(|item| self.child(item))),
            Value::Object(m) => {
                serializer.collect_map(m.iter().map(|(key, value)| (key, self.child(value))))
            }
            Value::Shared(shared) => {
                let addr = shared.addr();
                if self.active.borrow().contains(&addr) {
                    return Err(ser::Error::custom("cyclic reference"));
                }
                self.active.borrow_mut().push(addr);
                let result = self.child(&shared.read()).serialize(serializer);
                self.active.borrow_mut().pop();
                result
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any querystring value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::String(itoa::Buffer::new().format(v).to_owned()),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_preserves_key_order() {
        let value: Value = serde_json::from_str(r#"{"z":"1","a":["x",null],"m":{"k":true}}"#)
            .expect("valid json");
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(
            value.get("a"),
            Some(&Value::Array(vec!["x".into(), Value::Null]))
        );
        assert_eq!(value.get("m").and_then(|m| m.get("k")), Some(&Value::Bool(true)));
    }

    #[test]
    fn primitive_text_forms() {
        assert_eq!(Value::Int(-42).primitive_text().unwrap(), "-42");
        assert_eq!(Value::Float(1.0).primitive_text().unwrap(), "1");
        assert_eq!(Value::Float(0.5).primitive_text().unwrap(), "0.5");
        assert_eq!(Value::Float(1e15).primitive_text().unwrap(), "1000000000000000");
        assert_eq!(Value::Float(-1e16).primitive_text().unwrap(), "-10000000000000000");
        assert_eq!(
            Value::Float(1e20).primitive_text().unwrap(),
            "100000000000000000000"
        );
        assert_eq!(Value::Float(1e21).primitive_text().unwrap(), "1e21");
        assert_eq!(Value::Float(f64::NAN).primitive_text().unwrap(), "NaN");
        assert_eq!(Value::Bool(false).primitive_text().unwrap(), "false");
        assert_eq!(Value::Null.primitive_text(), None);
        assert_eq!(Value::Array(vec![]).primitive_text(), None);
    }

    #[test]
    fn holes_serialize_as_null() {
        let value = Value::Array(vec![Value::Hole, "b".into()]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[null,"b"]"#);
    }

    #[test]
    fn shared_equality() {
        let a = Shared::new(Value::from_iter([("k", "v")]));
        let b = Shared::new(Value::from_iter([("k", "v")]));
        let c = Shared::new(Value::from_iter([("k", "w")]));
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn shared_cycle_debug_does_not_recurse() {
        let node = Shared::new(Value::object());
        if let Value::Object(map) = &mut *node.write() {
            map.insert("self".into(), Value::Shared(node.clone()));
        }
        let rendered = format!("{:?}", node);
        assert!(rendered.starts_with("Shared(0x"), "got: {rendered}");
        let rendered = format!("{:?}", Value::Shared(node.clone()));
        assert!(rendered.starts_with("Shared(Shared(0x"), "got: {rendered}");

        *node.write() = Value::Null;
    }

    fn cyclic(key: &str) -> Shared {
        let node = Shared::new(Value::object());
        if let Value::Object(map) = &mut *node.write() {
            map.insert(key.into(), Value::Shared(node.clone()));
        }
        node
    }

    #[test]
    fn cyclic_handles_compare_without_recursing() {
        let a = cyclic("self");
        let b = cyclic("self");
        let c = cyclic("other");
        assert_eq!(a, b);
        assert_eq!(Value::Shared(a.clone()), Value::Shared(b.clone()));
        assert_ne!(a, c);

        for node in [a, b, c] {
            *node.write() = Value::Null;
        }
    }

    #[test]
    fn serializing_a_cycle_fails() {
        let node = cyclic("self");
        let err = serde_json::to_string(&Value::Shared(node.clone())).unwrap_err();
        assert!(err.to_string().contains("cyclic reference"), "got: {err}");

        // the same handle twice in separate branches is fine
        let shared = Shared::new(Value::from("x"));
        let value = Value::Array(vec![shared.clone().into(), shared.into()]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"["x","x"]"#);

        *node.write() = Value::Null;
    }

    #[test]
    fn object_equality_ignores_key_order() {
        let a = Value::from_iter([("a", "1"), ("b", "2")]);
        let b = Value::from_iter([("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
        assert_ne!(a, Value::from_iter([("a", "1")]));
    }
}
