//! Stringifying value trees into querystrings.

mod encode;

pub use encode::encode;

use std::borrow::Cow;

use tracing::debug;

use crate::config::{ArrayFormat, Charset, Filter, Kind, StringifyOptions};
use crate::error::{Error, Result};
use crate::utils::{ISO_SENTINEL, UTF8_SENTINEL};
use crate::value::{Map, Value};

/// Stringifies a value with the default options.
///
/// ```
/// use qs_tree::{to_string, Value};
///
/// let query = Value::from_iter([
///     ("name", Value::from("Alice")),
///     ("tags", Value::from(vec!["a".into(), "b".into()])),
/// ]);
/// assert_eq!(
///     to_string(&query).unwrap(),
///     "name=Alice&tags%5B0%5D=a&tags%5B1%5D=b"
/// );
/// ```
pub fn to_string(value: &Value) -> Result<String> {
    stringify(value, &StringifyOptions::default())
}

/// Stringifies a value into a querystring.
///
/// Only objects and arrays produce output: any other root value yields the
/// empty string. A [`Value::Shared`] that contains itself, directly or
/// further down, fails with [`Error::CyclicReference`].
///
/// ```
/// use qs_tree::{stringify, StringifyOptions, Value};
///
/// let value = Value::from_iter([("a", Value::from_iter([("b", "c d")]))]);
/// let options = StringifyOptions::new().encode_values_only(true);
/// assert_eq!(stringify(&value, &options).unwrap(), "a[b]=c%20d");
/// ```
pub fn stringify(value: &Value, options: &StringifyOptions) -> Result<String> {
    let mut serializer = QsSerializer::new(options);
    serializer.serialize_root(value)?;
    Ok(serializer.finish())
}

/// Walks a tree depth-first, writing one `key=value` pair per leaf.
///
/// The current key path is kept unencoded in `key` and extended in place as
/// the walk descends; it is encoded only when a pair is written. The
/// addresses of the shared nodes on the current path are kept in `active`.
struct QsSerializer<'o> {
    out: String,
    first_kv: bool,
    key: String,
    active: Vec<usize>,
    options: &'o StringifyOptions,
}

impl<'o> QsSerializer<'o> {
    fn new(options: &'o StringifyOptions) -> Self {
        Self {
            out: String::new(),
            first_kv: true,
            key: String::new(),
            active: Vec::new(),
            options,
        }
    }

    fn finish(self) -> String {
        if self.out.is_empty() {
            return self.out;
        }
        let mut prefix = String::with_capacity(self.out.len() + 21);
        if self.options.add_query_prefix {
            prefix.push('?');
        }
        if self.options.charset_sentinel {
            prefix.push_str(match self.options.charset {
                Charset::Utf8 => UTF8_SENTINEL,
                Charset::Iso88591 => ISO_SENTINEL,
            });
            prefix.push('&');
        }
        prefix.push_str(&self.out);
        prefix
    }

    fn serialize_root(&mut self, value: &Value) -> Result<()> {
        match self.apply_filter(value) {
            Some(value) => self.serialize_root_value(&value),
            None => Ok(()),
        }
    }

    fn serialize_root_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Shared(shared) => {
                self.enter(shared.addr())?;
                let result = self.serialize_root_value(&shared.read());
                self.active.pop();
                result
            }
            Value::Object(map) => {
                for key in self.object_keys(map, true) {
                    let Some(child) = map.get(key) else {
                        continue;
                    };
                    if self.options.skip_nulls && child.is_null() {
                        continue;
                    }
                    self.key.clear();
                    self.push_key_text(key);
                    self.visit(child, true)?;
                }
                Ok(())
            }
            Value::Array(items) => {
                let mut buffer = itoa::Buffer::new();
                for (i, item) in items.iter().enumerate() {
                    if item.is_hole() || (self.options.skip_nulls && item.is_null()) {
                        continue;
                    }
                    self.key.clear();
                    self.key.push_str(buffer.format(i));
                    self.visit(item, true)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Serializes `value` under the current key.
    fn visit(&mut self, value: &Value, filter: bool) -> Result<()> {
        let filtered;
        let value = if filter {
            match self.apply_filter(value) {
                Some(value) => {
                    filtered = value;
                    &*filtered
                }
                None => return Ok(()),
            }
        } else {
            value
        };

        match value {
            Value::Shared(shared) => {
                self.enter(shared.addr())?;
                let result = self.visit(&shared.read(), false);
                self.active.pop();
                result
            }
            Value::Hole => Ok(()),
            Value::Null => self.write_null(),
            Value::Array(items) => self.serialize_array(items),
            Value::Object(map) => self.serialize_object(map),
            primitive => match leaf_text(primitive, self.options) {
                Some(text) => {
                    let encoded = encode_value(&text, self.options)?;
                    self.write_pair(Some(&encoded))
                }
                None => Ok(()),
            },
        }
    }

    fn serialize_object(&mut self, map: &Map) -> Result<()> {
        for key in self.object_keys(map, false) {
            let Some(child) = map.get(key) else {
                continue;
            };
            if self.options.skip_nulls && child.is_null() {
                continue;
            }
            let mark = self.push_key(key);
            let result = self.visit(child, true);
            self.key.truncate(mark);
            result?;
        }
        Ok(())
    }

    fn serialize_array(&mut self, items: &[Value]) -> Result<()> {
        if items.is_empty() {
            if self.options.allow_empty_arrays {
                let part = format!("{}[]", self.key);
                self.write_raw(&part);
            }
            return Ok(());
        }

        let format = self.options.array_format;
        if format == ArrayFormat::Comma && items.iter().all(|item| !item.is_composite()) {
            return self.serialize_comma(items);
        }

        let mut buffer = itoa::Buffer::new();
        for (i, item) in items.iter().enumerate() {
            if item.is_hole() || (self.options.skip_nulls && item.is_null()) {
                continue;
            }
            let mark = self.key.len();
            match format {
                ArrayFormat::Brackets => self.key.push_str("[]"),
                ArrayFormat::Repeat => {}
                // composite elements cannot be joined, fall back to indices
                ArrayFormat::Indices | ArrayFormat::Comma => {
                    self.key.push('[');
                    self.key.push_str(buffer.format(i));
                    self.key.push(']');
                }
            }
            let result = self.visit(item, true);
            self.key.truncate(mark);
            result?;
        }
        Ok(())
    }

    /// Writes all elements as one pair, `key=a,b,c`.
    fn serialize_comma(&mut self, items: &[Value]) -> Result<()> {
        let mut joined = String::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                joined.push(',');
            }
            if let Some(text) = leaf_text(item, self.options) {
                joined.push_str(&encode_value(&text, self.options)?);
            }
        }

        let mark = self.key.len();
        if self.options.comma_round_trip && items.len() == 1 {
            self.key.push_str("[]");
        }
        let result = if !joined.is_empty() {
            self.write_pair(Some(&joined))
        } else if self.options.skip_nulls {
            Ok(())
        } else {
            self.write_null()
        };
        self.key.truncate(mark);
        result
    }

    fn apply_filter<'v>(&self, value: &'v Value) -> Option<Cow<'v, Value>> {
        match &self.options.filter {
            Some(Filter::Function(filter)) => filter(&self.key, value).map(Cow::Owned),
            _ => Some(Cow::Borrowed(value)),
        }
    }

    /// Keys of `map` in output order. A key filter only selects among the
    /// keys of the root object.
    fn object_keys<'m>(&self, map: &'m Map, root: bool) -> Vec<&'m str> {
        let mut keys: Vec<&str> = match &self.options.filter {
            Some(Filter::Keys(selected)) if root => selected
                .iter()
                .filter_map(|key| map.get_key_value(key.as_str()))
                .map(|(key, _)| key.as_str())
                .collect(),
            _ => map.keys().map(String::as_str).collect(),
        };
        if let Some(sort) = &self.options.sort {
            keys.sort_by(|a, b| sort(a, b));
        }
        keys
    }

    fn enter(&mut self, addr: usize) -> Result<()> {
        if self.active.contains(&addr) {
            debug!(key = %self.key, "cyclic reference detected");
            return Err(Error::CyclicReference);
        }
        self.active.push(addr);
        Ok(())
    }

    /// Appends a nested key segment, returning the length to truncate back
    /// to once the segment is done.
    fn push_key(&mut self, segment: &str) -> usize {
        let mark = self.key.len();
        if self.options.allow_dots {
            self.key.push('.');
            self.push_key_text(segment);
        } else {
            self.key.push('[');
            self.push_key_text(segment);
            self.key.push(']');
        }
        mark
    }

    fn push_key_text(&mut self, segment: &str) {
        if self.options.encode_dot_in_keys && segment.contains('.') {
            self.key.push_str(&segment.replace('.', "%2E"));
        } else {
            self.key.push_str(segment);
        }
    }

    fn write_null(&mut self) -> Result<()> {
        if self.options.strict_null_handling {
            self.write_pair(None)
        } else {
            self.write_pair(Some(""))
        }
    }

    fn write_pair(&mut self, value: Option<&str>) -> Result<()> {
        let key = encode_key(&self.key, self.options)?;
        if self.first_kv {
            self.first_kv = false;
        } else {
            self.out.push_str(&self.options.delimiter);
        }
        self.out.push_str(&key);
        if let Some(value) = value {
            self.out.push('=');
            self.out.push_str(value);
        }
        Ok(())
    }

    fn write_raw(&mut self, part: &str) {
        if self.first_kv {
            self.first_kv = false;
        } else {
            self.out.push_str(&self.options.delimiter);
        }
        self.out.push_str(part);
    }
}

/// Text of a leaf value before encoding. `Null` and holes have none.
fn leaf_text<'v>(value: &'v Value, options: &StringifyOptions) -> Option<Cow<'v, str>> {
    match (value, &options.serialize_date) {
        (Value::Date(date), Some(serialize)) => Some(Cow::Owned(serialize(date))),
        _ => value.primitive_text(),
    }
}

fn encode_key<'k>(key: &'k str, options: &StringifyOptions) -> Result<Cow<'k, str>> {
    let encoded = if options.encode && !options.encode_values_only {
        encode_text(key, Kind::Key, options)?
    } else {
        Cow::Borrowed(key)
    };
    Ok(encode::apply_format(encoded, options.format))
}

fn encode_value<'t>(text: &'t str, options: &StringifyOptions) -> Result<Cow<'t, str>> {
    let encoded = if options.encode {
        encode_text(text, Kind::Value, options)?
    } else {
        Cow::Borrowed(text)
    };
    Ok(encode::apply_format(encoded, options.format))
}

fn encode_text<'t>(text: &'t str, kind: Kind, options: &StringifyOptions) -> Result<Cow<'t, str>> {
    match &options.encoder {
        Some(encoder) => encoder(text, options.charset, kind, options.format)
            .map(Cow::Owned)
            .map_err(Error::DecoderFailure),
        None => Ok(encode::percent_encode_text(text, options.charset, options.format)),
    }
}
