use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{Error, HookError, Result};
use crate::value::{Map, Value};

/// Character set used to percent-encode and decode bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is one code point in `U+0000..=U+00FF`.
    Iso88591,
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Charset::Iso88591),
            _ => Err(Error::InvalidCharset(s.to_owned())),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Charset::Utf8 => "utf-8",
            Charset::Iso88591 => "iso-8859-1",
        })
    }
}

/// How spaces (and a few other characters) are written when encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Spaces become `+`, and `(`/`)` are left unescaped.
    Rfc1738,
    /// Spaces become `%20`.
    #[default]
    Rfc3986,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RFC1738" => Ok(Format::Rfc1738),
            "RFC3986" => Ok(Format::Rfc3986),
            _ => Err(Error::InvalidFormat(s.to_owned())),
        }
    }
}

/// Specifies how arrays should be formatted in the querystring during
/// serialization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArrayFormat {
    /// Use the `a[0]=1&a[1]=2` format.
    #[default]
    Indices,
    /// Use the `a[]=1&a[]=2` format.
    Brackets,
    /// Use the `a=1&a=2` format.
    Repeat,
    /// Use the `a=1,2` format.
    Comma,
}

impl FromStr for ArrayFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "indices" => Ok(ArrayFormat::Indices),
            "brackets" => Ok(ArrayFormat::Brackets),
            "repeat" => Ok(ArrayFormat::Repeat),
            "comma" => Ok(ArrayFormat::Comma),
            _ => Err(Error::InvalidFormat(s.to_owned())),
        }
    }
}

/// What to do when the same key appears more than once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Duplicates {
    /// Collect every value into an array.
    #[default]
    Combine,
    First,
    Last,
}

impl FromStr for Duplicates {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "combine" => Ok(Duplicates::Combine),
            "first" => Ok(Duplicates::First),
            "last" => Ok(Duplicates::Last),
            _ => Err(Error::InvalidDuplicatesMode(s.to_owned())),
        }
    }
}

/// Whether a hook is being asked about a key or a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Key,
    Value,
}

/// Separator between parameters on input.
#[derive(Clone, Debug)]
pub enum Delimiter {
    Str(Cow<'static, str>),
    Pattern(Regex),
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Str(Cow::Borrowed("&"))
    }
}

impl From<&'static str> for Delimiter {
    fn from(s: &'static str) -> Self {
        Delimiter::Str(Cow::Borrowed(s))
    }
}

impl From<String> for Delimiter {
    fn from(s: String) -> Self {
        Delimiter::Str(Cow::Owned(s))
    }
}

impl From<Regex> for Delimiter {
    fn from(r: Regex) -> Self {
        Delimiter::Pattern(r)
    }
}

pub type DecodeHook =
    Arc<dyn Fn(&str, Charset, Kind) -> std::result::Result<String, HookError> + Send + Sync>;
pub type EncodeHook = Arc<
    dyn Fn(&str, Charset, Kind, Format) -> std::result::Result<String, HookError> + Send + Sync,
>;
pub type FilterFn = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;
pub type SortFn = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;
pub type DateFn = Arc<dyn Fn(&DateTime<Utc>) -> String + Send + Sync>;

/// Restricts which entries are stringified.
#[derive(Clone)]
pub enum Filter {
    /// Called with `(prefix, value)` for every node. Returning `None` omits
    /// the node and everything below it; returning `Some` replaces it.
    Function(FilterFn),
    /// Selects and orders the keys of the root object.
    Keys(Vec<String>),
}

impl Filter {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        Filter::Function(Arc::new(f))
    }

    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Keys(keys.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Function(_) => f.write_str("Function(..)"),
            Filter::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
        }
    }
}

const DEFAULT_DEPTH: usize = 5;
const DEFAULT_ARRAY_LIMIT: usize = 20;
const DEFAULT_PARAMETER_LIMIT: usize = 1000;

/// Configuration for parsing a querystring into a [`Value`] tree.
///
/// ## Nesting Depth
///
/// `depth` caps the number of path segments a key is split into, the
/// leading key included. This is important for preventing denial-of-service
/// attacks from maliciously crafted inputs with excessive nesting. Anything
/// beyond the limit is kept as one literal key. A depth of 0 disables
/// nesting entirely.
///
/// Default value: `depth = 5`
///
/// ```
/// use qs_tree::{ParseOptions, Value};
///
/// let map = ParseOptions::new().depth(0).parse("a[b][c]=1").unwrap();
/// assert_eq!(map.get("a[b][c]"), Some(&Value::from("1")));
///
/// let map = ParseOptions::new().depth(2).parse("a[b][c]=1").unwrap();
/// let b = map.get("a").and_then(|a| a.get("b")).unwrap();
/// assert_eq!(b.get("[c]"), Some(&Value::from("1")));
/// ```
#[derive(Clone, Default)]
pub struct ParseOptions {
    pub(crate) allow_dots: Option<bool>,
    pub(crate) allow_empty_arrays: bool,
    pub(crate) allow_prototypes: bool,
    pub(crate) allow_sparse: bool,
    pub(crate) array_limit: Option<usize>,
    pub(crate) charset: Charset,
    pub(crate) charset_sentinel: bool,
    pub(crate) comma: bool,
    pub(crate) decode_dot_in_keys: bool,
    pub(crate) decoder: Option<DecodeHook>,
    pub(crate) delimiter: Delimiter,
    pub(crate) depth: Option<usize>,
    pub(crate) duplicates: Duplicates,
    pub(crate) ignore_query_prefix: bool,
    pub(crate) interpret_numeric_entities: bool,
    pub(crate) parameter_limit: Option<usize>,
    pub(crate) no_parse_arrays: bool,
    pub(crate) plain_objects: bool,
    pub(crate) strict_depth: bool,
    pub(crate) strict_null_handling: bool,
    pub(crate) throw_on_limit_exceeded: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables `a.b=c` as an alternative to `a[b]=c`.
    #[must_use]
    pub fn allow_dots(mut self, allow_dots: bool) -> Self {
        self.allow_dots = Some(allow_dots);
        self
    }

    /// Parses `a[]=` (and `a[]` with strict null handling) as an empty array.
    #[must_use]
    pub fn allow_empty_arrays(mut self, allow: bool) -> Self {
        self.allow_empty_arrays = allow;
        self
    }

    /// Allows keys named after built-in object methods such as
    /// `hasOwnProperty`. `__proto__` is always rejected.
    #[must_use]
    pub fn allow_prototypes(mut self, allow: bool) -> Self {
        self.allow_prototypes = allow;
        self
    }

    /// Keeps holes left by index gaps instead of compacting arrays.
    #[must_use]
    pub fn allow_sparse(mut self, allow: bool) -> Self {
        self.allow_sparse = allow;
        self
    }

    /// Highest bracket index that is still treated as an array position.
    /// Default is 20.
    ///
    /// An index reserves every position before it, so a single parameter
    /// can allocate up to `array_limit` slots and a whole input up to
    /// `array_limit * parameter_limit`. Raise both with that product in mind.
    ///
    /// ```
    /// use qs_tree::{ParseOptions, Value};
    ///
    /// let options = ParseOptions::new().array_limit(3).allow_sparse(true);
    /// let map = options.parse("a[3]=x&b[4]=y").unwrap();
    /// assert_eq!(
    ///     map.get("a"),
    ///     Some(&Value::from(vec![Value::Hole, Value::Hole, Value::Hole, "x".into()]))
    /// );
    /// assert_eq!(map.get("b").and_then(|b| b.get("4")), Some(&Value::from("y")));
    /// ```
    #[must_use]
    pub fn array_limit(mut self, limit: usize) -> Self {
        self.array_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Detects the charset from a `utf8=` parameter and removes it.
    #[must_use]
    pub fn charset_sentinel(mut self, enabled: bool) -> Self {
        self.charset_sentinel = enabled;
        self
    }

    /// Splits values containing `,` into arrays.
    #[must_use]
    pub fn comma(mut self, comma: bool) -> Self {
        self.comma = comma;
        self
    }

    /// Decodes `%2E` inside key segments into `.`. Implies `allow_dots`
    /// unless that was set explicitly.
    #[must_use]
    pub fn decode_dot_in_keys(mut self, decode: bool) -> Self {
        self.decode_dot_in_keys = decode;
        self
    }

    /// Replaces percent-decoding of keys and values. An error returned by the
    /// hook aborts the parse.
    #[must_use]
    pub fn decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&str, Charset, Kind) -> std::result::Result<String, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<Delimiter>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Specifies the maximum depth key that will be nested. Default is 5.
    #[must_use]
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn duplicates(mut self, duplicates: Duplicates) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Strips one leading `?` from the input.
    #[must_use]
    pub fn ignore_query_prefix(mut self, ignore: bool) -> Self {
        self.ignore_query_prefix = ignore;
        self
    }

    /// Turns `&#NNN;` in ISO-8859-1 values into the code point NNN.
    #[must_use]
    pub fn interpret_numeric_entities(mut self, interpret: bool) -> Self {
        self.interpret_numeric_entities = interpret;
        self
    }

    /// Maximum number of parameters read from the input. Default is 1000.
    #[must_use]
    pub fn parameter_limit(mut self, limit: usize) -> Self {
        self.parameter_limit = Some(limit);
        self
    }

    /// When disabled, bracket indices always produce object keys.
    #[must_use]
    pub fn parse_arrays(mut self, parse_arrays: bool) -> Self {
        self.no_parse_arrays = !parse_arrays;
        self
    }

    #[must_use]
    pub fn plain_objects(mut self, plain: bool) -> Self {
        self.plain_objects = plain;
        self
    }

    /// Fails instead of folding keys that nest deeper than `depth`.
    #[must_use]
    pub fn strict_depth(mut self, strict: bool) -> Self {
        self.strict_depth = strict;
        self
    }

    /// Parses a key without `=` as `Null` instead of the empty string.
    #[must_use]
    pub fn strict_null_handling(mut self, strict: bool) -> Self {
        self.strict_null_handling = strict;
        self
    }

    /// Fails instead of silently truncating when the parameter or array
    /// limits are exceeded.
    #[must_use]
    pub fn throw_on_limit_exceeded(mut self, throw: bool) -> Self {
        self.throw_on_limit_exceeded = throw;
        self
    }

    /// Parses a querystring using these options.
    pub fn parse(&self, input: &str) -> Result<Map> {
        crate::de::parse(input, self)
    }

    pub(crate) fn dots(&self) -> bool {
        self.allow_dots.unwrap_or(self.decode_dot_in_keys)
    }

    pub(crate) fn depth_limit(&self) -> usize {
        self.depth.unwrap_or(DEFAULT_DEPTH)
    }

    pub(crate) fn array_limit_value(&self) -> usize {
        self.array_limit.unwrap_or(DEFAULT_ARRAY_LIMIT)
    }

    pub(crate) fn parameter_limit_value(&self) -> usize {
        self.parameter_limit.unwrap_or(DEFAULT_PARAMETER_LIMIT)
    }

    pub(crate) fn arrays(&self) -> bool {
        !self.no_parse_arrays
    }

    /// Prototype method names are accepted as keys.
    pub(crate) fn prototypes_allowed(&self) -> bool {
        self.allow_prototypes || self.plain_objects
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("allow_dots", &self.dots())
            .field("array_limit", &self.array_limit_value())
            .field("charset", &self.charset)
            .field("delimiter", &self.delimiter)
            .field("depth", &self.depth_limit())
            .field("duplicates", &self.duplicates)
            .field("parameter_limit", &self.parameter_limit_value())
            .field("custom_decoder", &self.decoder.is_some())
            .finish_non_exhaustive()
    }
}

/// Configuration for stringifying a [`Value`] tree.
///
/// ```
/// use qs_tree::{ArrayFormat, StringifyOptions, Value};
///
/// let value = Value::from_iter([("a", Value::from(vec!["b".into(), "c".into()]))]);
/// let options = StringifyOptions::new()
///     .array_format(ArrayFormat::Brackets)
///     .encode_values_only(true);
/// assert_eq!(options.stringify(&value).unwrap(), "a[]=b&a[]=c");
/// ```
#[derive(Clone)]
pub struct StringifyOptions {
    pub(crate) add_query_prefix: bool,
    pub(crate) allow_dots: bool,
    pub(crate) allow_empty_arrays: bool,
    pub(crate) array_format: ArrayFormat,
    pub(crate) charset: Charset,
    pub(crate) charset_sentinel: bool,
    pub(crate) comma_round_trip: bool,
    pub(crate) delimiter: Cow<'static, str>,
    pub(crate) encode: bool,
    pub(crate) encode_dot_in_keys: bool,
    pub(crate) encoder: Option<EncodeHook>,
    pub(crate) encode_values_only: bool,
    pub(crate) filter: Option<Filter>,
    pub(crate) format: Format,
    pub(crate) serialize_date: Option<DateFn>,
    pub(crate) skip_nulls: bool,
    pub(crate) sort: Option<SortFn>,
    pub(crate) strict_null_handling: bool,
}

impl Default for StringifyOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl StringifyOptions {
    pub fn new() -> Self {
        Self {
            add_query_prefix: false,
            allow_dots: false,
            allow_empty_arrays: false,
            array_format: ArrayFormat::Indices,
            charset: Charset::Utf8,
            charset_sentinel: false,
            comma_round_trip: false,
            delimiter: Cow::Borrowed("&"),
            encode: true,
            encode_dot_in_keys: false,
            encoder: None,
            encode_values_only: false,
            filter: None,
            format: Format::Rfc3986,
            serialize_date: None,
            skip_nulls: false,
            sort: None,
            strict_null_handling: false,
        }
    }

    /// Prepends `?` to a non-empty output.
    #[must_use]
    pub fn add_query_prefix(mut self, add: bool) -> Self {
        self.add_query_prefix = add;
        self
    }

    /// Writes nested keys as `a.b` instead of `a[b]`.
    #[must_use]
    pub fn allow_dots(mut self, allow_dots: bool) -> Self {
        self.allow_dots = allow_dots;
        self
    }

    /// Writes empty arrays as `key[]` instead of omitting them.
    #[must_use]
    pub fn allow_empty_arrays(mut self, allow: bool) -> Self {
        self.allow_empty_arrays = allow;
        self
    }

    /// The default is `Indices`, which results in keys like `a[0]=1&a[1]=2`.
    #[must_use]
    pub fn array_format(mut self, array_format: ArrayFormat) -> Self {
        self.array_format = array_format;
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Prepends a `utf8=` parameter announcing the charset.
    #[must_use]
    pub fn charset_sentinel(mut self, enabled: bool) -> Self {
        self.charset_sentinel = enabled;
        self
    }

    /// With the comma format, keeps single-element arrays distinguishable
    /// from scalars by writing `key[]=v`.
    #[must_use]
    pub fn comma_round_trip(mut self, round_trip: bool) -> Self {
        self.comma_round_trip = round_trip;
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<Cow<'static, str>>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Disables percent-encoding entirely when `false`.
    #[must_use]
    pub fn encode(mut self, encode: bool) -> Self {
        self.encode = encode;
        self
    }

    /// Writes literal dots inside keys as `%2E`.
    #[must_use]
    pub fn encode_dot_in_keys(mut self, encode: bool) -> Self {
        self.encode_dot_in_keys = encode;
        self
    }

    /// Replaces percent-encoding of keys and values. An error returned by
    /// the hook aborts the stringify call.
    #[must_use]
    pub fn encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(&str, Charset, Kind, Format) -> std::result::Result<String, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Leaves keys unencoded and only encodes values.
    #[must_use]
    pub fn encode_values_only(mut self, values_only: bool) -> Self {
        self.encode_values_only = values_only;
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Renders dates. The default is an RFC 3339 timestamp in UTC with
    /// millisecond precision.
    #[must_use]
    pub fn serialize_date<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&DateTime<Utc>) -> String + Send + Sync + 'static,
    {
        self.serialize_date = Some(Arc::new(serialize));
        self
    }

    /// Omits entries whose value is `Null`.
    #[must_use]
    pub fn skip_nulls(mut self, skip: bool) -> Self {
        self.skip_nulls = skip;
        self
    }

    /// Sorts object keys at every level.
    #[must_use]
    pub fn sort<F>(mut self, compare: F) -> Self
    where
        F: Fn(&str, &str) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Arc::new(compare));
        self
    }

    /// Writes `Null` leaves as a bare key instead of `key=`.
    #[must_use]
    pub fn strict_null_handling(mut self, strict: bool) -> Self {
        self.strict_null_handling = strict;
        self
    }

    /// Serializes a value into a querystring using these options.
    pub fn stringify(&self, value: &Value) -> Result<String> {
        crate::ser::stringify(value, self)
    }
}

impl fmt::Debug for StringifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringifyOptions")
            .field("allow_dots", &self.allow_dots)
            .field("array_format", &self.array_format)
            .field("charset", &self.charset)
            .field("delimiter", &self.delimiter)
            .field("encode", &self.encode)
            .field("filter", &self.filter)
            .field("format", &self.format)
            .field("custom_encoder", &self.encoder.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn option_names_parse() {
        assert_eq!("UTF-8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!("iso-8859-1".parse::<Charset>().unwrap(), Charset::Iso88591);
        assert_eq!("rfc1738".parse::<Format>().unwrap(), Format::Rfc1738);
        assert_eq!("comma".parse::<ArrayFormat>().unwrap(), ArrayFormat::Comma);
        assert_eq!("last".parse::<Duplicates>().unwrap(), Duplicates::Last);
    }

    #[test]
    fn unknown_option_names_are_rejected() {
        assert!(matches!(
            "utf-16".parse::<Charset>(),
            Err(Error::InvalidCharset(name)) if name == "utf-16"
        ));
        assert!(matches!("RFC2396".parse::<Format>(), Err(Error::InvalidFormat(_))));
        assert!(matches!("nested".parse::<ArrayFormat>(), Err(Error::InvalidFormat(_))));
        assert!(matches!(
            "merge".parse::<Duplicates>(),
            Err(Error::InvalidDuplicatesMode(_))
        ));
    }

    #[test]
    fn unset_limits_use_defaults() {
        let options = ParseOptions::new();
        assert_eq!(options.depth_limit(), 5);
        assert_eq!(options.array_limit_value(), 20);
        assert_eq!(options.parameter_limit_value(), 1000);

        let options = ParseOptions::new().depth(0).array_limit(0);
        assert_eq!(options.depth_limit(), 0);
        assert_eq!(options.array_limit_value(), 0);
    }

    #[test]
    fn decode_dot_in_keys_implies_dots_unless_set() {
        assert!(!ParseOptions::new().dots());
        assert!(ParseOptions::new().decode_dot_in_keys(true).dots());
        assert!(
            !ParseOptions::new()
                .decode_dot_in_keys(true)
                .allow_dots(false)
                .dots()
        );
    }
}
