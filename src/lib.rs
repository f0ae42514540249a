//! Querystrings to and from dynamically-typed value trees
//!
//! Querystrings are not formally defined and loosely take the form of
//! _nested_ urlencoded queries.
//!
//! This library implements the dialect of
//! [qs](https://github.com/ljharb/qs): bracket and dot key paths,
//! array-versus-object inference, sparse arrays, duplicate-key policies,
//! prototype-key denial, UTF-8 and ISO-8859-1 percent-encoding, and the
//! `indices`, `brackets`, `repeat` and `comma` array formats.
//!
//! Rather than binding to Rust types, both directions work on a [`Value`]
//! tree whose objects keep their keys in insertion order.
//!
//! ## Usage
//!
//! ```
//! use qs_tree::{ArrayFormat, ParseOptions, StringifyOptions, Value};
//!
//! let map = ParseOptions::new()
//!     .parse("user[name]=Acme&user[ids][1]=2&user[ids][0]=1")
//!     .unwrap();
//! let user = map.get("user").unwrap();
//! assert_eq!(user.get("name"), Some(&Value::from("Acme")));
//! assert_eq!(
//!     user.get("ids"),
//!     Some(&Value::from(vec!["1".into(), "2".into()]))
//! );
//!
//! let query = StringifyOptions::new()
//!     .array_format(ArrayFormat::Brackets)
//!     .encode_values_only(true)
//!     .stringify(&Value::Object(map))
//!     .unwrap();
//! assert_eq!(query, "user[name]=Acme&user[ids][]=1&user[ids][]=2");
//! ```
//!
//! ## Limits
//!
//! Parsing is bounded by [`ParseOptions::depth`],
//! [`ParseOptions::array_limit`] and [`ParseOptions::parameter_limit`].
//! By default, input beyond a limit is folded into a literal key, turned
//! into an object key or dropped; with
//! [`ParseOptions::throw_on_limit_exceeded`] and
//! [`ParseOptions::strict_depth`] it is reported as an [`Error`] instead.
//!
//! ```
//! use qs_tree::{Error, ParseOptions};
//!
//! let options = ParseOptions::new()
//!     .parameter_limit(2)
//!     .throw_on_limit_exceeded(true);
//! assert!(matches!(
//!     options.parse("a=1&b=2&c=3"),
//!     Err(Error::ParameterLimitExceeded { limit: 2 })
//! ));
//! ```
//!
//! ## Logging
//!
//! The library emits [`tracing`] events at `debug` level when input is
//! truncated or discarded and when a cycle is found, and at `trace` level
//! for every parameter. No subscriber is installed.

mod config;
mod de;
mod error;
mod merge;
mod ser;
mod utils;
mod value;

#[doc(inline)]
pub use config::{
    ArrayFormat, Charset, DateFn, DecodeHook, Delimiter, Duplicates, EncodeHook, Filter,
    FilterFn, Format, Kind, ParseOptions, SortFn, StringifyOptions,
};
#[doc(inline)]
pub use de::{decode, parse, split_key, Notation, PathSegment, SegmentKind};
pub use error::{Error, HookError, ParseError, Result, StringifyError};
#[doc(inline)]
pub use merge::{compact, merge};
#[doc(inline)]
pub use ser::{encode, stringify, to_string};
pub use utils::{is_prototype_key, PROTOTYPE_KEYS};
#[doc(inline)]
pub use value::{Map, Shared, Value};

/// Parses a querystring with the default options.
///
/// ```
/// let map = qs_tree::from_str("a[1]=c&a[0]=b").unwrap();
/// assert_eq!(
///     map.get("a"),
///     Some(&qs_tree::Value::from(vec!["b".into(), "c".into()]))
/// );
/// ```
pub fn from_str(input: &str) -> Result<Map> {
    parse(input, &ParseOptions::default())
}
