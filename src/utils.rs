//! Constant tables shared by the parse and stringify engines.

/// The one key that is rejected regardless of configuration.
pub const PROTO_KEY: &str = "__proto__";

/// Names of built-in object methods. Keys equal to one of these are dropped
/// unless prototypes are explicitly allowed.
pub const PROTOTYPE_KEYS: &[&str] = &[
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
    "__proto__",
    "constructor",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
];

pub fn is_prototype_key(key: &str) -> bool {
    PROTOTYPE_KEYS.contains(&key)
}

/// `utf8=✓` with the checkmark percent-encoded as UTF-8.
pub const UTF8_SENTINEL: &str = "utf8=%E2%9C%93";

/// `utf8=&#10003;` percent-encoded, as a browser submitting ISO-8859-1 sends it.
pub const ISO_SENTINEL: &str = "utf8=%26%2310003%3B";

/// Prefix shared by both sentinels.
pub const SENTINEL_PREFIX: &str = "utf8=";
