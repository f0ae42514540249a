use thiserror::Error;

/// Error produced by a user-supplied encode or decode hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while parsing or stringifying a querystring.
///
/// Limit errors are only produced when the caller opted into them through
/// `throw_on_limit_exceeded` or `strict_depth`; otherwise the limits are
/// enforced silently. Malformed percent-encoding is never an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid charset `{0}`: expected `utf-8` or `iso-8859-1`")]
    InvalidCharset(String),

    #[error("invalid duplicates mode `{0}`: expected `combine`, `first` or `last`")]
    InvalidDuplicatesMode(String),

    #[error("invalid format `{0}`")]
    InvalidFormat(String),

    #[error("parameter limit exceeded: only {limit} parameter(s) allowed")]
    ParameterLimitExceeded { limit: usize },

    #[error("array limit exceeded: only {limit} element(s) allowed in an array")]
    ArrayLimitExceeded { limit: usize },

    #[error("input depth exceeded depth option of {depth} and strict depth is enabled")]
    DepthLimitExceeded { depth: usize },

    #[error("cyclic object value")]
    CyclicReference,

    #[error("custom encoder or decoder failed: {0}")]
    DecoderFailure(#[source] HookError),
}

/// Error returned by the parse engine.
pub type ParseError = Error;

/// Error returned by the stringify engine.
pub type StringifyError = Error;

pub type Result<T> = std::result::Result<T, Error>;
