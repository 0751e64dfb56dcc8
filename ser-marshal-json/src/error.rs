//! Marshalling errors
use ser_marshal::SerError;

use crate::de;

/// Marshalling result
pub type Result<T> = core::result::Result<T, Error>;

/// Marshalling error.
///
/// Structural mismatches met while decoding are not errors, the target is
/// left unchanged instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The value's type has no JSON mapping, e.g. a function pointer or a channel
    #[error("type `{0}` can not be represented as JSON")]
    UnsupportedType(&'static str),
    /// Embedded records form a cycle, the chain of type names is attached
    #[error("cyclic embedding: {0}")]
    CyclicType(String),
    /// The native engine rejected the input text
    #[error("malformed JSON: {0}")]
    Malformed(#[from] de::Error),
    /// The bridged host engine failed, its message is kept verbatim
    #[error("host JSON engine: {0}")]
    Host(String),
    /// A dynamically typed source or destination of an unknown kind
    #[error("unsupported {0} target")]
    UnsupportedTarget(&'static str),
    /// The value graph nests deeper than the configured limit
    #[error("nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),
    /// The output writer failed
    #[error(transparent)]
    Writer(#[from] SerError),
    /// The input stream failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
