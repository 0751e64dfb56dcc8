//! JSON text engines turning [`Value`] into text and back
use ser_marshal::Value;

use crate::{de, ser, Result};

/// A JSON text backend.
///
/// Engines only deal with text, the value graph is produced and consumed
/// by [`Encoder`](crate::Encoder) and [`Decoder`](crate::Decoder).
pub trait Engine: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;
    /// Append compact JSON text of `value` to `out`
    fn stringify(&self, value: &Value, out: &mut Vec<u8>) -> Result<()>;
    /// Parse a single JSON value
    fn parse(&self, input: &[u8]) -> Result<Value>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn stringify(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        (**self).stringify(value, out)
    }

    fn parse(&self, input: &[u8]) -> Result<Value> {
        (**self).parse(input)
    }
}

/// The built-in engine, see [`ser::Printer`] and [`de::Parser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEngine {
    recursion_limit: usize,
}

impl Default for NativeEngine {
    fn default() -> Self {
        NativeEngine { recursion_limit: de::DEFAULT_RECURSION_LIMIT }
    }
}

impl NativeEngine {
    pub fn new() -> Self {
        NativeEngine::default()
    }

    /// Limit the nesting of parsed arrays and objects
    pub fn with_recursion_limit(recursion_limit: usize) -> Self {
        NativeEngine { recursion_limit }
    }
}

impl Engine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn stringify(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        Ok(ser::to_writer(out, value)?)
    }

    fn parse(&self, input: &[u8]) -> Result<Value> {
        Ok(de::from_slice_with_limit(input, self.recursion_limit)?)
    }
}
