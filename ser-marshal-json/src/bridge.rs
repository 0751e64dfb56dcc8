//! Engine delegating to a host runtime's JSON facility.
//!
//! The host, e.g. a JavaScript environment reached over FFI, only exchanges
//! the small [`BridgeValue`] vocabulary: all numbers are double precision
//! floats and objects are ordered lists of string keyed entries.
use core::fmt;

use ser_marshal::{Map, Number, Value};
use tracing::debug;

use crate::engine::Engine;
use crate::{de, Error, Result};

/// A value as seen by the host
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<BridgeValue>),
    Object(Vec<(String, BridgeValue)>),
}

/// The host's JSON text facility, the counterpart of `JSON.stringify`
/// and `JSON.parse`.
pub trait HostJson: Send + Sync {
    type Error: fmt::Display;

    fn stringify(&self, value: &BridgeValue) -> core::result::Result<String, Self::Error>;

    fn parse(&self, text: &str) -> core::result::Result<BridgeValue, Self::Error>;
}

/// Convert to the host vocabulary, integers beyond 2^53 lose precision and
/// non-finite floats become `Null`.
pub fn to_bridge(value: &Value) -> BridgeValue {
    match value {
        Value::Null => BridgeValue::Null,
        Value::Bool(b) => BridgeValue::Bool(*b),
        Value::Number(n) if n.is_finite() => BridgeValue::Number(n.as_f64()),
        Value::Number(..) => BridgeValue::Null,
        Value::String(s) => BridgeValue::String(s.clone()),
        Value::Array(items) => BridgeValue::Array(items.iter().map(to_bridge).collect()),
        Value::Object(map) => BridgeValue::Object(
            map.iter().map(|(k, v)| (k.clone(), to_bridge(v))).collect()),
    }
}

/// Convert from the host vocabulary, a repeated key replaces the earlier
/// value in place.
pub fn from_bridge(value: BridgeValue) -> Value {
    match value {
        BridgeValue::Null => Value::Null,
        BridgeValue::Bool(b) => Value::Bool(b),
        BridgeValue::Number(f) => Value::Number(Number::F64(f)),
        BridgeValue::String(s) => Value::String(s),
        BridgeValue::Array(items) => Value::Array(items.into_iter().map(from_bridge).collect()),
        BridgeValue::Object(entries) => Value::Object(
            entries.into_iter().map(|(k, v)| (k, from_bridge(v))).collect::<Map>()),
    }
}

/// An [`Engine`] bridging to a [`HostJson`].
#[derive(Debug, Clone, Default)]
pub struct BridgeEngine<H> {
    host: H,
}

impl<H: HostJson> BridgeEngine<H> {
    pub fn new(host: H) -> Self {
        BridgeEngine { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: HostJson> Engine for BridgeEngine<H> {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn stringify(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        let text = self.host.stringify(&to_bridge(value)).map_err(host_error)?;
        out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn parse(&self, input: &[u8]) -> Result<Value> {
        let text = core::str::from_utf8(input).map_err(de::Error::from)?;
        let value = self.host.parse(text).map_err(host_error)?;
        Ok(from_bridge(value))
    }
}

fn host_error<E: fmt::Display>(err: E) -> Error {
    let message = err.to_string();
    debug!(%message, "host JSON engine failed");
    Error::Host(message)
}
