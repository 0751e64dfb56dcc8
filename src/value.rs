//! JSON-shaped value model
use core::fmt;

use indexmap::IndexMap;

/// An insertion-ordered JSON object. Keys are unique, inserting an existing
/// key replaces its value in place.
pub type Map = IndexMap<String, Value>;

/// A JSON number.
///
/// Every integer type widens to `Int`, floats keep their native width so
/// an `f32` prints with `f32` precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    F32(f32),
    F64(f64),
}

/// A JSON value, exactly one of the six JSON kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Number {
    /// Return `true` for an integer or a finite float without a fractional part.
    pub fn is_integral(&self) -> bool {
        self.as_i128().is_some()
    }

    /// Return the integer value, converting floats only when they are finite,
    /// have no fractional part and fit in `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Number::Int(n) => Some(n),
            Number::F32(f) => float_to_i128(f64::from(f)),
            Number::F64(f) => float_to_i128(f),
        }
    }

    /// Return the value as `f64`, integers beyond 2^53 lose precision.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(n) => n as f64,
            Number::F32(f) => f64::from(f),
            Number::F64(f) => f,
        }
    }

    /// Return `false` for NaN and infinities.
    pub fn is_finite(&self) -> bool {
        match *self {
            Number::Int(_) => true,
            Number::F32(f) => f.is_finite(),
            Number::F64(f) => f.is_finite(),
        }
    }
}

fn float_to_i128(f: f64) -> Option<i128> {
    // i128::MAX as f64 rounds up to 2^127, hence the strict upper bound
    const LIMIT: f64 = 170141183460469231731687303715884105728.0;
    if f.is_finite() && f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Some(f as i128)
    }
    else {
        None
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => n.fmt(f),
            Number::F32(x) => x.fmt(f),
            Number::F64(x) => x.fmt(f),
        }
    }
}

impl Value {
    /// Name of the JSON kind held, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None
        }
    }

    /// Look up `key` if this is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Number {
            #[inline]
            fn from(n: $ty) -> Self {
                Number::Int(n as i128)
            }
        }

        impl From<$ty> for Value {
            #[inline]
            fn from(n: $ty) -> Self {
                Value::Number(Number::from(n))
            }
        }
    )*};
}

impl_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Number(Number::F32(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(Number::F64(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().collect())
    }
}
