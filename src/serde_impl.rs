//! Serde support for [`Value`], so the model can travel through any serde format.
use core::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::value::{Map, Number, Value};

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        match *self {
            Number::Int(n) => {
                if let Ok(n) = i64::try_from(n) {
                    serializer.serialize_i64(n)
                }
                else if let Ok(n) = u64::try_from(n) {
                    serializer.serialize_u64(n)
                }
                else {
                    serializer.serialize_i128(n)
                }
            }
            Number::F32(f) => serializer.serialize_f32(f),
            Number::F64(f) => serializer.serialize_f64(f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Value, E> {
        Ok(Value::Number(Number::Int(v)))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Value, E> {
        Ok(match i128::try_from(v) {
            Ok(n) => Value::Number(Number::Int(n)),
            Err(..) => Value::Number(Number::F64(v as f64)),
        })
    }

    fn visit_f32<E: de::Error>(self, v: f32) -> Result<Value, E> {
        Ok(Value::Number(Number::F32(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(Number::F64(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.into()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
        where D: Deserializer<'de>
    {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
        where A: SeqAccess<'de>
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
        where A: MapAccess<'de>
    {
        let mut map = Map::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
        where D: Deserializer<'de>
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_serde_json() {
        let value: Value = [
            ("name".to_string(), Value::from("Alice")),
            ("age".to_string(), Value::from(30u8)),
            ("tags".to_string(), Value::from(vec![Value::from(true), Value::Null])),
            ("ratio".to_string(), Value::from(0.5f64)),
        ].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"name":"Alice","age":30,"tags":[true,null],"ratio":0.5}"#);
    }

    #[test]
    fn test_value_from_serde_json() {
        let value: Value = serde_json::from_str(
            r#"{"z":[1,-2,18446744073709551615,2.5],"a":{"b":"c"},"n":null}"#).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "n"]);
        assert_eq!(value.get("z").unwrap().as_array().unwrap(), &[
            Value::from(1u64),
            Value::from(-2i64),
            Value::from(u64::MAX),
            Value::from(2.5f64),
        ]);
        assert_eq!(value.get("a").unwrap().get("b").unwrap().as_str(), Some("c"));
        assert!(value.get("n").unwrap().is_null());
    }

    #[test]
    fn test_int_beyond_64_bits() {
        let value = Value::Number(Number::Int(-(u64::MAX as i128) - 1));
        assert_eq!(serde_json::to_string(&value).unwrap(), "-18446744073709551616");
    }
}
