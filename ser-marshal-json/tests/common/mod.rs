#![allow(dead_code)]
use ser_marshal_json::{BridgeValue, Config, HostJson, Json};
use serde_json::Value as JsonValue;

/// Host backed by `serde_json`, printing integral numbers without a fraction
/// the way `JSON.stringify` does.
pub struct SerdeJsonHost;

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

impl HostJson for SerdeJsonHost {
    type Error = serde_json::Error;

    fn stringify(&self, value: &BridgeValue) -> Result<String, Self::Error> {
        serde_json::to_string(&to_json(value))
    }

    fn parse(&self, text: &str) -> Result<BridgeValue, Self::Error> {
        serde_json::from_str::<JsonValue>(text).map(|value| from_json(&value))
    }
}

fn to_json(value: &BridgeValue) -> JsonValue {
    match value {
        BridgeValue::Null => JsonValue::Null,
        BridgeValue::Bool(b) => JsonValue::Bool(*b),
        BridgeValue::Number(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            JsonValue::from(*f as i64)
        }
        BridgeValue::Number(f) => serde_json::Number::from_f64(*f)
            .map_or(JsonValue::Null, JsonValue::Number),
        BridgeValue::String(s) => JsonValue::String(s.clone()),
        BridgeValue::Array(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        BridgeValue::Object(entries) => JsonValue::Object(
            entries.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()),
    }
}

fn from_json(value: &JsonValue) -> BridgeValue {
    match value {
        JsonValue::Null => BridgeValue::Null,
        JsonValue::Bool(b) => BridgeValue::Bool(*b),
        JsonValue::Number(n) => BridgeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => BridgeValue::String(s.clone()),
        JsonValue::Array(items) => BridgeValue::Array(items.iter().map(from_json).collect()),
        JsonValue::Object(map) => BridgeValue::Object(
            map.iter().map(|(k, v)| (k.clone(), from_json(v))).collect()),
    }
}

/// One marshaller per engine
pub fn engines() -> [Json; 2] {
    engines_with(Config::default())
}

pub fn engines_with(config: Config) -> [Json; 2] {
    [
        Json::builder().config(config).build(),
        Json::builder().config(config).bridge(SerdeJsonHost).build(),
    ]
}
