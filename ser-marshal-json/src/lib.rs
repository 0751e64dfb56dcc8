//! Structural JSON marshalling of Rust values with pluggable text engines.
/*!

Values are converted to the [`Value`] model by walking a cached
[`TypeDescriptor`] of their type, and an [`Engine`] turns the model into
text and back. The same type marshals identically on every engine.

| Rust type ->                     | JSON type
|----------------------------------|--------------------
| `()`                             | `null`
| `bool`                           | `boolean`
| `u8`-`u64`, `i8`-`i64`, `usize`  | `number`
| `f32`, `f64`                     | `number` (`null` if not finite)
| `char`, `String`, `str`          | `string`
| `Vec<u8>`, `VecDeque<u8>`        | `string` (see [`BlobEncoding`])
| `Vec<T>`, `VecDeque<T>`          | `array`
| `None`                           | `null`
| `Some(T)`, `Box<T>`              | `T` -> `JSON`
| `HashMap`, `BTreeMap`, `IndexMap`| `object` (string or integer keys)
| [`record!`] struct               | `object`
| [`Value`]                        | passed through

* Decoding is lenient: unknown object keys are ignored, absent keys leave
  fields unchanged and a value of the wrong kind leaves its target unchanged.
* Function pointers and channel endpoints fail with [`Error::UnsupportedType`].

```
use ser_marshal_json::{record, Json};

#[derive(Debug, Default, PartialEq)]
struct Person { name: String, age: u32 }
record!(Person { name = "name", age = "age" });

let json = Json::new();
let alice = Person { name: "Alice".into(), age: 30 };
assert_eq!(json.encode_to_string(&alice).unwrap(), r#"{"name":"Alice","age":30}"#);

let mut bob = Person::default();
json.decode_str(r#"{"name":"Bob","age":25,"extra":[]}"#, &mut bob).unwrap();
assert_eq!(bob, Person { name: "Bob".into(), age: 25 });
```
*/
#![cfg_attr(docsrs, feature(doc_cfg))]

use core::any::Any;
use core::fmt;
use std::io;

use once_cell::sync::OnceCell;
use tracing::debug;

pub mod base64;
pub mod bridge;
pub mod de;
pub mod descriptor;
pub mod engine;
pub mod record;
pub mod ser;
mod blob;
mod decode;
mod encode;
mod error;
mod marshal;

pub use ser_marshal;
pub use ser_marshal::{IoWriter, Map, Number, SerError, SerWrite, Value};

pub use blob::BlobEncoding;
pub use bridge::{BridgeEngine, BridgeValue, HostJson};
pub use decode::Decoder;
pub use descriptor::{Registry, Resolver, TypeDescriptor};
pub use encode::Encoder;
pub use engine::{Engine, NativeEngine};
pub use error::{Error, Result};
pub use marshal::{MapKey, Marshal};
pub use record::Record;

/// Nesting limit applied by default to encoding, decoding and parsing
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Marshalling options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// String form of byte sequences
    pub blob: BlobEncoding,
    /// Nesting limit of value graphs
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config { blob: BlobEncoding::default(), max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// A marshaller bound to a text [`Engine`].
pub struct Json {
    engine: Box<dyn Engine>,
    config: Config,
    registry: &'static Registry,
}

impl fmt::Debug for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Json")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Json {
    fn default() -> Self {
        Json::builder().build()
    }
}

/// Builder of [`Json`], the native engine is used unless another is chosen.
#[derive(Default)]
pub struct JsonBuilder {
    engine: Option<Box<dyn Engine>>,
    config: Config,
}

impl JsonBuilder {
    /// Use the built-in [`NativeEngine`]
    pub fn native(mut self) -> Self {
        self.engine = None;
        self
    }

    /// Use a [`BridgeEngine`] delegating to `host`
    pub fn bridge<H: HostJson + 'static>(self, host: H) -> Self {
        self.engine(Box::new(BridgeEngine::new(host)))
    }

    pub fn engine(mut self, engine: Box<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn blob_encoding(mut self, blob: BlobEncoding) -> Self {
        self.config.blob = blob;
        self
    }

    /// Limit the nesting of value graphs, the native engine's parser gets
    /// the same limit
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Json {
        let config = self.config;
        let engine = self.engine.unwrap_or_else(||
            Box::new(NativeEngine::with_recursion_limit(config.max_depth)));
        Json { engine, config, registry: Registry::global() }
    }
}

impl Json {
    /// Create a marshaller with the native engine and default options
    pub fn new() -> Self {
        Json::default()
    }

    pub fn builder() -> JsonBuilder {
        JsonBuilder::default()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert `value` to the [`Value`] model without producing text
    pub fn to_value<T: Marshal + ?Sized>(&self, value: &T) -> Result<Value> {
        Encoder::new(self.registry, &self.config).encode(value)
    }

    /// Populate `target` from the [`Value`] model, return `Ok(false)` if
    /// `value` was of a kind `target` can not take
    pub fn from_value<T: Marshal + ?Sized>(&self, value: &Value, target: &mut T) -> Result<bool> {
        Decoder::new(self.registry, &self.config).decode(target, value)
    }

    pub fn encode<T: Marshal + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let value = self.to_value(value)?;
        let mut out = Vec::new();
        self.engine.stringify(&value, &mut out)?;
        Ok(out)
    }

    pub fn encode_to_string<T: Marshal + ?Sized>(&self, value: &T) -> Result<String> {
        String::from_utf8(self.encode(value)?)
            .map_err(|_| Error::Writer(SerError::Utf8))
    }

    pub fn encode_to_writer<T, W>(&self, value: &T, mut writer: W) -> Result<()>
        where T: Marshal + ?Sized, W: SerWrite, Error: From<W::Error>
    {
        let bytes = self.encode(value)?;
        writer.write(&bytes)?;
        Ok(())
    }

    pub fn encode_to_io<T, W>(&self, value: &T, writer: W) -> Result<()>
        where T: Marshal + ?Sized, W: io::Write
    {
        self.encode_to_writer(value, IoWriter(writer))
    }

    pub fn decode<T: Marshal + ?Sized>(&self, input: &[u8], target: &mut T) -> Result<()> {
        let value = self.engine.parse(input)?;
        self.from_value(&value, target)?;
        Ok(())
    }

    pub fn decode_str<T: Marshal + ?Sized>(&self, input: &str, target: &mut T) -> Result<()> {
        self.decode(input.as_bytes(), target)
    }

    /// Read the stream to its end, then decode
    pub fn decode_from_reader<T, R>(&self, mut reader: R, target: &mut T) -> Result<()>
        where T: Marshal + ?Sized, R: io::Read
    {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        self.decode(&input, target)
    }

    /// Encode into a destination chosen at run time: `Vec<u8>` and `String`
    /// are replaced, a `Box<dyn io::Write>` is written to.
    pub fn encode_into(&self, value: &dyn Marshal, output: &mut dyn Any) -> Result<()> {
        if let Some(bytes) = output.downcast_mut::<Vec<u8>>() {
            *bytes = self.encode(value)?;
        }
        else if let Some(text) = output.downcast_mut::<String>() {
            *text = self.encode_to_string(value)?;
        }
        else if let Some(writer) = output.downcast_mut::<Box<dyn io::Write>>() {
            self.encode_to_io(value, writer)?;
        }
        else {
            return Err(Error::UnsupportedTarget("output"))
        }
        Ok(())
    }

    /// Decode from a source chosen at run time: `Vec<u8>`, `String`,
    /// `&'static str` or a `Box<dyn io::Read>`.
    pub fn decode_from(&self, input: &mut dyn Any, target: &mut dyn Marshal) -> Result<()> {
        if let Some(bytes) = input.downcast_ref::<Vec<u8>>() {
            self.decode(bytes, target)
        }
        else if let Some(text) = input.downcast_ref::<String>() {
            self.decode_str(text, target)
        }
        else if let Some(text) = input.downcast_ref::<&'static str>() {
            self.decode_str(text, target)
        }
        else if let Some(reader) = input.downcast_mut::<Box<dyn io::Read>>() {
            self.decode_from_reader(reader, target)
        }
        else {
            Err(Error::UnsupportedTarget("input"))
        }
    }
}

static GLOBAL: OnceCell<Json> = OnceCell::new();

/// Set the process-wide marshaller, return it back if one is already active.
pub fn install(json: Json) -> core::result::Result<(), Json> {
    let engine = json.engine_name();
    GLOBAL.set(json)?;
    debug!(engine, "process-wide JSON marshaller installed");
    Ok(())
}

/// The process-wide marshaller, the native one unless [`install`] came first.
pub fn global() -> &'static Json {
    GLOBAL.get_or_init(|| {
        debug!("process-wide JSON marshaller defaults to the native engine");
        Json::new()
    })
}

/// Encode with the process-wide marshaller
pub fn encode<T: Marshal + ?Sized>(value: &T) -> Result<Vec<u8>> {
    global().encode(value)
}

/// Encode with the process-wide marshaller
pub fn encode_to_string<T: Marshal + ?Sized>(value: &T) -> Result<String> {
    global().encode_to_string(value)
}

/// Decode with the process-wide marshaller
pub fn decode<T: Marshal + ?Sized>(input: &[u8], target: &mut T) -> Result<()> {
    global().decode(input, target)
}

/// Decode with the process-wide marshaller
pub fn decode_str<T: Marshal + ?Sized>(input: &str, target: &mut T) -> Result<()> {
    global().decode_str(input, target)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use ser_marshal::SliceWriter;
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }
    record!(Person { name = "name", age = "age" });

    fn alice() -> Person {
        Person { name: "Alice".into(), age: 30 }
    }

    const ALICE: &str = r#"{"name":"Alice","age":30}"#;

    /// A clonable sink, so the written bytes can be inspected after the
    /// boxed writer is handed over
    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encode_outputs() {
        let json = Json::new();
        assert_eq!(json.engine_name(), "native");
        assert_eq!(json.encode(&alice()).unwrap(), ALICE.as_bytes());
        assert_eq!(json.encode_to_string(&alice()).unwrap(), ALICE);
        let mut buf = [0u8; 64];
        let mut writer = SliceWriter::new(&mut buf);
        json.encode_to_writer(&alice(), &mut writer).unwrap();
        assert_eq!(writer.as_ref(), ALICE.as_bytes());
        let mut small = [0u8; 8];
        assert!(matches!(json.encode_to_writer(&alice(), SliceWriter::new(&mut small)),
            Err(Error::Writer(SerError::BufferFull))));
        let mut cursor = Cursor::new(Vec::new());
        json.encode_to_io(&alice(), &mut cursor).unwrap();
        assert_eq!(cursor.into_inner(), ALICE.as_bytes());
        let mut deque = std::collections::VecDeque::new();
        json.encode_to_writer(&alice(), &mut deque).unwrap();
        assert!(deque.iter().eq(ALICE.as_bytes()));
        let mut fixed = Cursor::new([0u8; 16]);
        assert!(matches!(json.encode_to_writer(&alice(), &mut fixed),
            Err(Error::Writer(SerError::BufferFull))));
    }

    #[test]
    fn test_decode_inputs() {
        let json = Json::new();
        let mut person = Person::default();
        json.decode(ALICE.as_bytes(), &mut person).unwrap();
        assert_eq!(person, alice());
        let mut person = Person::default();
        json.decode_from_reader(Cursor::new(ALICE), &mut person).unwrap();
        assert_eq!(person, alice());
        assert!(matches!(json.decode_str("{invalid json}", &mut person),
            Err(Error::Malformed(de::Error::KeyMustBeAString))));
        assert_eq!(person, alice());
        // a top level kind mismatch is not an error
        json.decode_str("[1,2]", &mut person).unwrap();
        assert_eq!(person, alice());
    }

    #[test]
    fn test_dynamic_targets() {
        let json = Json::new();
        let mut bytes = b"stale".to_vec();
        json.encode_into(&alice(), &mut bytes).unwrap();
        assert_eq!(bytes, ALICE.as_bytes());
        let mut text = String::new();
        json.encode_into(&alice(), &mut text).unwrap();
        assert_eq!(text, ALICE);
        let sink = Sink::default();
        let mut writer: Box<dyn io::Write> = Box::new(sink.clone());
        json.encode_into(&alice(), &mut writer).unwrap();
        assert_eq!(*sink.0.lock().unwrap(), ALICE.as_bytes());
        let mut number = 0u32;
        assert!(matches!(json.encode_into(&alice(), &mut number),
            Err(Error::UnsupportedTarget("output"))));

        let mut person = Person::default();
        json.decode_from(&mut bytes, &mut person).unwrap();
        assert_eq!(person, alice());
        let mut person = Person::default();
        json.decode_from(&mut text, &mut person).unwrap();
        assert_eq!(person, alice());
        let mut person = Person::default();
        let mut literal: &'static str = ALICE;
        json.decode_from(&mut literal, &mut person).unwrap();
        assert_eq!(person, alice());
        let mut person = Person::default();
        let mut reader: Box<dyn io::Read> = Box::new(Cursor::new(ALICE));
        json.decode_from(&mut reader, &mut person).unwrap();
        assert_eq!(person, alice());
        assert!(matches!(json.decode_from(&mut number, &mut person),
            Err(Error::UnsupportedTarget("input"))));
    }

    #[test]
    fn test_builder() {
        let json = Json::builder()
            .blob_encoding(BlobEncoding::Base64)
            .max_depth(2)
            .build();
        assert_eq!(json.config(), &Config { blob: BlobEncoding::Base64, max_depth: 2 });
        assert_eq!(json.encode_to_string(&vec![0xFFu8]).unwrap(), r#""/w==""#);
        assert!(matches!(json.encode(&vec![vec![1u16]]), Err(Error::DepthLimitExceeded(2))));
        assert!(matches!(json.decode_str("[[[1]]]", &mut Value::Null),
            Err(Error::Malformed(de::Error::RecursionLimitExceeded))));
        assert_eq!(format!("{json:?}"),
            "Json { engine: \"native\", config: Config { blob: Base64, max_depth: 2 } }");
    }

    #[test]
    fn test_global_instance() {
        let _ = install(Json::new());
        assert!(install(Json::builder().blob_encoding(BlobEncoding::Hex).build()).is_err());
        assert_eq!(global().engine_name(), "native");
        assert_eq!(global().config(), &Config::default());
        assert_eq!(encode(&alice()).unwrap(), ALICE.as_bytes());
        assert_eq!(encode_to_string(&vec![0x41u8]).unwrap(), r#""A""#);
        let mut person = Person::default();
        decode(ALICE.as_bytes(), &mut person).unwrap();
        assert_eq!(person, alice());
        let mut person = Person::default();
        decode_str(ALICE, &mut person).unwrap();
        assert_eq!(person, alice());
    }
}
