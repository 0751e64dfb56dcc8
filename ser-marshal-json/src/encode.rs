//! Conversion of marshallable values into the [`Value`] model
use core::any::type_name;

use ser_marshal::{Map, Value};

use crate::descriptor::Registry;
use crate::record::Record;
use crate::{Config, Error, Marshal, Result};

/// Walks a value graph producing a [`Value`].
///
/// Every nested [`encode`](Encoder::encode) call counts towards the
/// configured depth limit.
pub struct Encoder<'a> {
    registry: &'a Registry,
    config: &'a Config,
    depth: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(registry: &'a Registry, config: &'a Config) -> Self {
        Encoder { registry, config, depth: 0 }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Encode a nested value
    pub fn encode<T: Marshal + ?Sized>(&mut self, value: &T) -> Result<Value> {
        if self.depth >= self.config.max_depth {
            return Err(Error::DepthLimitExceeded(self.config.max_depth))
        }
        self.depth += 1;
        let res = value.encode(self);
        self.depth -= 1;
        res
    }

    /// Encode the marshalled fields of a record as an object
    pub fn encode_record<R: Record>(&mut self, record: &R) -> Result<Value> {
        let descriptor = self.registry.resolve::<R>()?;
        let Some(layout) = descriptor.as_record() else {
            return Err(Error::UnsupportedType(type_name::<R>()))
        };
        let mut map = Map::with_capacity(layout.fields().len());
        for field in layout.regular_fields() {
            if let Some(value) = field.get(record) {
                map.insert(field.name().to_owned(), self.encode(value)?);
            }
        }
        Ok(Value::Object(map))
    }

    /// Encode items as an array
    pub fn encode_seq<'v, T, I>(&mut self, items: I) -> Result<Value>
        where T: Marshal + 'v, I: IntoIterator<Item = &'v T>
    {
        items.into_iter()
            .map(|item| self.encode(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    /// Encode already keyed entries as an object, in the given order
    pub fn encode_entries<'v, V, I>(&mut self, entries: I) -> Result<Value>
        where V: Marshal + 'v, I: IntoIterator<Item = (String, &'v V)>
    {
        entries.into_iter()
            .map(|(key, value)| Ok((key, self.encode(value)?)))
            .collect::<Result<Map>>()
            .map(Value::Object)
    }

    /// Represent bytes as a string using the configured [`BlobEncoding`](crate::BlobEncoding)
    pub fn encode_blob(&self, bytes: &[u8]) -> Value {
        Value::String(self.config.blob.encode(bytes))
    }
}
