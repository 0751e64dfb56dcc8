//! Lenient population of marshallable targets from the [`Value`] model
use core::any::type_name;

use ser_marshal::Value;
use tracing::trace;

use crate::descriptor::Registry;
use crate::marshal::MapKey;
use crate::record::Record;
use crate::{Config, Error, Marshal, Result};

/// Writes a [`Value`] into existing targets.
///
/// Object keys without a matching field are ignored, fields without
/// a matching key keep their values, and a value of the wrong kind leaves
/// its target unchanged.
pub struct Decoder<'a> {
    registry: &'a Registry,
    config: &'a Config,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a Registry, config: &'a Config) -> Self {
        Decoder { registry, config, depth: 0 }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Decode a nested value, return `Ok(true)` if `target` was written to
    pub fn decode<T: Marshal + ?Sized>(&mut self, target: &mut T, value: &Value) -> Result<bool> {
        if self.depth >= self.config.max_depth {
            return Err(Error::DepthLimitExceeded(self.config.max_depth))
        }
        self.depth += 1;
        let res = target.decode(value, self);
        self.depth -= 1;
        res
    }

    /// Decode object entries into the matching fields of a record
    pub fn decode_record<R: Record>(&mut self, record: &mut R, value: &Value) -> Result<bool> {
        let Value::Object(map) = value else {
            return Ok(self.mismatch::<R>(value))
        };
        let descriptor = self.registry.resolve::<R>()?;
        let Some(layout) = descriptor.as_record() else {
            return Err(Error::UnsupportedType(type_name::<R>()))
        };
        for field in layout.regular_fields() {
            let Some(node) = map.get(field.name()) else { continue };
            if let Some(target) = field.get_mut(record) {
                self.decode(target, node)?;
            }
        }
        Ok(true)
    }

    /// Decode array items, each into a fresh default.
    ///
    /// Return `None` if `value` is not an array.
    pub fn decode_seq<T: Marshal + Default>(&mut self, value: &Value) -> Result<Option<Vec<T>>> {
        let Value::Array(items) = value else {
            return Ok(None)
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let mut element = T::default();
            self.decode(&mut element, item)?;
            out.push(element);
        }
        Ok(Some(out))
    }

    /// Decode object entries, each into a fresh default, and pass the
    /// written ones to `insert`. Entries with keys not representing `K`
    /// are skipped.
    ///
    /// Return `false` if `value` is not an object, the caller reports
    /// the mismatch for its own type.
    pub fn decode_entries<K, V>(&mut self, value: &Value, mut insert: impl FnMut(K, V)) -> Result<bool>
        where K: MapKey, V: Marshal + Default
    {
        let Value::Object(map) = value else {
            return Ok(false)
        };
        for (key, node) in map {
            let Some(key) = K::from_key(key) else {
                trace!(key = %key, ty = type_name::<K>(), "map key skipped");
                continue
            };
            let mut element = V::default();
            if self.decode(&mut element, node)? {
                insert(key, element);
            }
        }
        Ok(true)
    }

    /// Recover bytes from a string using the configured [`BlobEncoding`](crate::BlobEncoding)
    pub fn decode_blob(&self, value: &Value) -> Option<Vec<u8>> {
        value.as_str().and_then(|text| self.config.blob.decode(text))
    }

    /// Record a skipped target, always return `false`
    pub fn mismatch<T: ?Sized>(&self, value: &Value) -> bool {
        trace!(ty = type_name::<T>(), found = value.kind(), "value kind mismatch, target unchanged");
        false
    }
}
