//! The [`Marshal`] trait and its implementations for std types
use core::any::{type_name, Any};
use core::hash::Hash;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::mpsc;

use indexmap::IndexMap;
use ser_marshal::{Number, Value};

use crate::descriptor::{FloatKind, IntKind, Resolver, TypeDescriptor, TypeRef};
use crate::{Decoder, Encoder, Error, Result};

/// A type convertible to and from the [`Value`] model.
///
/// Records implement it with the [`record!`](crate::record!) macro.
///
/// Decoding is lenient: [`decode`](Marshal::decode) returns `Ok(false)` and
/// leaves `self` unchanged when `value` has a kind this type can not take.
/// Errors are reserved for failures that abort the whole operation.
pub trait Marshal: Any {
    /// Describe the structure of this type, called once per type by
    /// [`Resolver`] which caches the result.
    ///
    /// Types without a structural description are unsupported.
    fn describe(_resolver: &mut Resolver<'_>) -> Result<TypeDescriptor>
        where Self: Sized
    {
        Ok(TypeDescriptor::Unsupported(type_name::<Self>()))
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value>;

    /// Return `Ok(true)` if `self` was written to
    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool>;

    /// The record an `#[embed]` field hoists fields out of.
    ///
    /// This is the value itself, a `Box` hands out its content instead.
    fn embedded(this: &Self) -> &(dyn Any + 'static)
        where Self: Sized
    {
        this
    }

    fn embedded_mut(this: &mut Self) -> &mut (dyn Any + 'static)
        where Self: Sized
    {
        this
    }
}

/// A map key, JSON object keys are strings.
pub trait MapKey: Marshal + Sized {
    fn to_key(&self) -> String;
    /// Return `None` if `key` does not represent a value of this type
    fn from_key(key: &str) -> Option<Self>;
}

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Option<Self> {
        Some(key.to_owned())
    }
}

impl Marshal for () {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Unit)
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::Null)
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        Ok(value.is_null() || decoder.mismatch::<Self>(value))
    }
}

impl Marshal for bool {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Bool)
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        match value.as_bool() {
            Some(b) => {
                *self = b;
                Ok(true)
            }
            None => Ok(decoder.mismatch::<Self>(value))
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty => $kind:ident),*) => {$(
        impl Marshal for $ty {
            fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
                Ok(TypeDescriptor::Int(IntKind::$kind))
            }

            fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
                Ok(Value::from(*self))
            }

            /// Integral floats are accepted, out of range numbers are not
            fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
                match value.as_number()
                    .and_then(Number::as_i128)
                    .and_then(|n| <$ty>::try_from(n).ok())
                {
                    Some(n) => {
                        *self = n;
                        Ok(true)
                    }
                    None => Ok(decoder.mismatch::<Self>(value))
                }
            }
        }

        impl MapKey for $ty {
            fn to_key(&self) -> String {
                self.to_string()
            }

            fn from_key(key: &str) -> Option<Self> {
                key.parse().ok()
            }
        }
    )*};
}

impl_int!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize,
          u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize);

impl Marshal for f32 {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Float(FloatKind::F32))
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::from(*self))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        match value.as_number() {
            Some(&Number::F32(f)) => *self = f,
            Some(n) => *self = n.as_f64() as f32,
            None => return Ok(decoder.mismatch::<Self>(value))
        }
        Ok(true)
    }
}

impl Marshal for f64 {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Float(FloatKind::F64))
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::from(*self))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        match value.as_number() {
            Some(n) => {
                *self = n.as_f64();
                Ok(true)
            }
            None => Ok(decoder.mismatch::<Self>(value))
        }
    }
}

impl Marshal for char {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Char)
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }

    /// Only a string of exactly one character is accepted
    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        let mut chars = value.as_str().unwrap_or_default().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                *self = c;
                Ok(true)
            }
            _ => Ok(decoder.mismatch::<Self>(value))
        }
    }
}

impl Marshal for String {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Str)
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        match value.as_str() {
            Some(s) => {
                s.clone_into(self);
                Ok(true)
            }
            None => Ok(decoder.mismatch::<Self>(value))
        }
    }
}

/// Encode only, there is nothing to decode into behind a shared `str`
impl Marshal for str {
    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(Value::String(self.to_owned()))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        Ok(decoder.mismatch::<Self>(value))
    }
}

/// Passed through unchanged in both directions
impl Marshal for Value {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Dynamic)
    }

    fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
        Ok(self.clone())
    }

    fn decode(&mut self, value: &Value, _: &mut Decoder<'_>) -> Result<bool> {
        value.clone_into(self);
        Ok(true)
    }
}

impl<T: Marshal + Default> Marshal for Option<T> {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Optional(TypeRef::of::<T>()))
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        match self {
            Some(inner) => inner.encode(encoder),
            None => Ok(Value::Null)
        }
    }

    /// `null` clears, anything else decodes into the present value or into
    /// a fresh default which is kept only if it was written to
    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        if value.is_null() {
            *self = None;
            return Ok(true)
        }
        match self {
            Some(inner) => inner.decode(value, decoder),
            None => {
                let mut inner = T::default();
                let written = inner.decode(value, decoder)?;
                if written {
                    *self = Some(inner);
                }
                Ok(written)
            }
        }
    }
}

impl<T: Marshal> Marshal for Box<T> {
    fn describe(resolver: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok((*resolver.resolve::<T>()?).clone())
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        (**self).encode(encoder)
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        (**self).decode(value, decoder)
    }

    fn embedded(this: &Self) -> &(dyn Any + 'static) {
        T::embedded(this)
    }

    fn embedded_mut(this: &mut Self) -> &mut (dyn Any + 'static) {
        T::embedded_mut(this)
    }
}

impl<T: Marshal + Default> Marshal for Vec<T> {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Seq(TypeRef::of::<T>()))
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        match (self as &dyn Any).downcast_ref::<Vec<u8>>() {
            Some(bytes) => Ok(encoder.encode_blob(bytes)),
            None => encoder.encode_seq(self)
        }
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        if let (Value::String(..), Some(bytes)) = (value, (&mut *self as &mut dyn Any).downcast_mut::<Vec<u8>>()) {
            return Ok(match decoder.decode_blob(value) {
                Some(blob) => {
                    *bytes = blob;
                    true
                }
                None => decoder.mismatch::<Self>(value)
            })
        }
        match decoder.decode_seq(value)? {
            Some(items) => {
                *self = items;
                Ok(true)
            }
            None => Ok(decoder.mismatch::<Self>(value))
        }
    }
}

impl<T: Marshal + Default> Marshal for VecDeque<T> {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Seq(TypeRef::of::<T>()))
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        match (self as &dyn Any).downcast_ref::<VecDeque<u8>>() {
            Some(bytes) => {
                let (front, back) = bytes.as_slices();
                Ok(encoder.encode_blob(&[front, back].concat()))
            }
            None => encoder.encode_seq(self)
        }
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        if let (Value::String(..), Some(bytes)) = (value, (&mut *self as &mut dyn Any).downcast_mut::<VecDeque<u8>>()) {
            return Ok(match decoder.decode_blob(value) {
                Some(blob) => {
                    *bytes = blob.into();
                    true
                }
                None => decoder.mismatch::<Self>(value)
            })
        }
        match decoder.decode_seq::<T>(value)? {
            Some(items) => {
                *self = items.into();
                Ok(true)
            }
            None => Ok(decoder.mismatch::<Self>(value))
        }
    }
}

/// Keys are sorted so the output does not depend on the hasher
impl<K, V> Marshal for HashMap<K, V>
    where K: MapKey + Eq + Hash, V: Marshal + Default
{
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Map { key: TypeRef::of::<K>(), value: TypeRef::of::<V>() })
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        let mut entries: Vec<(String, &V)> = self.iter()
            .map(|(k, v)| (k.to_key(), v))
            .collect();
        entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        encoder.encode_entries(entries)
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        let decoded = decoder.decode_entries::<K, V>(value, |k, v| { self.insert(k, v); })?;
        Ok(decoded || decoder.mismatch::<Self>(value))
    }
}

impl<K, V> Marshal for BTreeMap<K, V>
    where K: MapKey + Ord, V: Marshal + Default
{
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Map { key: TypeRef::of::<K>(), value: TypeRef::of::<V>() })
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        encoder.encode_entries(self.iter().map(|(k, v)| (k.to_key(), v)))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        let decoded = decoder.decode_entries::<K, V>(value, |k, v| { self.insert(k, v); })?;
        Ok(decoded || decoder.mismatch::<Self>(value))
    }
}

/// Entries keep their insertion order
impl<K, V> Marshal for IndexMap<K, V>
    where K: MapKey + Eq + Hash, V: Marshal + Default
{
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Map { key: TypeRef::of::<K>(), value: TypeRef::of::<V>() })
    }

    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        encoder.encode_entries(self.iter().map(|(k, v)| (k.to_key(), v)))
    }

    fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
        let decoded = decoder.decode_entries::<K, V>(value, |k, v| { self.insert(k, v); })?;
        Ok(decoded || decoder.mismatch::<Self>(value))
    }
}

macro_rules! impl_unsupported {
    ($([$($gen:ident),*] $ty:ty),* $(,)?) => {$(
        impl<$($gen: 'static),*> Marshal for $ty {
            fn encode(&self, _: &mut Encoder<'_>) -> Result<Value> {
                Err(Error::UnsupportedType(type_name::<Self>()))
            }

            fn decode(&mut self, value: &Value, decoder: &mut Decoder<'_>) -> Result<bool> {
                Ok(decoder.mismatch::<Self>(value))
            }
        }
    )*};
}

impl_unsupported!(
    [R] fn() -> R,
    [A, R] fn(A) -> R,
    [A, B, R] fn(A, B) -> R,
    [A, B, C, R] fn(A, B, C) -> R,
    [T] mpsc::Sender<T>,
    [T] mpsc::SyncSender<T>,
    [T] mpsc::Receiver<T>,
);

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use crate::{descriptor::Registry, BlobEncoding, Config};
    use super::*;

    fn encode<T: Marshal + ?Sized>(value: &T) -> Result<Value> {
        let config = Config::default();
        Encoder::new(Registry::global(), &config).encode(value)
    }

    fn decode<T: Marshal + ?Sized>(target: &mut T, value: &Value) -> bool {
        let config = Config::default();
        Decoder::new(Registry::global(), &config).decode(target, value).unwrap()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(encode(&()).unwrap(), Value::Null);
        assert_eq!(encode(&true).unwrap(), Value::Bool(true));
        assert_eq!(encode(&-7i8).unwrap(), Value::from(-7));
        assert_eq!(encode(&u64::MAX).unwrap(), Value::from(u64::MAX));
        assert_eq!(encode(&1.5f32).unwrap(), Value::from(1.5f32));
        assert_eq!(encode(&'x').unwrap(), Value::from("x"));
        assert_eq!(encode(&String::from("Alice")).unwrap(), Value::from("Alice"));
        assert_eq!(encode("Alice").unwrap(), Value::from("Alice"));
    }

    #[test]
    fn test_borrowed_str_is_encode_only() {
        let mut owned = String::from("Bob");
        let target: &mut str = owned.as_mut_str();
        assert!(!decode(target, &Value::from("Eve")));
        assert_eq!(owned, "Bob");
    }

    #[test]
    fn test_int_decode_is_lenient() {
        let mut n = 5u8;
        assert!(decode(&mut n, &Value::from(30.0f64)));
        assert_eq!(n, 30);
        assert!(!decode(&mut n, &Value::from(30.5f64)));
        assert!(!decode(&mut n, &Value::from(256)));
        assert!(!decode(&mut n, &Value::from(-1)));
        assert!(!decode(&mut n, &Value::from("30")));
        assert!(!decode(&mut n, &Value::Null));
        assert_eq!(n, 30);
        let mut n = 0i64;
        assert!(decode(&mut n, &Value::from(i64::MIN)));
        assert_eq!(n, i64::MIN);
    }

    #[test]
    fn test_float_char_string_decode() {
        let mut f = 0.0f32;
        assert!(decode(&mut f, &Value::from(2)));
        assert_eq!(f, 2.0);
        let mut c = 'a';
        assert!(!decode(&mut c, &Value::from("ab")));
        assert!(!decode(&mut c, &Value::from("")));
        assert!(decode(&mut c, &Value::from("ł")));
        assert_eq!(c, 'ł');
        let mut s = String::from("keep");
        assert!(!decode(&mut s, &Value::from(1)));
        assert_eq!(s, "keep");
        assert!(decode(&mut s, &Value::from("new")));
        assert_eq!(s, "new");
    }

    #[test]
    fn test_option() {
        assert_eq!(encode(&None::<u8>).unwrap(), Value::Null);
        assert_eq!(encode(&Some(3u8)).unwrap(), Value::from(3));
        let mut opt = Some(1u8);
        assert!(decode(&mut opt, &Value::Null));
        assert_eq!(opt, None);
        assert!(!decode(&mut opt, &Value::from("x")));
        assert_eq!(opt, None);
        assert!(decode(&mut opt, &Value::from(9)));
        assert_eq!(opt, Some(9));
    }

    #[test]
    fn test_byte_sequences_are_blobs() {
        assert_eq!(encode(&vec![0x41u8, 0x42]).unwrap(), Value::from("AB"));
        assert_eq!(encode(&VecDeque::from(vec![0x43u8])).unwrap(), Value::from("C"));
        assert_eq!(encode(&vec![1u16, 2]).unwrap(), Value::from(vec![Value::from(1), Value::from(2)]));
        assert_eq!(encode(&vec![vec![0x41u8], vec![0x42]]).unwrap(),
            Value::from(vec![Value::from("A"), Value::from("B")]));
        let mut bytes = Vec::<u8>::new();
        assert!(decode(&mut bytes, &Value::from("AB")));
        assert_eq!(bytes, b"AB");
        assert!(decode(&mut bytes, &Value::from(vec![Value::from(1), Value::from(2)])));
        assert_eq!(bytes, [1, 2]);
        assert!(!decode(&mut bytes, &Value::from(1)));
        assert_eq!(bytes, [1, 2]);
    }

    #[test]
    fn test_blob_encodings() {
        for (blob, text) in [(BlobEncoding::Raw, "AB"), (BlobEncoding::Base64, "QUI="), (BlobEncoding::Hex, "4142")] {
            let config = Config { blob, ..Config::default() };
            let value = Encoder::new(Registry::global(), &config).encode(&vec![0x41u8, 0x42]).unwrap();
            assert_eq!(value, Value::from(text));
            let mut bytes = Vec::<u8>::new();
            assert!(Decoder::new(Registry::global(), &config).decode(&mut bytes, &value).unwrap());
            assert_eq!(bytes, b"AB");
        }
        let config = Config { blob: BlobEncoding::Base64, ..Config::default() };
        let mut bytes = vec![7u8];
        assert!(!Decoder::new(Registry::global(), &config).decode(&mut bytes, &Value::from("!!")).unwrap());
        assert_eq!(bytes, [7]);
    }

    #[test]
    fn test_sequence_elements() {
        let mut seq = vec![9u8; 5];
        let value = Value::from(vec![Value::from(1), Value::from("x"), Value::from(3)]);
        assert!(decode(&mut seq, &value));
        assert_eq!(seq, [1, 0, 3]);
        let mut deque = VecDeque::<String>::new();
        assert!(decode(&mut deque, &Value::from(vec![Value::from("a")])));
        assert_eq!(deque, ["a"]);
    }

    #[test]
    fn test_maps() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), 2u32);
        map.insert("a".to_string(), 1u32);
        assert_eq!(text(&encode(&map).unwrap()), r#"{"a":1,"b":2}"#);
        let mut ints = BTreeMap::new();
        ints.insert(10i32, true);
        ints.insert(-1i32, false);
        assert_eq!(text(&encode(&ints).unwrap()), r#"{"-1":false,"10":true}"#);

        let value: Value = crate::de::from_str(r#"{"x":1,"7":2,"y":"bad"}"#).unwrap();
        let mut merged = IndexMap::new();
        merged.insert("z".to_string(), 0u8);
        assert!(decode(&mut merged, &value));
        assert_eq!(merged.into_iter().collect::<Vec<_>>(),
            [("z".to_string(), 0), ("x".to_string(), 1), ("7".to_string(), 2)]);
        let mut keyed = HashMap::<u16, u8>::new();
        assert!(decode(&mut keyed, &value));
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed[&7], 2);
        assert!(!decode(&mut keyed, &Value::from(vec![])));

        match &*Registry::global().resolve::<BTreeMap<u16, String>>().unwrap() {
            TypeDescriptor::Map { key, value } => {
                assert_eq!(*key, TypeRef::of::<u16>());
                assert_eq!(*value, TypeRef::of::<String>());
            }
            other => panic!("unexpected {other:?}")
        }
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_map_mismatch_names_the_map() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let mut map = BTreeMap::from([(1u8, 2u16)]);
        tracing::subscriber::with_default(subscriber, || {
            assert!(!decode(&mut map, &Value::from("x")));
        });
        assert_eq!(map, BTreeMap::from([(1, 2)]));
        let text = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(text.contains("value kind mismatch"), "{text}");
        assert!(text.contains(type_name::<BTreeMap<u8, u16>>()), "{text}");
    }

    fn text(value: &Value) -> String {
        crate::ser::to_string(value)
    }

    #[test]
    fn test_dynamic_value() {
        let value: Value = crate::de::from_str(r#"{"any":[1,"two",null]}"#).unwrap();
        assert_eq!(encode(&value).unwrap(), value);
        let mut target = Value::Null;
        assert!(decode(&mut target, &value));
        assert_eq!(target, value);
    }

    #[test]
    fn test_unsupported_types() {
        let (tx, rx) = mpsc::channel::<u8>();
        assert!(matches!(encode(&tx), Err(Error::UnsupportedType(name)) if name.contains("Sender")));
        assert!(matches!(encode(&rx), Err(Error::UnsupportedType(..))));
        let f: fn(u8) -> u8 = |x| x;
        assert!(matches!(encode(&f), Err(Error::UnsupportedType(..))));
        assert!(matches!(&*Registry::global().resolve::<fn() -> u8>().unwrap(),
            TypeDescriptor::Unsupported(..)));
        let mut g: fn() = || ();
        assert!(!decode(&mut g, &Value::Null));
    }
}
