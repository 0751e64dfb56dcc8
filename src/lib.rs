//! Foundation for `ser-marshal` engines: the [`SerWrite`] output trait and the
//! JSON-shaped [`Value`] model exchanged between marshallers and text engines.
/*!

[`Value`] kinds:

| Value kind        | JSON type
|-------------------|--------------------
| `Null`            | `null`
| `Bool`            | `boolean`
| `Number`          | `number` (`i128` integer, `f32` or `f64`)
| `String`          | `string`
| `Array`           | `array`
| `Object`          | `object` (insertion-ordered, unique keys)
*/
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::io;

mod foreign;
mod serde_impl;
pub mod value;

pub use value::{Map, Number, Value};

pub type SerResult<T> = Result<T, SerError>;

/// An error returned by the provided [`SerWrite`] implementations
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SerError {
    /// Buffer is full
    #[error("buffer is full")]
    BufferFull,
    /// Written bytes are not valid UTF-8 and the target only holds text
    #[error("written bytes are not valid UTF-8")]
    Utf8,
    /// The underlying stream failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Serializers should write data to the implementations of this trait.
pub trait SerWrite {
    /// An error reported by the writer
    type Error;
    /// Write all bytes from `buf` to the internal buffer.
    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error>;
    /// Write a single `byte` to the internal buffer.
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write(core::slice::from_ref(&byte))
    }
    /// Write a string to the internal buffer.
    #[inline]
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.write(s.as_bytes())
    }
}

impl<T: SerWrite + ?Sized> SerWrite for &'_ mut T {
    type Error = T::Error;

    #[inline]
    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        (**self).write(buf)
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        (**self).write_byte(byte)
    }
    #[inline]
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        (**self).write_str(s)
    }
}

/// A bounded slice writer
#[derive(Debug, PartialEq)]
pub struct SliceWriter<'a> {
    pub buf: &'a mut [u8],
    pub len: usize
}

impl AsRef<[u8]> for SliceWriter<'_> {
    /// Returns a populated portion of the slice
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl<'a> SliceWriter<'a> {
    /// Create new instance
    pub fn new(buf: &'a mut [u8]) -> Self {
        SliceWriter { buf, len: 0 }
    }
    /// Return populated length
    pub fn len(&self) -> usize {
        self.len
    }
    /// Return `true` if nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// Return remaining capacity
    pub fn rem_capacity(&self) -> usize {
        self.buf.len() - self.len
    }
    /// Destruct into the populated portion of the underlying buffer
    pub fn into_written(self) -> &'a mut [u8] {
        &mut self.buf[..self.len]
    }
}

impl SerWrite for SliceWriter<'_> {
    type Error = SerError;

    fn write(&mut self, buf: &[u8]) -> SerResult<()> {
        let end = self.len + buf.len();
        match self.buf.get_mut(self.len..end) {
            Some(chunk) => {
                chunk.copy_from_slice(buf);
                self.len = end;
                Ok(())
            }
            None => Err(SerError::BufferFull)
        }
    }
}

/// Adapts any [`std::io::Write`] stream to [`SerWrite`].
///
/// Writes are forwarded unbuffered; wrap the stream in a `BufWriter` when
/// many small writes are expected.
#[derive(Debug)]
pub struct IoWriter<W>(pub W);

impl<W: io::Write> IoWriter<W> {
    /// Destruct self returning the wrapped stream
    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: io::Write> SerWrite for IoWriter<W> {
    type Error = SerError;

    #[inline]
    fn write(&mut self, buf: &[u8]) -> SerResult<()> {
        Ok(self.0.write_all(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_writer() {
        let mut buf = [0u8;10];
        let mut writer = SliceWriter::new(&mut buf[..]);
        assert!(writer.is_empty());
        writer.write_byte(b'{').unwrap();
        writer.write(b"\"id\":").unwrap();
        writer.write_str("42}").unwrap();
        assert_eq!(writer.as_ref(), br#"{"id":42}"#);
        assert_eq!((writer.len(), writer.rem_capacity()), (9, 1));
        assert!(matches!(writer.write(b",\n").unwrap_err(), SerError::BufferFull));
        assert_eq!(writer.len(), 9);
        assert_eq!(writer.into_written(), br#"{"id":42}"#);
    }

    #[test]
    fn test_io_writer() {
        let mut writer = IoWriter(Vec::new());
        writer.write(b"[1,").unwrap();
        writer.write_str("2]").unwrap();
        assert_eq!(writer.into_inner(), b"[1,2]");
    }

    #[test]
    fn test_writer_by_mut_ref() {
        fn emit<W: SerWrite>(mut w: W) -> Result<(), W::Error> {
            w.write_byte(b'{')?;
            w.write_str("}")
        }
        let mut vec = Vec::new();
        emit(&mut vec).unwrap();
        emit(&mut vec).unwrap();
        assert_eq!(vec, b"{}{}");
    }
}
