//! In-memory writers
use std::collections::VecDeque;
use std::io::{self, Cursor};

use super::*;

impl SerWrite for Vec<u8> {
    type Error = SerError;

    #[inline]
    fn write(&mut self, buf: &[u8]) -> SerResult<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> SerResult<()> {
        self.push(byte);
        Ok(())
    }
}

impl SerWrite for VecDeque<u8> {
    type Error = SerError;

    #[inline]
    fn write(&mut self, buf: &[u8]) -> SerResult<()> {
        self.extend(buf.iter().copied());
        Ok(())
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> SerResult<()> {
        self.push_back(byte);
        Ok(())
    }
}

/// A cursor over a fixed slice reports [`SerError::BufferFull`] once the
/// slice is exhausted.
impl<T> SerWrite for Cursor<T>
    where Cursor<T>: io::Write
{
    type Error = SerError;

    #[inline]
    fn write(&mut self, buf: &[u8]) -> SerResult<()> {
        io::Write::write_all(self, buf).map_err(|err| match err.kind() {
            io::ErrorKind::WriteZero => SerError::BufferFull,
            _ => SerError::Io(err)
        })
    }
}

/// Only whole UTF-8 sequences may be written, JSON printers write
/// multi-byte characters in one piece.
impl SerWrite for String {
    type Error = SerError;

    #[inline]
    fn write(&mut self, buf: &[u8]) -> SerResult<()> {
        let s = core::str::from_utf8(buf).map_err(|_| SerError::Utf8)?;
        self.push_str(s);
        Ok(())
    }
    #[inline]
    fn write_str(&mut self, s: &str) -> SerResult<()> {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_collects_document() {
        let mut writer = Vec::new();
        writer.write_byte(b'[').unwrap();
        writer.write(b"null,").unwrap();
        writer.write_str("\"ż\"]").unwrap();
        assert_eq!(writer, "[null,\"ż\"]".as_bytes());
    }

    #[test]
    fn test_vec_deque_appends_at_the_back() {
        let mut writer = VecDeque::from(vec![b'{']);
        writer.write(b"\"a\":").unwrap();
        writer.write_byte(b'1').unwrap();
        writer.write_str("}").unwrap();
        assert_eq!(writer, br#"{"a":1}"#);
    }

    #[test]
    fn test_cursor_over_slice_fills_up() {
        let mut writer = Cursor::new([0u8; 8]);
        writer.write(b"[true,").unwrap();
        writer.write_byte(b'1').unwrap();
        writer.write_str("]").unwrap();
        assert_eq!(writer.get_ref(), b"[true,1]");
        assert!(matches!(writer.write_byte(b' ').unwrap_err(), SerError::BufferFull));

        let mut writer = Cursor::new(Vec::new());
        writer.write_str("null").unwrap();
        assert_eq!(writer.into_inner(), b"null");
    }

    #[test]
    fn test_string_rejects_partial_utf8() {
        let mut writer = String::new();
        writer.write(b"\"").unwrap();
        writer.write_str("łączka").unwrap();
        writer.write_byte(b'"').unwrap();
        assert_eq!(writer, "\"łączka\"");
        assert!(matches!(writer.write(&[0xC5]).unwrap_err(), SerError::Utf8));
        assert_eq!(writer, "\"łączka\"");
    }
}
