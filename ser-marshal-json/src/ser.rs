//! Compact JSON printer for [`Value`] writing to [`SerWrite`]
use ser_marshal::{Number, SerWrite, Value};

/// Print `value` as compact JSON to a [`SerWrite`] implementation.
pub fn to_writer<W: SerWrite>(writer: W, value: &Value) -> Result<(), W::Error> {
    Printer::new(writer).print(value)
}

/// Print `value` as compact JSON to a new byte vector.
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut vec = Vec::new();
    // growing buffers never fail
    let _ = to_writer(&mut vec, value);
    vec
}

/// Print `value` as compact JSON to a new string.
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    // every write is a whole UTF-8 sequence
    let _ = to_writer(&mut out, value);
    out
}

/// JSON printer.
///
/// Writes no insignificant whitespace, non-finite floats print as `null`
/// and floats with an integral value print without a fraction, the way
/// `JSON.stringify` does.
pub struct Printer<W> {
    output: W
}

impl<W: SerWrite> Printer<W> {
    /// Create a new printer instance
    #[inline(always)]
    pub fn new(output: W) -> Self {
        Printer { output }
    }
    /// Destruct self returning the `output` object
    #[inline(always)]
    pub fn into_inner(self) -> W {
        self.output
    }
    /// Provide access to the inner writer for implementors of custom printers
    #[inline(always)]
    pub fn writer(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn print(&mut self, value: &Value) -> Result<(), W::Error> {
        match value {
            Value::Null => self.output.write(b"null"),
            Value::Bool(v) => self.output.write(if *v { b"true" } else { b"false" }),
            Value::Number(n) => self.print_number(n),
            Value::String(s) => self.print_str(s),
            Value::Array(items) => {
                self.output.write_byte(b'[')?;
                for (i, item) in items.iter().enumerate() {
                    if i != 0 {
                        self.output.write_byte(b',')?;
                    }
                    self.print(item)?;
                }
                self.output.write_byte(b']')
            }
            Value::Object(map) => {
                self.output.write_byte(b'{')?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i != 0 {
                        self.output.write_byte(b',')?;
                    }
                    self.print_str(key)?;
                    self.output.write_byte(b':')?;
                    self.print(item)?;
                }
                self.output.write_byte(b'}')
            }
        }
    }

    pub fn print_number(&mut self, number: &Number) -> Result<(), W::Error> {
        match *number {
            Number::Int(n) => self.print_int(n),
            Number::F32(v) if v.is_finite() => {
                let mut buffer = ryu_js::Buffer::new();
                self.output.write_str(buffer.format_finite(v))
            }
            Number::F64(v) if v.is_finite() => {
                let mut buffer = ryu_js::Buffer::new();
                self.output.write_str(buffer.format_finite(v))
            }
            _ => self.output.write(b"null")
        }
    }

    /// Print a quoted and escaped string
    pub fn print_str(&mut self, value: &str) -> Result<(), W::Error> {
        self.output.write_byte(b'"')?;
        format_escaped_str_contents(&mut self.output, value)?;
        self.output.write_byte(b'"')
    }

    fn print_int(&mut self, v: i128) -> Result<(), W::Error> {
        // "-170141183460469231731687303715884105728"
        let mut buf = [0u8; 40];
        let mut n = v.unsigned_abs();
        let mut i = buf.len();
        loop {
            i -= 1;
            buf[i] = (n % 10) as u8 + b'0';
            n /= 10;
            if n == 0 {
                break;
            }
        }
        if v < 0 {
            i -= 1;
            buf[i] = b'-';
        }
        self.output.write(&buf[i..])
    }
}

#[inline(always)]
fn hex_4bit(c: u8) -> u8 {
    if c <= 9 {
        0x30 + c
    } else {
        0x41 + (c - 10)
    }
}

/// Upper-case hex for value in 0..256, encoded as ASCII bytes
#[inline(always)]
pub(crate) fn hex(c: u8) -> [u8;2] {
    [hex_4bit(c >> 4), hex_4bit(c & 0x0F)]
}

fn format_escaped_str_contents<W>(
    writer: &mut W,
    value: &str,
) -> Result<(), W::Error>
    where W: ?Sized + SerWrite
{
    let bytes = value.as_bytes();

    let mut start = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        let escape = match byte {
            0x00..=0x1F => ESCAPE[byte as usize],
            QU|BS => byte,
            _ => continue
        };

        if start < i {
            writer.write_str(&value[start..i])?;
        }

        if escape == UU {
            writer.write(b"\\u00")?;
            writer.write(&hex(byte))?;
        }
        else {
            writer.write(&[b'\\', escape])?;
        }

        start = i + 1;
    }

    if start == bytes.len() {
        return Ok(());
    }

    writer.write_str(&value[start..])
}

const BB: u8 = b'b'; // \x08
const TT: u8 = b't'; // \x09
const NN: u8 = b'n'; // \x0A
const FF: u8 = b'f'; // \x0C
const RR: u8 = b'r'; // \x0D
const QU: u8 = b'"'; // \x22
const BS: u8 = b'\\'; // \x5C
const UU: u8 = b'u'; // \x00...\x1F except the ones above

// Lookup table of escape sequences. A value of b'x' at index i means that byte
// i is escaped as "\x" in JSON.
static ESCAPE: [u8; 32] = [
    //   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    UU, UU, UU, UU, UU, UU, UU, UU, BB, TT, NN, UU, FF, RR, UU, UU, // 0
    UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, // 1
];

#[cfg(test)]
mod tests {
    use ser_marshal::{Map, SerError, SliceWriter};
    use super::*;

    fn object(entries: &[(&str, Value)]) -> Value {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_print_scalars() {
        assert_eq!(to_string(&Value::Null), "null");
        assert_eq!(to_string(&Value::from(true)), "true");
        assert_eq!(to_string(&Value::from(false)), "false");
        assert_eq!(to_string(&Value::from(0u8)), "0");
        assert_eq!(to_string(&Value::from(i64::MIN)), "-9223372036854775808");
        assert_eq!(to_string(&Value::from(u64::MAX)), "18446744073709551615");
        assert_eq!(to_string(&Value::Number(Number::Int(i128::MIN))),
            "-170141183460469231731687303715884105728");
        assert_eq!(to_string(&Value::from(30.0f64)), "30");
        assert_eq!(to_string(&Value::from(0.1f32)), "0.1");
        assert_eq!(to_string(&Value::from(-1.5e300f64)), "-1.5e+300");
        assert_eq!(to_string(&Value::from(f64::NAN)), "null");
        assert_eq!(to_string(&Value::from(f32::NEG_INFINITY)), "null");
    }

    #[test]
    fn test_print_str_escapes() {
        assert_eq!(to_string(&Value::from("")), r#""""#);
        assert_eq!(to_string(&Value::from("Alice")), r#""Alice""#);
        assert_eq!(to_string(&Value::from("\"\\\n\t\r\u{8}\u{c}")), r#""\"\\\n\t\r\b\f""#);
        assert_eq!(to_string(&Value::from("\u{0}\u{1f}")), r#""\u0000\u001F""#);
        assert_eq!(to_string(&Value::from("/łączka ☃")), r#""/łączka ☃""#);
    }

    #[test]
    fn test_print_containers() {
        assert_eq!(to_string(&Value::Array(vec![])), "[]");
        assert_eq!(to_string(&Value::Object(Map::new())), "{}");
        let value = object(&[
            ("name", Value::from("Alice")),
            ("age", Value::from(30)),
            ("tags", Value::from(vec![Value::from("a"), Value::Null])),
            ("nested", object(&[("x", Value::from(1.5f64))])),
        ]);
        assert_eq!(to_vec(&value),
            br#"{"name":"Alice","age":30,"tags":["a",null],"nested":{"x":1.5}}"#);
    }

    #[test]
    fn test_print_to_bounded_writer() {
        let value = Value::from(vec![Value::from(1), Value::from(2)]);
        let mut buf = [0u8;5];
        let mut writer = SliceWriter::new(&mut buf);
        to_writer(&mut writer, &value).unwrap();
        assert_eq!(writer.as_ref(), b"[1,2]");
        let mut buf = [0u8;4];
        let mut writer = SliceWriter::new(&mut buf);
        assert!(matches!(to_writer(&mut writer, &value), Err(SerError::BufferFull)));
    }
}
