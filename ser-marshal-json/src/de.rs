//! JSON text parser producing [`Value`]
use core::str::{self, FromStr};

use ser_marshal::{Map, Number, Value};

/// Nesting limit applied by [`from_slice`]
pub const DEFAULT_RECURSION_LIMIT: usize = 128;

/// Parse a single JSON value from `input`, trailing whitespace is allowed.
pub fn from_slice(input: &[u8]) -> Result<Value> {
    from_slice_with_limit(input, DEFAULT_RECURSION_LIMIT)
}

/// Parse a single JSON value, arrays and objects may nest at most
/// `limit` levels deep.
pub fn from_slice_with_limit(input: &[u8], limit: usize) -> Result<Value> {
    let mut parser = Parser::new(input).with_recursion_limit(limit);
    let value = parser.parse_value()?;
    parser.end()?;
    Ok(value)
}

/// Parse a single JSON value from `input`.
pub fn from_str(input: &str) -> Result<Value> {
    from_slice(input.as_bytes())
}

/// Parsing result
pub type Result<T> = core::result::Result<T, Error>;

/// Parsing error
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// EOF while parsing
    #[error("Unexpected end of JSON input")]
    UnexpectedEof,
    /// Invalid JSON string escape sequence
    #[error("Invalid JSON string escape sequence")]
    InvalidEscapeSequence,
    /// A control ASCII character detected in a JSON input
    #[error("A control ASCII character found in a JSON string")]
    StringControlChar,
    /// Expected this character to be a `':'`.
    #[error("Expected `':'`")]
    ExpectedColon,
    /// Expected this character to be either a `','` or a `']'`.
    #[error("Expected `','` or `']'`")]
    ExpectedArrayCommaOrEnd,
    /// Array content starts with a leading `','`.
    #[error("JSON array content starts with a leading `','`")]
    LeadingArrayComma,
    /// Array content ends with a trailing `','`.
    #[error("JSON array content ends with a trailing `','`")]
    TrailingArrayComma,
    /// Expected this character to be either a `','` or a `'}'`.
    #[error("Expected `','` or `'}}'`")]
    ExpectedObjectCommaOrEnd,
    /// Object content starts with a leading `,`.
    #[error("JSON object content starts with a leading `','`")]
    LeadingObjectComma,
    /// Object content ends with a trailing `,`.
    #[error("JSON object content ends with a trailing `','`")]
    TrailingObjectComma,
    /// Expected to parse either `true`, `false`, or `null`.
    #[error("Expected either `true`, `false`, or `null`.")]
    ExpectedToken,
    /// Invalid number
    #[error("Invalid number")]
    InvalidNumber,
    /// Invalid unicode code point or an invalid UTF-8 sequence
    #[error("Invalid unicode code point")]
    InvalidUnicodeCodePoint,
    /// Object key is not a string
    #[error("Object key is not a string")]
    KeyMustBeAString,
    /// JSON has non-whitespace trailing characters after the value
    #[error("JSON has non-whitespace trailing character after the value")]
    TrailingCharacters,
    /// Unexpected character
    #[error("Unexpected token while parsing a JSON value")]
    UnexpectedChar,
    /// Arrays and objects nest deeper than the limit
    #[error("JSON nesting exceeds the recursion limit")]
    RecursionLimitExceeded,
}

impl From<str::Utf8Error> for Error {
    fn from(_err: str::Utf8Error) -> Self {
        Error::InvalidUnicodeCodePoint
    }
}

impl From<core::num::ParseFloatError> for Error {
    fn from(_err: core::num::ParseFloatError) -> Self {
        Error::InvalidNumber
    }
}

const SP: u8 = b' ';
const QU: u8 = b'"';
const RS: u8 = b'\\';
const SO: u8 = b'/';
const B_: u8 = 0x08; const BB: u8 = b'b'; // \b -> \x08
const T_: u8 = 0x09; const TT: u8 = b't'; // \t -> \x09
const N_: u8 = 0x0A; // const NN: u8 = b'n'; // \n -> \x0A
const F_: u8 = 0x0C; // const FF: u8 = b'f'; // \f => \x0C
const R_: u8 = 0x0D; // const RR: u8 = b'r'; // \r => \x0D
/* \uUUUU */
const UU: u8 = b'u';
const __: u8 = 0;
/* only selected (un)escape codes are permitted */
static UNESCAPE: [u8;19] = [
/* \b,  c,  d,  e, \f,  g,  h,  i,  j,  k,  l,  m, \n,  o,  p,  q, \r,  s, \t */
    B_, __, __, __, F_, __, __, __, __, __, __, __, N_, __, __, __, R_, __, T_
];

#[inline(always)]
pub(crate) fn parse_hex_nib(ch: u8) -> Option<u8> {
    match ch {
        n@b'0'..=b'9' => Some(n - b'0'),
        _ => match ch|0x20 {
            n@b'a'..=b'f' => Some(n - b'a' + 10),
            _ => None
        }
    }
}

#[inline(always)]
fn parse_uuuu([a,b,c,d]: [u8;4]) -> Option<u16> {
    Some(u16::from_be_bytes([
        (parse_hex_nib(a)? << 4) + parse_hex_nib(b)?,
        (parse_hex_nib(c)? << 4) + parse_hex_nib(d)?]))
}

/// JSON parser over a byte slice.
///
/// Integers print back exactly: a number without a fraction or an exponent
/// becomes [`Number::Int`] when it fits in `i128` and [`Number::F64`]
/// otherwise.
pub struct Parser<'a> {
    input: &'a [u8],
    index: usize,
    depth: usize,
    limit: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Parser { input, index: 0, depth: 0, limit: DEFAULT_RECURSION_LIMIT }
    }

    /// Set the nesting limit of arrays and objects
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Consume parser and check if trailing characters only consist of whitespace
    pub fn end(mut self) -> Result<()> {
        self.eat_whitespace().err()
        .map(|_| ())
        .ok_or(Error::TrailingCharacters)
    }

    /// Peek at the next byte code, otherwise return `Err(Error::UnexpectedEof)`.
    pub fn peek(&self) -> Result<u8> {
        self.input.get(self.index).copied()
        .ok_or(Error::UnexpectedEof)
    }

    #[inline]
    fn eat_some(&mut self, len: usize) {
        self.index += len;
    }

    /// Advance cursor while discarding any JSON whitespace characters from the input slice
    /// and peek at the next non-whitespace character.
    /// Otherwise return `Err(Error::UnexpectedEof)`.
    pub fn eat_whitespace(&mut self) -> Result<u8> {
        let index = self.index;
        self.input[index..].iter()
        .position(|&b| !matches!(b, SP|T_|N_|R_))
        .map(|pos| {
            self.index = index + pos;
            self.input[index + pos]
        })
        .ok_or(Error::UnexpectedEof)
    }

    /// Parse a token and if match is found advance the cursor.
    ///
    /// Example tokens: `b"null"`, `b"true"`, `b"false"`.
    fn parse_token_content(&mut self, token: &[u8]) -> Result<()> {
        let size = token.len();
        match self.input.get(self.index..self.index+size) {
            Some(slice) if slice == token => {
                self.eat_some(size);
                Ok(())
            }
            Some(..) => Err(Error::ExpectedToken),
            None => Err(Error::UnexpectedEof)
        }
    }

    /// Parse the next value after skipping leading whitespace
    pub fn parse_value(&mut self) -> Result<Value> {
        match self.eat_whitespace()? {
            b'n' => self.parse_token_content(b"null").map(|_| Value::Null),
            b't' => self.parse_token_content(b"true").map(|_| Value::Bool(true)),
            b'f' => self.parse_token_content(b"false").map(|_| Value::Bool(false)),
            b'-'|b'0'..=b'9' => self.parse_number().map(Value::Number),
            QU => {
                self.eat_some(1);
                self.parse_str_content().map(Value::String)
            }
            b'[' => {
                self.eat_some(1);
                self.nested(Self::parse_array_content)
            }
            b'{' => {
                self.eat_some(1);
                self.nested(Self::parse_object_content)
            }
            _ => Err(Error::UnexpectedChar)
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Value>) -> Result<Value> {
        if self.depth >= self.limit {
            return Err(Error::RecursionLimitExceeded)
        }
        self.depth += 1;
        let res = parse(self);
        self.depth -= 1;
        res
    }

    /// Call after consuming the opening `'['`
    fn parse_array_content(&mut self) -> Result<Value> {
        let mut items = Vec::new();
        if b']' == self.eat_whitespace()? {
            self.eat_some(1);
            return Ok(Value::Array(items))
        }
        loop {
            if b',' == self.eat_whitespace()? {
                return Err(if items.is_empty() { Error::LeadingArrayComma }
                           else { Error::UnexpectedChar })
            }
            items.push(self.parse_value()?);
            match self.eat_whitespace()? {
                b',' => {
                    self.eat_some(1);
                    if b']' == self.eat_whitespace()? {
                        return Err(Error::TrailingArrayComma)
                    }
                }
                b']' => {
                    self.eat_some(1);
                    return Ok(Value::Array(items))
                }
                _ => return Err(Error::ExpectedArrayCommaOrEnd)
            }
        }
    }

    /// Call after consuming the opening `'{'`, a repeated key replaces the earlier value
    fn parse_object_content(&mut self) -> Result<Value> {
        let mut map = Map::new();
        if b'}' == self.eat_whitespace()? {
            self.eat_some(1);
            return Ok(Value::Object(map))
        }
        loop {
            match self.eat_whitespace()? {
                QU => self.eat_some(1),
                b',' if map.is_empty() => return Err(Error::LeadingObjectComma),
                _ => return Err(Error::KeyMustBeAString)
            }
            let key = self.parse_str_content()?;
            if b':' != self.eat_whitespace()? {
                return Err(Error::ExpectedColon)
            }
            self.eat_some(1);
            let value = self.parse_value()?;
            map.insert(key, value);
            match self.eat_whitespace()? {
                b',' => {
                    self.eat_some(1);
                    if b'}' == self.eat_whitespace()? {
                        return Err(Error::TrailingObjectComma)
                    }
                }
                b'}' => {
                    self.eat_some(1);
                    return Ok(Value::Object(map))
                }
                _ => return Err(Error::ExpectedObjectCommaOrEnd)
            }
        }
    }

    /// Return the length of the number at the cursor and whether it has
    /// a fraction or an exponent.
    fn match_number(&self) -> Result<(usize, bool)> {
        let input = &self.input[self.index..];
        let digits = |from: usize| input.get(from..).map_or(0, |s|
            s.iter().take_while(|b| b.is_ascii_digit()).count());
        let mut pos = usize::from(input.first() == Some(&b'-'));
        match input.get(pos) {
            Some(b'0') => pos += 1,
            Some(b'1'..=b'9') => pos += digits(pos),
            Some(..) => return Err(Error::InvalidNumber),
            None => return Err(Error::UnexpectedEof)
        }
        let mut is_float = false;
        if input.get(pos) == Some(&b'.') {
            is_float = true;
            match digits(pos + 1) {
                0 => return Err(Error::InvalidNumber),
                n => pos += 1 + n
            }
        }
        if matches!(input.get(pos), Some(b'e'|b'E')) {
            is_float = true;
            pos += 1;
            if matches!(input.get(pos), Some(b'+'|b'-')) {
                pos += 1;
            }
            match digits(pos) {
                0 => return Err(Error::InvalidNumber),
                n => pos += n
            }
        }
        Ok((pos, is_float))
    }

    fn parse_number(&mut self) -> Result<Number> {
        let (len, is_float) = self.match_number()?;
        // matched bytes are ASCII only
        let s = str::from_utf8(&self.input[self.index..self.index+len])?;
        let number = match is_float {
            false => match i128::from_str(s) {
                Ok(n) => Number::Int(n),
                Err(..) => Number::F64(f64::from_str(s)?)
            }
            true => Number::F64(f64::from_str(s)?)
        };
        self.eat_some(len);
        Ok(number)
    }

    /// Parse a string until a closing `'"'` is found, return the unescaped content.
    ///
    /// Call after consuming an opening `'"'`.
    pub fn parse_str_content(&mut self) -> Result<String> {
        let mut out = Vec::new();
        let mut start = self.index;
        loop {
            /* search for either '\', '"' or a control character */
            let found = self.input[start..].iter()
                .position(|&b| matches!(b, RS|QU) || b <= 0x1F)
                .ok_or(Error::UnexpectedEof)?;
            let end = start + found;
            out.extend_from_slice(&self.input[start..end]);
            match self.input[end] {
                QU => {
                    self.index = end + 1;
                    break Ok(String::from_utf8(out).map_err(|e| e.utf8_error())?)
                }
                RS => {
                    let index = end + 1;
                    match self.input.get(index).copied() {
                        Some(c@(QU|RS|SO)) => {
                            out.push(c);
                            start = index + 1;
                        }
                        Some(c@(BB..=TT)) => { /* control codes */
                            let unescaped = UNESCAPE[(c-BB) as usize];
                            if unescaped == 0 {
                                break Err(Error::InvalidEscapeSequence)
                            }
                            out.push(unescaped);
                            start = index + 1;
                        }
                        Some(UU) => { /* u0000 */
                            let (ch, len) = self.parse_escaped_char(index + 1)?;
                            let mut buf = [0u8;4];
                            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                            start = index + 1 + len;
                        }
                        Some(..) => break Err(Error::InvalidEscapeSequence),
                        None => break Err(Error::UnexpectedEof)
                    }
                }
                _ => break Err(Error::StringControlChar)
            }
        }
    }

    /// Decode `XXXX` or a surrogate pair `XXXX\uXXXX` starting at `at`,
    /// return the character and the count of input bytes used.
    fn parse_escaped_char(&self, at: usize) -> Result<(char, usize)> {
        let code_at = |at: usize| -> Result<u16> {
            let code: [u8;4] = self.input.get(at..at+4)
                .ok_or(Error::UnexpectedEof)?
                .try_into().map_err(|_| Error::UnexpectedEof)?;
            parse_uuuu(code).ok_or(Error::InvalidEscapeSequence)
        };
        let high = code_at(at)?;
        match high {
            0xD800..=0xDBFF => {
                if self.input.get(at+4..at+6) != Some(b"\\u") {
                    return Err(Error::InvalidUnicodeCodePoint)
                }
                let low = code_at(at + 6)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(Error::InvalidUnicodeCodePoint)
                }
                let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                let ch = char::from_u32(code).ok_or(Error::InvalidUnicodeCodePoint)?;
                Ok((ch, 10))
            }
            _ => {
                let ch = char::from_u32(high.into()).ok_or(Error::InvalidUnicodeCodePoint)?;
                Ok((ch, 4))
            }
        }
    }
}
