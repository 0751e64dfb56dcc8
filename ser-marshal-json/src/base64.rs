//! Standard alphabet BASE-64 used by [`BlobEncoding::Base64`](crate::BlobEncoding::Base64)
static ALPHABET: &[u8;64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encode bytes as BASE-64 with `=` padding.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len().div_ceil(3) * 4);
    let mut chunks = bytes.chunks_exact(3);
    for slice in chunks.by_ref() {
        let (a, b, c) = (slice[0], slice[1], slice[2]);
        out.extend([
            a >> 2,
            ((a & 0x03) << 4) | ((b & 0xF0) >> 4),
            ((b & 0x0F) << 2) | ((c & 0xC0) >> 6),
            c & 0x3F
        ].map(|n| ALPHABET[(n & 0x3F) as usize]));
    }
    match *chunks.remainder() {
        [a, b] => {
            out.extend([
                a >> 2,
                ((a & 0x03) << 4) | ((b & 0xF0) >> 4),
                ((b & 0x0F) << 2)
            ].map(|n| ALPHABET[(n & 0x3F) as usize]));
            out.push(b'=');
        }
        [a] => {
            out.extend([
                a >> 2,
                ((a & 0x03) << 4),
            ].map(|n| ALPHABET[(n & 0x3F) as usize]));
            out.extend(b"==");
        }
        _ => {/* nothing to do */}
    }
    // only ALPHABET and '=' were pushed
    out.into_iter().map(char::from).collect()
}

#[inline]
fn get_code(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'Z' => Some(c - b'A'),
        b'a'..=b'z' => Some(c - b'a' + 26),
        b'0'..=b'9' => Some(c - b'0' + 52),
        b'/' => Some(63),
        b'+' => Some(62),
        _ => None
    }
}

/// Decode BASE-64 text, padding is optional.
///
/// Return `None` on a character outside of the alphabet, on characters
/// following the padding, or on a dangling 6-bit group.
pub fn decode(text: &str) -> Option<Vec<u8>> {
    let input = text.as_bytes();
    let data_len = input.iter().position(|&b| b == b'=').unwrap_or(input.len());
    let (data, padding) = input.split_at(data_len);
    if padding.len() > 2 || padding.iter().any(|&b| b != b'=') {
        return None
    }
    let mut out = Vec::with_capacity(data.len() * 3 / 4);
    let mut chunks = data.chunks_exact(4);
    for chunk in chunks.by_ref() {
        let packed = chunk.iter().try_fold(0u32, |acc, &c| {
            get_code(c).map(|code| (acc << 6) | u32::from(code))
        })?;
        out.extend([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]);
    }
    let rem = chunks.remainder();
    let packed = rem.iter().try_fold(0u32, |acc, &c| {
        get_code(c).map(|code| (acc << 6) | u32::from(code))
    })?;
    match rem.len() {
        0 => {}
        2 => out.push((packed >> 4) as u8),
        3 => out.extend([(packed >> 10) as u8, (packed >> 2) as u8]),
        _ => return None
    }
    Some(out)
}
