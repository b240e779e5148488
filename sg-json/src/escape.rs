//! Make raw device bytes safe to put into a JSON string
//!
//! Control characters, DEL and bytes outside of 7-bit ASCII are written as
//! a literal `\xHH`. The usual C escapes (`\b \f \n \r \t`), `"` and `\`
//! are passed through unchanged, because the serializer escapes those
//! again when the string is written.

use crate::JsonError;

fn passthrough(byte: u8) -> bool {
    matches!(byte, 0x08 | 0x0c | b'\n' | b'\r' | b'\t') || (0x20..0x7f).contains(&byte)
}

/// Number of bytes [`escape_for_json_into`] needs for `input`
pub fn escaped_len(input: &[u8]) -> usize {
    input
        .iter()
        .map(|&byte| if passthrough(byte) { 1 } else { 4 })
        .sum()
}

/// Escape `input` into `output`, returns the number of bytes written.
///
/// Fails without writing anything if `output` is too small.
pub fn escape_for_json_into(input: &[u8], output: &mut [u8]) -> Result<usize, JsonError> {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let need = escaped_len(input);
    if need > output.len() {
        return Err(JsonError::EscapeCapacity {
            need,
            capacity: output.len(),
        });
    }

    let mut pos = 0;
    for &byte in input {
        if passthrough(byte) {
            output[pos] = byte;
            pos += 1;
        } else {
            output[pos..pos + 4].copy_from_slice(&[
                b'\\',
                b'x',
                HEX[(byte >> 4) as usize],
                HEX[(byte & 0xf) as usize],
            ]);
            pos += 4;
        }
    }

    Ok(pos)
}

/// Escape `input` into a new string
pub fn escape_for_json(input: &[u8]) -> String {
    let mut buffer = vec![0u8; escaped_len(input)];
    match escape_for_json_into(input, &mut buffer) {
        // only ASCII is ever written
        Ok(len) => buffer[..len].iter().map(|&b| b as char).collect(),
        Err(_) => String::new(),
    }
}
