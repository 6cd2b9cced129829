//! Shared winnow-based parsing utilities used by the reader and both model decoders.

use winnow::Parser;
use winnow::error::ContextError;
use winnow::token::take;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// Convert raw bytes to a string one byte per character.
///
/// Asset names in both formats are 8-bit strings with no declared encoding, so
/// every byte maps to the Unicode code point of the same value.
pub fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Truncate a null-padded field at its first zero byte.
pub fn trim_null_padding(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Parser for a fixed-width, null-padded string field.
///
/// Always consumes exactly `width` bytes, whatever the string length.
pub fn padded_string<'a>(width: usize) -> impl FnMut(&mut &'a [u8]) -> WResult<String> {
    move |input: &mut &'a [u8]| {
        take(width)
            .map(|field: &[u8]| latin1_string(trim_null_padding(field)))
            .parse_next(input)
    }
}

/// Find a null-terminated string at the start of `input`.
///
/// Returns the string bytes (without the terminator), or `None` when no
/// terminator exists in `input`.
pub fn null_terminated(input: &[u8]) -> Option<&[u8]> {
    input.iter().position(|&b| b == 0).map(|end| &input[..end])
}
