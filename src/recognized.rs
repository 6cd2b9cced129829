use std::fmt;

/// A value that was either recognized as a known variant `T`, or is an
/// unrecognized raw value `Raw`.
///
/// Chunk ids are the main user: a chunk stream routinely carries record types
/// the decoder has no interest in, and those must be skipped rather than
/// rejected. Keeping the raw value lets warnings and logs say exactly which id
/// was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recognized<T, Raw = String> {
    Known(T),
    Unknown(Raw),
}

impl<T: Copy, Raw: Copy> Copy for Recognized<T, Raw> {}

impl<T, Raw> Recognized<T, Raw> {
    /// Collapse to a single value, converting each side with its own closure.
    pub fn fold<U>(self, known: impl FnOnce(T) -> U, unknown: impl FnOnce(Raw) -> U) -> U {
        match self {
            Recognized::Known(t) => known(t),
            Recognized::Unknown(raw) => unknown(raw),
        }
    }
}

impl<T: fmt::Display, Raw: fmt::Display> fmt::Display for Recognized<T, Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Known(t) => t.fmt(f),
            Recognized::Unknown(raw) => raw.fmt(f),
        }
    }
}
