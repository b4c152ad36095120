//! Code fingerprints
//!
//! Provides [`CodeHash`], the non-negative 31-bit fingerprint recorded in
//! `@Generated(hash = ...)` annotations. The value is derived from the
//! canonical form of a snippet (see [`crate::canonicalize`]) using the low
//! 64 bits of Murmur3 x64/128 with seed zero, truncated to 32 bits with the
//! sign bit cleared. Recorded values must stay reproducible forever; the
//! known values in the tests pin the algorithm.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::canonical::{canonicalize, strip_generated};

/// Placeholder written by generators where the hash will be embedded.
pub const HASH_STUB: &str = "HASH_STUB";

/// Fingerprint of a code snippet's canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeHash(u32);

impl CodeHash {
    /// Largest representable value (`Integer.MAX_VALUE` in the annotated sources)
    pub const MAX: u32 = 0x7fff_ffff;

    /// Wrap a raw value
    ///
    /// # Errors
    /// Returns error if the value has the sign bit set
    #[inline]
    pub const fn new(value: u32) -> Result<Self, HashError> {
        if value > Self::MAX {
            return Err(HashError::OutOfRange(value as i64));
        }
        Ok(Self(value))
    }

    /// Interpret a value read back from an annotation.
    ///
    /// Negative values are the "no previous hash" sentinel and yield `None`.
    ///
    /// # Errors
    /// Returns error if the value does not fit in 31 bits
    pub fn from_recorded(value: i64) -> Result<Option<Self>, HashError> {
        if value < 0 {
            return Ok(None);
        }
        u32::try_from(value)
            .map_err(|_| HashError::OutOfRange(value))
            .and_then(Self::new)
            .map(Some)
    }

    /// Fingerprint of `code`.
    ///
    /// Any `@Generated(...)` annotation with arguments is removed before
    /// canonicalizing, so embedding the result back into the snippet does
    /// not change it.
    #[must_use]
    pub fn compute(code: &str) -> Self {
        let canonical = canonicalize(&strip_generated(code));
        let low = murmur3_x64_128_low(canonical.as_bytes());
        // Truncate to 32 bits, then drop the sign bit
        Self((low as u32) & Self::MAX)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for CodeHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CodeHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| HashError::Malformed(s.to_string()))?;
        Self::new(value)
    }
}

/// Compute the fingerprint of `code`.
#[inline]
#[must_use]
pub fn code_hash(code: &str) -> CodeHash {
    CodeHash::compute(code)
}

/// Replace the [`HASH_STUB`] placeholder with the fingerprint of `code`.
///
/// Returns the finished snippet together with the embedded hash.
#[must_use]
pub fn embed_hash(code: &str) -> (String, CodeHash) {
    let hash = CodeHash::compute(code);
    (code.replace(HASH_STUB, &hash.to_string()), hash)
}

/// Errors that can occur when working with code hashes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    /// Value outside of the non-negative 32-bit integer range
    #[error("hash value out of range: {0}")]
    OutOfRange(i64),

    /// Text is not a decimal integer
    #[error("malformed hash value: {0:?}")]
    Malformed(String),
}

/// Low 64 bits (`h1`) of Murmur3 x64/128 with seed zero.
fn murmur3_x64_128_low(data: &[u8]) -> u64 {
    // Reading from a slice cannot fail
    let full = murmur3::murmur3_x64_128(&mut &data[..], 0).unwrap_or_default();
    full as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn murmur_of_empty_input_is_zero() {
        assert_eq!(murmur3_x64_128_low(b""), 0);
    }

    #[test]
    fn murmur_depends_on_every_tail_byte() {
        let base = murmur3_x64_128_low(b"0123456789abcdefXYZ");
        assert_ne!(base, murmur3_x64_128_low(b"0123456789abcdefXYz"));
        assert_ne!(base, murmur3_x64_128_low(b"0123456789abcdefXY"));
    }

    #[test]
    fn default_constructor_hash_matches_recorded_value() {
        let code = "@Generated(hash = 1272611929)\npublic Note() {\n}";
        assert_eq!(CodeHash::compute(code).value(), 1_272_611_929);
    }

    #[test]
    fn hash_ignores_formatting() {
        let a = CodeHash::compute("public Note() {\n}");
        let b = CodeHash::compute("    public Note()\n    {\n    }\n");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_non_negative() {
        for code in ["a", "int x;", "public void run() {}", "/** doc */ int y;"] {
            assert!(CodeHash::compute(code).value() <= CodeHash::MAX);
        }
    }

    #[test]
    fn embed_hash_replaces_stub() {
        let template = "@Generated(hash = HASH_STUB)\npublic Note() {\n}";
        let (code, hash) = embed_hash(template);
        assert_eq!(code, "@Generated(hash = 1272611929)\npublic Note() {\n}");
        assert_eq!(CodeHash::compute(&code), hash);
    }

    #[test]
    fn from_recorded_handles_sentinel() {
        assert_eq!(CodeHash::from_recorded(-1), Ok(None));
        assert_eq!(CodeHash::from_recorded(42).unwrap().map(CodeHash::value), Some(42));
        assert!(CodeHash::from_recorded(i64::from(u32::MAX)).is_err());
    }

    #[test]
    fn parse_and_display() {
        let hash: CodeHash = "1777635696".parse().unwrap();
        assert_eq!(hash.to_string(), "1777635696");
        assert!("abc".parse::<CodeHash>().is_err());
        assert!("4294967295".parse::<CodeHash>().is_err());
    }
}
