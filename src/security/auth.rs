//! Shared-secret comparison (§4.8, §9).
//!
//! The token is compared in constant time so a client cannot use response
//! latency to learn how many leading bytes of a guess matched — the
//! source compares with `strcmp`, which is not constant-time.

use subtle::ConstantTimeEq;

/// Returns whether `provided` equals `expected`, without short-circuiting
/// on the first mismatching byte.
///
/// A length mismatch is also not allowed to leak through timing beyond
/// what comparing against a same-length buffer would: unequal lengths are
/// simply unequal, checked before the constant-time byte comparison.
pub fn tokens_match(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_tokens_are_equal() {
        assert!(tokens_match("secret-token", "secret-token"));
    }

    #[test]
    fn mismatched_tokens_are_unequal() {
        assert!(!tokens_match("wrong", "secret-token"));
    }

    #[test]
    fn different_length_tokens_are_unequal() {
        assert!(!tokens_match("short", "much-longer-token"));
    }
}
