//! Lookup key generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Number of characters in a lookup key.
pub const LOOKUP_KEY_LEN: usize = 20;

/// Generate a fresh opaque lookup key.
///
/// Every character is drawn independently and uniformly from the 62-symbol
/// alphabet `[A-Za-z0-9]`, giving 62^20 (about 7 * 10^35) possible keys.
/// Collisions are not checked here; the storage layer rejects a duplicate
/// `l_key` and the registry retries with a new key.
pub fn generate_lookup_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LOOKUP_KEY_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_shape() {
        let key = generate_lookup_key();
        assert_eq!(key.len(), LOOKUP_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys: HashSet<String> = (0..1000).map(|_| generate_lookup_key()).collect();
        assert_eq!(keys.len(), 1000);
    }
}
