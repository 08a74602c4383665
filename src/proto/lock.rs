//! The NMDC lock-to-key challenge (spec.md §4 greeting: "`$Lock
//! EXTENDEDPROTOCOL<random> Pk=<HubName>|`... Client must respond with
//! `$Key <key>` where key is the lock-to-key transform").
//!
//! The transform itself is part of the wire protocol, not a local design
//! choice: every NMDC client implements the same byte-wise XOR/rotate/
//! escape algorithm, so the hub must match it exactly or no client can
//! ever log in.

use rand::Rng;

/// A fresh `EXTENDEDPROTOCOL<random>` lock string sent in the greeting.
pub fn generate_lock() -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!("EXTENDEDPROTOCOL_VERLICORE_{suffix:016X}")
}

/// The standard NMDC lock-to-key transform: XOR each byte against its
/// predecessor (and the first against the last two lock bytes plus 5),
/// nibble-swap, then escape the five characters that can't appear
/// literally on the wire.
pub fn lock_to_key(lock: &str) -> String {
    let lock = lock.as_bytes();
    if lock.is_empty() {
        return String::new();
    }
    let n = lock.len();
    let mut key = vec![0u8; n];
    key[0] = lock[0] ^ lock[n - 1] ^ lock[n.saturating_sub(2)] ^ 5;
    for i in 1..n {
        key[i] = lock[i] ^ lock[i - 1];
    }
    for b in &mut key {
        *b = (*b << 4) | (*b >> 4);
    }
    escape_key(&key)
}

/// Characters `0x00, 0x05, 0x24 ('$'), 0x60 ('`'), 0x7c ('|'), 0x7e ('~')`
/// can't appear in a key verbatim; each becomes `/%DCNNN%/` with the
/// decimal byte value.
fn escape_key(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &b in key {
        match b {
            0x00 | 0x05 | 0x24 | 0x60 | 0x7c | 0x7e => {
                out.push_str(&format!("/%DCN{b:03}%/"));
            }
            _ => out.push(b as char),
        }
    }
    out
}

/// Validates a client's `$Key` response against the lock this connection
/// was issued.
pub fn validate_key(lock: &str, candidate_key: &str) -> bool {
    lock_to_key(lock) == candidate_key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_lock_starts_with_extendedprotocol() {
        assert!(generate_lock().starts_with("EXTENDEDPROTOCOL"));
    }

    #[test]
    fn correct_key_validates() {
        let lock = "EXTENDEDPROTOCOL_ABCDEF0123456789";
        let key = lock_to_key(lock);
        assert!(validate_key(lock, &key));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let lock = "EXTENDEDPROTOCOL_ABCDEF0123456789";
        assert!(!validate_key(lock, "garbage"));
    }

    #[test]
    fn special_bytes_are_escaped() {
        // A lock chosen so the key transform produces a byte needing escape.
        let lock = "EXTENDEDPROTOCOL_\u{0}\u{0}\u{0}\u{0}";
        let key = lock_to_key(lock);
        assert!(key.contains("/%DCN"));
    }
}
