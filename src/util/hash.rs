//! 32-bit string hashing and nick case-folding (component A).

/// FNV-1a, matching the original hub's cheap 32-bit nick hash well enough
/// for bucket distribution; collisions are resolved by the backing map's
/// own equality check, never by the hash alone.
pub fn fnv1a_32(s: &str) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET;
    for b in s.as_bytes() {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Case-fold (and, per config, strip a configured prefix) before hashing
/// or comparing nicks, so `Alice` and `alice` collide on the same key per
/// spec.md §3's nick-key invariant.
pub fn casefold_nick(nick: &str, case_insensitive: bool, strip_prefix: Option<&str>) -> String {
    let stripped = match strip_prefix {
        Some(prefix) if nick.starts_with(prefix) => &nick[prefix.len()..],
        _ => nick,
    };
    if case_insensitive {
        stripped.to_lowercase()
    } else {
        stripped.to_string()
    }
}

/// The nick-hash used to key the user collection (§3 invariant: exactly
/// one user per nick-key).
pub fn nick_hash(nick: &str, case_insensitive: bool, strip_prefix: Option<&str>) -> u32 {
    fnv1a_32(&casefold_nick(nick, case_insensitive, strip_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casefold_collides_on_case() {
        assert_eq!(
            nick_hash("Alice", true, None),
            nick_hash("alice", true, None)
        );
    }

    #[test]
    fn case_sensitive_does_not_collide() {
        assert_ne!(
            nick_hash("Alice", false, None),
            nick_hash("alice", false, None)
        );
    }

    #[test]
    fn prefix_stripped_before_hash() {
        assert_eq!(
            nick_hash("[OP]bob", true, Some("[OP]")),
            nick_hash("bob", true, Some("[OP]"))
        );
    }
}
