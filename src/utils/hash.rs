//! Jenkins one-at-a-time hashing
//!
//! The game identifies resources by the Jenkins hash of their lowercased
//! name; drawable dictionaries store members sorted by this hash.

/// Jenkins one-at-a-time hash of the lowercased input.
#[must_use]
pub fn jenk_hash(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for byte in name.bytes() {
        hash = hash.wrapping_add(u32::from(byte.to_ascii_lowercase()));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hash() {
        // Well-known vehicle name hash.
        assert_eq!(jenk_hash("adder"), 0xB779A091);
        assert_eq!(jenk_hash("ADDER"), 0xB779A091);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(jenk_hash(""), 0);
    }
}
