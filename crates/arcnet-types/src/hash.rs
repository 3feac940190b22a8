//! Stable name hashing.
//!
//! Enum members, variant cases, and struct fields are identified on the
//! wire by a hash of their name. The hash must be identical on every build
//! and platform, so it is a fixed algorithm (32-bit FNV-1a) rather than
//! `std::hash`, whose output is allowed to change between releases.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `name`.
pub fn name_hash(name: &str) -> u32 {
    name.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_hash_known_vectors() {
        assert_eq!(name_hash(""), 0x811c_9dc5);
        assert_eq!(name_hash("a"), 0xe40c_292c);
        assert_eq!(name_hash("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_name_hash_distinguishes_names() {
        assert_ne!(name_hash("Red"), name_hash("Green"));
    }
}
