// Row hashing helpers. Every column hashes a row by folding its bytes into a
// caller-supplied running `u32` seed, so nested columns can chain children
// into one hash without allocating.

pub const FNV_PRIME: u32 = 0x0100_0193;
pub const FNV_SEED: u32 = 0x811c_9dc5;

/// Folded into the running hash in place of a null row's payload.
pub const NULL_HASH_SEED: u32 = 0x9e37_79b9;

/// 32-bit FNV-1a, continuing from `hash`.
#[inline]
pub fn fnv_hash(bytes: &[u8], hash: u32) -> u32 {
    bytes
        .iter()
        .fold(hash, |h, b| (h ^ *b as u32).wrapping_mul(FNV_PRIME))
}

/// zlib-compatible CRC-32, continuing from `hash`.
#[inline]
pub fn crc32_hash(bytes: &[u8], hash: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(hash);
    hasher.update(bytes);
    hasher.finalize()
}

// XOR-folds a byte string 8 bytes at a time, then the trailing bytes one at
// a time. Used by the variable-length columns' checksums.
pub(crate) fn xor_fold_bytes(bytes: &[u8]) -> i64 {
    let mut words = bytes.chunks_exact(8);
    let mut acc = 0_i64;
    for w in &mut words {
        let mut buf = [0_u8; 8];
        buf.copy_from_slice(w);
        acc ^= i64::from_le_bytes(buf);
    }
    for b in words.remainder() {
        acc ^= *b as i64;
    }
    acc
}
