//! Target Selection RNG
//!
//! Xorshift128+ generator used to pick targets from the corpus.
//! Seedable so corpus selection can be replayed in tests.

use sha2::{Sha256, Digest};

/// Xorshift128+ pseudo-random generator.
///
/// # Example
///
/// ```
/// use exprdle::core::rng::SelectionRng;
///
/// let mut a = SelectionRng::new(7);
/// let mut b = SelectionRng::new(7);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct SelectionRng {
    state: [u64; 2],
}

impl SelectionRng {
    /// Create a generator from a 64-bit seed.
    ///
    /// The seed is expanded with SplitMix64 so that small or sequential
    /// seeds still give well-spread state.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // State must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create a generator seeded from a fresh random UUID.
    pub fn from_entropy() -> Self {
        Self::new(derive_seed(uuid::Uuid::new_v4().as_bytes()))
    }

    /// Next 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Integer in `[0, max)`. Returns 0 when `max` is 0.
    #[inline]
    pub fn next_index(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        // Modulo bias is negligible for corpus-sized ranges
        (self.next_u64() % max as u64) as usize
    }

    /// Pick an element and its index.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<(usize, &'a T)> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_index(slice.len());
            Some((idx, &slice[idx]))
        }
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a 64-bit seed from arbitrary entropy bytes.
pub fn derive_seed(entropy: &[u8]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"EXPRDLE_SEED_V1");
    hasher.update(entropy);
    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = SelectionRng::new(12345);
        let mut rng2 = SelectionRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SelectionRng::new(12345);
        let mut rng2 = SelectionRng::new(54321);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_rng_known_values() {
        // Regression values; a change here reshuffles every seeded corpus pick.
        let mut rng = SelectionRng::new(42);
        assert_eq!(rng.next_u64(), 16629283624882167704);
        assert_eq!(rng.next_u64(), 1420492921613871959);
        assert_eq!(rng.next_u64(), 9768315062676884790);
    }

    #[test]
    fn test_next_index_bounds() {
        let mut rng = SelectionRng::new(1234);
        for _ in 0..1000 {
            assert!(rng.next_index(17) < 17);
        }
        assert_eq!(rng.next_index(0), 0);
        assert_eq!(rng.next_index(1), 0);
    }

    #[test]
    fn test_choose() {
        let mut rng = SelectionRng::new(99);
        let items = ["a", "b", "c"];
        let (idx, item) = rng.choose(&items).unwrap();
        assert_eq!(items[idx], *item);

        let empty: [&str; 0] = [];
        assert!(rng.choose(&empty).is_none());
    }

    #[test]
    fn test_derive_seed() {
        assert_eq!(derive_seed(b"abc"), derive_seed(b"abc"));
        assert_ne!(derive_seed(b"abc"), derive_seed(b"abd"));
    }
}
