use rand::Rng;

/// A seedable linear congruential generator used for reproducible shuffles.
///
/// Seeding strategies that randomize must produce the exact same permutation
/// for the same seed and input order, so the generator is explicit and
/// injectable rather than ambient. Uses Knuth's MMIX multiplier/increment.
#[derive(Clone, Debug)]
pub struct SeedRng {
    state: u64,
}

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

impl SeedRng {
    /// Creates a generator from an explicit seed.
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Creates a generator from operating system entropy. The resulting
    /// permutations are not reproducible.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    /// Returns the next pseudo-random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        // The high bits have the longest period.
        self.state >> 16
    }

    /// Returns a value uniformly distributed in `0..bound`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    #[inline]
    pub fn next_bounded(&mut self, bound: usize) -> usize {
        assert!(bound > 0);
        (self.next_u64() % bound as u64) as usize
    }

    /// Shuffles `slice` in place using the Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_bounded(i + 1);
            slice.swap(i, j);
        }
    }
}
