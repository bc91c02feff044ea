//! The two hash states behind the crate's map aliases.
//!
//! - [`FixedHashState`]: seeded `foldhash`, identical output in every
//!   process. Default for maps keyed by names, tags and addresses.
//! - [`NoOpHashState`]: hands an integer key back as its own hash. Only
//!   sound for keys that are already uniformly spread, such as
//!   [`TypeId`](core::any::TypeId).

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// Seeded

/// Output of [`FixedHashState::build_hasher`].
pub type FixedHasher = FoldHasher<'static>;

/// Deterministic `foldhash` state.
///
/// Stable tags and registry lookups must hash the same way on every
/// thread, so the seed is a constant rather than per-process entropy.
///
/// ```
/// use core::hash::BuildHasher;
/// use vc_utils::hash::FixedHashState;
///
/// assert_eq!(
///     FixedHashState.hash_one("pair<wrapper<leaf>, i4>"),
///     FixedHashState.hash_one("pair<wrapper<leaf>, i4>"),
/// );
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl FixedHashState {
    const SEED: FixedState = FixedState::with_seed(0x6A09_E667_F3BC_C908);
}

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline]
    fn build_hasher(&self) -> FixedHasher {
        Self::SEED.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// Pass-through

/// Output of [`NoOpHashState::build_hasher`].
///
/// Integer writes replace the state. Byte writes are packed into
/// little-endian words and mixed in, so keys that hash through
/// [`Hasher::write`] still land somewhere reasonable.
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHasher(u64);

impl NoOpHasher {
    #[inline]
    fn mix(&mut self, word: u64) {
        self.0 = self.0.rotate_left(29) ^ word;
    }
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.mix(u64::from_le_bytes(word));
        }
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.0 = u64::from(i);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.0 = i as u64;
    }
}

/// State for maps keyed by values that are hashes already.
///
/// ```
/// use core::hash::{BuildHasher, Hasher};
/// use vc_utils::hash::NoOpHashState;
///
/// let mut hasher = NoOpHashState.build_hasher();
/// hasher.write_u64(0x5EED);
/// assert_eq!(hasher.finish(), 0x5EED);
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline]
    fn build_hasher(&self) -> NoOpHasher {
        NoOpHasher::default()
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;
    use core::hash::{BuildHasher, Hasher};

    use super::{FixedHashState, NoOpHashState};
    use crate::hash::HashSet;

    #[test]
    fn integer_writes_pass_through() {
        let mut wide = NoOpHashState.build_hasher();
        wide.write_u64(1234);
        let mut narrow = NoOpHashState.build_hasher();
        narrow.write_u32(1234);
        assert_eq!(wide.finish(), 1234);
        assert_eq!(narrow.finish(), wide.finish());
    }

    #[test]
    fn byte_writes_depend_on_every_word() {
        let a = NoOpHashState.hash_one([1u8; 12].as_slice());
        let b = NoOpHashState.hash_one([1u8, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2].as_slice());
        assert_ne!(a, b);
    }

    #[test]
    fn type_ids_stay_distinct() {
        let ids = [TypeId::of::<u8>(), TypeId::of::<u16>(), TypeId::of::<&str>()];
        let hashes: HashSet<u64> = ids.iter().map(|id| NoOpHashState.hash_one(id)).collect();
        assert_eq!(hashes.len(), ids.len());
    }

    #[test]
    fn seeded_state_agrees_across_instances() {
        let one = FixedHashState;
        let other = FixedHashState::default();
        assert_eq!(one.hash_one("node"), other.hash_one("node"));
        assert_ne!(one.hash_one("node"), one.hash_one("leaf"));
    }
}
