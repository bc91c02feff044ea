//! Provide hash states and containers, re-exports *hashbrown* and *foldhash*.

// -----------------------------------------------------------------------------
// Modules

mod hasher;

// -----------------------------------------------------------------------------
// Exports

pub use hasher::{FixedHashState, FixedHasher};
pub use hasher::{NoOpHashState, NoOpHasher};

/// A [`hashbrown::HashMap`] using [`FixedHashState`] by default.
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`] by default.
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

/// A [`dashmap::DashMap`] using [`FixedHashState`] by default.
///
/// Used for process-wide tables that are shared between threads.
pub type ConcurrentMap<K, V, S = FixedHashState> = dashmap::DashMap<K, V, S>;

/// A [`dashmap::DashSet`] using [`FixedHashState`] by default.
pub type ConcurrentSet<T, S = FixedHashState> = dashmap::DashSet<T, S>;

// -----------------------------------------------------------------------------
// Re-export crates

pub use dashmap;
pub use foldhash;
pub use hashbrown;
