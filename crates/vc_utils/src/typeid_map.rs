use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt::Debug;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::hash::NoOpHashState;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A concurrent map container with [`TypeId`] as the fixed key type.
///
/// All methods take `&self`: the map is sharded internally, so readers on
/// different shards never wait for each other and a writer only holds one
/// shard for the duration of a single call. No guard is ever handed out,
/// values are cloned or visited through a closure instead.
///
/// # Examples
///
/// ```
/// use core::any::TypeId;
/// use vc_utils::TypeIdMap;
///
/// let map = TypeIdMap::<&'static str>::new();
/// assert!(map.try_insert(TypeId::of::<u8>(), || "u8"));
/// assert!(!map.try_insert(TypeId::of::<u8>(), || "byte"));
/// assert_eq!(map.get_type::<u8>(), Some("u8"));
/// ```
pub struct TypeIdMap<V>(DashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty `TypeIdMap`.
    #[inline]
    pub fn new() -> Self {
        Self(DashMap::with_hasher(NoOpHashState))
    }

    /// Creates an empty `TypeIdMap` with the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(DashMap::with_capacity_and_hasher(capacity, NoOpHashState))
    }

    /// Attempts to insert a key-value pair into the map.
    ///
    /// - Returns `true` if the key was not present and the pair was inserted.
    /// - Returns `false` if the key already exists, leaving the map unchanged.
    ///
    /// The closure `f` is only called if the key is not present.
    pub fn try_insert(&self, type_id: TypeId, f: impl FnOnce() -> V) -> bool {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => {
                entry.insert(f());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Inserts a key-value pair, returning the previous value if any.
    pub fn insert(&self, type_id: TypeId, v: V) -> Option<V> {
        self.0.insert(type_id, v)
    }

    /// Visits the value stored for `type_id`, if present.
    pub fn with<R>(&self, type_id: &TypeId, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.0.get(type_id).map(|entry| f(entry.value()))
    }

    /// Removes a key from the map, returning its value if it was present.
    pub fn remove(&self, type_id: &TypeId) -> Option<V> {
        self.0.remove(type_id).map(|(_, v)| v)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.0.contains_key(type_id)
    }

    /// Returns `true` if the map contains a value for the type `T`.
    #[inline(always)]
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.contains(&TypeId::of::<T>())
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clears the map, removing all key-value pairs.
    pub fn clear(&self) {
        self.0.clear();
    }
}

impl<V: Clone> TypeIdMap<V> {
    /// Returns a clone of the value corresponding to the key.
    pub fn get(&self, type_id: &TypeId) -> Option<V> {
        self.0.get(type_id).map(|entry| entry.value().clone())
    }

    /// Returns a clone of the value corresponding to the type `T`.
    #[inline(always)]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<V> {
        self.get(&TypeId::of::<T>())
    }

    /// Returns a snapshot of all values in arbitrary order.
    pub fn values(&self) -> Vec<V> {
        self.0.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for TypeIdMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeIdMap").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::any::TypeId;

    use super::TypeIdMap;

    #[test]
    fn insert_and_remove() {
        let map = TypeIdMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert(TypeId::of::<u32>(), 1), None);
        assert_eq!(map.insert(TypeId::of::<u32>(), 2), Some(1));
        assert_eq!(map.with(&TypeId::of::<u32>(), |v| *v * 10), Some(20));
        assert_eq!(map.remove(&TypeId::of::<u32>()), Some(2));
        assert!(!map.contains_type::<u32>());
    }

    #[test]
    fn shared_between_threads() {
        let map = Arc::new(TypeIdMap::new());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let map = Arc::clone(&map);
                scope.spawn(move || {
                    map.try_insert(TypeId::of::<i64>(), || 7_i64);
                    assert_eq!(map.get_type::<i64>(), Some(7));
                });
            }
        });
        assert_eq!(map.len(), 1);
    }
}
