//! An order-preserving map.
//!
//! AMQP map encodings carry their entries in a defined order, and two maps
//! with the same entries in different orders are different wire values, so
//! equality and hashing here are order-sensitive (unlike `IndexMap`'s own
//! `PartialEq`).

use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

/// A polymorphic mapping from distinct keys to values that preserves
/// insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V>(IndexMap<K, V>);

impl<K, V> OrderedMap<K, V> {
    /// Creates an empty map
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Creates an empty map with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the entries in order
    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.0.iter()
    }

    /// Consume the wrapper into the inner [`IndexMap`]
    pub fn into_inner(self) -> IndexMap<K, V> {
        self.0
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq,
{
    /// Inserts an entry, appending it if the key is new
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    /// Looks up a value by key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: Hash + indexmap::Equivalent<K> + ?Sized,
    {
        self.0.get(key)
    }

    /// Removes an entry, preserving the order of the rest
    pub fn shift_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: Hash + indexmap::Equivalent<K> + ?Sized,
    {
        self.0.shift_remove(key)
    }

    /// Whether the key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + indexmap::Equivalent<K> + ?Sized,
    {
        self.0.contains_key(key)
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self(IndexMap::default())
    }
}

impl<K, V> PartialEq for OrderedMap<K, V>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }
}

impl<K, V> Eq for OrderedMap<K, V>
where
    K: Eq,
    V: Eq,
{
}

impl<K, V> Hash for OrderedMap<K, V>
where
    K: Hash,
    V: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0.len());
        for entry in self.0.iter() {
            entry.hash(state);
        }
    }
}

impl<K, V> From<IndexMap<K, V>> for OrderedMap<K, V> {
    fn from(val: IndexMap<K, V>) -> Self {
        Self(val)
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedMap<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = indexmap::map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::OrderedMap;

    #[test]
    fn equality_is_order_sensitive() {
        let mut a = OrderedMap::new();
        a.insert("one", 1);
        a.insert("two", 2);

        let mut b = OrderedMap::new();
        b.insert("two", 2);
        b.insert("one", 1);

        assert_ne!(a, b);
    }
}
