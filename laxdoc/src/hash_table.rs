// SPDX-License-Identifier: Apache-2.0

//! Open-addressing hash table with coalesced chaining.
//!
//! Every slot carries an in-table link to the next entry of its chain. A key
//! is always reachable by walking the chain that starts at its home slot
//! (`hash % capacity`):
//!
//! - On a collision with an entry that sits in its own home slot, the new
//!   entry goes to a free slot and is linked right after that head.
//! - On a collision with an entry that was itself displaced into this slot,
//!   the occupant moves out to a free slot and the newcomer takes its home.
//!
//! Free slots are handed out by a cursor that only moves towards index 0.
//! Every slot at or above the cursor is occupied; a slot freed above it pulls
//! the cursor back up. There are no tombstones.

use core::borrow::Borrow;

use crate::parse_error::CapacityError;

/// Capacity used when zero is requested.
pub const DEFAULT_CAPACITY: u32 = 64;
/// Largest supported capacity.
pub const MAX_CAPACITY: u32 = 1_073_741_824;
/// Load factor used by [`HashTable::new`].
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Hashing and equality for the keys of one table.
///
/// A strategy is a value, so it can carry context: the table hands the same
/// instance to every call.
pub trait KeyStrategy {
    /// The borrowed form keys are hashed and compared as.
    type Key: ?Sized;

    fn hash(&self, key: &Self::Key) -> u32;

    fn eq(&self, stored: &Self::Key, probe: &Self::Key) -> bool;
}

/// 32-bit FNV-1a over raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1a;

impl KeyStrategy for Fnv1a {
    type Key = [u8];

    fn hash(&self, key: &[u8]) -> u32 {
        fnv1a(key.iter().copied())
    }

    fn eq(&self, stored: &[u8], probe: &[u8]) -> bool {
        stored == probe
    }
}

/// 32-bit FNV-1a over ASCII-lowercased bytes; keys compare case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaselessFnv1a;

impl KeyStrategy for CaselessFnv1a {
    type Key = [u8];

    fn hash(&self, key: &[u8]) -> u32 {
        fnv1a(key.iter().map(u8::to_ascii_lowercase))
    }

    fn eq(&self, stored: &[u8], probe: &[u8]) -> bool {
        stored.eq_ignore_ascii_case(probe)
    }
}

fn fnv1a(bytes: impl Iterator<Item = u8>) -> u32 {
    bytes.fold(2_166_136_261u32, |h, b| {
        (h ^ u32::from(b)).wrapping_mul(0x0100_0193)
    })
}

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u32,
}

#[derive(Clone)]
struct Slot<K, V> {
    entry: Option<Entry<K, V>>,
    next: Option<u32>,
}

impl<K, V> Slot<K, V> {
    const fn empty() -> Self {
        Self {
            entry: None,
            next: None,
        }
    }

    fn is_taken(&self) -> bool {
        self.entry.is_some()
    }
}

/// Associative array keyed through a [`KeyStrategy`].
///
/// Iteration order is the physical slot order and is not insertion order.
#[derive(Clone)]
pub struct HashTable<K, V, S = Fnv1a> {
    slots: Vec<Slot<K, V>>,
    /// Next free slot is searched for strictly below this index.
    free_slot: usize,
    count: u32,
    max_load: f32,
    max_count: u32,
    strategy: S,
}

fn alloc_slots<K, V>(size: u32) -> Result<Vec<Slot<K, V>>, CapacityError> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(size as usize)
        .map_err(|_| CapacityError::new(size as usize, MAX_CAPACITY as usize))?;
    slots.resize_with(size as usize, Slot::empty);
    Ok(slots)
}

impl<K, V, S: KeyStrategy + Default> HashTable<K, V, S>
where
    K: Borrow<S::Key>,
{
    /// Creates a table with `capacity` slots (0 picks the default) and the
    /// default load factor.
    pub fn new(capacity: u32) -> Result<Self, CapacityError> {
        Self::with_strategy(capacity, S::default(), DEFAULT_LOAD_FACTOR)
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    S: KeyStrategy,
    K: Borrow<S::Key>,
{
    /// Creates a table with an explicit strategy and load factor. A load
    /// factor that is not positive means the table only grows when full.
    pub fn with_strategy(
        capacity: u32,
        strategy: S,
        max_load_factor: f32,
    ) -> Result<Self, CapacityError> {
        let mut table = Self {
            slots: Vec::new(),
            free_slot: 0,
            count: 0,
            max_load: if max_load_factor > 0.0 {
                max_load_factor
            } else {
                1.0
            },
            max_count: 0,
            strategy,
        };
        table.resize(capacity)?;
        Ok(table)
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    fn home(&self, hash: u32) -> usize {
        (hash as usize) % self.slots.len()
    }

    fn matches(&self, index: usize, hash: u32, key: &S::Key) -> bool {
        match &self.slots[index].entry {
            Some(entry) => entry.hash == hash && self.strategy.eq(entry.key.borrow(), key),
            None => false,
        }
    }

    fn locate(&self, hash: u32, key: &S::Key) -> Option<usize> {
        let mut index = self.home(hash);
        while self.slots[index].is_taken() {
            if self.matches(index, hash, key) {
                return Some(index);
            }
            index = self.slots[index].next? as usize;
        }
        None
    }

    pub fn get(&self, key: &S::Key) -> Option<&V> {
        let index = self.locate(self.strategy.hash(key), key)?;
        self.slots[index].entry.as_ref().map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &S::Key) -> Option<&mut V> {
        let index = self.locate(self.strategy.hash(key), key)?;
        self.slots[index].entry.as_mut().map(|e| &mut e.value)
    }

    /// Looks up the stored key and value for `key`.
    pub fn find(&self, key: &S::Key) -> Option<(&K, &V)> {
        let index = self.locate(self.strategy.hash(key), key)?;
        self.slots[index].entry.as_ref().map(|e| (&e.key, &e.value))
    }

    pub fn contains_key(&self, key: &S::Key) -> bool {
        self.locate(self.strategy.hash(key), key).is_some()
    }

    /// Inserts or updates. On update the stored key is kept and the previous
    /// value is returned.
    ///
    /// Growing the table may fail, in which case the table is unchanged.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, CapacityError> {
        let hash = self.strategy.hash(key.borrow());
        if let Some(index) = self.locate(hash, key.borrow()) {
            if let Some(entry) = self.slots[index].entry.as_mut() {
                return Ok(Some(core::mem::replace(&mut entry.value, value)));
            }
        }
        self.insert(Entry { key, value, hash })?;
        Ok(None)
    }

    fn insert(&mut self, entry: Entry<K, V>) -> Result<(), CapacityError> {
        if self.count >= self.max_count {
            let doubled = (self.slots.len() as u32).saturating_mul(2);
            self.resize(doubled)?;
        }
        self.place(entry)
    }

    /// Picks the highest free slot below the cursor.
    fn take_free_slot(&mut self) -> Option<usize> {
        while self.free_slot > 0 {
            self.free_slot -= 1;
            if !self.slots[self.free_slot].is_taken() {
                return Some(self.free_slot);
            }
        }
        None
    }

    /// Stores `entry` without checking the load factor.
    fn place(&mut self, entry: Entry<K, V>) -> Result<(), CapacityError> {
        let home = self.home(entry.hash);
        let occupant_hash = self.slots[home].entry.as_ref().map(|e| e.hash);
        let target = match occupant_hash {
            None => {
                self.slots[home].next = None;
                home
            }
            Some(occupant_hash) => {
                let occupant_home = self.home(occupant_hash);
                let free = self
                    .take_free_slot()
                    .ok_or(CapacityError::new(self.count as usize + 1, self.slots.len()))?;
                if occupant_home == home {
                    // chain the newcomer right behind the head
                    self.slots[free].next = self.slots[home].next;
                    self.slots[home].next = Some(free as u32);
                    free
                } else {
                    // the occupant was displaced here: move it out of our home
                    let mut prev = occupant_home;
                    while let Some(next) = self.slots[prev].next {
                        if next as usize == home {
                            break;
                        }
                        prev = next as usize;
                    }
                    debug_assert_eq!(self.slots[prev].next, Some(home as u32));
                    self.slots[prev].next = Some(free as u32);
                    self.slots.swap(home, free);
                    self.slots[home].next = None;
                    home
                }
            }
        };
        self.slots[target].entry = Some(entry);
        self.count += 1;
        Ok(())
    }

    /// Empties slot `index` and makes it available to the free-slot cursor.
    fn reclaim(&mut self, index: usize) {
        self.slots[index] = Slot::empty();
        if index >= self.free_slot {
            self.free_slot = index + 1;
        }
    }

    /// Deletes `key`, returning the stored key and value.
    pub fn remove(&mut self, key: &S::Key) -> Option<(K, V)> {
        let hash = self.strategy.hash(key);
        let home = self.home(hash);
        let mut prev = home;
        let mut current = home;
        while !self.matches(current, hash, key) {
            prev = current;
            current = self.slots[current].next? as usize;
        }

        let removed = if prev == current {
            match self.slots[current].next {
                Some(successor) => {
                    // promote the successor into the head slot
                    let successor = successor as usize;
                    let promoted = core::mem::replace(&mut self.slots[successor], Slot::empty());
                    let old = core::mem::replace(&mut self.slots[current], promoted);
                    self.reclaim(successor);
                    old.entry
                }
                None => {
                    let entry = self.slots[current].entry.take();
                    self.reclaim(current);
                    entry
                }
            }
        } else {
            self.slots[prev].next = self.slots[current].next;
            let entry = self.slots[current].entry.take();
            self.reclaim(current);
            entry
        };

        let entry = removed?;
        self.count -= 1;
        Some((entry.key, entry.value))
    }

    /// Re-places every entry into a table of `capacity` slots (0 picks the
    /// default), reusing the cached hashes.
    ///
    /// Fails without touching the table if `capacity` is above
    /// [`MAX_CAPACITY`], below the current entry count, or cannot be
    /// allocated.
    pub fn resize(&mut self, capacity: u32) -> Result<(), CapacityError> {
        if capacity > MAX_CAPACITY {
            return Err(CapacityError::new(
                capacity as usize,
                MAX_CAPACITY as usize,
            ));
        }
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        if capacity < self.count {
            return Err(CapacityError::new(self.count as usize, capacity as usize));
        }

        let fresh = alloc_slots(capacity)?;
        let old = core::mem::replace(&mut self.slots, fresh);
        let old_capacity = old.len();
        self.free_slot = capacity as usize;
        self.count = 0;
        self.max_count = (capacity as f32 * self.max_load) as u32;

        for entry in old.into_iter().filter_map(|slot| slot.entry) {
            self.place(entry)?;
        }
        log::trace!(
            "hash table resized {} -> {} slots ({} entries)",
            old_capacity,
            capacity,
            self.count
        );
        Ok(())
    }
}

impl<K, V, S> HashTable<K, V, S> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drops every entry, keeping the slot array.
    pub fn clear(&mut self) {
        if self.count > 0 {
            self.slots.iter_mut().for_each(|slot| *slot = Slot::empty());
            self.free_slot = self.slots.len();
            self.count = 0;
        }
    }

    /// First entry in slot order.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    /// Entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<K, V, S> core::fmt::Debug for HashTable<K, V, S>
where
    K: core::fmt::Debug,
    V: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over occupied slots, in slot order.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .by_ref()
            .find_map(|slot| slot.entry.as_ref().map(|e| (&e.key, &e.value)))
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    /// Hashes a key to the first unsigned integer found in it, so tests can
    /// steer keys into chosen slots.
    #[derive(Default)]
    struct FirstNumber;

    impl KeyStrategy for FirstNumber {
        type Key = [u8];

        fn hash(&self, key: &[u8]) -> u32 {
            let digits: Vec<u8> = key
                .iter()
                .copied()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(u8::is_ascii_digit)
                .collect();
            if digits.is_empty() {
                return u32::MAX;
            }
            digits
                .iter()
                .fold(0u32, |n, d| n.wrapping_mul(10).wrapping_add(u32::from(d - b'0')))
        }

        fn eq(&self, stored: &[u8], probe: &[u8]) -> bool {
            stored == probe
        }
    }

    type TestTable = HashTable<&'static [u8], &'static str, FirstNumber>;

    fn table(capacity: u32, load: f32) -> TestTable {
        HashTable::with_strategy(capacity, FirstNumber, load).unwrap()
    }

    /// Renders occupied slots as `(index,hash,next)`, next = -1 at a chain end.
    fn layout<K, V, S>(t: &HashTable<K, V, S>) -> String {
        let mut out = String::new();
        for (i, slot) in t.slots.iter().enumerate() {
            if let Some(entry) = &slot.entry {
                let next = slot.next.map_or(-1, |n| n as i64);
                write!(out, "({},{},{})", i, entry.hash, next).unwrap();
            }
        }
        out
    }

    fn put_all(t: &mut TestTable, cases: &[(&'static str, &'static str, &str)]) {
        for &(key, value, expected) in cases {
            t.put(key.as_bytes(), value).unwrap();
            assert_eq!(layout(t), expected, "after putting {key}");
        }
    }

    fn remove_all(t: &mut TestTable, cases: &[(&'static str, &str)]) {
        for &(key, expected) in cases {
            assert!(t.remove(key.as_bytes()).is_some(), "{key} should be present");
            assert_eq!(layout(t), expected, "after removing {key}");
        }
    }

    #[test]
    fn test_collisions_chain_and_displace() {
        let mut t = table(4, 0.0);
        put_all(
            &mut t,
            &[
                ("K-1", "V-1", "(1,1,-1)"),
                ("K-5", "V-5", "(1,1,3)(3,5,-1)"),
                ("K-17", "V-17", "(1,1,2)(2,17,3)(3,5,-1)"),
                // 2 lands on a slot held by a displaced entry, which moves out
                ("K-2", "V-2", "(0,17,3)(1,1,0)(2,2,-1)(3,5,-1)"),
            ],
        );

        // full table doubles to 8 and re-places by cached hash
        put_all(
            &mut t,
            &[
                ("K-9", "V-9", "(1,17,6)(2,2,-1)(5,5,-1)(6,9,7)(7,1,-1)"),
                ("K-25", "V-25", "(1,17,4)(2,2,-1)(4,25,6)(5,5,-1)(6,9,7)(7,1,-1)"),
                (
                    "K-33",
                    "V-33",
                    "(1,17,3)(2,2,-1)(3,33,4)(4,25,6)(5,5,-1)(6,9,7)(7,1,-1)",
                ),
            ],
        );

        for key in ["K-1", "K-5", "K-17", "K-2", "K-9", "K-25", "K-33"] {
            let expected = key.replace('K', "V");
            assert_eq!(t.get(key.as_bytes()), Some(&expected.as_str()));
        }
        assert_eq!(t.get(b"K-100"), None);
        assert_eq!(t.get(b"K-41"), None);

        remove_all(
            &mut t,
            &[
                // single node chain
                ("K-2", "(1,17,3)(3,33,4)(4,25,6)(5,5,-1)(6,9,7)(7,1,-1)"),
                // a tail
                ("K-1", "(1,17,3)(3,33,4)(4,25,6)(5,5,-1)(6,9,-1)"),
                // an inner node
                ("K-25", "(1,17,3)(3,33,6)(5,5,-1)(6,9,-1)"),
                // a head
                ("K-17", "(1,33,6)(5,5,-1)(6,9,-1)"),
                ("K-9", "(1,33,-1)(5,5,-1)"),
                ("K-5", "(1,33,-1)"),
                ("K-33", ""),
            ],
        );
        assert!(t.is_empty());
    }

    #[test]
    fn test_head_removal_promotes_successor() {
        let mut t = table(4, 0.75);
        put_all(
            &mut t,
            &[
                ("K-1", "V-1", "(1,1,-1)"),
                ("K-5", "V-5", "(1,1,3)(3,5,-1)"),
                ("K-17", "V-17", "(1,1,2)(2,17,3)(3,5,-1)"),
            ],
        );
        put_all(
            &mut t,
            &[
                ("K-9", "V-9", "(1,1,6)(5,5,-1)(6,9,7)(7,17,-1)"),
                ("K-21", "V-21", "(1,1,6)(4,21,-1)(5,5,4)(6,9,7)(7,17,-1)"),
            ],
        );
        remove_all(&mut t, &[("K-5", "(1,1,6)(5,21,-1)(6,9,7)(7,17,-1)")]);

        let count = t.len();
        t.resize(6).unwrap();
        assert_eq!(layout(&t), "(1,1,-1)(3,21,4)(4,9,-1)(5,17,-1)");
        assert_eq!(t.len(), count);

        assert!(t.remove(b"K-41").is_none());
        assert!(t.remove(b"X-21").is_none());
        assert!(t.remove(b"K-21").is_some());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_put_updates_in_place() {
        let mut t: HashTable<Vec<u8>, u32> = HashTable::new(0).unwrap();
        assert_eq!(t.capacity(), DEFAULT_CAPACITY as usize);
        assert_eq!(t.put(b"a".to_vec(), 1).unwrap(), None);
        assert_eq!(t.put(b"a".to_vec(), 2).unwrap(), Some(1));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(b"a"), Some(&2));
        *t.get_mut(b"a").unwrap() += 1;
        assert_eq!(t.find(b"a"), Some((&b"a".to_vec(), &3)));
    }

    #[test]
    fn test_clear_and_iterate() {
        let mut t = table(4, 0.0);
        for key in ["k-1", "k-2", "k-3", "k-4"] {
            t.put(key.as_bytes(), "v").unwrap();
        }
        assert_eq!(t.iter().count(), 4);
        t.clear();
        assert!(t.is_empty());
        assert!(t.first().is_none());

        for key in ["k-3", "k-4", "k-5", "k-6", "k-7", "K-7", "X-7", "k-8"] {
            t.put(key.as_bytes(), "v").unwrap();
        }
        assert_eq!(t.len(), 8);
        let mut seen: Vec<String> = t
            .keys()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            ["K-7", "X-7", "k-3", "k-4", "k-5", "k-6", "k-7", "k-8"]
        );
    }

    /// Hashes int triples by two chosen columns.
    struct Columns([usize; 2]);

    impl KeyStrategy for Columns {
        type Key = [i32];

        fn hash(&self, key: &[i32]) -> u32 {
            (key[self.0[0]] as u32).wrapping_add(key[self.0[1]] as u32)
        }

        fn eq(&self, stored: &[i32], probe: &[i32]) -> bool {
            self.0.iter().all(|&i| stored[i] == probe[i])
        }
    }

    #[test]
    fn test_strategy_with_context() {
        let mut t: HashTable<[i32; 3], [i32; 3], Columns> =
            HashTable::with_strategy(10, Columns([0, 2]), 0.75).unwrap();
        let data = [[1, 2, 3], [0, 1, 4], [2, 3, 0], [1, 8, 1], [0, 9, 2]];
        for row in data {
            t.put(row, row).unwrap();
        }
        let value = t.get(&[1, 0, 1]).unwrap();
        assert_eq!(value[1], 8);
    }

    #[test]
    fn test_caseless_strategy() {
        let mut t: HashTable<Vec<u8>, u8, CaselessFnv1a> = HashTable::new(8).unwrap();
        t.put(b"Content-Type".to_vec(), 1).unwrap();
        assert_eq!(t.get(b"content-type"), Some(&1));
        assert_eq!(t.put(b"CONTENT-TYPE".to_vec(), 2).unwrap(), Some(1));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_resize_limits() {
        let mut t = table(4, 0.0);
        t.put(b"K-1", "a").unwrap();
        t.put(b"K-2", "b").unwrap();
        assert!(t.resize(MAX_CAPACITY + 1).is_err());
        assert!(t.resize(1).is_err());
        assert_eq!(layout(&t), "(1,1,-1)(2,2,-1)");
        t.resize(2).unwrap();
        assert_eq!(t.get(b"K-1"), Some(&"a"));
        assert_eq!(t.get(b"K-2"), Some(&"b"));
    }

    /// Small deterministic generator for the randomized checks.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) as u32
        }
    }

    #[test]
    fn test_random_put_remove_keeps_chains_reachable() {
        let mut rng = Lcg(7);
        let mut t: HashTable<Vec<u8>, u32> = HashTable::new(16).unwrap();
        let mut live = std::collections::BTreeMap::new();
        for round in 0..4000u32 {
            let key = format!("key-{}", rng.next() % 300).into_bytes();
            if rng.next() % 3 == 0 {
                assert_eq!(t.remove(&key).map(|(_, v)| v), live.remove(&key));
            } else {
                t.put(key.clone(), round).unwrap();
                live.insert(key, round);
            }
            assert_eq!(t.len(), live.len());
        }
        for (key, value) in &live {
            assert_eq!(t.get(key), Some(value));
        }
        assert_eq!(t.iter().count(), live.len());
    }

    #[test]
    fn test_resize_preserves_contents() {
        let mut rng = Lcg(99);
        let mut t: HashTable<Vec<u8>, u32> = HashTable::new(8).unwrap();
        for i in 0..200u32 {
            t.put(format!("{}", rng.next() % 500).into_bytes(), i).unwrap();
            if i % 4 == 0 {
                let victim = format!("{}", rng.next() % 500).into_bytes();
                t.remove(&victim);
            }
        }
        let before: std::collections::BTreeMap<Vec<u8>, u32> =
            t.iter().map(|(k, v)| (k.clone(), *v)).collect();

        for capacity in [before.len() as u32, 1000, 257, before.len() as u32 + 1] {
            t.resize(capacity).unwrap();
            assert_eq!(t.len(), before.len());
            for (key, value) in &before {
                assert_eq!(t.get(key), Some(value));
            }
        }
    }
}
