// SPDX-License-Identifier: Apache-2.0

//! Growable array of slots with auto-growing `set`/`insert`.
//!
//! New slots created by growth hold `T::default()`; for value arrays that is
//! the "undefined" placeholder.

use crate::parse_error::CapacityError;

/// Allocation granularity in slots.
pub const BLOCK_SLOTS: usize = 32;
/// Hard ceiling on the number of slots.
pub const MAX_SLOTS: usize = 1_048_576;

#[derive(Debug, Clone, PartialEq)]
pub struct SlotArray<T> {
    items: Vec<T>,
}

impl<T> Default for SlotArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotArray<T> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Makes room for `size` slots, rounding the allocation up to
    /// [`BLOCK_SLOTS`].
    pub fn reserve_slots(&mut self, size: usize) -> Result<(), CapacityError> {
        if self.items.capacity() >= size {
            return Ok(());
        }
        let rounded = size
            .checked_next_multiple_of(BLOCK_SLOTS)
            .ok_or(CapacityError::new(size, MAX_SLOTS))?;
        if rounded > MAX_SLOTS {
            return Err(CapacityError::new(size, MAX_SLOTS));
        }
        self.items
            .try_reserve_exact(rounded - self.items.len())
            .map_err(|_| CapacityError::new(size, MAX_SLOTS))
    }

    /// Appends `item` at the end.
    pub fn push(&mut self, item: T) -> Result<(), CapacityError> {
        let len = self.items.len();
        if len == self.items.capacity() {
            if len >= MAX_SLOTS {
                return Err(CapacityError::new(len + 1, MAX_SLOTS));
            }
            // doubling keeps pushes amortised O(1)
            self.reserve_slots(len.saturating_mul(2).clamp(len + 1, MAX_SLOTS))?;
        }
        self.items.push(item);
        Ok(())
    }

    /// Removes and returns the last item.
    ///
    /// # Panics
    /// If the array is empty.
    pub fn pop(&mut self) -> T {
        match self.items.pop() {
            Some(item) => item,
            None => panic!("pop on an empty slot array"),
        }
    }

    /// Removes and returns the first item, shifting the rest down.
    ///
    /// # Panics
    /// If the array is empty.
    pub fn shift(&mut self) -> T {
        self.remove(0)
    }

    /// Removes and returns the item at `index`, shifting the tail left.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self.items.len(), "remove index {index} out of bounds");
        self.items.remove(index)
    }

    /// Removes every item, releasing the allocation.
    pub fn clear(&mut self) {
        self.items = Vec::new();
    }

    /// Shortens the array to `size` slots. Does nothing if already shorter.
    pub fn truncate(&mut self, size: usize) {
        self.items.truncate(size);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Default> SlotArray<T> {
    /// Sets the length to exactly `size`, filling new slots with
    /// `T::default()` or dropping the tail.
    pub fn resize(&mut self, size: usize) -> Result<(), CapacityError> {
        self.reserve_slots(size)?;
        self.items.resize_with(size, T::default);
        Ok(())
    }

    /// Stores `item` at `index`, growing the array if needed. Returns the
    /// previous occupant.
    pub fn set(&mut self, index: usize, item: T) -> Result<T, CapacityError> {
        if index >= self.items.len() {
            self.resize(index.saturating_add(1))?;
        }
        Ok(core::mem::replace(&mut self.items[index], item))
    }

    /// Returns the slot at `index`, growing the array if needed.
    pub fn slot_mut(&mut self, index: usize) -> Result<&mut T, CapacityError> {
        if index >= self.items.len() {
            self.resize(index.saturating_add(1))?;
        }
        Ok(&mut self.items[index])
    }

    /// Inserts `item` at `index`, shifting the tail right. Past the end, the
    /// array grows so that `item` lands exactly at `index`.
    pub fn insert(&mut self, index: usize, item: T) -> Result<(), CapacityError> {
        if index >= self.items.len() {
            self.set(index, item)?;
        } else {
            self.reserve_slots(self.items.len() + 1)?;
            self.items.insert(index, item);
        }
        Ok(())
    }
}

impl<T: PartialEq> SlotArray<T> {
    /// Position of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|x| x == item)
    }

    /// Removes the first item equal to `item`, if any.
    pub fn remove_first(&mut self, item: &T) -> Option<T> {
        self.index_of(item).map(|i| self.items.remove(i))
    }

    /// Removes later duplicates, keeping the first occurrence of each item
    /// in its original order.
    pub fn dedup(&mut self) {
        let mut i = 0;
        while i < self.items.len() {
            let mut j = i + 1;
            while j < self.items.len() {
                if self.items[j] == self.items[i] {
                    self.items.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }
}

impl<'a, T> IntoIterator for &'a SlotArray<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for SlotArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
