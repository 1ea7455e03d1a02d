//! Growable scratch storage reused across many short-lived records.
//!
//! Capacity starts at two slots and doubles when exhausted. `clear` resets the
//! length but keeps the backing storage, so a caller that fills and clears the
//! array once per record only pays for allocation while the high-water mark
//! grows.

use std::collections::TryReserveError;

const INITIAL_CAPACITY: usize = 2;

#[derive(Debug)]
pub struct ScratchArray<T> {
    items: Vec<T>,
    len: usize,
}

impl<T: Default> ScratchArray<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            len: 0,
        }
    }

    /// Append a default-initialised slot and return it for the caller to fill.
    ///
    /// Slots left over from before the last `clear` are reset rather than
    /// reallocated.
    pub fn push(&mut self) -> Result<&mut T, TryReserveError> {
        if self.len == self.items.len() {
            if self.items.len() == self.items.capacity() {
                let grow_by = self.items.capacity().max(INITIAL_CAPACITY);
                self.items.try_reserve_exact(grow_by)?;
            }
            self.items.push(T::default());
        } else {
            self.items[self.len] = T::default();
        }
        let slot = self.len;
        self.len += 1;
        Ok(&mut self.items[slot])
    }
}

impl<T> ScratchArray<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let len = self.len;
        self.items[..len].get_mut(index)
    }

    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        let len = self.len;
        self.items[..len].last_mut()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T: Default> Default for ScratchArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a ScratchArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
