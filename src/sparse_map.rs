// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Sparse map: a sparse set plus a value column at the same dense positions.
//!
//! `values[i]` always belongs to `set.as_slice()[i]`. Both arrays are
//! swap-and-popped together so the parity holds after every removal.

use std::fmt;

use crate::entity::{Entity, EntityTraits};
use crate::error::{EcsError, Result};
use crate::sparse_set::{SparseSet, DEFAULT_PAGE_SIZE};

/// Entity-keyed map with dense value storage
#[derive(Clone)]
pub struct SparseMap<R: EntityTraits, V, const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    set: SparseSet<R, PAGE_SIZE>,
    values: Vec<V>,
}

impl<R: EntityTraits, V, const PAGE_SIZE: usize> SparseMap<R, V, PAGE_SIZE> {
    pub fn new() -> Self {
        Self {
            set: SparseSet::new(),
            values: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.set.capacity()
    }

    #[inline]
    pub fn contains(&self, key: Entity<R>) -> bool {
        self.set.contains(key)
    }

    /// True only if `key` is present and its value equals `value`.
    pub fn contains_value(&self, key: Entity<R>, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.get(key) == Some(value)
    }

    pub fn get(&self, key: Entity<R>) -> Option<&V> {
        let position = self.set.index_of(key)?;
        self.values.get(position)
    }

    pub fn get_mut(&mut self, key: Entity<R>) -> Option<&mut V> {
        let position = self.set.index_of(key)?;
        self.values.get_mut(position)
    }

    /// Insert `value` for `key`.
    ///
    /// First insert wins: if the key's identifier is already present the
    /// stored value is kept and `Ok(false)` is returned.
    pub fn insert(&mut self, key: Entity<R>, value: V) -> Result<bool> {
        self.values.try_reserve(1)?;
        if !self.set.insert(key)? {
            return Ok(false);
        }
        self.values.push(value);
        Ok(true)
    }

    /// Overwrite the value of a present key, returning the previous one.
    /// Absent keys are left absent.
    pub fn replace(&mut self, key: Entity<R>, value: V) -> Option<V> {
        let slot = self.get_mut(key)?;
        Some(std::mem::replace(slot, value))
    }

    /// Insert, or overwrite if present. Returns the previous value on overwrite.
    pub fn insert_or_replace(&mut self, key: Entity<R>, value: V) -> Result<Option<V>> {
        if let Some(slot) = self.get_mut(key) {
            return Ok(Some(std::mem::replace(slot, value)));
        }
        if self.insert(key, value)? {
            Ok(None)
        } else {
            Err(EcsError::InvalidOperation(format!(
                "identifier {} is held by another version",
                key.identifier()
            )))
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: Entity<R>) -> Option<V> {
        let position = self.set.swap_remove(key)?;
        Some(self.values.swap_remove(position))
    }

    /// Remove `key` only if its current value equals `value`.
    pub fn remove_value(&mut self, key: Entity<R>, value: &V) -> bool
    where
        V: PartialEq,
    {
        if !self.contains_value(key, value) {
            return false;
        }
        self.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.set.clear();
        self.values.clear();
    }

    /// Make room for `count` entries (see [`SparseSet::reserve`]).
    pub fn reserve(&mut self, count: usize) -> Result<()> {
        self.set.reserve(count)?;
        if count > self.values.capacity() {
            self.values.try_reserve(count - self.values.len())?;
        }
        Ok(())
    }

    pub fn shrink_to_fit(&mut self) {
        self.set.shrink_to_fit();
        self.values.shrink_to_fit();
    }

    /// Keys in dense order
    pub fn keys(&self) -> &[Entity<R>] {
        self.set.as_slice()
    }

    /// Values in dense order
    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [V] {
        &mut self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity<R>, &V)> + '_ {
        self.set.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity<R>, &mut V)> + '_ {
        self.set.iter().copied().zip(self.values.iter_mut())
    }

    /// Key membership as a plain set
    pub fn as_set(&self) -> &SparseSet<R, PAGE_SIZE> {
        &self.set
    }
}

impl<R: EntityTraits, V, const PAGE_SIZE: usize> Default for SparseMap<R, V, PAGE_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Same keys, and equal values per key, in any dense order.
impl<R: EntityTraits, V: PartialEq, const PAGE_SIZE: usize> PartialEq
    for SparseMap<R, V, PAGE_SIZE>
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<R: EntityTraits, V: Eq, const PAGE_SIZE: usize> Eq for SparseMap<R, V, PAGE_SIZE> {}

impl<R: EntityTraits, V: fmt::Debug, const PAGE_SIZE: usize> fmt::Debug
    for SparseMap<R, V, PAGE_SIZE>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
