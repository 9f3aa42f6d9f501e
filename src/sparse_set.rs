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

//! Paged sparse set of entities
//!
//! `sparse` maps an identifier to its position in `dense`. It is split into
//! fixed-size pages allocated on first touch, so a single large identifier
//! does not force a contiguous table sized to the whole identifier space.
//! `dense` has no holes: removal moves the last entity into the vacated slot.

use std::fmt;

use crate::entity::{Entity, EntityTraits};
use crate::error::{EcsError, Result};

/// Sparse page length used when none is given
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Sparse slot value meaning "not in the set"
const TOMBSTONE: u32 = u32::MAX;

type Page = Box<[u32]>;

/// Set of entities with O(1) insert, remove and membership test
#[derive(Clone)]
pub struct SparseSet<R: EntityTraits, const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    sparse: Vec<Option<Page>>,
    dense: Vec<Entity<R>>,
}

impl<R: EntityTraits, const PAGE_SIZE: usize> SparseSet<R, PAGE_SIZE> {
    const PAGE_SIZE_IS_NONZERO: () = assert!(PAGE_SIZE > 0, "sparse page size must be non-zero");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::PAGE_SIZE_IS_NONZERO;
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    #[inline]
    fn page(entity: Entity<R>) -> usize {
        entity.index() / PAGE_SIZE
    }

    #[inline]
    fn offset(entity: Entity<R>) -> usize {
        entity.index() % PAGE_SIZE
    }

    fn allocate_page() -> Result<Page> {
        let mut page = Vec::new();
        page.try_reserve_exact(PAGE_SIZE)?;
        page.resize(PAGE_SIZE, TOMBSTONE);
        Ok(page.into_boxed_slice())
    }

    /// Make sure the page covering `entity` exists.
    fn assure_page(&mut self, entity: Entity<R>) -> Result<()> {
        let page = Self::page(entity);
        if page >= self.sparse.len() {
            self.sparse.try_reserve(page + 1 - self.sparse.len())?;
            self.sparse.resize_with(page + 1, || None);
        }
        if self.sparse[page].is_none() {
            self.sparse[page] = Some(Self::allocate_page()?);
        }
        Ok(())
    }

    #[inline]
    fn sparse_slot(&self, entity: Entity<R>) -> Option<u32> {
        let page = self.sparse.get(Self::page(entity))?.as_ref()?;
        Some(page[Self::offset(entity)])
    }

    #[inline]
    fn sparse_slot_mut(&mut self, entity: Entity<R>) -> Option<&mut u32> {
        let page = self.sparse.get_mut(Self::page(entity))?.as_mut()?;
        Some(&mut page[Self::offset(entity)])
    }

    /// Dense position of `entity`, if present with the same version.
    pub fn index_of(&self, entity: Entity<R>) -> Option<usize> {
        let position = self.sparse_slot(entity)?;
        if position == TOMBSTONE {
            return None;
        }
        let position = position as usize;
        (self.dense.get(position) == Some(&entity)).then_some(position)
    }

    #[inline]
    pub fn contains(&self, entity: Entity<R>) -> bool {
        self.index_of(entity).is_some()
    }

    /// Insert `entity`.
    ///
    /// Returns `Ok(false)` without changes if its identifier is already
    /// present (whatever the stored version).
    pub fn insert(&mut self, entity: Entity<R>) -> Result<bool> {
        if entity.is_null() {
            return Err(EcsError::InvalidOperation(
                "the null entity cannot be stored".to_string(),
            ));
        }

        self.assure_page(entity)?;
        if self.sparse_slot(entity) != Some(TOMBSTONE) {
            return Ok(false);
        }

        self.dense.try_reserve(1)?;
        let position = self.dense.len() as u32;
        self.dense.push(entity);
        if let Some(slot) = self.sparse_slot_mut(entity) {
            *slot = position;
        }
        Ok(true)
    }

    /// Remove `entity`; returns `false` if it was not present.
    pub fn remove(&mut self, entity: Entity<R>) -> bool {
        self.swap_remove(entity).is_some()
    }

    /// Swap-and-pop removal. Returns the dense position that was vacated
    /// (now holding the former last element, if any).
    pub(crate) fn swap_remove(&mut self, entity: Entity<R>) -> Option<usize> {
        let position = self.index_of(entity)?;
        if let Some(slot) = self.sparse_slot_mut(entity) {
            *slot = TOMBSTONE;
        }

        self.dense.swap_remove(position);
        if let Some(&moved) = self.dense.get(position) {
            if let Some(slot) = self.sparse_slot_mut(moved) {
                *slot = position as u32;
            }
        }
        Some(position)
    }

    /// Remove every entity and drop all sparse pages. Dense capacity is kept.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
    }

    /// Make room for `count` entities and allocate the pages covering
    /// identifiers `0..count`.
    pub fn reserve(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if count > self.dense.capacity() {
            self.dense.try_reserve(count - self.dense.len())?;
        }

        let page_count = count.div_ceil(PAGE_SIZE);
        if page_count > self.sparse.len() {
            self.sparse.try_reserve(page_count - self.sparse.len())?;
            self.sparse.resize_with(page_count, || None);
        }
        for slot in &mut self.sparse[..page_count] {
            if slot.is_none() {
                *slot = Some(Self::allocate_page()?);
            }
        }
        Ok(())
    }

    /// Release dense slack; drops every page when the set is empty.
    pub fn shrink_to_fit(&mut self) {
        if self.dense.is_empty() {
            self.sparse = Vec::new();
        }
        self.dense.shrink_to_fit();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    /// Number of sparse pages currently allocated
    pub fn page_count(&self) -> usize {
        self.sparse.iter().filter(|page| page.is_some()).count()
    }

    /// Entities in dense order
    pub fn as_slice(&self) -> &[Entity<R>] {
        &self.dense
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity<R>> {
        self.dense.iter()
    }
}

impl<R: EntityTraits, const PAGE_SIZE: usize> Default for SparseSet<R, PAGE_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R: EntityTraits, const PAGE_SIZE: usize> IntoIterator for &'a SparseSet<R, PAGE_SIZE> {
    type Item = &'a Entity<R>;
    type IntoIter = std::slice::Iter<'a, Entity<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.dense.iter()
    }
}

/// Set equality: same entities, in any dense order.
impl<R: EntityTraits, const PAGE_SIZE: usize> PartialEq for SparseSet<R, PAGE_SIZE> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.dense.iter().all(|&e| other.contains(e))
    }
}

impl<R: EntityTraits, const PAGE_SIZE: usize> Eq for SparseSet<R, PAGE_SIZE> {}

impl<R: EntityTraits, const PAGE_SIZE: usize> fmt::Debug for SparseSet<R, PAGE_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.dense.iter()).finish()
    }
}
