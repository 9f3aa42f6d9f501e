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

//! Slot map: dense value storage addressed by generation-checked keys.
//!
//! Values live in a hole-free array. Keys point at a slot table which in
//! turn points at the dense position, so swap-and-pop erasure only has to
//! patch one slot and outstanding keys stay valid.

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// Key issued by [`SlotMap::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotMapKey {
    pub index: u32,
    pub generation: u32,
}

/// Reserved key that insertion never produces.
pub const INVALID_SLOT_MAP_KEY: SlotMapKey = SlotMapKey {
    index: u32::MAX,
    generation: u32::MAX,
};

impl Default for SlotMapKey {
    fn default() -> Self {
        INVALID_SLOT_MAP_KEY
    }
}

const VACANT: u32 = u32::MAX;
const MIN_GROWTH: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    /// Position in the dense value array, or `VACANT`
    position: u32,
}

/// Generational slot map
#[derive(Debug, Clone)]
pub struct SlotMap<T> {
    slots: Vec<Slot>,
    values: Vec<T>,
    /// `owners[i]` is the slot index that owns `values[i]`
    owners: Vec<u32>,
    /// Reclaimed slot indices, most recent last.
    /// Capacity always covers `slots.len()` so erase never allocates.
    free: Vec<u32>,
}

impl<T> SlotMap<T> {
    pub const INVALID: SlotMapKey = INVALID_SLOT_MAP_KEY;

    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            values: Vec::new(),
            owners: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Insert a value and return its key.
    ///
    /// Storage grows geometrically; a failed allocation is reported as
    /// `OutOfMemory` and leaves the map untouched.
    pub fn insert(&mut self, value: T) -> Result<SlotMapKey> {
        if self.values.len() == self.values.capacity()
            || self.owners.len() == self.owners.capacity()
        {
            let additional = self.values.capacity().max(MIN_GROWTH);
            self.values.try_reserve(additional)?;
            self.owners.try_reserve(additional)?;
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len();
                if index >= VACANT as usize {
                    return Err(EcsError::CapacityExceeded {
                        requested: index,
                        max: VACANT as usize - 1,
                    });
                }
                self.slots.try_reserve(1)?;
                self.free.try_reserve(self.slots.len() + 1 - self.free.len())?;
                self.slots.push(Slot {
                    generation: 0,
                    position: VACANT,
                });
                index as u32
            }
        };

        let position = self.values.len() as u32;
        self.values.push(value);
        self.owners.push(index);

        let slot = &mut self.slots[index as usize];
        slot.position = position;

        Ok(SlotMapKey {
            index,
            generation: slot.generation,
        })
    }

    #[inline]
    fn position(&self, key: SlotMapKey) -> Option<usize> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation == key.generation && slot.position != VACANT {
            Some(slot.position as usize)
        } else {
            None
        }
    }

    /// Value for `key`, or `None` if the key is stale or unknown.
    pub fn try_get(&self, key: SlotMapKey) -> Option<&T> {
        let position = self.position(key)?;
        self.values.get(position)
    }

    pub fn try_get_mut(&mut self, key: SlotMapKey) -> Option<&mut T> {
        let position = self.position(key)?;
        self.values.get_mut(position)
    }

    pub fn contains_key(&self, key: SlotMapKey) -> bool {
        self.position(key).is_some()
    }

    /// Dense position of a live key.
    pub fn index_of(&self, key: SlotMapKey) -> Option<usize> {
        self.position(key)
    }

    /// Remove the value for `key`.
    ///
    /// Stale or unknown keys are a no-op returning `None`. On success the
    /// slot generation advances, so `key` (and every older key for the same
    /// index) never resolves again.
    pub fn erase(&mut self, key: SlotMapKey) -> Option<T> {
        let position = self.position(key)?;

        let slot = &mut self.slots[key.index as usize];
        slot.position = VACANT;
        slot.generation = slot.generation.wrapping_add(1);

        let value = self.values.swap_remove(position);
        self.owners.swap_remove(position);
        if let Some(&moved) = self.owners.get(position) {
            self.slots[moved as usize].position = position as u32;
        }

        self.free.push(key.index);
        Some(value)
    }

    /// Remove every value. All outstanding keys become stale; capacity is kept.
    pub fn clear(&mut self) {
        for &owner in &self.owners {
            let slot = &mut self.slots[owner as usize];
            slot.position = VACANT;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(owner);
        }
        self.values.clear();
        self.owners.clear();
    }

    /// Reserve room for `additional` more values.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.values.try_reserve(additional)?;
        self.owners.try_reserve(additional)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Values in dense order
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// `(key, value)` pairs in dense order
    pub fn iter(&self) -> impl Iterator<Item = (SlotMapKey, &T)> + '_ {
        let slots = &self.slots;
        self.owners
            .iter()
            .zip(self.values.iter())
            .map(move |(&owner, value)| {
                let key = SlotMapKey {
                    index: owner,
                    generation: slots[owner as usize].generation,
                };
                (key, value)
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotMapKey, &mut T)> + '_ {
        let slots = &self.slots;
        self.owners
            .iter()
            .zip(self.values.iter_mut())
            .map(move |(&owner, value)| {
                let key = SlotMapKey {
                    index: owner,
                    generation: slots[owner as usize].generation,
                };
                (key, value)
            })
    }
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
