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

//! Registry - entity allocation and per-type component pools
//!
//! The entity table doubles as the free list. A live slot `i` stores the
//! entity `(i, version)`. A free slot stores `(next_free, next_version)`,
//! where `next_free` is the identifier of the next free slot (or the null
//! identifier at the end of the list). A slot is therefore live exactly when
//! its stored identifier equals its index.

use std::fmt;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::component::{Component, ComponentId, ComponentSet};
use crate::entity::{DefaultRepr, Entity, EntityTraits};
use crate::error::{EcsError, Result};
use crate::event::{ComponentAdded, ComponentRemoved, ComponentReplaced, EventManager};
use crate::handle::{EntityHandle, EntityRef};
use crate::pool::{ComponentPool, Pool};
use crate::relationship::EntityRelationship;
use crate::view::{ComponentView, ComponentViewMut, EntityView};

/// Registry over the platform's default entity width
pub type Registry = BaseRegistry<DefaultRepr>;

/// Entity registry generic over the raw entity width
pub struct BaseRegistry<R: EntityTraits> {
    entities: Vec<Entity<R>>,
    free_head: u32,
    active: usize,
    pools: Vec<Option<Box<dyn ComponentPool<R>>>>,
    events: EventManager,
}

impl<R: EntityTraits> BaseRegistry<R> {
    pub fn new() -> Self {
        let mut registry = Self {
            entities: Vec::new(),
            free_head: R::IDENTIFIER_MASK,
            active: 0,
            pools: Vec::new(),
            events: EventManager::new(),
        };
        // Relationship links live in every registry. If this allocation
        // fails the pool is created on first use instead.
        registry.assure_pool::<EntityRelationship<R>>().ok();
        registry
    }

    /// Registry with room for `capacity` entities before the entity table grows
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut registry = Self::new();
        registry.entities.try_reserve_exact(capacity)?;
        Ok(registry)
    }

    /// Live entity count
    #[inline]
    pub fn active(&self) -> usize {
        self.active
    }

    /// Reserved entity slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Slots ever handed out, live or free
    #[inline]
    pub fn allocated(&self) -> usize {
        self.entities.len()
    }

    /// Largest number of entities that can be live at once
    pub fn max_entities() -> usize {
        R::IDENTIFIER_MASK as usize
    }

    pub(crate) fn slots(&self) -> &[Entity<R>] {
        &self.entities
    }

    /// True if `entity` refers to the current occupant of its slot
    #[inline]
    pub fn is_valid(&self, entity: Entity<R>) -> bool {
        !entity.is_null() && self.entities.get(entity.index()) == Some(&entity)
    }

    /// Live entity at slot `index`
    pub fn at(&self, index: usize) -> Option<Entity<R>> {
        self.entities
            .get(index)
            .copied()
            .filter(|entity| entity.index() == index)
    }

    /// Allocate an entity, reusing the most recently freed slot first.
    pub fn allocate(&mut self) -> Result<EntityHandle<'_, R>> {
        let entity = self.allocate_entity()?;
        Ok(EntityHandle::new(entity, self))
    }

    fn allocate_entity(&mut self) -> Result<Entity<R>> {
        let entity = if self.free_head != R::IDENTIFIER_MASK {
            let identifier = self.free_head;
            let slot = self.entities[identifier as usize];
            self.free_head = slot.identifier();
            let entity = Entity::new(identifier, slot.version());
            self.entities[identifier as usize] = entity;
            entity
        } else {
            let next = self.entities.len();
            if next >= Self::max_entities() {
                return Err(EcsError::CapacityExceeded {
                    requested: next,
                    max: Self::max_entities(),
                });
            }
            self.entities.try_reserve(1)?;
            let entity = Entity::new(next as u32, 0);
            self.entities.push(entity);
            entity
        };

        self.active += 1;
        Ok(entity)
    }

    /// Release `entity`, dropping its components from every pool.
    ///
    /// Stale or unknown handles are ignored and return `false`.
    pub fn deallocate(&mut self, entity: Entity<R>) -> bool {
        if !self.is_valid(entity) {
            return false;
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("registry.deallocate", pools = self.pools.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        self.unlink(entity);
        for pool in self.pools.iter_mut().flatten() {
            pool.remove(entity);
        }

        let next = entity.next_version();
        self.entities[entity.index()] = Entity::new(self.free_head, next.version());
        self.free_head = entity.identifier();
        self.active -= 1;
        true
    }

    /// Deallocate every live entity and empty every pool.
    ///
    /// Versions are bumped, so handles issued before the clear stay stale.
    pub fn clear(&mut self) {
        #[cfg(feature = "profiling")]
        let span = info_span!("registry.clear", active = self.active);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for pool in self.pools.iter_mut().flatten() {
            pool.clear();
        }

        for index in (0..self.entities.len()).rev() {
            let entity = self.entities[index];
            if entity.index() == index {
                let next = entity.next_version();
                self.entities[index] = Entity::new(self.free_head, next.version());
                self.free_head = index as u32;
            }
        }
        self.active = 0;
    }

    /// Mutable handle for `entity`, if it is live
    pub fn handle(&mut self, entity: Entity<R>) -> Option<EntityHandle<'_, R>> {
        if self.is_valid(entity) {
            Some(EntityHandle::new(entity, self))
        } else {
            None
        }
    }

    /// Read-only handle for `entity`, if it is live
    pub fn entity_ref(&self, entity: Entity<R>) -> Option<EntityRef<'_, R>> {
        if self.is_valid(entity) {
            Some(EntityRef::new(entity, self))
        } else {
            None
        }
    }

    fn pool_by_id(&self, id: ComponentId) -> Option<&dyn ComponentPool<R>> {
        self.pools.get(id.index())?.as_deref()
    }

    fn pool<C: Component>(&self) -> Option<&Pool<R, C>> {
        self.pool_by_id(ComponentId::of::<C>())?
            .as_any()
            .downcast_ref::<Pool<R, C>>()
    }

    fn pool_mut<C: Component>(&mut self) -> Option<&mut Pool<R, C>> {
        self.pools
            .get_mut(ComponentId::of::<C>().index())?
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<Pool<R, C>>()
    }

    fn assure_pool<C: Component>(&mut self) -> Result<&mut Pool<R, C>> {
        let index = ComponentId::of::<C>().index();
        if index >= self.pools.len() {
            self.pools.try_reserve(index + 1 - self.pools.len())?;
            self.pools.resize_with(index + 1, || None);
        }

        let slot = &mut self.pools[index];
        if slot.is_none() {
            #[cfg(feature = "profiling")]
            let span = info_span!("registry.create_pool", component = std::any::type_name::<C>());
            #[cfg(feature = "profiling")]
            let _span_guard = span.enter();

            *slot = Some(Box::new(Pool::<R, C>::new()));
        }

        slot.as_deref_mut()
            .and_then(|pool| pool.as_any_mut().downcast_mut::<Pool<R, C>>())
            .ok_or_else(|| {
                EcsError::InvalidOperation(format!(
                    "pool {index} does not store {}",
                    std::any::type_name::<C>()
                ))
            })
    }

    /// Pre-size the pool of `C` for `count` entities
    pub fn reserve<C: Component>(&mut self, count: usize) -> Result<()> {
        self.assure_pool::<C>()?.reserve(count)
    }

    /// Attach `value` to `entity`.
    ///
    /// If the entity already holds a `C` the stored value is kept and
    /// `Ok(false)` is returned.
    pub fn assign<C: Component>(&mut self, entity: Entity<R>, value: C) -> Result<bool> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleEntity);
        }
        let inserted = self.assure_pool::<C>()?.insert(entity, value)?;
        if inserted {
            self.notify_stored::<_, C>(&ComponentAdded::<R, C>::new(entity), entity);
        }
        Ok(inserted)
    }

    /// Attach `value`, overwriting any existing `C`. Returns the previous value.
    pub fn assign_or_replace<C: Component>(
        &mut self,
        entity: Entity<R>,
        value: C,
    ) -> Result<Option<C>> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleEntity);
        }
        let previous = self.assure_pool::<C>()?.insert_or_replace(entity, value)?;
        if previous.is_some() {
            self.notify_stored::<_, C>(&ComponentReplaced::<R, C>::new(entity), entity);
        } else {
            self.notify_stored::<_, C>(&ComponentAdded::<R, C>::new(entity), entity);
        }
        Ok(previous)
    }

    /// Overwrite an existing `C`. Entities without one are left untouched.
    pub fn replace<C: Component>(&mut self, entity: Entity<R>, value: C) -> Option<C> {
        let previous = self.pool_mut::<C>()?.replace(entity, value)?;
        self.notify_stored::<_, C>(&ComponentReplaced::<R, C>::new(entity), entity);
        Some(previous)
    }

    /// Detach and return the entity's `C`
    pub fn remove<C: Component>(&mut self, entity: Entity<R>) -> Option<C> {
        let removed = self.pool_mut::<C>()?.remove(entity)?;
        self.events
            .emit_with(&ComponentRemoved::<R, C>::new(entity), &removed);
        Some(removed)
    }

    /// Emit `event` with the entity's stored `C` as payload.
    fn notify_stored<E: 'static, C: Component>(&self, event: &E, entity: Entity<R>) {
        if !self.events.has_listeners::<E>() {
            return;
        }
        if let Some(value) = self.try_get::<C>(entity) {
            self.events.emit_with(event, value);
        }
    }

    /// True if `entity` is live and holds a `C`
    pub fn has<C: Component>(&self, entity: Entity<R>) -> bool {
        self.pool::<C>().is_some_and(|pool| pool.contains(entity))
    }

    /// True if `entity` is live and holds every component in `S`
    pub fn contains<S: ComponentSet>(&self, entity: Entity<R>) -> bool {
        self.is_valid(entity)
            && S::component_ids()
                .into_iter()
                .all(|id| self.pool_by_id(id).is_some_and(|pool| pool.contains(entity)))
    }

    pub fn get<C: Component>(&self, entity: Entity<R>) -> Result<&C> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleEntity);
        }
        self.try_get(entity).ok_or(EcsError::ComponentNotFound)
    }

    pub fn get_mut<C: Component>(&mut self, entity: Entity<R>) -> Result<&mut C> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleEntity);
        }
        self.try_get_mut(entity).ok_or(EcsError::ComponentNotFound)
    }

    pub fn try_get<C: Component>(&self, entity: Entity<R>) -> Option<&C> {
        self.pool::<C>()?.get(entity)
    }

    pub fn try_get_mut<C: Component>(&mut self, entity: Entity<R>) -> Option<&mut C> {
        self.pool_mut::<C>()?.get_mut(entity)
    }

    /// Number of entities holding a `C`
    pub fn count<C: Component>(&self) -> usize {
        self.pool::<C>().map_or(0, Pool::len)
    }

    /// Every `C` value, in pool order
    pub fn component_view<C: Component>(&self) -> ComponentView<'_, C> {
        ComponentView::new(self.pool::<C>().map(Pool::values).unwrap_or_default())
    }

    pub fn component_view_mut<C: Component>(&mut self) -> ComponentViewMut<'_, C> {
        ComponentViewMut::new(
            self.pool_mut::<C>()
                .map(Pool::values_mut)
                .unwrap_or_default(),
        )
    }

    /// Every `(entity, &C)` pair, in pool order
    pub fn component_entries<C: Component>(&self) -> impl Iterator<Item = (Entity<R>, &C)> + '_ {
        self.pool::<C>().into_iter().flat_map(|pool| pool.iter())
    }

    /// Parallel mutable iteration over every `C` value
    #[cfg(feature = "parallel")]
    pub fn par_component_view_mut<C: Component>(&mut self) -> rayon::slice::IterMut<'_, C> {
        use rayon::prelude::*;

        self.pool_mut::<C>()
            .map(Pool::values_mut)
            .unwrap_or_default()
            .par_iter_mut()
    }

    /// Live entities holding every component in `S`
    ///
    /// With `S = ()` every live entity is yielded.
    pub fn entity_view<S: ComponentSet>(&self) -> EntityView<'_, R> {
        #[cfg(feature = "profiling")]
        let span = info_span!("registry.entity_view", components = S::LEN);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let ids = S::component_ids();
        let mut pools = smallvec::SmallVec::with_capacity(ids.len());
        for id in ids {
            match self.pool_by_id(id) {
                Some(pool) => pools.push(pool),
                None => return EntityView::empty(self),
            }
        }
        EntityView::new(self, pools)
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventManager {
        &mut self.events
    }
}

impl<R: EntityTraits> Default for BaseRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: EntityTraits> fmt::Debug for BaseRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pools: Vec<(&str, usize)> = self
            .pools
            .iter()
            .flatten()
            .map(|pool| (pool.component_name(), pool.len()))
            .collect();
        f.debug_struct("BaseRegistry")
            .field("active", &self.active)
            .field("allocated", &self.entities.len())
            .field("pools", &pools)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Health(u32);

    #[test]
    fn test_free_list_is_lifo() -> Result<()> {
        let mut registry = BaseRegistry::<u32>::new();
        let a = registry.allocate()?.entity();
        let b = registry.allocate()?.entity();
        let c = registry.allocate()?.entity();

        registry.deallocate(a);
        registry.deallocate(c);

        let first = registry.allocate()?.entity();
        let second = registry.allocate()?.entity();
        assert_eq!((first.identifier(), first.version()), (2, 1));
        assert_eq!((second.identifier(), second.version()), (0, 1));
        assert!(registry.is_valid(b));
        assert_eq!(registry.allocated(), 3);
        Ok(())
    }

    #[test]
    fn test_slot_liveness() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let a = registry.allocate()?.entity();
        let b = registry.allocate()?.entity();
        registry.deallocate(a);

        assert_eq!(registry.at(0), None);
        assert_eq!(registry.at(1), Some(b));
        assert_eq!(registry.at(2), None);
        assert!(!registry.is_valid(Entity::null()));
        Ok(())
    }

    #[test]
    fn test_identifier_exhaustion() {
        let mut registry = BaseRegistry::<u32>::new();
        registry.entities = (0..u32::IDENTIFIER_MASK)
            .map(|identifier| Entity::new(identifier, 0))
            .collect();
        registry.active = registry.entities.len();

        let err = registry.allocate().map(|handle| handle.entity()).unwrap_err();
        assert_eq!(
            err,
            EcsError::CapacityExceeded {
                requested: u32::IDENTIFIER_MASK as usize,
                max: u32::IDENTIFIER_MASK as usize,
            }
        );
    }

    #[test]
    fn test_clear_bumps_versions() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let mut old = Vec::new();
        for i in 0..4 {
            let entity = registry.allocate()?.entity();
            registry.assign(entity, Health(i))?;
            old.push(entity);
        }

        registry.clear();
        assert_eq!(registry.active(), 0);
        assert_eq!(registry.count::<Health>(), 0);
        assert!(old.iter().all(|&entity| !registry.is_valid(entity)));

        let reused = registry.allocate()?.entity();
        assert_eq!((reused.identifier(), reused.version()), (0, 1));
        Ok(())
    }

    #[test]
    fn test_debug_lists_pools() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let entity = registry.allocate()?.entity();
        registry.assign(entity, Health(3))?;

        let debug = format!("{registry:?}");
        assert!(debug.contains("active: 1"));
        assert!(debug.contains("Health"));
        Ok(())
    }
}
