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

//! Entity handles bundling an entity with its registry
//!
//! `EntityHandle` borrows the registry mutably and supports chained
//! component assignment:
//!
//! ```
//! # use ryujin_ecs::{Registry, Result};
//! # fn main() -> Result<()> {
//! let mut registry = Registry::new();
//! let entity = registry.allocate()?.assign(1u32)?.assign(2.0f32)?.entity();
//! assert!(registry.contains::<(u32, f32)>(entity));
//! # Ok(())
//! # }
//! ```

use std::fmt;

use crate::component::{Component, ComponentSet};
use crate::entity::{Entity, EntityTraits};
use crate::error::Result;
use crate::registry::BaseRegistry;

/// Mutable entity handle
pub struct EntityHandle<'r, R: EntityTraits> {
    entity: Entity<R>,
    registry: &'r mut BaseRegistry<R>,
}

impl<'r, R: EntityTraits> EntityHandle<'r, R> {
    pub(crate) fn new(entity: Entity<R>, registry: &'r mut BaseRegistry<R>) -> Self {
        Self { entity, registry }
    }

    #[inline]
    pub fn entity(&self) -> Entity<R> {
        self.entity
    }

    pub fn is_valid(&self) -> bool {
        self.registry.is_valid(self.entity)
    }

    /// Attach a component; an existing one of the same type is kept.
    pub fn assign<C: Component>(&mut self, value: C) -> Result<&mut Self> {
        self.registry.assign(self.entity, value)?;
        Ok(self)
    }

    /// Attach a component, overwriting an existing one of the same type.
    pub fn assign_or_replace<C: Component>(&mut self, value: C) -> Result<&mut Self> {
        self.registry.assign_or_replace(self.entity, value)?;
        Ok(self)
    }

    pub fn replace<C: Component>(&mut self, value: C) -> Option<C> {
        self.registry.replace(self.entity, value)
    }

    pub fn remove<C: Component>(&mut self) -> Option<C> {
        self.registry.remove::<C>(self.entity)
    }

    pub fn has<C: Component>(&self) -> bool {
        self.registry.has::<C>(self.entity)
    }

    pub fn contains<S: ComponentSet>(&self) -> bool {
        self.registry.contains::<S>(self.entity)
    }

    pub fn get<C: Component>(&self) -> Result<&C> {
        self.registry.get(self.entity)
    }

    pub fn get_mut<C: Component>(&mut self) -> Result<&mut C> {
        self.registry.get_mut(self.entity)
    }

    pub fn try_get<C: Component>(&self) -> Option<&C> {
        self.registry.try_get(self.entity)
    }

    pub fn try_get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.registry.try_get_mut(self.entity)
    }

    /// Read-only view of the same entity
    pub fn as_entity_ref(&self) -> EntityRef<'_, R> {
        EntityRef::new(self.entity, self.registry)
    }

    /// Release the entity. Returns `false` if it was already stale.
    pub fn deallocate(self) -> bool {
        self.registry.deallocate(self.entity)
    }
}

impl<R: EntityTraits> fmt::Debug for EntityHandle<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityHandle").field(&self.entity).finish()
    }
}

/// Read-only entity handle, yielded by entity views
pub struct EntityRef<'r, R: EntityTraits> {
    entity: Entity<R>,
    registry: &'r BaseRegistry<R>,
}

impl<'r, R: EntityTraits> EntityRef<'r, R> {
    pub(crate) fn new(entity: Entity<R>, registry: &'r BaseRegistry<R>) -> Self {
        Self { entity, registry }
    }

    #[inline]
    pub fn entity(&self) -> Entity<R> {
        self.entity
    }

    pub fn is_valid(&self) -> bool {
        self.registry.is_valid(self.entity)
    }

    pub fn has<C: Component>(&self) -> bool {
        self.registry.has::<C>(self.entity)
    }

    pub fn contains<S: ComponentSet>(&self) -> bool {
        self.registry.contains::<S>(self.entity)
    }

    pub fn get<C: Component>(&self) -> Result<&'r C> {
        self.registry.get(self.entity)
    }

    pub fn try_get<C: Component>(&self) -> Option<&'r C> {
        self.registry.try_get(self.entity)
    }
}

impl<R: EntityTraits> Clone for EntityRef<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: EntityTraits> Copy for EntityRef<'_, R> {}

impl<R: EntityTraits> PartialEq for EntityRef<'_, R> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && std::ptr::eq(self.registry, other.registry)
    }
}

impl<R: EntityTraits> Eq for EntityRef<'_, R> {}

impl<R: EntityTraits> fmt::Debug for EntityRef<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.entity).finish()
    }
}

impl<R: EntityTraits> From<EntityRef<'_, R>> for Entity<R> {
    fn from(entity_ref: EntityRef<'_, R>) -> Self {
        entity_ref.entity
    }
}

impl<R: EntityTraits> From<EntityHandle<'_, R>> for Entity<R> {
    fn from(handle: EntityHandle<'_, R>) -> Self {
        handle.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EcsError;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(f32, f32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(f32, f32);

    #[test]
    fn test_chained_assign() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let mut handle = registry.allocate()?;
        handle
            .assign(Position(1.0, 2.0))?
            .assign(Velocity(0.5, 0.0))?;

        assert!(handle.has::<Position>());
        assert!(handle.contains::<(Position, Velocity)>());
        assert_eq!(handle.get::<Velocity>()?, &Velocity(0.5, 0.0));
        Ok(())
    }

    #[test]
    fn test_handle_mutation() -> Result<()> {
        let mut registry = BaseRegistry::<u32>::new();
        let mut handle = registry.allocate()?;
        handle.assign(Position(0.0, 0.0))?;

        if let Some(position) = handle.try_get_mut::<Position>() {
            position.0 = 4.0;
        }
        handle.get_mut::<Position>()?.1 = 2.0;
        assert_eq!(handle.try_get::<Position>(), Some(&Position(4.0, 2.0)));

        assert_eq!(handle.replace(Position(9.0, 9.0)), Some(Position(4.0, 2.0)));
        assert_eq!(handle.replace(Velocity(1.0, 1.0)), None);
        assert_eq!(handle.remove::<Position>(), Some(Position(9.0, 9.0)));
        assert_eq!(handle.get::<Position>(), Err(EcsError::ComponentNotFound));
        Ok(())
    }

    #[test]
    fn test_handle_deallocate() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let handle = registry.allocate()?;
        let entity = handle.entity();
        assert!(handle.deallocate());

        assert!(registry.handle(entity).is_none());
        assert!(registry.entity_ref(entity).is_none());
        Ok(())
    }

    #[test]
    fn test_entity_ref_outlives_lookup() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let entity = registry.allocate()?.assign(Position(3.0, 1.0))?.entity();

        let entity_ref = registry.entity_ref(entity).expect("live entity");
        let position: &Position = entity_ref.get()?;
        assert_eq!(position, &Position(3.0, 1.0));
        assert!(entity_ref.try_get::<Velocity>().is_none());
        assert_eq!(Entity::from(entity_ref), entity);
        Ok(())
    }
}
