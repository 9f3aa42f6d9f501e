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

//! Type-erased component pools

use std::any::{type_name, Any};

use crate::component::Component;
use crate::entity::{Entity, EntityTraits};
use crate::sparse_map::SparseMap;

/// Page size of every component pool's sparse index
pub const POOL_PAGE_SIZE: usize = 1024;

/// Storage for one component type
pub type Pool<R, C> = SparseMap<R, C, POOL_PAGE_SIZE>;

/// Operations the registry needs without knowing the component type
pub trait ComponentPool<R: EntityTraits>: Any + Send + Sync {
    fn contains(&self, entity: Entity<R>) -> bool;

    /// Drop the entity's component if present
    fn remove(&mut self, entity: Entity<R>) -> bool;

    /// Entities holding this component, in dense order
    fn entities(&self) -> &[Entity<R>];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    fn component_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<R: EntityTraits, C: Component> ComponentPool<R> for Pool<R, C> {
    fn contains(&self, entity: Entity<R>) -> bool {
        SparseMap::contains(self, entity)
    }

    fn remove(&mut self, entity: Entity<R>) -> bool {
        SparseMap::remove(self, entity).is_some()
    }

    fn entities(&self) -> &[Entity<R>] {
        self.keys()
    }

    fn len(&self) -> usize {
        SparseMap::len(self)
    }

    fn clear(&mut self) {
        SparseMap::clear(self)
    }

    fn component_name(&self) -> &'static str {
        type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_erased_pool_roundtrip() -> Result<()> {
        let mut typed: Pool<u64, f32> = Pool::new();
        typed.insert(Entity::new(4, 0), 1.5)?;

        let mut erased: Box<dyn ComponentPool<u64>> = Box::new(typed);
        assert_eq!(erased.len(), 1);
        assert!(erased.contains(Entity::new(4, 0)));
        assert!(!erased.contains(Entity::new(4, 1)));
        assert_eq!(erased.entities(), &[Entity::new(4, 0)]);
        assert_eq!(erased.component_name(), "f32");

        let back = erased
            .as_any()
            .downcast_ref::<Pool<u64, f32>>()
            .expect("pool type");
        assert_eq!(back.get(Entity::new(4, 0)), Some(&1.5));
        assert!(erased.as_any().downcast_ref::<Pool<u64, i32>>().is_none());

        assert!(erased.remove(Entity::new(4, 0)));
        assert!(!erased.remove(Entity::new(4, 0)));
        assert!(erased.is_empty());
        Ok(())
    }
}
