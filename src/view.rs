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

//! Registry views
//!
//! Views borrow the registry for their whole lifetime, so the pools they read
//! cannot be restructured while iteration is in progress.

use std::iter::FusedIterator;
use std::ops::Range;
use std::slice;

use smallvec::SmallVec;

use crate::component::MAX_SET_COMPONENTS;
use crate::entity::{Entity, EntityTraits};
use crate::handle::EntityRef;
use crate::pool::ComponentPool;
use crate::registry::BaseRegistry;

/// Values of one component type, in pool order
pub struct ComponentView<'a, C> {
    values: slice::Iter<'a, C>,
}

impl<'a, C> ComponentView<'a, C> {
    pub(crate) fn new(values: &'a [C]) -> Self {
        Self {
            values: values.iter(),
        }
    }

    /// Remaining values as a slice
    pub fn as_slice(&self) -> &'a [C] {
        self.values.as_slice()
    }
}

impl<'a, C> Iterator for ComponentView<'a, C> {
    type Item = &'a C;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.values.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<C> ExactSizeIterator for ComponentView<'_, C> {}
impl<C> DoubleEndedIterator for ComponentView<'_, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.values.next_back()
    }
}
impl<C> FusedIterator for ComponentView<'_, C> {}

/// Mutable values of one component type, in pool order
pub struct ComponentViewMut<'a, C> {
    values: slice::IterMut<'a, C>,
}

impl<'a, C> ComponentViewMut<'a, C> {
    pub(crate) fn new(values: &'a mut [C]) -> Self {
        Self {
            values: values.iter_mut(),
        }
    }
}

impl<'a, C> Iterator for ComponentViewMut<'a, C> {
    type Item = &'a mut C;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.values.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<C> ExactSizeIterator for ComponentViewMut<'_, C> {}
impl<C> FusedIterator for ComponentViewMut<'_, C> {}

enum Source<'a, R: EntityTraits> {
    /// Every slot of the entity table; free slots are skipped
    Slots(Range<usize>),
    /// Keys of the smallest filtering pool
    Keys(slice::Iter<'a, Entity<R>>),
    Empty,
}

/// Live entities holding every component of a filter set
pub struct EntityView<'a, R: EntityTraits> {
    registry: &'a BaseRegistry<R>,
    pools: SmallVec<[&'a dyn ComponentPool<R>; MAX_SET_COMPONENTS]>,
    source: Source<'a, R>,
}

impl<'a, R: EntityTraits> EntityView<'a, R> {
    pub(crate) fn new(
        registry: &'a BaseRegistry<R>,
        pools: SmallVec<[&'a dyn ComponentPool<R>; MAX_SET_COMPONENTS]>,
    ) -> Self {
        let source = match pools.iter().min_by_key(|pool| pool.len()) {
            Some(smallest) => Source::Keys(smallest.entities().iter()),
            None => Source::Slots(0..registry.slots().len()),
        };
        Self {
            registry,
            pools,
            source,
        }
    }

    /// View that yields nothing (a filter pool was never created)
    pub(crate) fn empty(registry: &'a BaseRegistry<R>) -> Self {
        Self {
            registry,
            pools: SmallVec::new(),
            source: Source::Empty,
        }
    }

    fn matches(&self, entity: Entity<R>) -> bool {
        self.pools.iter().all(|pool| pool.contains(entity))
    }
}

impl<'a, R: EntityTraits> Iterator for EntityView<'a, R> {
    type Item = EntityRef<'a, R>;

    fn next(&mut self) -> Option<Self::Item> {
        let registry = self.registry;
        loop {
            let entity = match &mut self.source {
                Source::Slots(range) => {
                    let index = range.next()?;
                    match registry.at(index) {
                        Some(entity) => entity,
                        None => continue,
                    }
                }
                Source::Keys(keys) => *keys.next()?,
                Source::Empty => return None,
            };
            if self.matches(entity) {
                return Some(EntityRef::new(entity, registry));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            Source::Slots(range) => (0, Some(range.len())),
            Source::Keys(keys) => (0, Some(keys.len())),
            Source::Empty => (0, Some(0)),
        }
    }
}

impl<R: EntityTraits> FusedIterator for EntityView<'_, R> {}

#[cfg(test)]
mod tests {
    use crate::entity::Entity;
    use crate::error::Result;
    use crate::registry::BaseRegistry;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Mass(f32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Charge(i8);

    #[test]
    fn test_view_uses_smallest_pool() -> Result<()> {
        let mut registry = BaseRegistry::<u64>::new();
        let mut charged = Vec::new();
        for i in 0..10 {
            let entity = registry.allocate()?.assign(Mass(i as f32))?.entity();
            if i % 5 == 0 {
                registry.assign(entity, Charge(1))?;
                charged.push(entity);
            }
        }

        let view = registry.entity_view::<(Mass, Charge)>();
        assert_eq!(view.size_hint(), (0, Some(2)));
        let found: Vec<Entity<u64>> = view.map(|entity| entity.entity()).collect();
        assert_eq!(found, charged);
        Ok(())
    }

    #[test]
    fn test_component_view_is_exact_size() -> Result<()> {
        let mut registry = BaseRegistry::<u32>::new();
        for i in 0..3 {
            registry.allocate()?.assign(Mass(i as f32))?;
        }

        let view = registry.component_view::<Mass>();
        assert_eq!(view.len(), 3);
        assert_eq!(view.rev().next(), Some(&Mass(2.0)));
        assert_eq!(registry.component_view::<Charge>().len(), 0);
        Ok(())
    }

    #[test]
    fn test_component_view_mut() -> Result<()> {
        let mut registry = BaseRegistry::<u32>::new();
        let entity = registry.allocate()?.assign(Mass(1.0))?.entity();

        for mass in registry.component_view_mut::<Mass>() {
            mass.0 *= 3.0;
        }
        assert_eq!(registry.get::<Mass>(entity)?, &Mass(3.0));
        assert_eq!(registry.component_view_mut::<Charge>().count(), 0);
        Ok(())
    }
}
