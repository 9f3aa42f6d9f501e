use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityTraits};
use crate::error::{EcsError, Result};
use crate::registry::BaseRegistry;

/// Parent/child links of an entity
///
/// Children form an intrusive singly linked list: the parent points at its
/// first child and each child at its next sibling. The null entity marks an
/// absent link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRelationship<R: EntityTraits> {
    pub parent: Entity<R>,
    pub first_child: Entity<R>,
    pub next_sibling: Entity<R>,
}

impl<R: EntityTraits> EntityRelationship<R> {
    /// Link value meaning "none"
    pub fn tombstone() -> Entity<R> {
        Entity::null()
    }

    /// No parent, no children, no siblings
    pub fn new() -> Self {
        Self {
            parent: Self::tombstone(),
            first_child: Self::tombstone(),
            next_sibling: Self::tombstone(),
        }
    }

    pub fn has_parent(&self) -> bool {
        !self.parent.is_null()
    }

    pub fn has_children(&self) -> bool {
        !self.first_child.is_null()
    }
}

impl<R: EntityTraits> Default for EntityRelationship<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of an entity, most recently attached first
pub struct Children<'r, R: EntityTraits> {
    registry: &'r BaseRegistry<R>,
    next: Entity<R>,
}

impl<R: EntityTraits> Iterator for Children<'_, R> {
    type Item = Entity<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next;
        let links = self.registry.try_get::<EntityRelationship<R>>(current)?;
        self.next = links.next_sibling;
        Some(current)
    }
}

impl<R: EntityTraits> BaseRegistry<R> {
    /// Parent of `entity`, if it has one
    pub fn parent_of(&self, entity: Entity<R>) -> Option<Entity<R>> {
        self.try_get::<EntityRelationship<R>>(entity)
            .map(|links| links.parent)
            .filter(|parent| !parent.is_null())
    }

    pub fn children_of(&self, parent: Entity<R>) -> Children<'_, R> {
        let first = self
            .try_get::<EntityRelationship<R>>(parent)
            .map_or_else(Entity::null, |links| links.first_child);
        Children {
            registry: self,
            next: first,
        }
    }

    /// True if `ancestor` is reachable by following parent links from `entity`
    pub fn is_ancestor(&self, ancestor: Entity<R>, entity: Entity<R>) -> bool {
        let mut cursor = self.parent_of(entity);
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.parent_of(parent);
        }
        false
    }

    /// Attach `child` as the first child of `parent`.
    ///
    /// The child is detached from any previous parent first. Missing
    /// relationship components are assigned on demand.
    pub fn set_parent(&mut self, child: Entity<R>, parent: Entity<R>) -> Result<()> {
        if !self.is_valid(child) || !self.is_valid(parent) {
            return Err(EcsError::StaleEntity);
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(EcsError::InvalidOperation(format!(
                "parenting {child} under {parent} would form a cycle"
            )));
        }

        self.detach(child);
        self.assign(child, EntityRelationship::<R>::new())?;
        self.assign(parent, EntityRelationship::<R>::new())?;

        let parent_links = self.get_mut::<EntityRelationship<R>>(parent)?;
        let previous_first = std::mem::replace(&mut parent_links.first_child, child);

        let child_links = self.get_mut::<EntityRelationship<R>>(child)?;
        child_links.parent = parent;
        child_links.next_sibling = previous_first;
        Ok(())
    }

    /// Unlink `child` from its parent. Returns `false` if it had none.
    pub fn detach(&mut self, child: Entity<R>) -> bool {
        let Some(&links) = self.try_get::<EntityRelationship<R>>(child) else {
            return false;
        };
        if !links.has_parent() {
            return false;
        }

        let first = self
            .try_get::<EntityRelationship<R>>(links.parent)
            .map_or_else(Entity::null, |parent| parent.first_child);
        if first == child {
            if let Some(parent) = self.try_get_mut::<EntityRelationship<R>>(links.parent) {
                parent.first_child = links.next_sibling;
            }
        } else {
            let mut cursor = first;
            while let Some(sibling) = self.try_get_mut::<EntityRelationship<R>>(cursor) {
                if sibling.next_sibling == child {
                    sibling.next_sibling = links.next_sibling;
                    break;
                }
                cursor = sibling.next_sibling;
            }
        }

        if let Some(links) = self.try_get_mut::<EntityRelationship<R>>(child) {
            links.parent = Entity::null();
            links.next_sibling = Entity::null();
        }
        true
    }

    /// Detach `entity` from its parent and orphan its children.
    pub(crate) fn unlink(&mut self, entity: Entity<R>) {
        self.detach(entity);

        let mut child = match self.try_get_mut::<EntityRelationship<R>>(entity) {
            Some(links) => std::mem::replace(&mut links.first_child, Entity::null()),
            None => return,
        };
        while let Some(links) = self.try_get_mut::<EntityRelationship<R>>(child) {
            links.parent = Entity::null();
            child = std::mem::replace(&mut links.next_sibling, Entity::null());
        }
    }
}
