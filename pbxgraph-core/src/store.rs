//! Node store
//!
//! Arena of every entity in the project document, addressed by [`ObjectId`].
//! Reverse lookups (who refers to an id) are computed on demand instead of
//! stored as back-pointers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{GraphError, Result};
use crate::types::{Entity, Object, ObjectId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeStore {
    objects: BTreeMap<ObjectId, Object>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Insert an entity under a freshly generated id
    pub fn insert<E: Entity>(&mut self, entity: E) -> ObjectId {
        let mut id = ObjectId::generate();
        while self.objects.contains_key(&id) {
            id = ObjectId::generate();
        }
        self.objects.insert(id.clone(), entity.into_object());
        id
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: &ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    /// Typed lookup; a missing id or a different kind is NotFound
    pub fn get<E: Entity>(&self, id: &ObjectId) -> Result<&E> {
        self.objects
            .get(id)
            .and_then(E::from_object)
            .ok_or_else(|| GraphError::not_found(E::KIND, id.to_string()))
    }

    pub fn get_mut<E: Entity>(&mut self, id: &ObjectId) -> Result<&mut E> {
        self.objects
            .get_mut(id)
            .and_then(E::from_object_mut)
            .ok_or_else(|| GraphError::not_found(E::KIND, id.to_string()))
    }

    /// All entities of one kind, in id order
    pub fn iter<'a, E: Entity + 'a>(&'a self) -> impl Iterator<Item = (&'a ObjectId, &'a E)> {
        self.objects
            .iter()
            .filter_map(|(id, object)| E::from_object(object).map(|entity| (id, entity)))
    }

    pub fn iter_all(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    /// Ids of every entity holding a link (owning or not) to `id`
    pub fn referrers(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, object)| object.references().contains(&id))
            .map(|(other, _)| other.clone())
            .collect()
    }

    /// Owner of `id`, if any entity lists it as an owned child
    pub fn owner_of(&self, id: &ObjectId) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.owned().contains(&id))
            .map(|(owner, _)| owner.clone())
    }

    /// Remove an entity and, recursively, everything it owns.
    ///
    /// The root must already be detached from its owner. Links between members
    /// of the subtree never block the cascade; a link from outside does, and
    /// then nothing is removed.
    pub fn remove_subtree(&mut self, id: &ObjectId) -> Result<Vec<Object>> {
        let members = self.subtree_ids(id);
        if members.is_empty() {
            return Err(GraphError::InvalidArgument(format!("no object with id {}", id)));
        }
        let inside: HashSet<&ObjectId> = members.iter().collect();
        for member in &members {
            if let Some(outside) = self
                .referrers(member)
                .into_iter()
                .find(|referrer| !inside.contains(referrer))
            {
                let kind = self
                    .objects
                    .get(&outside)
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default();
                return Err(GraphError::Validation(format!(
                    "cannot remove {}: {} is still referenced by {} {}",
                    id, member, kind, outside
                )));
            }
        }
        Ok(members
            .iter()
            .filter_map(|member| self.objects.remove(member))
            .collect())
    }

    /// Ids in the subtree rooted at `id` (root included), owners first
    pub fn subtree_ids(&self, id: &ObjectId) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut pending = vec![id.clone()];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(object) = self.objects.get(&next) {
                pending.extend(object.owned().into_iter().cloned());
                ids.push(next);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildFile, BuildPhase, FileReference, Group, PhaseKind, SourceTree};

    fn file(path: &str) -> FileReference {
        FileReference {
            name: None,
            path: path.into(),
            source_tree: SourceTree::Group,
            last_known_file_type: None,
            explicit_file_type: None,
        }
    }

    #[test]
    fn test_insert_and_typed_get() {
        let mut store = NodeStore::new();
        let id = store.insert(Group::named("Models"));
        assert_eq!(store.get::<Group>(&id).unwrap().display_name(), "Models");
        // Wrong kind is a miss
        assert!(store.get::<FileReference>(&id).is_err());
        assert_eq!(store.iter::<Group>().count(), 1);
    }

    #[test]
    fn test_remove_subtree_cascades_owned_children() {
        let mut store = NodeStore::new();
        let file_id = store.insert(file("User.swift"));
        let build_file = store.insert(BuildFile::for_file(file_id.clone()));
        let mut phase = BuildPhase::new(PhaseKind::Sources);
        phase.files.push(build_file.clone());
        let phase_id = store.insert(phase);

        let removed = store.remove_subtree(&phase_id).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!store.contains(&build_file));
        // The file reference is only referenced, not owned, by the phase
        assert!(store.contains(&file_id));
        assert!(store.referrers(&file_id).is_empty());
    }

    #[test]
    fn test_remove_subtree_blocked_by_outside_link() {
        let mut store = NodeStore::new();
        let file_id = store.insert(file("User.swift"));
        let mut group = Group::named("Models");
        group.children.push(file_id.clone());
        let group_id = store.insert(group);
        let build_file = store.insert(BuildFile::for_file(file_id.clone()));

        assert!(matches!(
            store.remove_subtree(&group_id),
            Err(GraphError::Validation(_))
        ));
        // Nothing was removed
        assert!(store.contains(&group_id));
        assert!(store.contains(&file_id));

        assert_eq!(store.remove_subtree(&build_file).unwrap().len(), 1);
        assert_eq!(store.remove_subtree(&group_id).unwrap().len(), 2);
    }

    #[test]
    fn test_owner_of() {
        let mut store = NodeStore::new();
        let child = store.insert(Group::named("Child"));
        let mut parent = Group::named("Parent");
        parent.children.push(child.clone());
        let parent_id = store.insert(parent);
        assert_eq!(store.owner_of(&child), Some(parent_id.clone()));
        assert_eq!(store.owner_of(&parent_id), None);
        assert_eq!(store.subtree_ids(&parent_id).len(), 2);
    }
}
