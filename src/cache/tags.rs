// Tag index for cache invalidation.
// Maps abstract invalidation tags to the cache keys whose results depend on
// them, so mutations never need to know which queries are currently cached.

use std::collections::{HashMap, HashSet};

use super::key::QueryKey;

/// Entity kind a tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Task,
}

/// Abstract label a cache entry depends on.
///
/// A tag without an id is a wildcard: during invalidation it matches every
/// tag of its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagType,
    pub id: Option<String>,
}

impl Tag {
    /// Tag scoped to one todo-list's tasks.
    pub fn task(id: impl Into<String>) -> Self {
        Self {
            kind: TagType::Task,
            id: Some(id.into()),
        }
    }

    /// Wildcard matching any task tag.
    pub fn any_task() -> Self {
        Self {
            kind: TagType::Task,
            id: None,
        }
    }

    fn matches(&self, other: &Tag) -> bool {
        self.kind == other.kind
            && match (&self.id, &other.id) {
                (None, _) | (_, None) => true,
                (Some(a), Some(b)) => a == b,
            }
    }
}

/// Index from tags to the keys registered under them.
#[derive(Debug, Default)]
pub struct TagIndex {
    keys_by_tag: HashMap<Tag, HashSet<QueryKey>>,
    tags_by_key: HashMap<QueryKey, Vec<Tag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `key` with `tags`, replacing any prior association.
    pub fn register(&mut self, key: QueryKey, tags: Vec<Tag>) {
        self.remove(&key);
        for tag in &tags {
            self.keys_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.tags_by_key.insert(key, tags);
    }

    /// Drop every association for `key`.
    pub fn remove(&mut self, key: &QueryKey) {
        let Some(tags) = self.tags_by_key.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(keys) = self.keys_by_tag.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.keys_by_tag.remove(&tag);
                }
            }
        }
    }

    /// Every key registered under a tag matching any of `tags`.
    pub fn invalidate(&self, tags: &[Tag]) -> HashSet<QueryKey> {
        let mut hit = HashSet::new();
        for (registered, keys) in &self.keys_by_tag {
            if tags.iter().any(|tag| registered.matches(tag)) {
                hit.extend(keys.iter().cloned());
            }
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_tag_hits_only_its_todolist() {
        let mut index = TagIndex::new();
        index.register(QueryKey::tasks_page("X", 1), vec![Tag::task("X")]);
        index.register(QueryKey::tasks_page("Y", 1), vec![Tag::task("Y")]);

        let hit = index.invalidate(&[Tag::task("X")]);
        assert!(hit.contains(&QueryKey::tasks_page("X", 1)));
        assert!(!hit.contains(&QueryKey::tasks_page("Y", 1)));
    }

    #[test]
    fn test_wildcard_registration_matches_any_task_tag() {
        let mut index = TagIndex::new();
        index.register(QueryKey::tasks_page("X", 1), vec![Tag::any_task()]);

        let hit = index.invalidate(&[Tag::task("Y")]);
        assert!(hit.contains(&QueryKey::tasks_page("X", 1)));
    }

    #[test]
    fn test_wildcard_invalidation_matches_scoped_registrations() {
        let mut index = TagIndex::new();
        index.register(QueryKey::tasks_page("X", 1), vec![Tag::task("X")]);

        let hit = index.invalidate(&[Tag::any_task()]);
        assert!(hit.contains(&QueryKey::tasks_page("X", 1)));
    }

    #[test]
    fn test_register_replaces_prior_association() {
        let mut index = TagIndex::new();
        let key = QueryKey::tasks_page("X", 1);
        index.register(key.clone(), vec![Tag::task("X")]);
        index.register(key.clone(), vec![Tag::any_task()]);

        // the old scoped tag no longer points at the key on its own
        let hit = index.invalidate(&[Tag::task("Y")]);
        assert!(hit.contains(&key), "wildcard should match any task tag");
        index.register(key.clone(), vec![Tag::task("Z")]);
        let hit = index.invalidate(&[Tag::task("X")]);
        assert!(!hit.contains(&key));
    }

    #[test]
    fn test_remove_clears_all_associations() {
        let mut index = TagIndex::new();
        let key = QueryKey::tasks_page("X", 1);
        index.register(key.clone(), vec![Tag::task("X"), Tag::any_task()]);
        index.remove(&key);

        assert!(index.invalidate(&[Tag::any_task()]).is_empty());
    }
}
