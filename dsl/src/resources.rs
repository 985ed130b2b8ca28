//! Tracks which external resources a fragment of the model touches.
//!
//! Every expression and statement computes its resource set once, when it
//! is constructed, as the union of its children's sets plus anything it
//! references directly. The sets are for bookkeeping and diagnostics; no
//! code generation decision depends on them.

use std::collections::btree_set;
use std::collections::BTreeSet;

use crate::common::{Tag, Variable};

/// A resource that persists outside of a single expression: a device tag or
/// a macro variable.
///
/// Ordering and equality follow the identity of the wrapped value, so a
/// tag is identified by device and address and a variable by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Tag(Tag),
    Variable(Variable),
}

/// An ordered set of resources. Iteration order is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceSet {
    items: BTreeSet<Resource>,
}

impl ResourceSet {
    pub const fn new() -> Self {
        Self {
            items: BTreeSet::new(),
        }
    }

    /// Creates the union of the sets.
    pub fn union<'a>(sets: impl IntoIterator<Item = &'a ResourceSet>) -> Self {
        let mut result = ResourceSet::new();
        for set in sets {
            result.extend_from(set);
        }
        result
    }

    pub fn insert(&mut self, resource: Resource) {
        self.items.insert(resource);
    }

    pub fn insert_tag(&mut self, tag: &Tag) {
        self.items.insert(Resource::Tag(tag.clone()));
    }

    pub fn insert_variable(&mut self, variable: &Variable) {
        self.items.insert(Resource::Variable(variable.clone()));
    }

    pub fn extend_from(&mut self, other: &ResourceSet) {
        self.items.extend(other.items.iter().cloned());
    }

    pub fn contains_tag(&self, tag: &Tag) -> bool {
        self.items.contains(&Resource::Tag(tag.clone()))
    }

    pub fn contains_variable(&self, variable: &Variable) -> bool {
        self.items.contains(&Resource::Variable(variable.clone()))
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.items.iter().filter_map(|r| match r {
            Resource::Tag(tag) => Some(tag),
            Resource::Variable(_) => None,
        })
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.items.iter().filter_map(|r| match r {
            Resource::Tag(_) => None,
            Resource::Variable(variable) => Some(variable),
        })
    }

    /// Resources that appear in both sets.
    pub fn shared_with(&self, other: &ResourceSet) -> ResourceSet {
        ResourceSet {
            items: self.items.intersection(&other.items).cloned().collect(),
        }
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Resource> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a Resource;
    type IntoIter = btree_set::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        ResourceSet {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, TagType};

    fn tag(name: &str, address: &str) -> Tag {
        Tag::new(name, "Local HMI", address, TagType::S16).unwrap()
    }

    #[test]
    fn insert_when_same_address_different_name_then_one_resource() {
        let mut set = ResourceSet::new();
        set.insert_tag(&tag("pressure", "LW, 10"));
        set.insert_tag(&tag("pressure_alias", "LW,10"));

        assert_eq!(set.len(), 1);
        assert!(set.contains_tag(&tag("anything", "LW, 10")));
    }

    #[test]
    fn union_when_overlapping_then_deduplicates() {
        let level = Variable::new("level", DataType::Short).unwrap();
        let mut a = ResourceSet::new();
        a.insert_tag(&tag("a", "LW, 1"));
        a.insert_variable(&level);
        let mut b = ResourceSet::new();
        b.insert_tag(&tag("b", "LW, 2"));
        b.insert_variable(&level);

        let union = ResourceSet::union([&a, &b]);

        assert_eq!(union.len(), 3);
        assert_eq!(union.variables().count(), 1);
        assert_eq!(a.shared_with(&b).len(), 1);
    }
}
