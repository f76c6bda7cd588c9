//! Product category tree used by the marketplace category filter.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent: Option<CategoryId>,
    pub is_active: bool,
}

/// Parent/child index over the category reference data.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    categories: BTreeMap<CategoryId, Category>,
    children: BTreeMap<CategoryId, Vec<CategoryId>>,
}

impl CategoryTree {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut tree = Self::default();
        for category in categories {
            tree.insert(category);
        }
        tree
    }

    pub fn insert(&mut self, category: Category) {
        if let Some(parent) = category.parent {
            let siblings = self.children.entry(parent).or_default();
            if !siblings.contains(&category.id) {
                siblings.push(category.id);
            }
        }
        self.categories.insert(category.id, category);
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    /// The category itself plus every active descendant.
    ///
    /// An unknown id yields an empty set so a filter on it matches nothing. Inactive children are
    /// pruned together with their subtree.
    pub fn descendants_of(&self, id: CategoryId) -> BTreeSet<CategoryId> {
        let mut found = BTreeSet::new();
        if !self.categories.contains_key(&id) {
            return found;
        }

        let mut to_visit = vec![id];
        while let Some(current) = to_visit.pop() {
            if !found.insert(current) {
                continue;
            }
            if let Some(children) = self.children.get(&current) {
                to_visit.extend(children.iter().copied().filter(|child| {
                    self.categories
                        .get(child)
                        .map(|category| category.is_active)
                        .unwrap_or(false)
                }));
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: u32, parent: Option<u32>, is_active: bool) -> Category {
        Category {
            id: CategoryId(id),
            name: format!("category-{id}"),
            parent: parent.map(CategoryId),
            is_active,
        }
    }

    #[test]
    fn descendants_include_root_and_active_children() {
        let tree = CategoryTree::new([
            category(1, None, true),
            category(2, Some(1), true),
            category(3, Some(2), true),
            category(4, Some(1), false),
            category(5, Some(4), true),
        ]);

        let ids = tree.descendants_of(CategoryId(1));
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec![CategoryId(1), CategoryId(2), CategoryId(3)]
        );
    }

    #[test]
    fn unknown_category_has_no_descendants() {
        let tree = CategoryTree::new([category(1, None, true)]);
        assert!(tree.descendants_of(CategoryId(42)).is_empty());
    }
}
