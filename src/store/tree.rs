//! Per-locale translation tree.
//!
//! The tree is the system of record for one (workspace unit, locale) pair.
//! Every leaf is tagged with the document that defined it, and an ownership
//! index (document -> owned key paths) makes document-scoped removal
//! proportional to the document's own size instead of the whole tree.

use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};

/// A terminal (key path, value) pair tagged with its owning document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Leaf {
    /// Translation text.
    value: String,
    /// Identity of the document that currently owns this leaf.
    owner: String,
}

/// One node in the tree: an inner path segment or a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TreeNode {
    /// Inner node keyed by path segment.
    Branch(BTreeMap<String, TreeNode>),
    /// Terminal value.
    Leaf(Leaf),
}

/// Translation tree for one locale within one workspace unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TranslationTree {
    /// Key path separator (`.` by convention).
    separator: String,
    /// Root children keyed by first path segment.
    root: BTreeMap<String, TreeNode>,
    /// Document identity -> key paths it currently owns.
    owned: HashMap<String, BTreeSet<String>>,
    /// Derived flat lookup index. Never the system of record; rebuilt from
    /// the tree whenever `stale` is set.
    index: HashMap<String, String>,
    /// Whether `index` lags behind the tree.
    stale: bool,
}

impl TranslationTree {
    /// Creates an empty tree using the given key separator.
    pub(crate) fn new(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            root: BTreeMap::new(),
            owned: HashMap::new(),
            index: HashMap::new(),
            stale: false,
        }
    }

    /// Inserts one leaf, replacing whatever occupied the key path before.
    ///
    /// A leaf landing on an existing subtree replaces the whole subtree, and
    /// a leaf on an inner segment of the path is converted to a branch; in
    /// both cases the displaced leaves are detached from their owners
    /// (last-merged-wins).
    pub(crate) fn insert(&mut self, key: &str, value: &str, owner: &str) {
        if key.is_empty() {
            return;
        }
        let segments: Vec<&str> = key.split(self.separator.as_str()).collect();
        let leaf = Leaf { value: value.to_string(), owner: owner.to_string() };

        let mut ousted = Vec::new();
        Self::insert_into(&mut self.root, "", &segments, &self.separator, leaf, &mut ousted);

        for (lost_key, lost_owner) in ousted {
            if let Some(keys) = self.owned.get_mut(&lost_owner) {
                keys.remove(&lost_key);
                if keys.is_empty() {
                    self.owned.remove(&lost_owner);
                }
            }
        }
        self.owned.entry(owner.to_string()).or_default().insert(key.to_string());
        self.stale = true;
    }

    /// Recursive insertion. Displaced leaves are reported through `ousted`
    /// as (key path, previous owner) so the ownership index can be fixed up.
    fn insert_into(
        children: &mut BTreeMap<String, TreeNode>,
        prefix: &str,
        segments: &[&str],
        separator: &str,
        leaf: Leaf,
        ousted: &mut Vec<(String, String)>,
    ) {
        let Some((segment, rest)) = segments.split_first() else {
            return;
        };
        let path = if prefix.is_empty() {
            (*segment).to_string()
        } else {
            format!("{prefix}{separator}{segment}")
        };

        if rest.is_empty() {
            if let Some(existing) = children.get(*segment) {
                Self::collect_leaves(existing, &path, separator, ousted);
            }
            children.insert((*segment).to_string(), TreeNode::Leaf(leaf));
            return;
        }

        let node = children
            .entry((*segment).to_string())
            .or_insert_with(|| TreeNode::Branch(BTreeMap::new()));
        if let TreeNode::Leaf(old) = node {
            ousted.push((path.clone(), old.owner.clone()));
            *node = TreeNode::Branch(BTreeMap::new());
        }
        if let TreeNode::Branch(map) = node {
            Self::insert_into(map, &path, rest, separator, leaf, ousted);
        }
    }

    /// Collects every leaf under `node` as (key path, owner).
    fn collect_leaves(
        node: &TreeNode,
        path: &str,
        separator: &str,
        out: &mut Vec<(String, String)>,
    ) {
        match node {
            TreeNode::Leaf(leaf) => out.push((path.to_string(), leaf.owner.clone())),
            TreeNode::Branch(children) => {
                for (segment, child) in children {
                    let child_path = format!("{path}{separator}{segment}");
                    Self::collect_leaves(child, &child_path, separator, out);
                }
            }
        }
    }

    /// Removes every leaf owned by `owner`, pruning branches that become
    /// empty. Returns the number of leaves removed.
    pub(crate) fn remove_document(&mut self, owner: &str) -> usize {
        let Some(keys) = self.owned.remove(owner) else {
            return 0;
        };
        let count = keys.len();
        for key in keys {
            let segments: Vec<&str> = key.split(self.separator.as_str()).collect();
            Self::remove_path(&mut self.root, &segments);
        }
        if count > 0 {
            self.stale = true;
        }
        count
    }

    /// Removes the leaf at the given path. Returns whether a leaf was
    /// removed; empty branches along the way are pruned.
    fn remove_path(children: &mut BTreeMap<String, TreeNode>, segments: &[&str]) -> bool {
        let Some((segment, rest)) = segments.split_first() else {
            return false;
        };
        if rest.is_empty() {
            return match children.get(*segment) {
                Some(TreeNode::Leaf(_)) => {
                    children.remove(*segment);
                    true
                }
                _ => false,
            };
        }

        let (removed, now_empty) = match children.get_mut(*segment) {
            Some(TreeNode::Branch(map)) => {
                let removed = Self::remove_path(map, rest);
                (removed, map.is_empty())
            }
            _ => (false, false),
        };
        if removed && now_empty {
            children.remove(*segment);
        }
        removed
    }

    /// Rebuilds the flat lookup index from the tree.
    pub(crate) fn rebuild_index(&mut self) {
        self.index.clear();
        Self::index_subtree(&self.root, "", &self.separator, &mut self.index);
        self.stale = false;
    }

    /// Accumulates leaf paths into the index.
    fn index_subtree(
        children: &BTreeMap<String, TreeNode>,
        prefix: &str,
        separator: &str,
        out: &mut HashMap<String, String>,
    ) {
        for (segment, node) in children {
            let path = if prefix.is_empty() {
                segment.clone()
            } else {
                format!("{prefix}{separator}{segment}")
            };
            match node {
                TreeNode::Leaf(leaf) => {
                    out.insert(path, leaf.value.clone());
                }
                TreeNode::Branch(map) => Self::index_subtree(map, &path, separator, out),
            }
        }
    }

    /// Point lookup through the derived index.
    ///
    /// Callers must rebuild after merging before trusting the result; a
    /// stale index is only ever a documented optimization, never silent.
    pub(crate) fn lookup(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(String::as_str)
    }

    /// Whether the index lags behind the tree.
    pub(crate) const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether the tree holds no leaves at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of leaves currently owned, counted via the ownership index.
    pub(crate) fn leaf_count(&self) -> usize {
        self.owned.values().map(BTreeSet::len).sum()
    }
}
