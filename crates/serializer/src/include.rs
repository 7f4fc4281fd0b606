//! Include paths - `author,comments.author` as a tree of association keys

use heck::ToLowerCamelCase;
use indexmap::IndexMap;

/// Association keys to include, each with the keys to include beneath it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: IndexMap<String, IncludeTree>,
}

impl IncludeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse comma separated, dotted include paths
    ///
    /// Segments may be dasherized (`best-friend`) or camel-cased (`bestFriend`).
    pub fn parse(paths: &str) -> Self {
        let mut tree = Self::new();
        for path in paths.split(',').map(str::trim).filter(|path| !path.is_empty()) {
            tree.insert_path(path);
        }
        tree
    }

    pub fn insert_path(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_lower_camel_case()).or_default();
        }
    }

    /// Add every path of `other` to this tree
    pub fn merge(&mut self, other: &IncludeTree) {
        for (key, subtree) in &other.children {
            self.children.entry(key.clone()).or_default().merge(subtree);
        }
    }

    pub fn get(&self, key: &str) -> Option<&IncludeTree> {
        self.children.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
