use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node of the virtual filesystem.
///
/// A directory exclusively owns its children; navigation is always by path
/// from the root, so nodes carry no back-references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    File {
        #[serde(default)]
        content: String,
    },
    Directory {
        #[serde(default)]
        children: BTreeMap<String, Node>,
    },
}

impl Node {
    pub fn file(content: impl Into<String>) -> Self {
        Node::File {
            content: content.into(),
        }
    }

    pub fn empty_dir() -> Self {
        Node::Directory {
            children: BTreeMap::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File { .. })
    }

    /// File content (files only).
    pub fn content(&self) -> Option<&str> {
        match self {
            Node::File { content } => Some(content),
            Node::Directory { .. } => None,
        }
    }

    /// Children (directories only).
    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Directory { children } => Some(children),
            Node::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match self {
            Node::Directory { children } => Some(children),
            Node::File { .. } => None,
        }
    }

    /// Count files and directories below this node (excluding itself).
    pub fn count_descendants(&self) -> (usize, usize) {
        let Some(children) = self.children() else {
            return (0, 0);
        };
        children.values().fold((0, 0), |(files, dirs), child| {
            let (f, d) = child.count_descendants();
            if child.is_directory() {
                (files + f, dirs + d + 1)
            } else {
                (files + f + 1, dirs + d)
            }
        })
    }
}
