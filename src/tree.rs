use std::collections::HashMap;

use thiserror::Error;

use crate::model::{join_path, TorrentFile};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("torrent {torrent_id}: path '{path}' is used by more than one file or directory")]
    PathConflict { torrent_id: i64, path: String },
    #[error("torrent {torrent_id}: file #{index} has an empty name")]
    EmptyName { torrent_id: i64, index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf(TorrentFile),
    Parent(FileTree),
}

/// A directory of a torrent. The root of a torrent has an empty name and
/// path; every other directory's `path` includes its own name. Children
/// keep the order in which the daemon listed them.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTree {
    pub torrent_id: i64,
    pub name: String,
    pub path: String,
    children: Vec<(String, TreeNode)>,
    positions: HashMap<String, usize>,
}

impl FileTree {
    pub fn new(torrent_id: i64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            torrent_id,
            name: name.into(),
            path: path.into(),
            children: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn root(torrent_id: i64) -> Self {
        Self::new(torrent_id, "", "")
    }

    /// Builds the directory hierarchy from the flat file list of a torrent.
    pub fn from_files<I>(torrent_id: i64, files: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = TorrentFile>,
    {
        let mut root = Self::root(torrent_id);
        for file in files {
            root.insert_file(file)?;
        }
        Ok(root)
    }

    pub fn insert_file(&mut self, file: TorrentFile) -> Result<(), TreeError> {
        if file.name.is_empty() {
            return Err(TreeError::EmptyName {
                torrent_id: file.torrent_id,
                index: file.index,
            });
        }
        let components: Vec<String> = file
            .path
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        self.insert_at(&components, file)
    }

    fn insert_at(&mut self, components: &[String], file: TorrentFile) -> Result<(), TreeError> {
        let Some((head, rest)) = components.split_first() else {
            if self.positions.contains_key(&file.name) {
                return Err(TreeError::PathConflict {
                    torrent_id: file.torrent_id,
                    path: file.full_path(),
                });
            }
            let key = file.name.clone();
            self.push_child(key, TreeNode::Leaf(file));
            return Ok(());
        };
        let dir_path = join_path(&self.path, head);
        let pos = match self.positions.get(head) {
            Some(&pos) => pos,
            None => {
                let dir = FileTree::new(self.torrent_id, head.clone(), dir_path.clone());
                self.push_child(head.clone(), TreeNode::Parent(dir))
            }
        };
        match &mut self.children[pos].1 {
            TreeNode::Parent(dir) => dir.insert_at(rest, file),
            TreeNode::Leaf(_) => Err(TreeError::PathConflict {
                torrent_id: self.torrent_id,
                path: dir_path,
            }),
        }
    }

    fn push_child(&mut self, key: String, node: TreeNode) -> usize {
        let pos = self.children.len();
        self.positions.insert(key.clone(), pos);
        self.children.push((key, node));
        pos
    }

    /// Adds or replaces a child, returning the node it replaced.
    #[cfg(test)]
    pub fn insert(&mut self, key: impl Into<String>, node: TreeNode) -> Option<TreeNode> {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.children[pos].1, node)),
            None => {
                self.push_child(key, node);
                None
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Children in display order: case-insensitive by key, keys that fold
    /// to the same string keep their insertion order.
    pub fn sorted_children(&self) -> Vec<(&str, &TreeNode)> {
        let mut children: Vec<(&str, &TreeNode)> = self
            .children
            .iter()
            .map(|(key, node)| (key.as_str(), node))
            .collect();
        children.sort_by_cached_key(|(key, _)| key.to_lowercase());
        children
    }

    /// Every file below this directory, depth first in display order.
    pub fn leaves(&self) -> Vec<&TorrentFile> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a TorrentFile>) {
        for (_, node) in self.sorted_children() {
            match node {
                TreeNode::Leaf(file) => out.push(file),
                TreeNode::Parent(dir) => dir.collect_leaves(out),
            }
        }
    }
}
