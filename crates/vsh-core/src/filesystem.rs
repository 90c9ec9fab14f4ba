//! In-memory virtual filesystem.
//!
//! # Path Convention
//!
//! Every operation takes an absolute, normalized path:
//!
//! - Root: `"/"`
//! - Nested: `"/home/user/notes.txt"`
//! - No trailing slash, no `.`/`..`/empty segments
//!
//! Use [`VirtualFs::normalize_path`] to turn user input into this form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::FsError;
use crate::models::{Node, User};

/// Directory entry returned by [`VirtualFs::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    /// Content length in bytes (files only).
    pub size: Option<usize>,
}

/// The filesystem tree.
///
/// Serializes as `{"/": <root directory node>}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFs {
    #[serde(rename = "/")]
    root: Node,
}

impl Default for VirtualFs {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFs {
    /// Create a filesystem holding only the root directory.
    pub fn new() -> Self {
        Self {
            root: Node::empty_dir(),
        }
    }

    /// Create the filesystem a fresh session boots with.
    ///
    /// Every user gets a home directory with `.bashrc`, an empty
    /// `.bash_history` and a `.bash_aliases`.
    pub fn seeded(users: &[User]) -> Self {
        let mut fs = Self::new();

        for dir in config::SEED_DIRECTORIES {
            fs.seed_dir(dir);
        }
        for user in users {
            let aliases = if user.is_root() {
                config::DEFAULT_ROOT_ALIASES
            } else {
                config::DEFAULT_USER_ALIASES
            };
            fs.seed_dir(&user.home);
            fs.seed_file(
                &join_path(&user.home, config::dotfiles::RC),
                config::DEFAULT_BASHRC,
            );
            fs.seed_file(&join_path(&user.home, config::dotfiles::HISTORY), "");
            fs.seed_file(&join_path(&user.home, config::dotfiles::ALIASES), aliases);
        }
        for (path, content) in config::SEED_FILES {
            fs.seed_file(path, content);
        }

        let passwd: String = users
            .iter()
            .map(|u| format!("{}:x:{}:{}::{}:{}\n", u.name, u.uid, u.uid, u.home, config::SHELL_PATH))
            .collect();
        fs.seed_file("/etc/passwd", &passwd);

        fs
    }

    fn seed_dir(&mut self, path: &str) {
        if let Err(e) = self.create_dir_all(path) {
            log::warn!("seed: cannot create {}: {}", path, e);
        }
    }

    fn seed_file(&mut self, path: &str, content: &str) {
        self.seed_dir(&parent_path(path));
        if let Err(e) = self.write_file(path, content) {
            log::warn!("seed: cannot write {}: {}", path, e);
        }
    }

    /// The root directory node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    // =========================================================================
    // Path Helpers
    // =========================================================================

    /// Normalize user input into an absolute path.
    ///
    /// - A leading `~` expands to `home`
    /// - Relative paths resolve against `cwd`
    /// - Empty and `.` segments are dropped, `..` pops one level
    ///   (popping past the root is a no-op)
    pub fn normalize_path(path: &str, cwd: &str, home: &str) -> String {
        let expanded = if path == "~" {
            home.to_string()
        } else if let Some(rest) = path.strip_prefix("~/") {
            format!("{}/{}", home, rest)
        } else {
            path.to_string()
        };

        let combined = if expanded.starts_with('/') {
            expanded
        } else {
            format!("{}/{}", cwd, expanded)
        };

        let mut parts: Vec<&str> = Vec::new();
        for part in combined.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                _ => parts.push(part),
            }
        }

        format!("/{}", parts.join("/"))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get the node at `path`, if any.
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        let mut current = &self.root;
        for part in segments(path) {
            current = current.children()?.get(part)?;
        }
        Some(current)
    }

    fn resolve_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut current = &mut self.root;
        for part in segments(path) {
            current = current.children_mut()?.get_mut(part)?;
        }
        Some(current)
    }

    /// Get the directory that would contain `path`, with the final name.
    ///
    /// Returns `None` for the root itself or when the parent is missing or
    /// not a directory.
    pub fn resolve_parent<'a>(&'a self, path: &'a str) -> Option<(&'a Node, &'a str)> {
        let name = file_name(path);
        if name.is_empty() {
            return None;
        }
        let parent = self.resolve(&parent_path(path))?;
        parent.is_directory().then_some((parent, name))
    }

    /// Children of the parent directory of `path`, plus the final name.
    fn parent_children_mut<'a>(
        &mut self,
        path: &'a str,
    ) -> Result<(&mut BTreeMap<String, Node>, &'a str), FsError> {
        let name = file_name(path);
        if name.is_empty() {
            return Err(FsError::RootBusy);
        }
        let parent = self
            .resolve_mut(&parent_path(path))
            .ok_or(FsError::NotFound)?;
        let children = parent.children_mut().ok_or(FsError::NotADirectory)?;
        Ok((children, name))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(Node::is_file)
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(Node::is_directory)
    }

    /// Read the content of a file.
    pub fn read_file(&self, path: &str) -> Result<&str, FsError> {
        match self.resolve(path) {
            Some(Node::File { content }) => Ok(content),
            Some(Node::Directory { .. }) => Err(FsError::IsADirectory),
            None => Err(FsError::NotFound),
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Create a file or directory.
    ///
    /// Fails when the parent is missing or the target already exists.
    pub fn create(&mut self, path: &str, is_dir: bool, content: Option<&str>) -> Result<(), FsError> {
        let (children, name) = match self.parent_children_mut(path) {
            Err(FsError::RootBusy) => return Err(FsError::AlreadyExists),
            other => other?,
        };
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        let node = if is_dir {
            Node::empty_dir()
        } else {
            Node::file(content.unwrap_or_default())
        };
        children.insert(name.to_string(), node);
        Ok(())
    }

    /// Create a file or replace the content of an existing one.
    pub fn write_file(&mut self, path: &str, content: &str) -> Result<(), FsError> {
        let (children, name) = match self.parent_children_mut(path) {
            Err(FsError::RootBusy) => return Err(FsError::IsADirectory),
            other => other?,
        };
        match children.get_mut(name) {
            Some(Node::Directory { .. }) => Err(FsError::IsADirectory),
            Some(Node::File { content: existing }) => {
                *existing = content.to_string();
                Ok(())
            }
            None => {
                children.insert(name.to_string(), Node::file(content));
                Ok(())
            }
        }
    }

    /// Append to a file, creating it when missing.
    pub fn append_file(&mut self, path: &str, content: &str) -> Result<(), FsError> {
        match self.resolve_mut(path) {
            Some(Node::File { content: existing }) => {
                existing.push_str(content);
                Ok(())
            }
            Some(Node::Directory { .. }) => Err(FsError::IsADirectory),
            None => self.write_file(path, content),
        }
    }

    /// Create a directory and any missing ancestors.
    ///
    /// Returns the number of directories created.
    pub fn create_dir_all(&mut self, path: &str) -> Result<usize, FsError> {
        let mut created = 0;
        let mut current = &mut self.root;
        for part in segments(path) {
            let children = current.children_mut().ok_or(FsError::NotADirectory)?;
            current = children.entry(part.to_string()).or_insert_with(|| {
                created += 1;
                Node::empty_dir()
            });
        }
        if current.is_directory() {
            Ok(created)
        } else {
            Err(FsError::NotADirectory)
        }
    }

    /// Remove a node.
    ///
    /// Directories require `recursive`; a missing target is only an error
    /// without `force`.
    pub fn remove(&mut self, path: &str, recursive: bool, force: bool) -> Result<(), FsError> {
        let (children, name) = match self.parent_children_mut(path) {
            Err(FsError::NotFound) if force => return Ok(()),
            other => other?,
        };
        match children.get(name) {
            None if force => Ok(()),
            None => Err(FsError::NotFound),
            Some(Node::Directory { .. }) if !recursive => Err(FsError::IsADirectory),
            Some(_) => {
                children.remove(name);
                Ok(())
            }
        }
    }

    /// Deep-copy `src` to `dst`.
    ///
    /// An existing file at `dst` is replaced; an existing directory is not.
    pub fn copy(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        if src == dst {
            return if self.exists(src) {
                Ok(())
            } else {
                Err(FsError::NotFound)
            };
        }
        let node = self.resolve(src).ok_or(FsError::NotFound)?.clone();
        if node.is_directory() && is_within(dst, src) {
            return Err(FsError::IntoItself);
        }

        let (children, name) = self.parent_children_mut(dst)?;
        match children.get(name) {
            Some(Node::Directory { .. }) => return Err(FsError::IsADirectory),
            Some(Node::File { .. }) if node.is_directory() => return Err(FsError::NotADirectory),
            _ => {}
        }
        children.insert(name.to_string(), node);
        Ok(())
    }

    /// Move `src` to `dst` (copy, then remove the source).
    pub fn move_node(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        if src == dst {
            return self.copy(src, dst);
        }
        self.copy(src, dst)?;
        self.remove(src, true, false)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List directory contents sorted by name.
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let node = self.resolve(path).ok_or(FsError::NotFound)?;
        let children = node.children().ok_or(FsError::NotADirectory)?;
        Ok(children
            .iter()
            .map(|(name, child)| DirEntry {
                name: name.clone(),
                is_dir: child.is_directory(),
                size: child.content().map(str::len),
            })
            .collect())
    }

    /// Render the subtree below `path` with box-drawing prefixes.
    ///
    /// The header line (the directory itself) is not included.
    pub fn tree(&self, path: &str) -> Result<Vec<String>, FsError> {
        let node = self.resolve(path).ok_or(FsError::NotFound)?;
        let children = node.children().ok_or(FsError::NotADirectory)?;
        let mut lines = Vec::new();
        render_tree(children, "", &mut lines);
        Ok(lines)
    }

    /// Every node below `path` in pre-order, with paths relative to it.
    pub fn walk(&self, path: &str) -> Result<Vec<(String, &Node)>, FsError> {
        let node = self.resolve(path).ok_or(FsError::NotFound)?;
        let mut out = Vec::new();
        walk_into(node, "", &mut out);
        Ok(out)
    }
}

fn render_tree(children: &BTreeMap<String, Node>, prefix: &str, lines: &mut Vec<String>) {
    let count = children.len();
    for (i, (name, child)) in children.iter().enumerate() {
        let is_last = i + 1 == count;
        let branch = if is_last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, branch, name));

        if let Some(grandchildren) = child.children() {
            let indent = if is_last { "    " } else { "│   " };
            render_tree(grandchildren, &format!("{}{}", prefix, indent), lines);
        }
    }
}

fn walk_into<'a>(node: &'a Node, base: &str, out: &mut Vec<(String, &'a Node)>) {
    let Some(children) = node.children() else {
        return;
    };
    for (name, child) in children {
        let path = if base.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", base, name)
        };
        out.push((path.clone(), child));
        walk_into(child, &path, out);
    }
}

// =============================================================================
// Path Functions
// =============================================================================

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Parent of an absolute path (`"/"` for top-level entries and the root).
pub fn parent_path(path: &str) -> String {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

/// Final segment of a path (empty for the root).
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Join a directory path and a name.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// `true` when `path` equals `ancestor` or lies below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor == "/"
        || path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Normalize a path lexically into relative form.
///
/// Leading `/` is removed, `.` and empty segments are dropped and `..` pops
/// (never above the start). Used for archive member names.
pub fn normalize_relative(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;

    fn create_test_fs() -> VirtualFs {
        let mut fs = VirtualFs::new();
        fs.create_dir_all("/home/user/docs").unwrap();
        fs.write_file("/home/user/docs/a.txt", "alpha").unwrap();
        fs.write_file("/home/user/b.txt", "beta").unwrap();
        fs
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    #[test]
    fn test_normalize_relative_to_cwd() {
        assert_eq!(
            VirtualFs::normalize_path("docs", "/home/user", "/home/user"),
            "/home/user/docs"
        );
        assert_eq!(
            VirtualFs::normalize_path("../x/./y//z", "/home/user", "/root"),
            "/home/x/y/z"
        );
    }

    #[test]
    fn test_normalize_tilde() {
        assert_eq!(VirtualFs::normalize_path("~", "/tmp", "/home/user"), "/home/user");
        assert_eq!(
            VirtualFs::normalize_path("~/docs", "/tmp", "/home/user"),
            "/home/user/docs"
        );
        // Only a leading tilde expands
        assert_eq!(VirtualFs::normalize_path("a/~", "/tmp", "/home/user"), "/tmp/a/~");
    }

    #[test]
    fn test_normalize_root_pop_is_noop() {
        assert_eq!(VirtualFs::normalize_path("../../..", "/home", "/"), "/");
        assert_eq!(VirtualFs::normalize_path("/..", "/", "/"), "/");
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "", ".", "..", "/", "~", "~/a/../b", "a//b/./c/..", "/x/y/../../..", "~user", "./~/..",
        ];
        for input in inputs {
            let once = VirtualFs::normalize_path(input, "/home/user", "/home/user");
            let twice = VirtualFs::normalize_path(&once, "/somewhere", "/else");
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    #[test]
    fn test_existing_directories_resolve_after_normalize() {
        let fs = VirtualFs::seeded(&Settings::default().users);
        for (path, node) in fs.walk("/").unwrap() {
            if node.is_directory() {
                let normalized = VirtualFs::normalize_path(&path, "/", "/");
                assert!(fs.is_directory(&normalized), "{}", normalized);
            }
        }
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(parent_path("/home/user"), "/home");
        assert_eq!(parent_path("/home"), "/");
        assert_eq!(parent_path("/"), "/");
        assert_eq!(file_name("/home/user"), "user");
        assert_eq!(file_name("/"), "");
        assert_eq!(join_path("/", "etc"), "/etc");
        assert_eq!(join_path("/etc", "hosts"), "/etc/hosts");
        assert!(is_within("/a/b", "/a"));
        assert!(!is_within("/ab", "/a"));
        assert_eq!(normalize_relative("/abs/./x/../y/"), "abs/y");
        assert_eq!(normalize_relative("../up"), "up");
    }

    #[test]
    fn test_resolve_parent() {
        let fs = create_test_fs();
        let path = String::from("/home/user/new.txt");
        let (parent, name) = fs.resolve_parent(&path).unwrap();
        assert!(parent.is_directory());
        assert_eq!(name, "new.txt");

        assert!(fs.resolve_parent("/").is_none());
        assert!(fs.resolve_parent("/missing/x").is_none());
        assert!(fs.resolve_parent("/home/user/b.txt/x").is_none());
    }

    // =========================================================================
    // Create / Remove
    // =========================================================================

    #[test]
    fn test_create_and_remove() {
        let mut fs = create_test_fs();
        fs.create("/home/user/new.txt", false, Some("hi")).unwrap();
        assert_eq!(fs.read_file("/home/user/new.txt").unwrap(), "hi");

        fs.remove("/home/user/new.txt", false, false).unwrap();
        assert!(!fs.exists("/home/user/new.txt"));
    }

    #[test]
    fn test_create_errors() {
        let mut fs = create_test_fs();
        assert_eq!(
            fs.create("/home/user/b.txt", false, None),
            Err(FsError::AlreadyExists)
        );
        assert_eq!(
            fs.create("/missing/x", true, None),
            Err(FsError::NotFound)
        );
        assert_eq!(
            fs.create("/home/user/b.txt/x", false, None),
            Err(FsError::NotADirectory)
        );
        assert_eq!(fs.create("/", true, None), Err(FsError::AlreadyExists));
    }

    #[test]
    fn test_remove_rules() {
        let mut fs = create_test_fs();
        assert_eq!(
            fs.remove("/home/user/docs", false, false),
            Err(FsError::IsADirectory)
        );
        assert_eq!(fs.remove("/nope", false, false), Err(FsError::NotFound));
        assert_eq!(fs.remove("/nope/deeper", false, true), Ok(()));
        assert_eq!(fs.remove("/", true, true), Err(FsError::RootBusy));

        fs.remove("/home/user/docs", true, false).unwrap();
        assert!(!fs.exists("/home/user/docs/a.txt"));
    }

    #[test]
    fn test_write_and_append() {
        let mut fs = create_test_fs();
        fs.write_file("/home/user/b.txt", "one\n").unwrap();
        fs.append_file("/home/user/b.txt", "two\n").unwrap();
        assert_eq!(fs.read_file("/home/user/b.txt").unwrap(), "one\ntwo\n");

        fs.append_file("/home/user/c.txt", "x").unwrap();
        assert_eq!(fs.read_file("/home/user/c.txt").unwrap(), "x");

        assert_eq!(
            fs.write_file("/home/user/docs", "x"),
            Err(FsError::IsADirectory)
        );
    }

    #[test]
    fn test_create_dir_all_counts() {
        let mut fs = VirtualFs::new();
        assert_eq!(fs.create_dir_all("/a/b/c").unwrap(), 3);
        assert_eq!(fs.create_dir_all("/a/b/d").unwrap(), 1);
        fs.write_file("/a/file", "").unwrap();
        assert_eq!(fs.create_dir_all("/a/file/x"), Err(FsError::NotADirectory));
    }

    // =========================================================================
    // Copy / Move
    // =========================================================================

    #[test]
    fn test_copy_is_deep() {
        let mut fs = create_test_fs();
        fs.copy("/home/user/docs", "/home/user/docs2").unwrap();
        fs.write_file("/home/user/docs/a.txt", "changed").unwrap();
        assert_eq!(fs.read_file("/home/user/docs2/a.txt").unwrap(), "alpha");
    }

    #[test]
    fn test_copy_then_remove_equals_move() {
        let mut copied = create_test_fs();
        copied.copy("/home/user/docs", "/tmpdocs").unwrap();
        copied.remove("/home/user/docs", true, false).unwrap();

        let mut moved = create_test_fs();
        moved.move_node("/home/user/docs", "/tmpdocs").unwrap();

        assert_eq!(copied, moved);
    }

    #[test]
    fn test_copy_into_itself_rejected() {
        let mut fs = create_test_fs();
        assert_eq!(
            fs.copy("/home/user", "/home/user/docs/inner"),
            Err(FsError::IntoItself)
        );
        assert_eq!(fs.move_node("/home/user/b.txt", "/home/user/b.txt"), Ok(()));
        assert!(fs.exists("/home/user/b.txt"));
    }

    #[test]
    fn test_copy_over_directory_rejected() {
        let mut fs = create_test_fs();
        assert_eq!(
            fs.copy("/home/user/b.txt", "/home/user/docs"),
            Err(FsError::IsADirectory)
        );
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn test_list_sorted() {
        let fs = create_test_fs();
        let entries = fs.list("/home/user").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "docs"]);
        assert_eq!(entries[0].size, Some(4));
        assert!(entries[1].is_dir);

        assert_eq!(fs.list("/home/user/b.txt"), Err(FsError::NotADirectory));
        assert_eq!(fs.list("/nope"), Err(FsError::NotFound));
    }

    #[test]
    fn test_tree_prefixes() {
        let mut fs = VirtualFs::new();
        fs.create_dir_all("/a/b").unwrap();
        fs.write_file("/a/b/c.txt", "").unwrap();
        fs.write_file("/z.txt", "").unwrap();

        let lines = fs.tree("/").unwrap();
        assert_eq!(
            lines,
            vec!["├── a", "│   └── b", "│       └── c.txt", "└── z.txt"]
        );
    }

    #[test]
    fn test_walk_preorder() {
        let fs = create_test_fs();
        let paths: Vec<_> = fs
            .walk("/home")
            .unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(
            paths,
            vec!["user", "user/b.txt", "user/docs", "user/docs/a.txt"]
        );
    }

    #[test]
    fn test_seeded_layout() {
        let settings = Settings::default();
        let fs = VirtualFs::seeded(&settings.users);
        assert!(fs.is_directory("/home/user/Desktop"));
        assert!(fs.is_file("/root/.bash_aliases"));
        assert!(fs.is_file("/home/alice/.bash_history"));
        assert!(fs.read_file("/etc/passwd").unwrap().starts_with("root:x:0:0"));
        assert!(fs.is_directory("/tmp"));
    }

    #[test]
    fn test_serde_root_key() {
        let fs = create_test_fs();
        let json = serde_json::to_value(&fs).unwrap();
        assert_eq!(json["/"]["type"], "directory");
        let back: VirtualFs = serde_json::from_value(json).unwrap();
        assert_eq!(back, fs);
    }
}
