//! In-memory file server
//!
//! Behaves like a small POSIX FTP server: user accounts, a shared directory
//! tree, per-connection working directory and `ls -l` style listings.
//! Used by the test-suite and by `backend = "memory"` for local development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ConnectTarget, Connector, RemoteFs, RemoteResult};
use crate::error::RemoteError;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Default)]
struct Tree {
    /// Absolute normalized path -> node; always contains "/"
    nodes: BTreeMap<String, Node>,
    users: HashMap<String, String>,
}

/// Shared state of an in-memory server
#[derive(Debug, Clone)]
pub struct MemoryServer {
    inner: Arc<Mutex<Tree>>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    /// Create an empty server with just the root directory
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self {
            inner: Arc::new(Mutex::new(Tree {
                nodes,
                users: HashMap::new(),
            })),
        }
    }

    /// Add an account
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.lock()
            .users
            .insert(username.to_string(), password.to_string());
        self
    }

    /// Create a directory (and its parents) at an absolute path
    pub fn with_dir(self, path: &str) -> Self {
        {
            let mut tree = self.lock();
            let mut current = String::new();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                current.push('/');
                current.push_str(segment);
                tree.nodes.entry(current.clone()).or_insert(Node::Dir);
            }
        }
        self
    }

    /// Place a file at an absolute path; parents must exist
    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        let path = normalize("/", path);
        self.lock().nodes.insert(path, Node::File(data.to_vec()));
        self
    }

    /// Content of the file at an absolute path
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().nodes.get(&normalize("/", path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Whether a directory exists at an absolute path
    pub fn has_dir(&self, path: &str) -> bool {
        matches!(self.lock().nodes.get(&normalize("/", path)), Some(Node::Dir))
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        // Tree operations never panic midway, so a poisoned lock still holds a consistent tree
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Connector for a [`MemoryServer`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    server: MemoryServer,
}

impl MemoryConnector {
    pub fn new(server: MemoryServer) -> Self {
        Self { server }
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, target: &ConnectTarget) -> RemoteResult<Box<dyn RemoteFs>> {
        let tree = self.server.lock();
        match tree.users.get(&target.username) {
            Some(password) if *password == target.password => {}
            _ => {
                return Err(RemoteError::Authentication("Login incorrect.".to_string()));
            }
        }
        drop(tree);

        Ok(Box::new(MemoryConnection {
            server: self.server.clone(),
            cwd: "/".to_string(),
            open: true,
        }))
    }
}

/// One connection to a [`MemoryServer`]
struct MemoryConnection {
    server: MemoryServer,
    cwd: String,
    open: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> RemoteResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(RemoteError::Network("connection closed".to_string()))
        }
    }

    fn resolve(&self, path: &str) -> String {
        normalize(&self.cwd, path)
    }

    fn unavailable(path: &str, reason: &str) -> RemoteError {
        RemoteError::Unavailable(format!("{}: {}", path, reason))
    }
}

impl RemoteFs for MemoryConnection {
    fn pwd(&mut self) -> RemoteResult<String> {
        self.ensure_open()?;
        Ok(self.cwd.clone())
    }

    fn cwd(&mut self, path: &str) -> RemoteResult<()> {
        self.ensure_open()?;
        let target = self.resolve(path);
        match self.server.lock().nodes.get(&target) {
            Some(Node::Dir) => {
                self.cwd = target;
                Ok(())
            }
            Some(Node::File(_)) => Err(Self::unavailable(path, "Not a directory")),
            None => Err(Self::unavailable(path, "No such file or directory")),
        }
    }

    fn list(&mut self) -> RemoteResult<Vec<String>> {
        self.ensure_open()?;
        let tree = self.server.lock();
        let lines = children(&tree, &self.cwd)
            .map(|(name, node)| match node {
                Node::Dir => format!("drwxr-xr-x   2 owner    group        4096 Jan 01 00:00 {}", name),
                Node::File(data) => format!(
                    "-rw-r--r--   1 owner    group    {:>8} Jan 01 00:00 {}",
                    data.len(),
                    name
                ),
            })
            .collect();
        Ok(lines)
    }

    fn put(&mut self, name: &str, data: &[u8]) -> RemoteResult<u64> {
        self.ensure_open()?;
        let target = self.resolve(name);
        let mut tree = self.server.lock();
        if !matches!(tree.nodes.get(&parent_of(&target)), Some(Node::Dir)) {
            return Err(Self::unavailable(name, "No such file or directory"));
        }
        if matches!(tree.nodes.get(&target), Some(Node::Dir)) {
            return Err(Self::unavailable(name, "Is a directory"));
        }
        tree.nodes.insert(target, Node::File(data.to_vec()));
        Ok(data.len() as u64)
    }

    fn retrieve(&mut self, name: &str) -> RemoteResult<Vec<u8>> {
        self.ensure_open()?;
        match self.server.lock().nodes.get(&self.resolve(name)) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(Self::unavailable(name, "Is a directory")),
            None => Err(Self::unavailable(name, "No such file or directory")),
        }
    }

    fn mkdir(&mut self, name: &str) -> RemoteResult<()> {
        self.ensure_open()?;
        let target = self.resolve(name);
        let mut tree = self.server.lock();
        if tree.nodes.contains_key(&target) {
            return Err(Self::unavailable(name, "File exists"));
        }
        if !matches!(tree.nodes.get(&parent_of(&target)), Some(Node::Dir)) {
            return Err(Self::unavailable(name, "No such file or directory"));
        }
        tree.nodes.insert(target, Node::Dir);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        self.ensure_open()?;
        let source = self.resolve(from);
        let dest = self.resolve(to);
        let mut tree = self.server.lock();
        if source == "/" || !tree.nodes.contains_key(&source) {
            return Err(Self::unavailable(from, "No such file or directory"));
        }
        if tree.nodes.contains_key(&dest) || !matches!(tree.nodes.get(&parent_of(&dest)), Some(Node::Dir)) {
            return Err(Self::unavailable(to, "Cannot rename to this name"));
        }
        if dest.starts_with(&format!("{}/", source)) {
            return Err(Self::unavailable(to, "Cannot move a directory into itself"));
        }

        // Move the node and everything beneath it
        let prefix = format!("{}/", source);
        let moved: Vec<String> = tree
            .nodes
            .keys()
            .filter(|k| **k == source || k.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = tree.nodes.remove(&old) {
                let new = format!("{}{}", dest, &old[source.len()..]);
                tree.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn remove_file(&mut self, name: &str) -> RemoteResult<()> {
        self.ensure_open()?;
        let target = self.resolve(name);
        let mut tree = self.server.lock();
        match tree.nodes.get(&target) {
            Some(Node::File(_)) => {
                tree.nodes.remove(&target);
                Ok(())
            }
            Some(Node::Dir) => Err(Self::unavailable(name, "Is a directory")),
            None => Err(Self::unavailable(name, "No such file or directory")),
        }
    }

    fn remove_dir(&mut self, name: &str) -> RemoteResult<()> {
        self.ensure_open()?;
        let target = self.resolve(name);
        let mut tree = self.server.lock();
        match tree.nodes.get(&target) {
            Some(Node::Dir) if target != "/" => {
                if children(&tree, &target).next().is_some() {
                    return Err(Self::unavailable(name, "Directory not empty"));
                }
                tree.nodes.remove(&target);
                Ok(())
            }
            Some(_) => Err(Self::unavailable(name, "Not a directory")),
            None => Err(Self::unavailable(name, "No such file or directory")),
        }
    }

    fn quit(&mut self) -> RemoteResult<()> {
        self.ensure_open()?;
        self.open = false;
        Ok(())
    }
}

/// Direct children of `dir` as (name, node)
fn children<'a>(tree: &'a Tree, dir: &str) -> impl Iterator<Item = (&'a str, &'a Node)> + 'a {
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{}/", dir)
    };
    let skip = prefix.len();
    tree.nodes
        .range(prefix.clone()..)
        .take_while(move |(k, _)| k.starts_with(&prefix))
        .filter_map(move |(k, node)| {
            let rest = &k[skip..];
            if rest.is_empty() || rest.contains('/') {
                None
            } else {
                Some((rest, node))
            }
        })
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Resolve `path` against `cwd` into an absolute path without `.`/`..`
fn normalize(cwd: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
