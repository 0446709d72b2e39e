//! Hierarchical name space: `/a/b/c` paths, per-node data,
//! children set, version triple (`czxid, mzxid, pzxid`), ephemeral owner,
//! ACL. All operations carry a `zxid` drawn from `session::SessionManager`.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone)]
pub struct Node {
    pub data: Vec<u8>,
    pub children: Vec<String>,
    pub czxid: u64,
    pub mzxid: u64,
    pub pzxid: u64,
    pub version: u64,
    pub ephemeral_owner: Option<u64>,
    pub acl: Vec<String>,
}

impl Node {
    fn new(data: Vec<u8>, zxid: u64, ephemeral_owner: Option<u64>, acl: Vec<String>) -> Self {
        Self { data, children: Vec::new(), czxid: zxid, mzxid: zxid, pzxid: zxid, version: 0, ephemeral_owner, acl }
    }
}

fn parent_path(path: &str) -> Option<String> {
    let idx = path.rfind('/')?;
    if idx == 0 {
        Some("/".to_string())
    } else {
        Some(path[..idx].to_string())
    }
}

fn child_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// In-memory namespace; a real leader replicates every mutating call via
/// Raft append-entries before applying it locally.
pub struct NodeStore {
    nodes: HashMap<String, Node>,
    next_sequence: HashMap<String, u64>,
}

impl NodeStore {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::new(Vec::new(), 0, None, Vec::new()));
        Self { nodes, next_sequence: HashMap::new() }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn get(&self, path: &str) -> EngineResult<&Node> {
        self.nodes.get(path).ok_or_else(|| no_node(path))
    }

    pub fn list(&self, path: &str) -> EngineResult<&[String]> {
        Ok(&self.get(path)?.children)
    }

    pub fn create(
        &mut self,
        path: &str,
        data: Vec<u8>,
        ephemeral_owner: Option<u64>,
        sequential: bool,
        acl: Vec<String>,
        zxid: u64,
    ) -> EngineResult<String> {
        let parent = parent_path(path).ok_or_else(|| no_node(path))?;
        if !self.nodes.contains_key(&parent) {
            return Err(no_node(&parent));
        }
        let final_path = if sequential {
            let seq = self.next_sequence.entry(path.to_string()).or_insert(0);
            let name = format!("{path}{:010}", *seq);
            *seq += 1;
            name
        } else {
            path.to_string()
        };
        if self.nodes.contains_key(&final_path) {
            return Err(EngineError::new(ErrorCode::LogicalError, format!("node exists: {final_path}")));
        }
        self.nodes.insert(final_path.clone(), Node::new(data, zxid, ephemeral_owner, acl));
        let child = child_name(&final_path);
        let parent_node = self.nodes.get_mut(&parent).expect("parent checked above");
        parent_node.children.push(child);
        parent_node.pzxid = zxid;
        Ok(final_path)
    }

    pub fn set(&mut self, path: &str, data: Vec<u8>, expected_version: Option<u64>, zxid: u64) -> EngineResult<()> {
        let node = self.nodes.get_mut(path).ok_or_else(|| no_node(path))?;
        check_version(node.version, expected_version)?;
        node.data = data;
        node.version += 1;
        node.mzxid = zxid;
        Ok(())
    }

    pub fn check(&self, path: &str, expected_version: u64) -> EngineResult<()> {
        let node = self.get(path)?;
        check_version(node.version, Some(expected_version))
    }

    pub fn remove(&mut self, path: &str, expected_version: Option<u64>) -> EngineResult<()> {
        {
            let node = self.get(path)?;
            check_version(node.version, expected_version)?;
            if !node.children.is_empty() {
                return Err(EngineError::new(ErrorCode::LogicalError, format!("{path} has children")));
            }
        }
        self.nodes.remove(path);
        if let Some(parent) = parent_path(path) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                let name = child_name(path);
                parent_node.children.retain(|c| c != &name);
            }
        }
        Ok(())
    }

    /// Removes every node owned by an expired session. Returns the removed paths so watches can be fired.
    pub fn remove_ephemerals_owned_by(&mut self, session_id: u64) -> Vec<String> {
        let paths: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.ephemeral_owner == Some(session_id))
            .map(|(p, _)| p.clone())
            .collect();
        for path in &paths {
            let _ = self.remove(path, None);
        }
        paths
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(actual: u64, expected: Option<u64>) -> EngineResult<()> {
    match expected {
        Some(v) if v != actual => Err(EngineError::new(ErrorCode::BadVersion, format!("expected version {v}, node is at {actual}"))),
        _ => Ok(()),
    }
}

fn no_node(path: &str) -> EngineError {
    EngineError::new(ErrorCode::LogicalError, format!("no node at {path}"))
}
