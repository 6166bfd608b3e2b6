//! Resource graph - resolves references into dependency edges

use crate::error::{Error, Result};
use crate::resource::Resource;
use std::collections::HashMap;

/// DFS marks for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// All resources of one stack, keyed by name, in insertion order
#[derive(Debug, Default, Clone)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    /// `edges[i]` holds the indices resource `i` depends on
    edges: Option<Vec<Vec<usize>>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; the graph is left unchanged on error
    pub fn add(&mut self, resource: Resource) -> Result<()> {
        if self.index.contains_key(resource.name()) {
            return Err(Error::DuplicateName(resource.name().to_string()));
        }
        log::debug!("Declared {} '{}'", resource.kind(), resource.name());
        self.index
            .insert(resource.name().to_string(), self.resources.len());
        self.resources.push(resource);
        self.edges = None;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.index.get(name).map(|&i| &self.resources[i])
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Resources in insertion order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub(crate) fn resource_at(&self, index: usize) -> &Resource {
        &self.resources[index]
    }

    pub(crate) fn resource_at_mut(&mut self, index: usize) -> &mut Resource {
        &mut self.resources[index]
    }

    /// Scan every reference, check targets exist and that no cycle forms
    ///
    /// On success the adjacency list (resource -> its dependencies) is kept
    /// for [`dependencies`](Self::dependencies) and the planner.
    pub fn resolve_references(&mut self) -> Result<()> {
        self.resolve_edges().map(|_| ())
    }

    /// Resolve and return the adjacency list, `edges[i]` being the indices
    /// resource `i` depends on
    pub(crate) fn resolve_edges(&mut self) -> Result<Vec<Vec<usize>>> {
        let mut edges = Vec::with_capacity(self.resources.len());

        for resource in &self.resources {
            let mut deps: Vec<usize> = Vec::new();
            for reference in resource.references() {
                let target = self.index.get(&reference.resource).copied().ok_or_else(|| {
                    Error::UnknownReference {
                        from: resource.name().to_string(),
                        target: reference.resource.clone(),
                    }
                })?;
                if !deps.contains(&target) {
                    deps.push(target);
                }
            }
            edges.push(deps);
        }

        detect_cycle(&edges).map_err(|cycle| Error::CyclicDependency {
            cycle: cycle
                .into_iter()
                .map(|i| self.resources[i].name().to_string())
                .collect(),
        })?;

        log::debug!(
            "Resolved {} resources with {} dependency edges",
            self.resources.len(),
            edges.iter().map(Vec::len).sum::<usize>()
        );
        self.edges = Some(edges.clone());
        Ok(edges)
    }

    /// Whether the adjacency list is current
    pub fn is_resolved(&self) -> bool {
        self.edges.is_some()
    }

    /// Names a resource depends on, available after [`resolve_references`](Self::resolve_references)
    pub fn dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let edges = self.edges.as_ref()?;
        let i = self.index_of(name)?;
        Some(
            edges[i]
                .iter()
                .map(|&d| self.resources[d].name())
                .collect(),
        )
    }
}

/// Three-color depth-first search over `edges`
///
/// Returns the first cycle found as a path that starts and ends on the same
/// node. Roots are visited in insertion order so the reported cycle is
/// deterministic.
fn detect_cycle(edges: &[Vec<usize>]) -> std::result::Result<(), Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut path = Vec::new();

    for root in 0..edges.len() {
        if marks[root] == Mark::Unvisited {
            visit(root, edges, &mut marks, &mut path)?;
        }
    }
    Ok(())
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> std::result::Result<(), Vec<usize>> {
    marks[node] = Mark::InProgress;
    path.push(node);

    for &dep in &edges[node] {
        match marks[dep] {
            Mark::InProgress => {
                let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(dep);
                return Err(cycle);
            }
            Mark::Unvisited => visit(dep, edges, marks, path)?,
            Mark::Done => {}
        }
    }

    path.pop();
    marks[node] = Mark::Done;
    Ok(())
}
