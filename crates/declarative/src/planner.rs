//! Execution planner - orders resources so dependencies come first

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::types::ResourceKind;
use serde::Serialize;
use std::collections::BTreeSet;

/// One resource in an execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub name: String,
    pub kind: ResourceKind,
    /// Names of the resources this one references
    pub depends_on: Vec<String>,
    /// 0 without dependencies, else one more than the deepest dependency
    pub level: usize,
    #[serde(skip)]
    pub(crate) index: usize,
}

/// A dependency-ordered application sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    /// Resource names in application order
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Group steps by level, each wave keeping plan order
    ///
    /// Every dependency of a step lives in an earlier wave, so a wave may be
    /// applied concurrently once the previous one has completed.
    pub fn waves(&self) -> Vec<Vec<&PlanStep>> {
        let depth = self.steps.iter().map(|s| s.level + 1).max().unwrap_or(0);
        let mut waves: Vec<Vec<&PlanStep>> = vec![Vec::new(); depth];
        for step in &self.steps {
            waves[step.level].push(step);
        }
        waves
    }
}

/// Build a plan for `graph`
///
/// Resolves references first, so unknown targets and cycles surface here
/// before anything is applied. Among resources with no ordering constraint
/// between them, insertion order is kept: the ready set always yields the
/// earliest-declared resource whose dependencies are all planned.
pub fn plan(graph: &mut ResourceGraph) -> Result<ExecutionPlan> {
    let edges = graph.resolve_edges()?;

    let n = edges.len();
    let mut pending: Vec<usize> = edges.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, deps) in edges.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(node);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut levels = vec![0usize; n];
    let mut steps = Vec::with_capacity(n);

    while let Some(node) = ready.pop_first() {
        let level = edges[node]
            .iter()
            .map(|&d| levels[d] + 1)
            .max()
            .unwrap_or(0);
        levels[node] = level;

        let resource = graph.resource_at(node);
        steps.push(PlanStep {
            name: resource.name().to_string(),
            kind: resource.kind(),
            depends_on: edges[node]
                .iter()
                .map(|&d| graph.resource_at(d).name().to_string())
                .collect(),
            level,
            index: node,
        });

        for &next in &dependents[node] {
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.insert(next);
            }
        }
    }

    log::debug!("Planned {} resources", steps.len());
    Ok(ExecutionPlan { steps })
}
