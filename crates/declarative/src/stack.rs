//! Stack - the unit of declaration and application
//!
//! A stack owns one resource graph plus its named exports. It is built
//! once, applied once, and read afterwards:
//!
//! ```text
//! Unapplied -> Applying -> Applied
//!                      \-> Failed
//! ```

use crate::context::{NoProgress, ProgressCallback, Provider};
use crate::error::{Error, Result};
use crate::executor;
use crate::graph::ResourceGraph;
use crate::planner::{self, ExecutionPlan};
use crate::resource::Resource;
use crate::types::{ExecuteOptions, ExecuteSummary, Outputs, Reference, StackState, Value};
use serde::Serialize;

/// A named export declared on a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutput {
    pub name: String,
    pub description: String,
    pub value: Reference,
}

/// A stack export with its applied value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub name: String,
    pub description: String,
    pub value: Value,
}

#[derive(Debug)]
pub struct Stack {
    name: String,
    graph: ResourceGraph,
    stack_outputs: Vec<StackOutput>,
    state: StackState,
    summary: Option<ExecuteSummary>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: ResourceGraph::new(),
            stack_outputs: Vec::new(),
            state: StackState::Unapplied,
            summary: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.graph.get(name)
    }

    /// Summary of the last apply run
    pub fn summary(&self) -> Option<&ExecuteSummary> {
        self.summary.as_ref()
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<()> {
        self.require_unapplied()?;
        self.graph.add(resource)
    }

    /// Declare a named export of another resource's output
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        value: Reference,
    ) -> Result<()> {
        self.require_unapplied()?;
        let name = name.into();
        if self.stack_outputs.iter().any(|o| o.name == name) {
            return Err(Error::DuplicateName(name));
        }
        self.stack_outputs.push(StackOutput {
            name,
            description: description.into(),
            value,
        });
        Ok(())
    }

    pub fn declared_outputs(&self) -> &[StackOutput] {
        &self.stack_outputs
    }

    /// Validate every reference of the graph and of the exports
    pub fn resolve_references(&mut self) -> Result<()> {
        self.graph.resolve_references()?;
        self.check_exports()
    }

    /// Dependency-ordered plan; no provider is involved
    pub fn plan(&mut self) -> Result<ExecutionPlan> {
        let plan = planner::plan(&mut self.graph)?;
        self.check_exports()?;
        Ok(plan)
    }

    /// Apply every resource in plan order, one at a time
    pub fn apply<P>(&mut self, provider: &P) -> Result<ExecuteSummary>
    where
        P: Provider + ?Sized,
    {
        self.apply_with(provider, &ExecuteOptions::default(), &mut NoProgress)
    }

    /// Apply with options and a progress callback
    ///
    /// Configuration errors (unknown references, cycles) are reported
    /// before the provider is called and leave the stack `Unapplied`. The
    /// first provider failure moves it to `Failed`; resources applied
    /// before that keep their outputs and later ones are not attempted.
    pub fn apply_with<P, C>(
        &mut self,
        provider: &P,
        opts: &ExecuteOptions,
        progress: &mut C,
    ) -> Result<ExecuteSummary>
    where
        P: Provider + ?Sized,
        C: ProgressCallback + ?Sized,
    {
        self.require_unapplied()?;
        let plan = self.plan()?;

        log::info!(
            "Applying stack '{}' ({} resources, {} jobs)",
            self.name,
            plan.len(),
            opts.jobs.max(1)
        );
        self.state = StackState::Applying;

        let execution = executor::execute(&mut self.graph, &plan, provider, opts, progress);
        self.summary = Some(execution.summary.clone());

        match execution.failure {
            None => {
                self.state = StackState::Applied;
                log::info!("Stack '{}' applied", self.name);
                Ok(execution.summary)
            }
            Some(err) => {
                self.state = StackState::Failed;
                log::warn!("Stack '{}' failed: {err}", self.name);
                Err(err)
            }
        }
    }

    /// Outputs of one applied resource
    pub fn outputs(&self, name: &str) -> Result<&Outputs> {
        let resource = self
            .graph
            .get(name)
            .ok_or_else(|| Error::UnknownResource(name.to_string()))?;
        resource
            .outputs()
            .ok_or_else(|| Error::NotApplied(name.to_string()))
    }

    /// Declared exports with their applied values
    pub fn exports(&self) -> Result<Vec<Export>> {
        self.stack_outputs
            .iter()
            .map(|output| {
                let outputs = self.outputs(&output.value.resource)?;
                let value = outputs.get(&output.value.output).cloned().ok_or_else(|| {
                    Error::MissingOutput {
                        resource: output.value.resource.clone(),
                        output: output.value.output.clone(),
                    }
                })?;
                Ok(Export {
                    name: output.name.clone(),
                    description: output.description.clone(),
                    value,
                })
            })
            .collect()
    }

    fn check_exports(&self) -> Result<()> {
        for output in &self.stack_outputs {
            if !self.graph.contains(&output.value.resource) {
                return Err(Error::UnknownReference {
                    from: output.name.clone(),
                    target: output.value.resource.clone(),
                });
            }
        }
        Ok(())
    }

    fn require_unapplied(&self) -> Result<()> {
        if self.state == StackState::Unapplied {
            Ok(())
        } else {
            Err(Error::InvalidState {
                name: self.name.clone(),
                state: self.state.to_string(),
                expected: StackState::Unapplied.to_string(),
            })
        }
    }
}
