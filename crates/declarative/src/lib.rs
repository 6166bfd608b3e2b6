//! # Declarative
//!
//! A small declarative-resource-graph composer.
//!
//! Resources are declared with literal attributes and references to other
//! resources' outputs. The graph infers dependencies from those references,
//! the planner orders them dependency-first, and a stack applies them one by
//! one through a [`Provider`], feeding each resource the outputs of the
//! resources it references.
//!
//! ## Core Concepts
//!
//! - **Resource**: a named, typed declaration with attributes
//! - **Reference**: pointer from an attribute to another resource's output
//! - **ResourceGraph**: resources keyed by name, validated for unknown
//!   references and cycles
//! - **ExecutionPlan**: dependency-first, insertion-stable ordering
//! - **Stack**: declaration plus single application
//!
//! ## Example
//!
//! ```
//! use declarative::{Outputs, Provider, Resource, ResourceKind, Stack, Value};
//!
//! struct Echo;
//!
//! impl Provider for Echo {
//!     fn create(
//!         &self,
//!         _kind: ResourceKind,
//!         attributes: &declarative::Attributes,
//!     ) -> anyhow::Result<Outputs> {
//!         Ok(attributes.clone())
//!     }
//! }
//!
//! let mut stack = Stack::new("Demo");
//! stack.add_resource(Resource::new(
//!     "Repo",
//!     ResourceKind::SourceRepository,
//!     [("repository_name", Value::from("demo"))],
//! )?)?;
//! stack.add_resource(Resource::new(
//!     "Build",
//!     ResourceKind::BuildProject,
//!     [
//!         ("project_name", Value::reference("Repo", "repository_name")),
//!         ("environment", Value::map([("privileged", Value::from(true))])),
//!     ],
//! )?)?;
//!
//! assert_eq!(stack.plan()?.names(), vec!["Repo", "Build"]);
//! stack.apply(&Echo)?;
//! assert_eq!(stack.outputs("Build")?["project_name"], Value::from("demo"));
//! # Ok::<(), declarative::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`Provider`]: materializes one resource and returns its outputs
//! - [`ProgressCallback`]: observes an apply run
//!
//! This keeps the crate free of any cloud SDK or terminal UI.

pub mod context;
pub mod error;
mod executor;
pub mod graph;
mod graph_proptest;
pub mod planner;
pub mod resource;
pub mod stack;
pub mod types;

// Re-export main types at crate root
pub use context::{LogProgress, NoProgress, ProgressCallback, Provider};
pub use error::{Error, Result};
pub use graph::ResourceGraph;
pub use planner::{ExecutionPlan, PlanStep, plan};
pub use resource::Resource;
pub use stack::{Export, Stack, StackOutput};
pub use types::{
    ApplyResult, Attributes, ExecuteOptions, ExecuteSummary, Outputs, Reference, ResourceKind,
    StackState, Value,
};
