//! Provider and progress traits
//!
//! These traits keep the declarative crate independent of any cloud API
//! or terminal UI. A provider materializes one resource at a time; a
//! progress callback observes an apply run.

use crate::types::{ApplyResult, Attributes, Outputs, ResourceKind};
use anyhow::Result;

/// External executor that materializes resources
///
/// Attributes arrive fully resolved: every reference has been replaced by
/// the referenced resource's output value.
pub trait Provider: Send + Sync {
    /// Create (or update) one resource and return its computed outputs
    fn create(&self, kind: ResourceKind, attributes: &Attributes) -> Result<Outputs>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn create(&self, kind: ResourceKind, attributes: &Attributes) -> Result<Outputs> {
        (**self).create(kind, attributes)
    }
}

/// Progress callback for apply runs
pub trait ProgressCallback: Send {
    /// Called once before the first resource, with the plan length
    fn on_apply_start(&mut self, total: usize);

    /// Called before a resource is handed to the provider
    fn on_resource_start(&mut self, name: &str, kind: ResourceKind);

    /// Called when a resource has been applied, failed or skipped
    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult);

    /// Called once after the last resource
    fn on_apply_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_apply_start(&mut self, _total: usize) {}
    fn on_resource_start(&mut self, _name: &str, _kind: ResourceKind) {}
    fn on_resource_complete(&mut self, _name: &str, _result: &ApplyResult) {}
    fn on_apply_complete(&mut self) {}
}

/// Progress callback that logs through the `log` facade
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_apply_start(&mut self, total: usize) {
        log::info!("Applying {total} resources");
    }

    fn on_resource_start(&mut self, name: &str, kind: ResourceKind) {
        log::info!("Creating {kind} '{name}'");
    }

    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult) {
        match result {
            ApplyResult::Created => log::info!("Created '{name}'"),
            ApplyResult::Failed { error } => log::warn!("Failed '{name}': {error}"),
            ApplyResult::Skipped { reason } => log::info!("Skipped '{name}': {reason}"),
        }
    }

    fn on_apply_complete(&mut self) {}
}
