//! Execution engine - applies a plan through a provider
//!
//! Sequential runs follow plan order exactly. Concurrent runs apply one
//! wave (plan level) at a time on a rayon pool, so a resource only starts
//! after every resource it references has completed.

use crate::context::{ProgressCallback, Provider};
use crate::error::Error;
use crate::graph::ResourceGraph;
use crate::planner::{ExecutionPlan, PlanStep};
use crate::types::{
    ApplyResult, Attributes, ExecuteOptions, ExecuteSummary, Outputs, Reference, Value,
};
use anyhow::{Result, anyhow};
use rayon::prelude::*;

/// Outcome of one apply run
pub(crate) struct Execution {
    pub summary: ExecuteSummary,
    /// First provider failure in plan order
    pub failure: Option<Error>,
}

/// Apply every step of `plan` against `graph`
pub(crate) fn execute<P, C>(
    graph: &mut ResourceGraph,
    plan: &ExecutionPlan,
    provider: &P,
    opts: &ExecuteOptions,
    progress: &mut C,
) -> Execution
where
    P: Provider + ?Sized,
    C: ProgressCallback + ?Sized,
{
    progress.on_apply_start(plan.len());

    let execution = if opts.jobs > 1 {
        match rayon::ThreadPoolBuilder::new().num_threads(opts.jobs).build() {
            Ok(pool) => execute_waves(graph, plan, provider, &pool, progress),
            Err(e) => {
                log::warn!("Failed to create thread pool, applying sequentially: {e}");
                execute_sequential(graph, plan, provider, progress)
            }
        }
    } else {
        execute_sequential(graph, plan, provider, progress)
    };

    progress.on_apply_complete();
    execution
}

fn execute_sequential<P, C>(
    graph: &mut ResourceGraph,
    plan: &ExecutionPlan,
    provider: &P,
    progress: &mut C,
) -> Execution
where
    P: Provider + ?Sized,
    C: ProgressCallback + ?Sized,
{
    let mut summary = ExecuteSummary::default();
    let mut failure: Option<Error> = None;

    for step in &plan.steps {
        if let Some(failed) = failure.as_ref().map(failed_name) {
            skip(step, &failed, &mut summary, progress);
            continue;
        }

        progress.on_resource_start(&step.name, step.kind);
        let created =
            resolve_attributes(graph, step).and_then(|attrs| provider.create(step.kind, &attrs));
        let result = record(graph, step, created, &mut failure);
        summary.add_result(&result);
        progress.on_resource_complete(&step.name, &result);
    }

    Execution { summary, failure }
}

fn execute_waves<P, C>(
    graph: &mut ResourceGraph,
    plan: &ExecutionPlan,
    provider: &P,
    pool: &rayon::ThreadPool,
    progress: &mut C,
) -> Execution
where
    P: Provider + ?Sized,
    C: ProgressCallback + ?Sized,
{
    let mut summary = ExecuteSummary::default();
    let mut failure: Option<Error> = None;

    for wave in plan.waves() {
        if let Some(failed) = failure.as_ref().map(failed_name) {
            for step in wave {
                skip(step, &failed, &mut summary, progress);
            }
            continue;
        }

        log::debug!("Applying wave of {} resources", wave.len());
        let inputs: Vec<(&PlanStep, Result<Attributes>)> = wave
            .into_iter()
            .map(|step| {
                progress.on_resource_start(&step.name, step.kind);
                (step, resolve_attributes(graph, step))
            })
            .collect();

        // Progress callbacks are not thread-safe, report after the wave
        let results: Vec<(&PlanStep, Result<Outputs>)> = pool.install(|| {
            inputs
                .into_par_iter()
                .map(|(step, attrs)| {
                    let created = attrs.and_then(|attrs| provider.create(step.kind, &attrs));
                    (step, created)
                })
                .collect()
        });

        for (step, created) in results {
            let result = record(graph, step, created, &mut failure);
            summary.add_result(&result);
            progress.on_resource_complete(&step.name, &result);
        }
    }

    Execution { summary, failure }
}

/// Substitute every reference with the referenced resource's output
fn resolve_attributes(graph: &ResourceGraph, step: &PlanStep) -> Result<Attributes> {
    let resource = graph.resource_at(step.index);
    let mut lookup = |reference: &Reference| -> Result<Value> {
        let target = graph
            .get(&reference.resource)
            .ok_or_else(|| anyhow!("unknown resource '{}'", reference.resource))?;
        let outputs = target
            .outputs()
            .ok_or_else(|| anyhow!("'{}' has not been applied", reference.resource))?;
        outputs.get(&reference.output).cloned().ok_or_else(|| {
            anyhow!(
                "'{}' has no output '{}'",
                reference.resource,
                reference.output
            )
        })
    };

    resource
        .attributes()
        .iter()
        .map(|(key, value)| Ok((key.clone(), value.resolve(&mut lookup)?)))
        .collect()
}

/// Store outputs on success, remember the first failure
fn record(
    graph: &mut ResourceGraph,
    step: &PlanStep,
    created: Result<Outputs>,
    failure: &mut Option<Error>,
) -> ApplyResult {
    let outcome = created.and_then(|outputs| {
        graph
            .resource_at_mut(step.index)
            .record_outputs(outputs)
            .map_err(anyhow::Error::from)
    });

    match outcome {
        Ok(()) => {
            log::debug!("Recorded outputs for '{}'", step.name);
            ApplyResult::Created
        }
        Err(cause) => {
            let error = format!("{cause:#}");
            if failure.is_none() {
                *failure = Some(Error::apply(&step.name, cause));
            }
            ApplyResult::Failed { error }
        }
    }
}

fn failed_name(err: &Error) -> String {
    match err {
        Error::Apply { resource, .. } => resource.clone(),
        other => other.to_string(),
    }
}

fn skip<C>(step: &PlanStep, failed: &str, summary: &mut ExecuteSummary, progress: &mut C)
where
    C: ProgressCallback + ?Sized,
{
    let result = ApplyResult::Skipped {
        reason: format!("'{failed}' failed"),
    };
    summary.add_result(&result);
    progress.on_resource_complete(&step.name, &result);
}
