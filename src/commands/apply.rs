//! Apply the pipeline stack through the simulated provider

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{ExecuteOptions, ExecuteSummary, LogProgress, ProgressCallback, Stack};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::pipeline;
use crate::progress::ApplyProgress;
use crate::provider::SimulatedProvider;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = ctx.pipeline_config()?;
    let mut stack = pipeline::build_stack(&config)?;
    let plan = stack.plan()?;

    if !args.json {
        ui::header(&format!("Applying {}", stack.name()));
        println!();
        ui::kv("Region", &config.region);
        ui::kv("Account", &config.account);
        ui::kv("Resources", &plan.len().to_string());
    }

    if !args.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let provider = SimulatedProvider::new(&config.region, &config.account);
    let opts = ExecuteOptions {
        jobs: usize::from(args.jobs),
    };
    // JSON output keeps stdout clean; progress goes to the log instead
    let mut progress: Box<dyn ProgressCallback> = if args.json {
        Box::new(LogProgress)
    } else {
        println!();
        Box::new(ApplyProgress::new(ctx.quiet))
    };
    let result = stack.apply_with(&provider, &opts, progress.as_mut());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report(&stack))?);
    } else if let Some(summary) = stack.summary() {
        print_summary(summary);
    }

    result?;

    if !args.json && !ctx.quiet {
        print_outputs(&stack)?;
    }

    if let Some(path) = &args.outputs_file {
        write_outputs_file(&stack, path)?;
        if !args.json {
            ui::success(&format!("Wrote outputs to {}", path.display()));
        }
    }

    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt("Apply this stack?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")
}

fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Stack applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Stack applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

fn print_outputs(stack: &Stack) -> Result<()> {
    ui::section("Resources");
    for resource in stack.graph().resources() {
        println!("  {}", resource.name().bold());
        for (key, value) in stack.outputs(resource.name())? {
            ui::kv(&format!("  {key}"), &value.to_string());
        }
    }

    ui::section("Outputs");
    for export in stack.exports()? {
        ui::kv(&export.name, &export.value.to_string());
    }
    Ok(())
}

/// Exports keyed by stack name, then export name
fn exports_document(stack: &Stack) -> Result<serde_json::Value> {
    let exports: BTreeMap<String, declarative::Value> = stack
        .exports()?
        .into_iter()
        .map(|export| (export.name, export.value))
        .collect();
    let mut document = serde_json::Map::new();
    document.insert(stack.name().to_string(), serde_json::to_value(exports)?);
    Ok(serde_json::Value::Object(document))
}

fn write_outputs_file(stack: &Stack, path: &Path) -> Result<()> {
    let document = exports_document(stack)?;
    let content = serde_json::to_string_pretty(&document)?;
    fs::write(path, content + "\n")
        .with_context(|| format!("Could not write outputs file: {}", path.display()))
}

/// Machine-readable result of an apply run
fn report(stack: &Stack) -> serde_json::Value {
    let resources: BTreeMap<&str, _> = stack
        .graph()
        .resources()
        .filter_map(|r| r.outputs().map(|outputs| (r.name(), outputs)))
        .collect();

    json!({
        "stack": stack.name(),
        "state": stack.state(),
        "summary": stack.summary(),
        "resources": resources,
        "exports": stack.exports().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use declarative::StackState;

    fn applied_stack() -> Stack {
        let config = PipelineConfig::default();
        let mut stack = pipeline::build_stack(&config).unwrap();
        stack
            .apply(&SimulatedProvider::new(&config.region, &config.account))
            .unwrap();
        stack
    }

    #[test]
    fn test_write_outputs_file() {
        let stack = applied_stack();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs.json");

        write_outputs_file(&stack, &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written["CdkEcrPipelineStack"]["ImageRepositoryUri"],
            "000000000000.dkr.ecr.us-east-1.amazonaws.com/model-image-repo"
        );
        assert_eq!(
            written["CdkEcrPipelineStack"]["RepositoryCloneUrlSsh"],
            "ssh://git-codecommit.us-east-1.amazonaws.com/v1/repos/model-repo"
        );
    }

    #[test]
    fn test_outputs_require_apply() {
        let stack = pipeline::build_stack(&PipelineConfig::default()).unwrap();
        assert_eq!(stack.state(), StackState::Unapplied);
        assert!(exports_document(&stack).is_err());
    }

    #[test]
    fn test_report() {
        let stack = applied_stack();
        let value = report(&stack);
        assert_eq!(value["state"], "applied");
        assert_eq!(value["summary"]["created"], 5);
        assert_eq!(
            value["resources"]["Pipeline"]["pipeline_name"],
            "model-pipeline"
        );
        assert_eq!(value["exports"].as_array().unwrap().len(), 3);
    }
}
