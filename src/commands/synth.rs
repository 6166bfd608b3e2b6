//! Show the declared stack without calling a provider

use anyhow::Result;
use colored::Colorize;
use declarative::Stack;
use serde_json::json;

use crate::Context;
use crate::pipeline;
use crate::ui;

const VALUE_WIDTH: usize = 72;

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let config = ctx.pipeline_config()?;
    let mut stack = pipeline::build_stack(&config)?;
    stack.resolve_references()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&stack))?);
        return Ok(());
    }

    ui::header(&format!("Stack: {}", stack.name()));

    for resource in stack.graph().resources() {
        println!();
        println!(
            "  {} {}",
            resource.name().bold(),
            format!("({})", resource.kind()).dimmed()
        );

        let deps = stack
            .graph()
            .dependencies(resource.name())
            .unwrap_or_default();
        if !deps.is_empty() {
            ui::dim(&format!("  depends on: {}", deps.join(", ")));
        }

        if !ctx.quiet {
            for (key, value) in resource.attributes() {
                ui::kv(
                    &format!("  {key}"),
                    &ui::truncate(&value.to_string(), VALUE_WIDTH),
                );
            }
        }
    }

    if !stack.declared_outputs().is_empty() {
        ui::section("Outputs");
        for output in stack.declared_outputs() {
            ui::kv(&output.name, &output.value.to_string());
        }
    }

    Ok(())
}

fn to_json(stack: &Stack) -> serde_json::Value {
    let resources: Vec<_> = stack
        .graph()
        .resources()
        .map(|resource| {
            json!({
                "name": resource.name(),
                "kind": resource.kind(),
                "attributes": resource.attributes(),
                "depends_on": stack.graph().dependencies(resource.name()).unwrap_or_default(),
            })
        })
        .collect();

    json!({
        "stack": stack.name(),
        "resources": resources,
        "outputs": stack.declared_outputs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    #[test]
    fn test_json_lists_references_as_refs() {
        let mut stack = pipeline::build_stack(&PipelineConfig::default()).unwrap();
        stack.resolve_references().unwrap();
        let value = to_json(&stack);

        assert_eq!(value["stack"], "CdkEcrPipelineStack");
        let resources = value["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 5);

        let build = &resources[2];
        assert_eq!(build["name"], "BuildProject");
        assert_eq!(build["kind"], "build-project");
        assert_eq!(build["depends_on"], json!(["ImageRepository"]));
        assert_eq!(
            build["attributes"]["environment"]["variables"][2]["value"],
            json!({"ref": "ImageRepository", "output": "repository_uri"})
        );
        assert_eq!(value["outputs"][0]["name"], "RepositoryCloneUrlHttp");
    }
}
