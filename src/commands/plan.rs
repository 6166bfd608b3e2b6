//! Show the dependency-ordered plan

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::pipeline;
use crate::ui;

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let config = ctx.pipeline_config()?;
    let mut stack = pipeline::build_stack(&config)?;
    let plan = stack.plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    ui::header(&format!("Plan: {}", stack.name()));
    println!();

    for (i, step) in plan.steps.iter().enumerate() {
        let label = format!("{} {}", step.name.bold(), format!("({})", step.kind).dimmed());
        ui::step(i + 1, plan.len(), &label);
        if !step.depends_on.is_empty() && !ctx.quiet {
            ui::dim(&format!("     after {}", step.depends_on.join(", ")));
        }
    }

    println!();
    ui::info(&format!(
        "{} resources in {} levels",
        plan.len(),
        plan.waves().len()
    ));
    Ok(())
}
