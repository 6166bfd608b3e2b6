use anyhow::Result;

use crate::Context;
use crate::config::{CONTEXT_KEYS, config_dir};
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let config = ctx.pipeline_config()?;

    ui::header("Configuration");
    println!();
    ui::kv("stack_name", &config.stack_name);
    ui::kv("image_repository", &config.image_repository);
    ui::kv("source_repository", &config.source_repository);
    ui::kv("branch", &config.branch);
    ui::kv("build_project", &config.build_project);
    ui::kv("pipeline_name", &config.pipeline_name);
    ui::kv(
        "notification_email",
        config.notification_email.as_deref().unwrap_or("(none)"),
    );
    ui::kv("region", &config.region);
    ui::kv("account", &config.account);

    if !ctx.quiet {
        println!();
        match &ctx.config_path {
            Some(path) => ui::dim(&format!("Config file: {path}")),
            None => ui::dim(&format!(
                "Config file: {}",
                config_dir()?.join("config.toml").display()
            )),
        }
        ui::dim(&format!("Context keys: {}", CONTEXT_KEYS.join(", ")));
    }

    Ok(())
}
