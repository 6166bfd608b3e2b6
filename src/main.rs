mod cli;
mod commands;
mod config;
mod pipeline;
mod progress;
mod provider;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::PipelineConfig;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<String>,
    pub context: Vec<String>,
}

impl Context {
    /// Resolve the pipeline configuration from the CLI inputs
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let config = PipelineConfig::from_cli(self.config_path.as_deref(), &self.context)?;
        log::debug!(
            "Resolved config for stack '{}' in {} ({} verbosity)",
            config.stack_name,
            config.region,
            self.verbose
        );
        Ok(config)
    }
}

fn main() {
    if let Err(err) = run() {
        ui::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
        context: cli.context,
    };

    match cli.command {
        Command::Synth(args) => commands::synth::run(&ctx, args.json),
        Command::Plan(args) => commands::plan::run(&ctx, args.json),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Config => commands::config::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pipestack", &mut io::stdout());
            Ok(())
        }
    }
}
