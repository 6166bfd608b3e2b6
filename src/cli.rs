use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pipestack")]
#[command(version)]
#[command(about = "Declare, plan and apply the model build pipeline stack", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/pipestack/config.toml)
    #[arg(long, global = true, env = "PIPESTACK_CONFIG")]
    pub config: Option<String>,

    /// Override a config value (key=value, repeatable, before the subcommand)
    #[arg(short = 'c', long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the declared resources without applying anything
    Synth(OutputArgs),

    /// Show the dependency-ordered plan
    Plan(OutputArgs),

    /// Apply the stack in dependency order
    Apply(ApplyArgs),

    /// Show the resolved configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct OutputArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Number of resources applied concurrently within one plan level
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub jobs: u16,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Write the stack exports to this file as JSON
    #[arg(long, value_name = "PATH")]
    pub outputs_file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from([
            "pipestack",
            "-c",
            "branch=main",
            "--context",
            "region=eu-west-1",
            "apply",
            "--jobs",
            "4",
            "--yes",
        ]);
        assert_eq!(cli.context, vec!["branch=main", "region=eu-west-1"]);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.jobs, 4);
                assert!(args.yes);
                assert!(args.outputs_file.is_none());
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_context_after_subcommand_is_rejected() {
        // A value given after the subcommand must not replace earlier ones
        let result = Cli::try_parse_from([
            "pipestack",
            "-c",
            "branch=main",
            "apply",
            "-c",
            "region=eu-west-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_jobs_must_be_positive() {
        assert!(Cli::try_parse_from(["pipestack", "apply", "--jobs", "0"]).is_err());
    }
}
