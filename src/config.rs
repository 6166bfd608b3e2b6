//! Pipeline configuration
//!
//! Every value can come from `--context key=value`, the config file, the
//! environment (region and account only) or a built-in default, in that
//! order. The CDK context keys (`ecr_repo`, `codecommit_repo`, ...) are
//! accepted as aliases.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Keys accepted by `--context` and the config file
pub const CONTEXT_KEYS: [&str; 9] = [
    "stack_name",
    "image_repository",
    "source_repository",
    "branch",
    "build_project",
    "pipeline_name",
    "notification_email",
    "region",
    "account",
];

/// CDK context key aliases, as `(alias, key)`
pub const CONTEXT_ALIASES: [(&str, &str); 6] = [
    ("ecr_repo", "image_repository"),
    ("codecommit_repo", "source_repository"),
    ("codecommit_branch", "branch"),
    ("codebuild_project", "build_project"),
    ("codepipeline_name", "pipeline_name"),
    ("notifications_email", "notification_email"),
];

/// Environment variables consulted for the region, in order
const REGION_VARS: [&str; 4] = [
    "CDK_INTEG_REGION",
    "CDK_DEFAULT_REGION",
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
];

/// Environment variables consulted for the account, in order
const ACCOUNT_VARS: [&str; 2] = ["CDK_DEFAULT_ACCOUNT", "AWS_ACCOUNT_ID"];

const DEFAULT_STACK_NAME: &str = "CdkEcrPipelineStack";
const DEFAULT_IMAGE_REPOSITORY: &str = "model-image-repo";
const DEFAULT_SOURCE_REPOSITORY: &str = "model-repo";
const DEFAULT_BRANCH: &str = "master";
const DEFAULT_BUILD_PROJECT: &str = "model-build";
const DEFAULT_PIPELINE_NAME: &str = "model-pipeline";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_ACCOUNT: &str = "000000000000";

static STACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").unwrap());
static IMAGE_REPOSITORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*(?:/[a-z0-9]+(?:[._-][a-z0-9]+)*)*$").unwrap()
});
static SOURCE_REPOSITORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]{1,100}$").unwrap());
static BUILD_PROJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{1,254}$").unwrap());
static PIPELINE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.@_-]{1,100}$").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d$").unwrap());
static ACCOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{12}$").unwrap());

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("pipestack"))
}

// ============================================================================
// Partial config (file or --context)
// ============================================================================

/// Optional values from one configuration source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub stack_name: Option<String>,
    #[serde(alias = "ecr_repo")]
    pub image_repository: Option<String>,
    #[serde(alias = "codecommit_repo")]
    pub source_repository: Option<String>,
    #[serde(alias = "codecommit_branch")]
    pub branch: Option<String>,
    #[serde(alias = "codebuild_project")]
    pub build_project: Option<String>,
    #[serde(alias = "codepipeline_name")]
    pub pipeline_name: Option<String>,
    #[serde(alias = "notifications_email")]
    pub notification_email: Option<String>,
    pub region: Option<String>,
    pub account: Option<String>,
}

impl ConfigLayer {
    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Load the explicit config path, or the default one if it exists
    pub fn load_file(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => {
                let expanded = shellexpand::tilde(path);
                Self::load(Path::new(expanded.as_ref()))
            }
            None => {
                let path = config_dir()?.join("config.toml");
                if path.exists() {
                    log::debug!("Using config file {}", path.display());
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse `key=value` pairs given with `--context`
    pub fn from_context(pairs: &[String]) -> Result<Self> {
        let mut layer = Self::default();
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Invalid context '{pair}', expected key=value"))?;
            layer.set(key.trim(), value.trim())?;
        }
        Ok(layer)
    }

    /// Set one value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = CONTEXT_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map_or(key, |&(_, canonical)| canonical);
        let slot = match key {
            "stack_name" => &mut self.stack_name,
            "image_repository" => &mut self.image_repository,
            "source_repository" => &mut self.source_repository,
            "branch" => &mut self.branch,
            "build_project" => &mut self.build_project,
            "pipeline_name" => &mut self.pipeline_name,
            "notification_email" => &mut self.notification_email,
            "region" => &mut self.region,
            "account" => &mut self.account,
            _ => bail!(
                "Unknown context key '{key}' (expected one of: {})",
                CONTEXT_KEYS.join(", ")
            ),
        };
        *slot = Some(value.to_string());
        Ok(())
    }
}

// ============================================================================
// Resolved config
// ============================================================================

/// Fully resolved configuration for one pipeline stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub stack_name: String,
    pub image_repository: String,
    pub source_repository: String,
    pub branch: String,
    pub build_project: String,
    pub pipeline_name: String,
    pub notification_email: Option<String>,
    pub region: String,
    pub account: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            image_repository: DEFAULT_IMAGE_REPOSITORY.to_string(),
            source_repository: DEFAULT_SOURCE_REPOSITORY.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            build_project: DEFAULT_BUILD_PROJECT.to_string(),
            pipeline_name: DEFAULT_PIPELINE_NAME.to_string(),
            notification_email: None,
            region: DEFAULT_REGION.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }
}

/// First value that is present and non-empty
fn first_of<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
}

impl PipelineConfig {
    /// Merge context, file and environment over the defaults, then validate
    ///
    /// `env` looks up environment variables; tests pass a closure.
    pub fn resolve<F>(context: ConfigLayer, file: ConfigLayer, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |a: Option<String>, b: Option<String>, default: &str| {
            first_of([a, b]).unwrap_or_else(|| default.to_string())
        };

        let config = Self {
            stack_name: pick(context.stack_name, file.stack_name, DEFAULT_STACK_NAME),
            image_repository: pick(
                context.image_repository,
                file.image_repository,
                DEFAULT_IMAGE_REPOSITORY,
            ),
            source_repository: pick(
                context.source_repository,
                file.source_repository,
                DEFAULT_SOURCE_REPOSITORY,
            ),
            branch: pick(context.branch, file.branch, DEFAULT_BRANCH),
            build_project: pick(context.build_project, file.build_project, DEFAULT_BUILD_PROJECT),
            pipeline_name: pick(context.pipeline_name, file.pipeline_name, DEFAULT_PIPELINE_NAME),
            notification_email: first_of([context.notification_email, file.notification_email]),
            region: first_of(
                [context.region, file.region]
                    .into_iter()
                    .chain(REGION_VARS.iter().map(|var| env(var))),
            )
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            account: first_of(
                [context.account, file.account]
                    .into_iter()
                    .chain(ACCOUNT_VARS.iter().map(|var| env(var))),
            )
            .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Resolve from CLI inputs and the process environment
    pub fn from_cli(config_path: Option<&str>, context: &[String]) -> Result<Self> {
        let context = ConfigLayer::from_context(context)?;
        let file = ConfigLayer::load_file(config_path)?;
        Self::resolve(context, file, |key| std::env::var(key).ok())
    }

    /// Check every value against the provider's naming rules
    pub fn validate(&self) -> Result<()> {
        check("stack_name", &self.stack_name, &STACK_NAME)?;
        check("image_repository", &self.image_repository, &IMAGE_REPOSITORY)?;
        if !(2..=256).contains(&self.image_repository.len()) {
            bail!("Invalid image_repository: must be 2 to 256 characters");
        }
        check("source_repository", &self.source_repository, &SOURCE_REPOSITORY)?;
        if self.source_repository.ends_with(".git") {
            bail!("Invalid source_repository: must not end with .git");
        }
        if self.branch.trim().is_empty() || self.branch.contains(char::is_whitespace) {
            bail!("Invalid branch: '{}'", self.branch);
        }
        check("build_project", &self.build_project, &BUILD_PROJECT)?;
        check("pipeline_name", &self.pipeline_name, &PIPELINE_NAME)?;
        if let Some(email) = &self.notification_email {
            check("notification_email", email, &EMAIL)?;
        }
        check("region", &self.region, &REGION)?;
        check("account", &self.account, &ACCOUNT)?;
        Ok(())
    }
}

fn check(key: &str, value: &str, pattern: &Regex) -> Result<()> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        bail!("Invalid {key}: '{value}'")
    }
}
