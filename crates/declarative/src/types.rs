//! Core types for declarative resource graphs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attribute values of a resource declaration
pub type Attributes = BTreeMap<String, Value>;

/// Output values computed by a provider
pub type Outputs = BTreeMap<String, Value>;

/// Pointer from an attribute to another resource's output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    /// Name of the referenced resource
    #[serde(rename = "ref")]
    pub resource: String,
    /// Output key on the referenced resource
    pub output: String,
}

impl Reference {
    pub fn new(resource: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.resource, self.output)
    }
}

/// A literal or reference attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    String(String),
    Ref(Reference),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a reference value
    pub fn reference(resource: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Ref(Reference::new(resource, output))
    }

    /// Build a list of string values
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    /// Build a map value from key/value pairs
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Collect every reference in this value, depth-first
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Ref(r) => out.push(r),
            Self::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_references(out)),
            Self::Bool(_) | Self::String(_) => {}
        }
    }

    /// Whether any reference remains in this value
    pub fn has_references(&self) -> bool {
        match self {
            Self::Ref(_) => true,
            Self::List(items) => items.iter().any(Self::has_references),
            Self::Map(entries) => entries.values().any(Self::has_references),
            Self::Bool(_) | Self::String(_) => false,
        }
    }

    /// Replace every reference with the value returned by `lookup`
    pub fn resolve<F>(&self, lookup: &mut F) -> anyhow::Result<Value>
    where
        F: FnMut(&Reference) -> anyhow::Result<Value>,
    {
        Ok(match self {
            Self::Ref(r) => lookup(r)?,
            Self::List(items) => Self::List(
                items
                    .iter()
                    .map(|v| v.resolve(lookup))
                    .collect::<anyhow::Result<_>>()?,
            ),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.resolve(lookup)?)))
                    .collect::<anyhow::Result<_>>()?,
            ),
            Self::Bool(_) | Self::String(_) => self.clone(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Ref(r) => write!(f, "{r}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// Kinds of infrastructure object a resource can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    SourceRepository,
    ImageRepository,
    BuildProject,
    RolePolicy,
    Pipeline,
    Topic,
    Subscription,
    EventRule,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        Self::SourceRepository,
        Self::ImageRepository,
        Self::BuildProject,
        Self::RolePolicy,
        Self::Pipeline,
        Self::Topic,
        Self::Subscription,
        Self::EventRule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceRepository => "source-repository",
            Self::ImageRepository => "image-repository",
            Self::BuildProject => "build-project",
            Self::RolePolicy => "role-policy",
            Self::Pipeline => "pipeline",
            Self::Topic => "topic",
            Self::Subscription => "subscription",
            Self::EventRule => "event-rule",
        }
    }

    /// Attributes every declaration of this kind must carry
    pub fn required_attributes(&self) -> &'static [&'static str] {
        match self {
            Self::SourceRepository | Self::ImageRepository => &["repository_name"],
            Self::BuildProject => &["project_name", "environment"],
            Self::RolePolicy => &["role", "actions", "resources"],
            Self::Pipeline => &["pipeline_name", "stages"],
            Self::Topic => &[],
            Self::Subscription => &["topic", "protocol", "endpoint"],
            Self::EventRule => &["event_pattern", "targets"],
        }
    }

    /// Attributes a declaration of this kind may carry
    pub fn optional_attributes(&self) -> &'static [&'static str] {
        match self {
            Self::SourceRepository => &["description"],
            Self::ImageRepository => &["scan_on_push"],
            Self::BuildProject => &["description"],
            Self::RolePolicy | Self::Pipeline | Self::Subscription => &[],
            Self::Topic => &["topic_name", "display_name"],
            Self::EventRule => &["description"],
        }
    }

    pub fn allows_attribute(&self, key: &str) -> bool {
        self.required_attributes().contains(&key) || self.optional_attributes().contains(&key)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unsupported resource type '{s}'"))
    }
}

/// Lifecycle of a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackState {
    Unapplied,
    Applying,
    Applied,
    Failed,
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackState::Unapplied => write!(f, "unapplied"),
            StackState::Applying => write!(f, "applying"),
            StackState::Applied => write!(f, "applied"),
            StackState::Failed => write!(f, "failed"),
        }
    }
}

/// Result of applying a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Resource was created and its outputs recorded
    Created,
    /// Provider reported a failure
    Failed { error: String },
    /// Not attempted because an earlier resource failed
    Skipped { reason: String },
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Summary of an apply run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ExecuteSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.failed + self.skipped
    }

    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created => self.created += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for applying a stack
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Worker threads per wave; 1 applies strictly in plan order
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}
