//! Simulated provider
//!
//! Derives the outputs a real cloud account would return (ARNs, URIs,
//! clone URLs) from the resolved attributes. Generated names carry a short
//! blake3 suffix of the kind and attributes, so the same declaration always
//! produces the same outputs.

use anyhow::Result;
use declarative::{Attributes, Outputs, Provider, ResourceKind, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{kind} is missing attribute '{attribute}'")]
    MissingAttribute {
        kind: ResourceKind,
        attribute: String,
    },

    #[error("{kind} attribute '{attribute}' must be {expected}")]
    WrongShape {
        kind: ResourceKind,
        attribute: String,
        expected: &'static str,
    },

    #[error("attribute '{attribute}' still references {reference}")]
    Unresolved { attribute: String, reference: String },
}

#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    region: String,
    account: String,
}

impl SimulatedProvider {
    pub fn new(region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account: account.into(),
        }
    }

    fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{service}:{}:{}:{resource}",
            self.region, self.account
        )
    }
}

impl Provider for SimulatedProvider {
    fn create(&self, kind: ResourceKind, attributes: &Attributes) -> Result<Outputs> {
        for (key, value) in attributes {
            if let Some(reference) = value.references().first() {
                return Err(ProviderError::Unresolved {
                    attribute: key.clone(),
                    reference: reference.to_string(),
                }
                .into());
            }
        }

        let attrs = Attrs { kind, attributes };
        let suffix = suffix(kind, attributes)?;
        let mut outputs = Outputs::new();
        let mut put = |key: &str, value: String| {
            outputs.insert(key.to_string(), Value::String(value));
        };

        match kind {
            ResourceKind::SourceRepository => {
                let name = attrs.string("repository_name")?;
                attrs.optional_string("description")?;
                let host = format!("git-codecommit.{}.amazonaws.com/v1/repos/{name}", self.region);
                put("arn", self.arn("codecommit", name));
                put("repository_name", name.to_string());
                put("clone_url_http", format!("https://{host}"));
                put("clone_url_ssh", format!("ssh://{host}"));
            }
            ResourceKind::ImageRepository => {
                let name = attrs.string("repository_name")?;
                attrs.optional_bool("scan_on_push")?;
                put("arn", self.arn("ecr", &format!("repository/{name}")));
                put("repository_name", name.to_string());
                put(
                    "repository_uri",
                    format!(
                        "{}.dkr.ecr.{}.amazonaws.com/{name}",
                        self.account, self.region
                    ),
                );
            }
            ResourceKind::BuildProject => {
                let name = attrs.string("project_name")?;
                attrs.map("environment")?;
                attrs.optional_string("description")?;
                put("arn", self.arn("codebuild", &format!("project/{name}")));
                put("project_name", name.to_string());
                put(
                    "role_arn",
                    format!("arn:aws:iam::{}:role/{name}-role-{suffix}", self.account),
                );
            }
            ResourceKind::RolePolicy => {
                let role = attrs.string("role")?;
                attrs.string_list("actions")?;
                attrs.string_list("resources")?;
                let role_name = role.rsplit('/').next().unwrap_or(role);
                put("policy_name", format!("{role_name}-policy-{suffix}"));
            }
            ResourceKind::Pipeline => {
                let name = attrs.string("pipeline_name")?;
                attrs.list("stages")?;
                put("arn", self.arn("codepipeline", name));
                put("pipeline_name", name.to_string());
            }
            ResourceKind::Topic => {
                attrs.optional_string("display_name")?;
                let name = attrs
                    .optional_string("topic_name")?
                    .map_or_else(|| format!("topic-{suffix}"), str::to_string);
                put("arn", self.arn("sns", &name));
                put("topic_name", name);
            }
            ResourceKind::Subscription => {
                let topic = attrs.string("topic")?;
                attrs.string("protocol")?;
                attrs.string("endpoint")?;
                put("arn", format!("{topic}:{suffix}"));
            }
            ResourceKind::EventRule => {
                attrs.map("event_pattern")?;
                attrs.list("targets")?;
                attrs.optional_string("description")?;
                put("arn", self.arn("events", &format!("rule/rule-{suffix}")));
            }
        }

        log::debug!("Simulated {kind} with {} outputs", outputs.len());
        Ok(outputs)
    }
}

/// Short, stable hash of a declaration
fn suffix(kind: ResourceKind, attributes: &Attributes) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(&serde_json::to_vec(attributes)?);
    let hex = hasher.finalize().to_hex();
    Ok(hex.as_str()[..12].to_uppercase())
}

/// Typed attribute access for one resource
struct Attrs<'a> {
    kind: ResourceKind,
    attributes: &'a Attributes,
}

impl<'a> Attrs<'a> {
    fn get(&self, key: &str) -> Result<&'a Value, ProviderError> {
        self.attributes
            .get(key)
            .ok_or_else(|| ProviderError::MissingAttribute {
                kind: self.kind,
                attribute: key.to_string(),
            })
    }

    fn wrong_shape(&self, key: &str, expected: &'static str) -> ProviderError {
        ProviderError::WrongShape {
            kind: self.kind,
            attribute: key.to_string(),
            expected,
        }
    }

    fn string(&self, key: &str) -> Result<&'a str, ProviderError> {
        self.get(key)?
            .as_str()
            .ok_or_else(|| self.wrong_shape(key, "a string"))
    }

    fn optional_string(&self, key: &str) -> Result<Option<&'a str>, ProviderError> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(_) => self.string(key).map(Some),
        }
    }

    fn optional_bool(&self, key: &str) -> Result<Option<bool>, ProviderError> {
        match self.attributes.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.wrong_shape(key, "a boolean")),
        }
    }

    fn list(&self, key: &str) -> Result<&'a [Value], ProviderError> {
        self.get(key)?
            .as_list()
            .ok_or_else(|| self.wrong_shape(key, "a list"))
    }

    fn string_list(&self, key: &str) -> Result<Vec<&'a str>, ProviderError> {
        self.list(key)?
            .iter()
            .map(|v| v.as_str().ok_or_else(|| self.wrong_shape(key, "a list of strings")))
            .collect()
    }

    fn map(&self, key: &str) -> Result<(), ProviderError> {
        self.get(key)?
            .as_map()
            .map(|_| ())
            .ok_or_else(|| self.wrong_shape(key, "a map"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SimulatedProvider {
        SimulatedProvider::new("eu-west-1", "123456789012")
    }

    fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> Attributes {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_source_repository_outputs() {
        let outputs = provider()
            .create(
                ResourceKind::SourceRepository,
                &attrs([("repository_name", Value::from("model-repo"))]),
            )
            .unwrap();

        assert_eq!(
            outputs["arn"].as_str(),
            Some("arn:aws:codecommit:eu-west-1:123456789012:model-repo")
        );
        assert_eq!(
            outputs["clone_url_ssh"].as_str(),
            Some("ssh://git-codecommit.eu-west-1.amazonaws.com/v1/repos/model-repo")
        );
    }

    #[test]
    fn test_outputs_are_deterministic() {
        let attributes = attrs([
            ("project_name", Value::from("model-build")),
            ("environment", Value::map([("privileged", Value::from(true))])),
        ]);
        let a = provider()
            .create(ResourceKind::BuildProject, &attributes)
            .unwrap();
        let b = provider()
            .create(ResourceKind::BuildProject, &attributes)
            .unwrap();
        assert_eq!(a, b);

        let role = a["role_arn"].as_str().unwrap();
        assert!(role.starts_with("arn:aws:iam::123456789012:role/model-build-role-"));
    }

    #[test]
    fn test_missing_attribute() {
        let err = provider()
            .create(ResourceKind::Pipeline, &attrs([("pipeline_name", Value::from("p"))]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::MissingAttribute { attribute, .. }) if attribute == "stages"
        ));
    }

    #[test]
    fn test_wrong_shape() {
        let err = provider()
            .create(
                ResourceKind::RolePolicy,
                &attrs([
                    ("role", Value::from("arn:aws:iam::1:role/r")),
                    ("actions", Value::from("codecommit:GitPull")),
                    ("resources", Value::strings(["*"])),
                ]),
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::WrongShape { attribute, .. }) if attribute == "actions"
        ));
    }

    #[test]
    fn test_unresolved_reference() {
        let err = provider()
            .create(
                ResourceKind::Subscription,
                &attrs([
                    ("topic", Value::reference("Topic", "arn")),
                    ("protocol", Value::from("email")),
                    ("endpoint", Value::from("ops@example.com")),
                ]),
            )
            .unwrap_err();
        assert!(err.to_string().contains("${Topic.arn}"));
    }

    #[test]
    fn test_topic_name_generated_when_absent() {
        let outputs = provider()
            .create(ResourceKind::Topic, &Attributes::new())
            .unwrap();
        let name = outputs["topic_name"].as_str().unwrap();
        assert!(name.starts_with("topic-"));
        assert_eq!(
            outputs["arn"].as_str().unwrap(),
            format!("arn:aws:sns:eu-west-1:123456789012:{name}")
        );
    }
}
