//! Resource declarations
//!
//! A Resource is a named, typed declaration of one infrastructure object.
//! It holds literal and reference attributes, and the outputs a provider
//! computed for it once applied.

use crate::error::{Error, Result};
use crate::types::{Attributes, Outputs, Reference, ResourceKind, Value};
use serde::Serialize;

/// A validated resource declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    name: String,
    kind: ResourceKind,
    attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<Outputs>,
}

impl Resource {
    /// Declare a resource, validating its attributes against the kind
    ///
    /// Every required attribute of `kind` must be present and no attribute
    /// outside the kind's required and optional sets is accepted.
    pub fn new<I, K>(name: impl Into<String>, kind: ResourceKind, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let name = name.into();
        let attributes: Attributes = attributes.into_iter().map(|(k, v)| (k.into(), v)).collect();

        if name.trim().is_empty() {
            return Err(Error::validation(name, "resource name must not be empty"));
        }

        let missing: Vec<&str> = kind
            .required_attributes()
            .iter()
            .copied()
            .filter(|key| !attributes.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::validation(
                name,
                format!("{kind} requires attribute(s): {}", missing.join(", ")),
            ));
        }

        if let Some(unknown) = attributes.keys().find(|key| !kind.allows_attribute(key)) {
            return Err(Error::validation(
                &name,
                format!("{kind} does not accept attribute '{unknown}'"),
            ));
        }

        Ok(Self {
            name,
            kind,
            attributes,
            outputs: None,
        })
    }

    /// Declare a resource from a type name such as `"build-project"`
    pub fn parse<I, K>(name: impl Into<String>, kind: &str, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let name = name.into();
        let kind = kind
            .parse::<ResourceKind>()
            .map_err(|reason| Error::validation(&name, reason))?;
        Self::new(name, kind, attributes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Every reference in the attributes, in attribute-key order
    pub fn references(&self) -> Vec<&Reference> {
        self.attributes.values().flat_map(Value::references).collect()
    }

    /// Outputs recorded by apply, `None` until then
    pub fn outputs(&self) -> Option<&Outputs> {
        self.outputs.as_ref()
    }

    pub fn is_applied(&self) -> bool {
        self.outputs.is_some()
    }

    /// Record provider outputs; a resource is applied at most once
    pub(crate) fn record_outputs(&mut self, outputs: Outputs) -> Result<()> {
        if self.outputs.is_some() {
            return Err(Error::InvalidState {
                name: self.name.clone(),
                state: "applied".into(),
                expected: "unapplied".into(),
            });
        }
        self.outputs = Some(outputs);
        Ok(())
    }
}
