//! CloudFormation template synthesis.
//!
//! Turns a [`ResourceGraph`] into the document handed to the provisioning
//! engine. Resources keep their declaration order; `DependsOn` is rendered
//! only for explicit edges since reference edges are implied by the
//! intrinsics themselves.

pub mod intrinsic;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::ResourceGraph;

/// CloudFormation template format version
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Serialization format of a synthesized template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl FromStr for TemplateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(Error::invalid_config(
                "format",
                format!("unknown template format '{}', expected json or yaml", other),
            )),
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateFormat::Json => write!(f, "json"),
            TemplateFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// One entry under `Resources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// One entry under `Outputs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A synthesized CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: IndexMap<String, TemplateResource>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, TemplateOutput>,
}

impl Template {
    /// Synthesize a template from a declared graph.
    ///
    /// Fails if the graph cannot be ordered; the engine would reject a cyclic
    /// template anyway.
    pub fn from_graph(graph: &ResourceGraph, description: Option<&str>) -> Result<Self> {
        graph.deployment_order()?;

        let resources = graph
            .resources()
            .map(|node| {
                let depends_on = graph
                    .explicit_dependencies(&node.logical_id)
                    .into_iter()
                    .map(|id| id.to_string())
                    .collect();
                (
                    node.logical_id.to_string(),
                    TemplateResource {
                        resource_type: node.resource_type.clone(),
                        properties: node.properties.clone(),
                        depends_on,
                    },
                )
            })
            .collect::<IndexMap<_, _>>();

        let outputs = graph
            .outputs()
            .map(|output| {
                (
                    output.name.clone(),
                    TemplateOutput {
                        value: output.value.clone(),
                        description: output.description.clone(),
                    },
                )
            })
            .collect::<IndexMap<_, _>>();

        debug!(
            resources = resources.len(),
            outputs = outputs.len(),
            "Synthesized template"
        );

        Ok(Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.map(str::to_string),
            resources,
            outputs,
        })
    }

    /// Look up a resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.get(logical_id)
    }

    /// Resources of one CloudFormation type, in template order
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// YAML rendering
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn render(&self, format: TemplateFormat) -> Result<String> {
        match format {
            TemplateFormat::Json => self.to_json(),
            TemplateFormat::Yaml => self.to_yaml(),
        }
    }

    /// Render and write to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path, format: TemplateFormat) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }
}
