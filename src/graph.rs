//! Resource Graph
//!
//! The explicit graph-builder the stack definition writes into. Each
//! declaration becomes a node; edges run from a dependency to its dependent
//! and come from two places:
//!
//! - references (`Ref` / `Fn::GetAtt`) found in a resource's properties
//! - explicit `DependsOn` edges added with [`ResourceGraph::depends_on`]
//!
//! The graph keeps declaration order separately from the topological order so
//! tests can assert on the order the stack definition declared things.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::template::intrinsic;

/// Identifier of a resource inside the synthesized template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derive a logical id from a construct path.
    ///
    /// Path components are stripped to ASCII alphanumerics and concatenated,
    /// then suffixed with the first eight upper-case hex digits of the MD5 of
    /// the `/`-joined path, so two constructs with the same readable prefix
    /// never collide.
    pub fn from_path(path: &[&str]) -> Self {
        let readable: String = path
            .iter()
            .filter(|component| **component != "Default")
            .flat_map(|component| component.chars().filter(char::is_ascii_alphanumeric))
            .collect();
        let digest = format!("{:x}", md5::compute(path.join("/")));
        Self(format!("{}{}", readable, digest[..8].to_uppercase()))
    }

    /// Wrap an already-formed id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which component of the stack a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    SecurityPolicy,
    Identity,
    Credential,
    Compute,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::SecurityPolicy => write!(f, "security_policy"),
            ResourceKind::Identity => write!(f, "identity"),
            ResourceKind::Credential => write!(f, "credential"),
            ResourceKind::Compute => write!(f, "compute"),
        }
    }
}

/// A declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Logical id in the template
    pub logical_id: LogicalId,
    /// Construct path the id was derived from
    pub path: String,
    /// CloudFormation type, e.g. `AWS::EC2::VPC`
    pub resource_type: String,
    /// Owning stack component
    pub kind: ResourceKind,
    /// Resource properties
    pub properties: Map<String, Value>,
    /// Declaration sequence number
    pub sequence: u64,
}

/// How an edge was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Implied by a `Ref` or `Fn::GetAtt` in the dependent's properties
    Reference,
    /// Rendered as `DependsOn` in the template
    Explicit,
}

/// A named stack output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackOutput {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
    /// Resources the value is derived from
    pub sources: Vec<LogicalId>,
}

/// The resource graph for one declaration pass
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: DiGraph<ResourceNode, DependencyType>,
    node_indices: HashMap<LogicalId, NodeIndex>,
    declaration_order: Vec<NodeIndex>,
    outputs: IndexMap<String, StackOutput>,
    sequence_counter: u64,
}

impl ResourceGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource.
    ///
    /// Every logical id referenced from `properties` must already be declared;
    /// a reference edge is added for each one.
    pub fn declare(
        &mut self,
        path: &[&str],
        kind: ResourceKind,
        resource_type: &str,
        properties: Map<String, Value>,
    ) -> Result<LogicalId> {
        let logical_id = LogicalId::from_path(path);
        if self.node_indices.contains_key(&logical_id) {
            return Err(Error::DuplicateResource(logical_id.to_string()));
        }

        let references = intrinsic::referenced_ids(&Value::Object(properties.clone()));
        let mut reference_indices = Vec::with_capacity(references.len());
        for id in &references {
            let idx = self
                .node_indices
                .get(&LogicalId::new(id.as_str()))
                .ok_or_else(|| Error::UnknownResource(id.clone()))?;
            reference_indices.push(*idx);
        }

        let node = ResourceNode {
            logical_id: logical_id.clone(),
            path: path.join("/"),
            resource_type: resource_type.to_string(),
            kind,
            properties,
            sequence: self.sequence_counter,
        };
        self.sequence_counter += 1;

        let idx = self.graph.add_node(node);
        self.node_indices.insert(logical_id.clone(), idx);
        self.declaration_order.push(idx);

        for from in reference_indices {
            self.graph.add_edge(from, idx, DependencyType::Reference);
        }

        debug!(
            logical_id = %logical_id,
            resource_type,
            %kind,
            "Declared resource"
        );

        Ok(logical_id)
    }

    /// Add an explicit `DependsOn` edge: `dependent` is created after `dependency`.
    pub fn depends_on(&mut self, dependent: &LogicalId, dependency: &LogicalId) -> Result<()> {
        let to = self.index_of(dependent)?;
        let from = self.index_of(dependency)?;
        self.graph.add_edge(from, to, DependencyType::Explicit);
        Ok(())
    }

    /// Declare a named output. The value's references must be declared.
    pub fn add_output(
        &mut self,
        name: &str,
        value: Value,
        description: Option<&str>,
    ) -> Result<()> {
        if self.outputs.contains_key(name) {
            return Err(Error::DuplicateOutput(name.to_string()));
        }
        let mut sources = Vec::new();
        for id in intrinsic::referenced_ids(&value) {
            let id = LogicalId::new(id);
            self.index_of(&id)?;
            sources.push(id);
        }
        self.outputs.insert(
            name.to_string(),
            StackOutput {
                name: name.to_string(),
                value,
                description: description.map(str::to_string),
                sources,
            },
        );
        Ok(())
    }

    fn index_of(&self, id: &LogicalId) -> Result<NodeIndex> {
        self.node_indices
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownResource(id.to_string()))
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.declaration_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declaration_order.is_empty()
    }

    /// Look up a resource by logical id
    pub fn get(&self, id: &LogicalId) -> Option<&ResourceNode> {
        self.node_indices
            .get(id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &ResourceNode> {
        self.declaration_order
            .iter()
            .filter_map(|idx| self.graph.node_weight(*idx))
    }

    /// Resources of one CloudFormation type, in declaration order
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.resources()
            .filter(move |node| node.resource_type == resource_type)
    }

    /// Logical ids in declaration order
    pub fn declaration_order(&self) -> Vec<LogicalId> {
        self.resources().map(|n| n.logical_id.clone()).collect()
    }

    /// The component kind of each declaration, consecutive repeats collapsed
    pub fn kinds_in_order(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = Vec::new();
        for node in self.resources() {
            if kinds.last() != Some(&node.kind) {
                kinds.push(node.kind);
            }
        }
        kinds
    }

    /// Outputs in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &StackOutput> {
        self.outputs.values()
    }

    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.outputs.get(name)
    }

    /// Check for dependency cycles
    pub fn has_cycles(&self) -> bool {
        tarjan_scc(&self.graph).iter().any(|scc| scc.len() > 1)
    }

    /// Topological order in which the engine may create resources
    pub fn deployment_order(&self) -> Result<Vec<LogicalId>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).map(|n| n.logical_id.clone()))
                .collect()),
            Err(cycle) => {
                let id = self
                    .graph
                    .node_weight(cycle.node_id())
                    .map(|n| n.logical_id.to_string())
                    .unwrap_or_default();
                Err(Error::DependencyCycle(format!(
                    "cannot order resources, cycle through '{}'",
                    id
                )))
            }
        }
    }

    /// Explicit `DependsOn` targets of a resource, in declaration order
    pub fn explicit_dependencies(&self, id: &LogicalId) -> Vec<LogicalId> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<&ResourceNode> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|edge| *edge.weight() == DependencyType::Explicit)
            .filter_map(|edge| self.graph.node_weight(edge.source()))
            .collect();
        deps.sort_by_key(|n| n.sequence);
        deps.into_iter().map(|n| n.logical_id.clone()).collect()
    }

    /// All resources a resource depends on, direct and transitive
    pub fn dependencies(&self, id: &LogicalId) -> HashSet<LogicalId> {
        let mut dependencies = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start_idx) = self.node_indices.get(id) {
            queue.push_back(start_idx);

            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, Direction::Incoming) {
                    if let Some(node) = self.graph.node_weight(neighbor) {
                        if dependencies.insert(node.logical_id.clone()) {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }

        dependencies
    }

    /// Component kinds a resource depends on, direct and transitive
    pub fn dependency_kinds(&self, id: &LogicalId) -> HashSet<ResourceKind> {
        self.dependencies(id)
            .iter()
            .filter_map(|dep| self.get(dep).map(|n| n.kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_logical_id_is_readable_and_hashed() {
        let id = LogicalId::from_path(&["Vpc", "PublicSubnet1", "Subnet"]);
        assert!(id.as_str().starts_with("VpcPublicSubnet1Subnet"));
        assert_eq!(id.as_str().len(), "VpcPublicSubnet1Subnet".len() + 8);
        assert_eq!(id, LogicalId::from_path(&["Vpc", "PublicSubnet1", "Subnet"]));
    }

    #[test]
    fn test_logical_id_strips_punctuation() {
        let id = LogicalId::from_path(&["ec2WithSSH-KeyPair"]);
        assert!(id.as_str().starts_with("ec2WithSSHKeyPair"));
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_declare_adds_reference_edges() {
        let mut graph = ResourceGraph::new();
        let vpc = graph
            .declare(&["Vpc", "Resource"], ResourceKind::Network, "AWS::EC2::VPC", Map::new())
            .unwrap();
        let sg = graph
            .declare(
                &["SecurityGroup", "Resource"],
                ResourceKind::SecurityPolicy,
                "AWS::EC2::SecurityGroup",
                props(json!({ "VpcId": intrinsic::reference(vpc.as_str()) })),
            )
            .unwrap();

        assert!(graph.dependencies(&sg).contains(&vpc));
        assert!(graph.explicit_dependencies(&sg).is_empty());
        assert_eq!(graph.deployment_order().unwrap(), vec![vpc, sg]);
    }

    #[test]
    fn test_declare_rejects_unknown_reference() {
        let mut graph = ResourceGraph::new();
        let err = graph
            .declare(
                &["SecurityGroup"],
                ResourceKind::SecurityPolicy,
                "AWS::EC2::SecurityGroup",
                props(json!({ "VpcId": intrinsic::reference("Missing") })),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResource(id) if id == "Missing"));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_declare_rejects_duplicates() {
        let mut graph = ResourceGraph::new();
        graph
            .declare(&["Vpc"], ResourceKind::Network, "AWS::EC2::VPC", Map::new())
            .unwrap();
        let err = graph
            .declare(&["Vpc"], ResourceKind::Network, "AWS::EC2::VPC", Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(_)));
    }

    #[test]
    fn test_explicit_cycle_is_reported() {
        let mut graph = ResourceGraph::new();
        let a = graph
            .declare(&["A"], ResourceKind::Network, "AWS::EC2::VPC", Map::new())
            .unwrap();
        let b = graph
            .declare(
                &["B"],
                ResourceKind::Network,
                "AWS::EC2::Subnet",
                props(json!({ "VpcId": intrinsic::reference(a.as_str()) })),
            )
            .unwrap();
        graph.depends_on(&a, &b).unwrap();

        assert!(graph.has_cycles());
        assert!(matches!(
            graph.deployment_order(),
            Err(Error::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_outputs_track_sources() {
        let mut graph = ResourceGraph::new();
        let instance = graph
            .declare(&["Instance"], ResourceKind::Compute, "AWS::EC2::Instance", Map::new())
            .unwrap();
        graph
            .add_output(
                "instanceId",
                intrinsic::reference(instance.as_str()),
                Some("The ID of the EC2 instance"),
            )
            .unwrap();

        let output = graph.output("instanceId").unwrap();
        assert_eq!(output.sources, vec![instance]);
        assert!(matches!(
            graph.add_output("instanceId", Value::Null, None),
            Err(Error::DuplicateOutput(_))
        ));
    }

    #[test]
    fn test_kinds_in_order_collapses_runs() {
        let mut graph = ResourceGraph::new();
        graph
            .declare(&["Vpc"], ResourceKind::Network, "AWS::EC2::VPC", Map::new())
            .unwrap();
        graph
            .declare(&["Igw"], ResourceKind::Network, "AWS::EC2::InternetGateway", Map::new())
            .unwrap();
        graph
            .declare(&["Role"], ResourceKind::Identity, "AWS::IAM::Role", Map::new())
            .unwrap();
        assert_eq!(
            graph.kinds_in_order(),
            vec![ResourceKind::Network, ResourceKind::Identity]
        );
    }
}
