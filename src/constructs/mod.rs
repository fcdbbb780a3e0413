//! Resource constructs.
//!
//! Each construct declares one stack component into the [`ResourceGraph`]
//! and hands back a typed reference that later constructs take as input.
//! Because a reference can only be obtained by declaring its component,
//! Compute cannot be declared before the four components it depends on.
//!
//! ## Components
//!
//! | Construct | Reference | CloudFormation resources |
//! |-----------|-----------|--------------------------|
//! | [`network`] | [`NetworkRef`] | VPC, subnet, route table, internet gateway, default route |
//! | [`security`] | [`SecurityPolicyRef`] | security group with inline rules |
//! | [`identity`] | [`IdentityRef`] | IAM role |
//! | [`credential`] | [`CredentialRef`] | key pair, or nothing for a named reference |
//! | [`compute`] | [`ComputeRef`] | instance profile, instance |
//! | [`outputs`] | [`StackOutputs`] | two template outputs |

pub mod compute;
pub mod credential;
pub mod identity;
pub mod network;
pub mod outputs;
pub mod peer;
pub mod security;

pub use compute::{
    declare_compute, BlockDevice, ComputeProps, ComputeRef, ImageQuery, InstanceClass,
    InstanceSize, InstanceType, ScriptPayload,
};
pub use credential::{declare_credential, CredentialMode, CredentialRef};
pub use identity::{declare_identity, IdentityRef};
pub use network::{declare_network, NetworkProps, NetworkRef};
pub use outputs::{declare_outputs, StackOutputs};
pub use peer::Ipv4Cidr;
pub use security::{declare_security_policy, IngressRule, Protocol, SecurityPolicyRef};

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::graph::{LogicalId, ResourceGraph, ResourceKind};

/// The stack a construct declares into.
pub struct Scope<'a> {
    graph: &'a mut ResourceGraph,
    stack_name: &'a str,
}

impl<'a> Scope<'a> {
    pub fn new(graph: &'a mut ResourceGraph, stack_name: &'a str) -> Self {
        Self { graph, stack_name }
    }

    pub fn stack_name(&self) -> &str {
        self.stack_name
    }

    pub fn graph_mut(&mut self) -> &mut ResourceGraph {
        &mut *self.graph
    }

    /// Declare a resource at `path` inside this stack.
    pub fn declare(
        &mut self,
        path: &[&str],
        kind: ResourceKind,
        resource_type: &str,
        properties: Value,
    ) -> Result<LogicalId> {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.graph.declare(path, kind, resource_type, properties)
    }

    /// `Name` tag value for a construct path: `<stack>/<path>`
    pub fn name_tag(&self, path: &[&str]) -> Value {
        json!([{ "Key": "Name", "Value": format!("{}/{}", self.stack_name, path.join("/")) }])
    }
}
