//! Security Policy: a security group admitting SSH from one source address.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::network::NetworkRef;
use super::Scope;
use crate::error::Result;
use crate::graph::{LogicalId, ResourceKind};
use crate::template::intrinsic;

/// SSH port
pub const SSH_PORT: u16 = 22;

/// Group description rendered into the template
pub const GROUP_DESCRIPTION: &str = "Allow SSH access to EC2 instance";

/// IP protocol of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    /// Every protocol (`-1`)
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::All => "-1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ingress rule from an IPv4 peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Source CIDR, forwarded as given
    pub source: String,
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    pub description: String,
}

impl IngressRule {
    /// TCP/22 from `source`
    pub fn ssh_from(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            protocol: Protocol::Tcp,
            from_port: SSH_PORT,
            to_port: SSH_PORT,
            description: "Allow SSH access from specified IP".to_string(),
        }
    }

    fn to_property(&self) -> Value {
        json!({
            "CidrIp": self.source,
            "Description": self.description,
            "FromPort": self.from_port,
            "IpProtocol": self.protocol.as_str(),
            "ToPort": self.to_port,
        })
    }
}

/// Reference to the declared security group
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityPolicyRef {
    pub security_group: LogicalId,
    /// The single ingress rule
    pub ingress: IngressRule,
}

impl SecurityPolicyRef {
    /// `Fn::GetAtt` of the group id, as instances expect it
    pub fn group_id(&self) -> Value {
        intrinsic::get_att(self.security_group.as_str(), "GroupId")
    }
}

/// Declare a security group in `network` with unrestricted egress and a
/// single SSH ingress rule from `source_ip`.
///
/// `source_ip` is not inspected here; see
/// [`validate_source_address`](crate::stack::validate_source_address) for the
/// strict check.
pub fn declare_security_policy(
    scope: &mut Scope<'_>,
    network: &NetworkRef,
    source_ip: &str,
) -> Result<SecurityPolicyRef> {
    let ingress = IngressRule::ssh_from(source_ip);
    let path = ["SecurityGroup", "Resource"];

    let security_group = scope.declare(
        &path,
        ResourceKind::SecurityPolicy,
        "AWS::EC2::SecurityGroup",
        json!({
            "GroupDescription": GROUP_DESCRIPTION,
            "SecurityGroupEgress": [{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": Protocol::All.as_str(),
            }],
            "SecurityGroupIngress": [ingress.to_property()],
            "VpcId": intrinsic::reference(network.vpc.as_str()),
        }),
    )?;

    info!(
        security_group = %security_group,
        source = %ingress.source,
        port = ingress.from_port,
        "Declared security policy"
    );

    Ok(SecurityPolicyRef {
        security_group,
        ingress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::network::{declare_network, NetworkProps};
    use crate::graph::ResourceGraph;

    #[test]
    fn test_single_ssh_ingress_rule() {
        let mut graph = ResourceGraph::new();
        let mut scope = Scope::new(&mut graph, "TestStack");
        let network = declare_network(&mut scope, &NetworkProps::default()).unwrap();
        let policy = declare_security_policy(&mut scope, &network, "198.51.100.0/24").unwrap();

        let sg = graph.get(&policy.security_group).unwrap();
        let ingress = sg.properties["SecurityGroupIngress"].as_array().unwrap();
        assert_eq!(ingress.len(), 1);
        assert_eq!(ingress[0]["CidrIp"], "198.51.100.0/24");
        assert_eq!(ingress[0]["FromPort"], 22);
        assert_eq!(ingress[0]["ToPort"], 22);
        assert_eq!(ingress[0]["IpProtocol"], "tcp");

        let egress = sg.properties["SecurityGroupEgress"].as_array().unwrap();
        assert_eq!(egress[0]["IpProtocol"], "-1");
        assert_eq!(egress[0]["CidrIp"], "0.0.0.0/0");
        assert!(graph.dependencies(&policy.security_group).contains(&network.vpc));
    }

    #[test]
    fn test_source_is_forwarded_uninspected() {
        let mut graph = ResourceGraph::new();
        let mut scope = Scope::new(&mut graph, "TestStack");
        let network = declare_network(&mut scope, &NetworkProps::default()).unwrap();
        let policy = declare_security_policy(&mut scope, &network, "not-an-address").unwrap();
        assert_eq!(policy.ingress.source, "not-an-address");
    }
}
