//! Identity: the IAM role the instance assumes.

use serde_json::json;
use tracing::info;

use super::Scope;
use crate::error::Result;
use crate::graph::{LogicalId, ResourceKind};
use crate::template::intrinsic;

/// Service principal trusted to assume the role
pub const SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";

/// Managed policy granting Session Manager access
pub const SSM_MANAGED_POLICY: &str = "AmazonSSMManagedInstanceCore";

/// Reference to the declared role
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRef {
    pub role: LogicalId,
}

/// Declare a role trusted by EC2 with the Session Manager managed policy.
pub fn declare_identity(scope: &mut Scope<'_>) -> Result<IdentityRef> {
    let role = scope.declare(
        &["Role", "Resource"],
        ResourceKind::Identity,
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": SERVICE_PRINCIPAL },
                }],
                "Version": "2012-10-17",
            },
            "ManagedPolicyArns": [intrinsic::managed_policy_arn(SSM_MANAGED_POLICY)],
        }),
    )?;

    info!(role = %role, principal = SERVICE_PRINCIPAL, "Declared identity");

    Ok(IdentityRef { role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceGraph;

    #[test]
    fn test_role_trusts_ec2_and_attaches_ssm() {
        let mut graph = ResourceGraph::new();
        let mut scope = Scope::new(&mut graph, "TestStack");
        let identity = declare_identity(&mut scope).unwrap();

        let role = graph.get(&identity.role).unwrap();
        assert_eq!(role.resource_type, "AWS::IAM::Role");
        assert_eq!(
            role.properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            SERVICE_PRINCIPAL
        );
        let arns = role.properties["ManagedPolicyArns"].to_string();
        assert!(arns.contains(":iam::aws:policy/AmazonSSMManagedInstanceCore"));
        assert!(graph.dependencies(&identity.role).is_empty());
    }
}
