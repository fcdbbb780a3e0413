//! Stack outputs, both derived from the instance.

use tracing::debug;

use super::compute::ComputeRef;
use super::Scope;
use crate::error::Result;
use crate::template::intrinsic;

/// Output carrying the instance id
pub const INSTANCE_ID: &str = "instanceId";
/// Output carrying the instance's public address
pub const INSTANCE_PUBLIC_IP: &str = "instancePublicIp";

/// Names of the declared outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutputs {
    pub instance_id: String,
    pub instance_public_ip: String,
}

/// Declare `instanceId` and `instancePublicIp`.
pub fn declare_outputs(scope: &mut Scope<'_>, compute: &ComputeRef) -> Result<StackOutputs> {
    let graph = scope.graph_mut();

    graph.add_output(
        INSTANCE_ID,
        intrinsic::reference(compute.instance.as_str()),
        Some("The ID of the EC2 instance"),
    )?;
    graph.add_output(
        INSTANCE_PUBLIC_IP,
        intrinsic::get_att(compute.instance.as_str(), "PublicIp"),
        Some("The public IP address of the EC2 instance"),
    )?;

    debug!(instance = %compute.instance, "Declared outputs");

    Ok(StackOutputs {
        instance_id: INSTANCE_ID.to_string(),
        instance_public_ip: INSTANCE_PUBLIC_IP.to_string(),
    })
}
