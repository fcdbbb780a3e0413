//! Network: a VPC with a single public subnet in one availability zone.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::peer::Ipv4Cidr;
use super::Scope;
use crate::error::{Error, Result};
use crate::graph::{LogicalId, ResourceKind};
use crate::template::intrinsic;

/// Network layout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkProps {
    /// VPC address range
    pub cidr: String,
    /// Name of the public subnet group
    pub subnet_name: String,
    /// Prefix length of the public subnet
    pub cidr_mask: u8,
}

impl Default for NetworkProps {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            subnet_name: "Public".to_string(),
            cidr_mask: 24,
        }
    }
}

impl NetworkProps {
    /// CIDR of the single public subnet: the first `/cidr_mask` of the VPC range.
    pub fn subnet_cidr(&self) -> Result<Ipv4Cidr> {
        let vpc = self.cidr.parse::<Ipv4Cidr>().map_err(|e| {
            let message = match e {
                Error::InvalidSourceAddress { message, .. } => message,
                other => other.to_string(),
            };
            Error::invalid_config("network.cidr", message)
        })?;
        vpc.subnet(self.cidr_mask, 0).ok_or_else(|| {
            Error::invalid_config(
                "network.cidr_mask",
                format!(
                    "/{} subnet does not fit inside VPC range {}",
                    self.cidr_mask, self.cidr
                ),
            )
        })
    }
}

/// Reference to the declared network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRef {
    pub vpc: LogicalId,
    pub public_subnet: LogicalId,
    pub route_table: LogicalId,
    /// The subnet's default route; instances depend on it for outbound access
    pub default_route: LogicalId,
    pub internet_gateway: LogicalId,
    /// Availability zone of the public subnet
    pub availability_zone: Value,
}

/// Declare the VPC, its internet gateway, and one public subnet.
pub fn declare_network(scope: &mut Scope<'_>, props: &NetworkProps) -> Result<NetworkRef> {
    let subnet_cidr = props.subnet_cidr()?;
    let availability_zone = intrinsic::select(0, intrinsic::get_azs());
    let subnet_group = format!("{}Subnet1", props.subnet_name);

    let vpc = scope.declare(
        &["Vpc", "Resource"],
        ResourceKind::Network,
        "AWS::EC2::VPC",
        json!({
            "CidrBlock": props.cidr,
            "EnableDnsHostnames": true,
            "EnableDnsSupport": true,
            "InstanceTenancy": "default",
            "Tags": scope.name_tag(&["Vpc"]),
        }),
    )?;

    let internet_gateway = scope.declare(
        &["Vpc", "IGW"],
        ResourceKind::Network,
        "AWS::EC2::InternetGateway",
        json!({ "Tags": scope.name_tag(&["Vpc"]) }),
    )?;

    let gateway_attachment = scope.declare(
        &["Vpc", "VPCGW"],
        ResourceKind::Network,
        "AWS::EC2::VPCGatewayAttachment",
        json!({
            "InternetGatewayId": intrinsic::reference(internet_gateway.as_str()),
            "VpcId": intrinsic::reference(vpc.as_str()),
        }),
    )?;

    let subnet_name_tag = format!("{}/Vpc/{}", scope.stack_name(), subnet_group);
    let public_subnet = scope.declare(
        &["Vpc", subnet_group.as_str(), "Subnet"],
        ResourceKind::Network,
        "AWS::EC2::Subnet",
        json!({
            "AvailabilityZone": availability_zone.clone(),
            "CidrBlock": subnet_cidr.to_string(),
            "MapPublicIpOnLaunch": true,
            "Tags": [
                { "Key": "aws-cdk:subnet-name", "Value": props.subnet_name },
                { "Key": "aws-cdk:subnet-type", "Value": "Public" },
                { "Key": "Name", "Value": subnet_name_tag },
            ],
            "VpcId": intrinsic::reference(vpc.as_str()),
        }),
    )?;

    let route_table = scope.declare(
        &["Vpc", subnet_group.as_str(), "RouteTable"],
        ResourceKind::Network,
        "AWS::EC2::RouteTable",
        json!({
            "Tags": [{ "Key": "Name", "Value": subnet_name_tag }],
            "VpcId": intrinsic::reference(vpc.as_str()),
        }),
    )?;

    scope.declare(
        &["Vpc", subnet_group.as_str(), "RouteTableAssociation"],
        ResourceKind::Network,
        "AWS::EC2::SubnetRouteTableAssociation",
        json!({
            "RouteTableId": intrinsic::reference(route_table.as_str()),
            "SubnetId": intrinsic::reference(public_subnet.as_str()),
        }),
    )?;

    let default_route = scope.declare(
        &["Vpc", subnet_group.as_str(), "DefaultRoute"],
        ResourceKind::Network,
        "AWS::EC2::Route",
        json!({
            "DestinationCidrBlock": "0.0.0.0/0",
            "GatewayId": intrinsic::reference(internet_gateway.as_str()),
            "RouteTableId": intrinsic::reference(route_table.as_str()),
        }),
    )?;
    // The route is only usable once the gateway is attached to the VPC.
    scope
        .graph_mut()
        .depends_on(&default_route, &gateway_attachment)?;

    info!(
        vpc = %vpc,
        subnet = %public_subnet,
        cidr = %props.cidr,
        subnet_cidr = %subnet_cidr,
        "Declared network"
    );

    Ok(NetworkRef {
        vpc,
        public_subnet,
        route_table,
        default_route,
        internet_gateway,
        availability_zone,
    })
}
