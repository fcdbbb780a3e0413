//! Compute: the EC2 instance, declared last.
//!
//! [`declare_compute`] takes a reference to each of the four components it
//! depends on, so the type system keeps it from running early.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::credential::CredentialRef;
use super::identity::IdentityRef;
use super::network::NetworkRef;
use super::security::SecurityPolicyRef;
use super::Scope;
use crate::error::{Error, Result};
use crate::graph::{LogicalId, ResourceKind};
use crate::template::intrinsic;

/// Image id used while the image lookup is unresolved
pub const PLACEHOLDER_IMAGE_ID: &str = "ami-1234";

// ============================================================================
// Instance Types
// ============================================================================

/// Instance family and generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceClass {
    T2,
    T3,
    T3a,
    T4g,
    M5,
    M6i,
    M7i,
    C5,
    C6i,
    R5,
    R6i,
}

impl InstanceClass {
    pub const ALL: &'static [InstanceClass] = &[
        InstanceClass::T2,
        InstanceClass::T3,
        InstanceClass::T3a,
        InstanceClass::T4g,
        InstanceClass::M5,
        InstanceClass::M6i,
        InstanceClass::M7i,
        InstanceClass::C5,
        InstanceClass::C6i,
        InstanceClass::R5,
        InstanceClass::R6i,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceClass::T2 => "t2",
            InstanceClass::T3 => "t3",
            InstanceClass::T3a => "t3a",
            InstanceClass::T4g => "t4g",
            InstanceClass::M5 => "m5",
            InstanceClass::M6i => "m6i",
            InstanceClass::M7i => "m7i",
            InstanceClass::C5 => "c5",
            InstanceClass::C6i => "c6i",
            InstanceClass::R5 => "r5",
            InstanceClass::R6i => "r6i",
        }
    }

    /// Burstable classes only come in the small sizes
    fn is_burstable(&self) -> bool {
        matches!(
            self,
            InstanceClass::T2 | InstanceClass::T3 | InstanceClass::T3a | InstanceClass::T4g
        )
    }
}

/// Instance size within a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
    Xlarge,
    Xlarge2,
    Xlarge4,
    Xlarge8,
}

impl InstanceSize {
    pub const ALL: &'static [InstanceSize] = &[
        InstanceSize::Nano,
        InstanceSize::Micro,
        InstanceSize::Small,
        InstanceSize::Medium,
        InstanceSize::Large,
        InstanceSize::Xlarge,
        InstanceSize::Xlarge2,
        InstanceSize::Xlarge4,
        InstanceSize::Xlarge8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceSize::Nano => "nano",
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
            InstanceSize::Xlarge => "xlarge",
            InstanceSize::Xlarge2 => "2xlarge",
            InstanceSize::Xlarge4 => "4xlarge",
            InstanceSize::Xlarge8 => "8xlarge",
        }
    }
}

/// An instance type such as `t3.xlarge`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    pub fn new(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }
}

impl Default for InstanceType {
    fn default() -> Self {
        Self::new(InstanceClass::T3, InstanceSize::Xlarge)
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class.as_str(), self.size.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: String| Error::invalid_config("compute.instance_type", message);

        let (class, size) = s
            .trim()
            .to_lowercase()
            .split_once('.')
            .map(|(c, z)| (c.to_string(), z.to_string()))
            .ok_or_else(|| invalid(format!("'{}' is not of the form <class>.<size>", s)))?;

        let class = InstanceClass::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == class)
            .ok_or_else(|| invalid(format!("unsupported instance class '{}'", class)))?;
        let size = InstanceSize::ALL
            .iter()
            .copied()
            .find(|z| z.as_str() == size)
            .ok_or_else(|| invalid(format!("unsupported instance size '{}'", size)))?;

        if class.is_burstable() && size > InstanceSize::Xlarge2 {
            return Err(invalid(format!(
                "{} is not offered in size {}",
                class.as_str(),
                size.as_str()
            )));
        }

        Ok(Self { class, size })
    }
}

impl TryFrom<String> for InstanceType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InstanceType> for String {
    fn from(value: InstanceType) -> Self {
        value.to_string()
    }
}

// ============================================================================
// Image Selection
// ============================================================================

/// Filter selecting the newest machine image matching a name pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageQuery {
    /// Image name pattern, `*` wildcards allowed
    pub name_pattern: String,
    /// Trusted image owners
    pub owners: Vec<String>,
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self {
            name_pattern: "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-server-*".to_string(),
            owners: vec!["099720109477".to_string()],
        }
    }
}

impl ImageQuery {
    /// Key under which the resolved image id is stored in the context.
    pub fn context_key(&self, account: &str, region: &str) -> String {
        let mut key = format!(
            "ami:account={}:filters.image-type.0=machine:filters.name.0={}:filters.state.0=available",
            account, self.name_pattern
        );
        for (i, owner) in self.owners.iter().enumerate() {
            key.push_str(&format!(":owners.{}={}", i, owner));
        }
        key.push_str(&format!(":region={}", region));
        key
    }
}

// ============================================================================
// Storage and Payload
// ============================================================================

/// An EBS-backed block device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockDevice {
    pub device_name: String,
    pub size_gib: u32,
}

impl Default for BlockDevice {
    fn default() -> Self {
        Self {
            device_name: "/dev/sda1".to_string(),
            size_gib: 125,
        }
    }
}

/// First-boot script, forwarded byte for byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPayload(String);

impl ScriptPayload {
    /// Wrap script bytes. User data travels as template text, so it must be
    /// UTF-8; anything else is reported as unreadable.
    pub fn from_bytes(bytes: Vec<u8>, path: &Path) -> Result<Self> {
        String::from_utf8(bytes).map(Self).map_err(|e| {
            Error::file_read(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.utf8_error()),
            )
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ScriptPayload {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Declaration
// ============================================================================

/// Fixed instance settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeProps {
    pub instance_type: InstanceType,
    pub root_volume: BlockDevice,
}

/// Reference to the declared instance
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeRef {
    pub instance: LogicalId,
    pub instance_profile: LogicalId,
}

/// Declare the instance profile and the instance in the public subnet.
#[allow(clippy::too_many_arguments)]
pub fn declare_compute(
    scope: &mut Scope<'_>,
    network: &NetworkRef,
    policy: &SecurityPolicyRef,
    identity: &IdentityRef,
    credential: &CredentialRef,
    script: &ScriptPayload,
    props: &ComputeProps,
    image_id: &str,
) -> Result<ComputeRef> {
    let instance_profile = scope.declare(
        &["Instance", "InstanceProfile"],
        ResourceKind::Compute,
        "AWS::IAM::InstanceProfile",
        json!({ "Roles": [intrinsic::reference(identity.role.as_str())] }),
    )?;

    let instance = scope.declare(
        &["Instance", "Resource"],
        ResourceKind::Compute,
        "AWS::EC2::Instance",
        json!({
            "AvailabilityZone": network.availability_zone.clone(),
            "BlockDeviceMappings": [{
                "DeviceName": props.root_volume.device_name,
                "Ebs": { "VolumeSize": props.root_volume.size_gib },
            }],
            "IamInstanceProfile": intrinsic::reference(instance_profile.as_str()),
            "ImageId": image_id,
            "InstanceType": props.instance_type.to_string(),
            "KeyName": credential.key_name_value(),
            "SecurityGroupIds": [policy.group_id()],
            "SubnetId": intrinsic::reference(network.public_subnet.as_str()),
            "Tags": scope.name_tag(&["Instance"]),
            "UserData": intrinsic::base64(script.as_str()),
        }),
    )?;

    // The role must exist before the instance boots with its profile, and the
    // instance needs a route out for the first-boot script.
    let graph = scope.graph_mut();
    graph.depends_on(&instance, &identity.role)?;
    graph.depends_on(&instance, &network.default_route)?;

    info!(
        instance = %instance,
        instance_type = %props.instance_type,
        image_id,
        key_name = credential.key_name(),
        user_data_bytes = script.len(),
        "Declared compute"
    );

    Ok(ComputeRef {
        instance,
        instance_profile,
    })
}
