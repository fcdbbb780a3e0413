//! The EC2-with-SSH stack definition.
//!
//! One linear declaration pass:
//!
//! 1. read the SSH source address from the context (fatal if absent)
//! 2. read the bootstrap script (fatal if unreadable)
//! 3. declare Network, Security Policy, Identity, Credential, Compute
//! 4. declare the two outputs
//!
//! Both fatal checks run before the first declaration, so a failed pass
//! never leaves a partial graph behind.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::constructs::compute::PLACEHOLDER_IMAGE_ID;
use crate::constructs::{
    declare_compute, declare_credential, declare_identity, declare_network, declare_outputs,
    declare_security_policy, ComputeProps, ComputeRef, CredentialRef, IdentityRef, Ipv4Cidr,
    NetworkRef, Scope, ScriptPayload, SecurityPolicyRef, StackOutputs,
};
use crate::context::{ContextProviderKind, DeclarationContext, MissingContext};
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::template::Template;

/// Account segment of lookup keys when no account is configured
pub const UNKNOWN_ACCOUNT: &str = "unknown-account";
/// Region segment of lookup keys when no region is configured
pub const UNKNOWN_REGION: &str = "unknown-region";

/// Read the SSH source address from the context.
///
/// Only presence is checked: a missing or empty value fails, anything else
/// (whitespace included) is returned as given.
pub fn validate_input(context: &DeclarationContext, parameter_name: &str) -> Result<String> {
    match context.try_get(parameter_name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::missing_parameter(parameter_name)),
    }
}

/// Require `value` to be an IPv4 CIDR block.
pub fn validate_source_address(value: &str) -> Result<Ipv4Cidr> {
    value.trim().parse()
}

/// Read the first-boot script at `path`, byte for byte.
pub fn load_bootstrap_script(path: &Path) -> Result<ScriptPayload> {
    let bytes = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    ScriptPayload::from_bytes(bytes, path)
}

/// A declared stack
#[derive(Debug, Clone)]
pub struct Ec2WithSshStack {
    name: String,
    description: Option<String>,
    graph: ResourceGraph,
    source_ip: String,
    missing_context: Vec<MissingContext>,
    pub network: NetworkRef,
    pub security_policy: SecurityPolicyRef,
    pub identity: IdentityRef,
    pub credential: CredentialRef,
    pub compute: ComputeRef,
    pub outputs: StackOutputs,
}

impl Ec2WithSshStack {
    /// Run the declaration pass.
    ///
    /// `project_dir` anchors the bootstrap script path.
    pub fn new(config: &Config, context: &DeclarationContext, project_dir: &Path) -> Result<Self> {
        let settings = &config.stack;

        let source_ip = validate_input(context, &settings.ip_parameter)?;
        if settings.strict_source_ip {
            validate_source_address(&source_ip)?;
        }
        let script = load_bootstrap_script(&config.bootstrap_script_path(project_dir))?;

        let mut missing_context = Vec::new();
        let image_id = resolve_image_id(config, context, &mut missing_context);

        let mut graph = ResourceGraph::new();
        let mut scope = Scope::new(&mut graph, &settings.name);

        let network = declare_network(&mut scope, &config.network)?;
        let security_policy = declare_security_policy(&mut scope, &network, &source_ip)?;
        let identity = declare_identity(&mut scope)?;
        let credential = declare_credential(&mut scope, &config.credential)?;
        let compute = declare_compute(
            &mut scope,
            &network,
            &security_policy,
            &identity,
            &credential,
            &script,
            &ComputeProps {
                instance_type: config.compute.instance_type,
                root_volume: config.compute.root_volume.clone(),
            },
            &image_id,
        )?;
        let outputs = declare_outputs(&mut scope, &compute)?;

        info!(
            stack = %settings.name,
            resources = graph.len(),
            missing_context = missing_context.len(),
            "Declared stack"
        );

        Ok(Self {
            name: settings.name.clone(),
            description: settings.description.clone(),
            graph,
            source_ip,
            missing_context,
            network,
            security_policy,
            identity,
            credential,
            compute,
            outputs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// The SSH source address as read from the context
    pub fn source_ip(&self) -> &str {
        &self.source_ip
    }

    /// Lookups answered with a placeholder during this pass
    pub fn missing_context(&self) -> &[MissingContext] {
        &self.missing_context
    }

    pub fn has_missing_context(&self) -> bool {
        !self.missing_context.is_empty()
    }

    /// Synthesize the template
    pub fn template(&self) -> Result<Template> {
        Template::from_graph(&self.graph, self.description.as_deref())
    }
}

/// Image id: configured override, then context, then the placeholder with
/// the lookup recorded as missing.
fn resolve_image_id(
    config: &Config,
    context: &DeclarationContext,
    missing: &mut Vec<MissingContext>,
) -> String {
    if let Some(id) = &config.compute.image.id {
        return id.clone();
    }

    let account = config.stack.account.as_deref().unwrap_or(UNKNOWN_ACCOUNT);
    let region = config.stack.region.as_deref().unwrap_or(UNKNOWN_REGION);
    let query = config.compute.image.query();
    let key = query.context_key(account, region);

    if let Some(id) = context.try_get(&key) {
        return id;
    }

    warn!(key = %key, placeholder = PLACEHOLDER_IMAGE_ID, "Image lookup unresolved");
    missing.push(MissingContext {
        key,
        provider: ContextProviderKind::AmiProvider,
        query,
        account: account.to_string(),
        region: region.to_string(),
    });
    PLACEHOLDER_IMAGE_ID.to_string()
}
