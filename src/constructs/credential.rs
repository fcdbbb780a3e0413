//! Credential: the SSH key pair attached to the instance.
//!
//! Two modes, chosen by configuration:
//!
//! - `inline`: import literal public-key material as a new key pair
//! - `reference`: bind to a key pair that already exists in the account,
//!   managed outside this stack; nothing is declared

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::Scope;
use crate::error::{Error, Result};
use crate::graph::{LogicalId, ResourceKind};
use crate::template::intrinsic;

/// Construct id of the imported key pair
pub const KEY_PAIR_ID: &str = "ec2WithSSH-KeyPair";

/// Key formats accepted as inline public-key material
const KEY_PREFIXES: &[&str] = &[
    "ssh-ed25519 ",
    "ssh-rsa ",
    "ecdsa-sha2-nistp256 ",
    "ecdsa-sha2-nistp384 ",
    "ecdsa-sha2-nistp521 ",
];

/// How the stack obtains its key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialMode {
    /// Import the given OpenSSH public key
    Inline {
        public_key: String,
        /// Key pair name; derived from the stack name when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_name: Option<String>,
    },
    /// Use an existing key pair by name
    Reference { name: String },
}

impl Default for CredentialMode {
    fn default() -> Self {
        Self::Reference {
            name: "ec2-ssh-stack".to_string(),
        }
    }
}

impl CredentialMode {
    /// Check the mode's data without declaring anything.
    pub fn validate(&self) -> Result<()> {
        match self {
            CredentialMode::Inline { public_key, .. } => {
                let key = public_key.trim();
                if key.is_empty() {
                    return Err(Error::invalid_config(
                        "credential.public_key",
                        "public key material is empty",
                    ));
                }
                if !KEY_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
                    return Err(Error::invalid_config(
                        "credential.public_key",
                        "expected an OpenSSH public key (ssh-ed25519, ssh-rsa or ecdsa-sha2-*)",
                    ));
                }
                Ok(())
            }
            CredentialMode::Reference { name } => {
                if name.trim().is_empty() {
                    return Err(Error::invalid_config(
                        "credential.name",
                        "key pair name is empty",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Reference to the instance's key pair
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialRef {
    /// A key pair declared by this stack
    Declared { key_pair: LogicalId, key_name: String },
    /// A pre-existing key pair
    Named(String),
}

impl CredentialRef {
    /// Value for the instance's `KeyName` property
    pub fn key_name_value(&self) -> Value {
        match self {
            // Ref of AWS::EC2::KeyPair yields the key name
            CredentialRef::Declared { key_pair, .. } => intrinsic::reference(key_pair.as_str()),
            CredentialRef::Named(name) => Value::String(name.clone()),
        }
    }

    pub fn key_name(&self) -> &str {
        match self {
            CredentialRef::Declared { key_name, .. } => key_name,
            CredentialRef::Named(name) => name,
        }
    }

    /// Whether this stack owns the key pair resource
    pub fn is_declared(&self) -> bool {
        matches!(self, CredentialRef::Declared { .. })
    }
}

/// Declare or reference the key pair.
pub fn declare_credential(scope: &mut Scope<'_>, mode: &CredentialMode) -> Result<CredentialRef> {
    mode.validate()?;

    match mode {
        CredentialMode::Inline {
            public_key,
            key_name,
        } => {
            let key_name = key_name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", scope.stack_name(), KEY_PAIR_ID));
            let key_pair = scope.declare(
                &[KEY_PAIR_ID, "Resource"],
                ResourceKind::Credential,
                "AWS::EC2::KeyPair",
                json!({
                    "KeyName": key_name,
                    "PublicKeyMaterial": public_key.trim(),
                }),
            )?;
            info!(key_pair = %key_pair, key_name = %key_name, "Declared inline key pair");
            Ok(CredentialRef::Declared { key_pair, key_name })
        }
        CredentialMode::Reference { name } => {
            info!(key_name = %name, "Referencing existing key pair");
            Ok(CredentialRef::Named(name.clone()))
        }
    }
}
