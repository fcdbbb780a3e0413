//! Configuration module for ec2-ssh-stack
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/ec2-ssh-stack/config.toml)
//! - User configuration (~/.ec2-ssh-stack.toml)
//! - Project configuration (./ec2-ssh-stack.toml)
//! - Environment variables
//! - Command-line arguments
//!
//! Files are merged key by key, so a project file only needs the values it
//! changes. The `credential` table is the exception: it is replaced whole
//! since its fields depend on its `mode`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::constructs::{BlockDevice, CredentialMode, ImageQuery, InstanceType, NetworkProps};
use crate::context::DeclarationContext;
use crate::logging::LoggingConfig;

/// Environment variable naming an extra config file
pub const CONFIG_ENV: &str = "EC2_SSH_STACK_CONFIG";

/// Largest root volume EBS accepts, in GiB
const MAX_VOLUME_GIB: u32 = 16_384;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stack identity and input parameter
    pub stack: StackSettings,

    /// Network layout
    pub network: NetworkProps,

    /// Instance settings
    pub compute: ComputeSettings,

    /// Key pair mode
    pub credential: CredentialMode,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Context entries, lowest precedence
    pub context: DeclarationContext,

    /// Ignored environment overrides, reported once logging is up
    #[serde(skip)]
    env_warnings: Vec<String>,
}

/// Stack-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Stack name, also used as the `Name` tag prefix
    pub name: String,

    /// Template description
    pub description: Option<String>,

    /// Target account; used for image lookups
    pub account: Option<String>,

    /// Target region; used for image lookups
    pub region: Option<String>,

    /// Context key holding the SSH source address
    pub ip_parameter: String,

    /// Require the source address to be an IPv4 CIDR block
    pub strict_source_ip: bool,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: "Ec2WithSSHStack".to_string(),
            description: Some(
                "EC2 instance reachable over SSH from a single source address".to_string(),
            ),
            account: None,
            region: None,
            ip_parameter: "myIp".to_string(),
            strict_source_ip: false,
        }
    }
}

/// Machine image selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Image name pattern
    pub name_pattern: String,

    /// Trusted owners
    pub owners: Vec<String>,

    /// Fixed image id; skips the lookup entirely
    pub id: Option<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        let query = ImageQuery::default();
        Self {
            name_pattern: query.name_pattern,
            owners: query.owners,
            id: None,
        }
    }
}

impl ImageSettings {
    pub fn query(&self) -> ImageQuery {
        ImageQuery {
            name_pattern: self.name_pattern.clone(),
            owners: self.owners.clone(),
        }
    }
}

/// Instance settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    pub instance_type: InstanceType,

    pub image: ImageSettings,

    pub root_volume: BlockDevice,

    /// First-boot script, relative to the project directory
    pub bootstrap_script: PathBuf,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            instance_type: InstanceType::default(),
            image: ImageSettings::default(),
            root_volume: BlockDevice::default(),
            bootstrap_script: PathBuf::from("userData/user-data.yml"),
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                let layer = Self::read_file(&path)?;
                merge_values(&mut merged, layer);
                debug!(path = %path.display(), "Merged config file");
            } else if config_path == Some(&path) {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        let mut config: Config =
            serde_json::from_value(merged).context("Invalid configuration")?;

        // Apply environment variable overrides
        config.env_warnings = config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest precedence first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path replaces the search
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        // System-wide config
        paths.push(PathBuf::from("/etc/ec2-ssh-stack/config.toml"));

        // User config
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ec2-ssh-stack.toml"));
        }

        // Project config (current directory)
        paths.push(PathBuf::from("ec2-ssh-stack.toml"));

        // Environment variable
        if let Ok(env_config) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Parse one file into a JSON value for merging
    fn read_file(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let value = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => {
                let table: toml::Table = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                serde_json::to_value(table)?
            }
        };

        Ok(value)
    }

    /// Load from a specific file on top of the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;
        merge_values(&mut merged, Self::read_file(path.as_ref())?);
        serde_json::from_value(merged).context("Invalid configuration")
    }

    /// Environment overrides that `load` ignored because their values did not parse
    pub fn env_warnings(&self) -> &[String] {
        &self.env_warnings
    }

    /// Apply environment variable overrides.
    ///
    /// Returns one message per variable that was ignored. Logging is not
    /// initialized yet when this runs, so the caller reports them later.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        let mut ignored = Vec::new();

        if let Ok(name) = std::env::var("EC2_SSH_STACK_NAME") {
            self.stack.name = name;
        }

        if let Ok(param) = std::env::var("EC2_SSH_STACK_IP_PARAMETER") {
            self.stack.ip_parameter = param;
        }

        if let Ok(strict) = std::env::var("EC2_SSH_STACK_STRICT_SOURCE_IP") {
            self.stack.strict_source_ip = matches!(strict.as_str(), "1" | "true" | "yes");
        }

        // Explicit settings first, then the deploy tool's defaults
        if let Ok(account) = std::env::var("EC2_SSH_STACK_ACCOUNT") {
            self.stack.account = Some(account);
        } else if self.stack.account.is_none() {
            self.stack.account = std::env::var("CDK_DEFAULT_ACCOUNT").ok();
        }

        if let Ok(region) = std::env::var("EC2_SSH_STACK_REGION") {
            self.stack.region = Some(region);
        } else if self.stack.region.is_none() {
            self.stack.region = std::env::var("CDK_DEFAULT_REGION").ok();
        }

        if let Ok(instance_type) = std::env::var("EC2_SSH_STACK_INSTANCE_TYPE") {
            match instance_type.parse() {
                Ok(t) => self.compute.instance_type = t,
                Err(e) => ignored.push(format!("Ignoring EC2_SSH_STACK_INSTANCE_TYPE: {}", e)),
            }
        }

        if let Ok(image_id) = std::env::var("EC2_SSH_STACK_IMAGE_ID") {
            self.compute.image.id = Some(image_id);
        }

        if let Ok(key_name) = std::env::var("EC2_SSH_STACK_KEY_NAME") {
            self.credential = CredentialMode::Reference { name: key_name };
        }

        if let Ok(level) = std::env::var("EC2_SSH_STACK_LOG_LEVEL") {
            match level.parse() {
                Ok(l) => self.logging.level = l,
                Err(e) => ignored.push(format!("Ignoring EC2_SSH_STACK_LOG_LEVEL: {}", e)),
            }
        }

        if let Ok(format) = std::env::var("EC2_SSH_STACK_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.logging.format = f,
                Err(e) => ignored.push(format!("Ignoring EC2_SSH_STACK_LOG_FORMAT: {}", e)),
            }
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.logging.ansi_colors = false;
        }

        ignored
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        validate_stack_name(&self.stack.name)?;

        if self.stack.ip_parameter.trim().is_empty() {
            return Err(Error::invalid_config(
                "stack.ip_parameter",
                "context key must not be empty",
            ));
        }

        self.network.subnet_cidr()?;

        let size = self.compute.root_volume.size_gib;
        if size == 0 || size > MAX_VOLUME_GIB {
            return Err(Error::invalid_config(
                "compute.root_volume.size_gib",
                format!("{} is outside 1..={}", size, MAX_VOLUME_GIB),
            ));
        }

        if self.compute.image.id.is_none() && self.compute.image.owners.is_empty() {
            return Err(Error::invalid_config(
                "compute.image.owners",
                "at least one trusted owner is required",
            ));
        }

        self.credential.validate()
    }

    /// Resolve the bootstrap script path against `project_dir`
    pub fn bootstrap_script_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.compute.bootstrap_script)
    }
}

/// Stack names: a letter, then letters, digits and hyphens, at most 128 chars
fn validate_stack_name(name: &str) -> crate::error::Result<()> {
    let valid = name.len() <= 128
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(crate::error::Error::invalid_config(
            "stack.name",
            format!("'{}' is not a valid stack name", name),
        ))
    }
}

/// Recursively overlay `layer` onto `base`
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) if key != "credential" => merge_values(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stack.name, "Ec2WithSSHStack");
        assert_eq!(config.stack.ip_parameter, "myIp");
        assert_eq!(config.compute.instance_type.to_string(), "t3.xlarge");
        assert_eq!(config.compute.root_volume.size_gib, 125);
        assert_eq!(config.compute.root_volume.device_name, "/dev/sda1");
        assert_eq!(config.network.cidr_mask, 24);
        assert!(!config.stack.strict_source_ip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_values_is_deep() {
        let mut base = json!({ "stack": { "name": "A", "ip_parameter": "myIp" } });
        merge_values(&mut base, json!({ "stack": { "name": "B" } }));
        assert_eq!(base["stack"]["name"], "B");
        assert_eq!(base["stack"]["ip_parameter"], "myIp");
    }

    #[test]
    fn test_credential_table_is_replaced() {
        let mut base = serde_json::to_value(Config::default()).unwrap();
        merge_values(
            &mut base,
            json!({ "credential": { "mode": "inline", "public_key": "ssh-ed25519 AAAA x" } }),
        );
        assert!(base["credential"].get("name").is_none());
        let config: Config = serde_json::from_value(base).unwrap();
        assert!(matches!(config.credential, CredentialMode::Inline { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.compute.root_volume.size_gib = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stack.name = "1-bad_name".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.cidr_mask = 12;
        assert!(config.validate().is_err());
    }
}
