//! Shared helpers for integration tests.

#![allow(dead_code)]

use ec2_ssh_stack::config::Config;
use ec2_ssh_stack::context::DeclarationContext;
use std::path::Path;
use tempfile::TempDir;

/// Script content used by most tests
pub const SCRIPT: &str = "#cloud-config\npackages:\n  - htop\n";

/// A project directory holding `userData/user-data.yml` with `content`
pub fn project_with_script(content: &[u8]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), content);
    dir
}

pub fn write_script(project: &Path, content: &[u8]) {
    let script_dir = project.join("userData");
    std::fs::create_dir_all(&script_dir).unwrap();
    std::fs::write(script_dir.join("user-data.yml"), content).unwrap();
}

/// A context carrying `value` under `myIp`
pub fn context_with_ip(value: &str) -> DeclarationContext {
    let mut context = DeclarationContext::new();
    context.set("myIp", value);
    context
}

/// Default config with account and region set, so lookup keys are stable
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.stack.account = Some("123456789012".to_string());
    config.stack.region = Some("us-east-1".to_string());
    config
}
