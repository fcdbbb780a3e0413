//! CLI tests for ec2-ssh-stack
//!
//! Runs the built binary with assert_cmd and checks exit codes, stdout
//! templates and stderr messages.

mod common;

use assert_cmd::Command;
use common::{project_with_script, SCRIPT};
use predicates::prelude::*;
use serde_json::Value;

// Helper to get a command for testing
fn stack_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ec2-ssh-stack").unwrap();
    cmd.env_remove("EC2_SSH_STACK_CONFIG")
        .env_remove("CDK_DEFAULT_ACCOUNT")
        .env_remove("CDK_DEFAULT_REGION")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn test_help() {
    stack_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_synth_prints_json_template() {
    let project = project_with_script(SCRIPT.as_bytes());
    let output = stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "synth"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let template: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    assert!(template["Outputs"].get("instancePublicIp").is_some());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ami-1234"));
}

#[test]
fn test_synth_yaml_to_file() {
    let project = project_with_script(SCRIPT.as_bytes());
    let out = project.path().join("cdk.out/template.yaml");

    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "synth", "--format", "yaml", "--output"])
        .arg(&out)
        .assert()
        .success();

    let content = std::fs::read_to_string(&out).unwrap();
    assert!(content.contains("AWS::EC2::Instance"));
    assert!(content.contains("203.0.113.5/32"));
}

#[test]
fn test_missing_ip_exits_2_with_hint() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .arg("synth")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "IP address must be provided via context",
        ))
        .stderr(predicate::str::contains("-c myIp=your.ip.address/32"));
}

#[test]
fn test_empty_ip_exits_2() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=", "synth"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_script_exits_3() {
    let project = tempfile::tempdir().unwrap();
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "synth"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("user-data.yml"));
}

#[test]
fn test_strict_source_exits_4() {
    let project = project_with_script(SCRIPT.as_bytes());
    std::fs::write(
        project.path().join("strict.toml"),
        "[stack]\nstrict_source_ip = true\n",
    )
    .unwrap();

    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .arg("--config")
        .arg(project.path().join("strict.toml"))
        .args(["-c", "myIp=203.0.113.5", "synth"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Did you mean 203.0.113.5/32?"));
}

#[test]
fn test_validate_reports_unresolved_context() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "validate"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Context lookup unresolved"));

    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "validate", "--allow-missing-context"])
        .assert()
        .success();
}

#[test]
fn test_validate_succeeds_with_image_id() {
    let project = project_with_script(SCRIPT.as_bytes());
    std::fs::write(
        project.path().join("pinned.toml"),
        "[compute.image]\nid = \"ami-0abcdef1234567890\"\n",
    )
    .unwrap();

    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .arg("--config")
        .arg(project.path().join("pinned.toml"))
        .args(["-c", "myIp=203.0.113.5/32", "validate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("is valid"));
}

#[test]
fn test_context_cache_is_read() {
    let project = project_with_script(SCRIPT.as_bytes());
    std::fs::write(
        project.path().join("stack.context.json"),
        r#"{ "myIp": "198.51.100.9/32" }"#,
    )
    .unwrap();

    let output = stack_cmd()
        .arg("-C")
        .arg(project.path())
        .arg("synth")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("198.51.100.9/32"));
}

#[test]
fn test_list_json() {
    let project = project_with_script(SCRIPT.as_bytes());
    let output = stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "-c", "ignored=1", "list", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["stack"], "Ec2WithSSHStack");
    let resources = listing["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 11);
    assert_eq!(resources[0]["kind"], "network");
    assert_eq!(resources.last().unwrap()["resource_type"], "AWS::EC2::Instance");
    assert_eq!(listing["outputs"].as_array().unwrap().len(), 2);
}

#[test]
fn test_list_table() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AWS::EC2::SecurityGroup"))
        .stdout(predicate::str::contains("instancePublicIp"));
}

#[test]
fn test_context_flags_on_both_sides_of_subcommand() {
    let project = project_with_script(SCRIPT.as_bytes());
    let output = stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "synth", "-c", "other=1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let template: Value = serde_json::from_slice(&output.stdout).unwrap();
    let group = template["Resources"]
        .as_object()
        .unwrap()
        .values()
        .find(|r| r["Type"] == "AWS::EC2::SecurityGroup")
        .unwrap();
    assert_eq!(
        group["Properties"]["SecurityGroupIngress"][0]["CidrIp"],
        "203.0.113.5/32"
    );
}

#[test]
fn test_context_flag_after_subcommand_wins() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "synth", "-c", "myIp=198.51.100.7/32"])
        .assert()
        .success()
        .stdout(predicate::str::contains("198.51.100.7/32"))
        .stdout(predicate::str::contains("203.0.113.5/32").not());

    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "validate", "-c", "myIp="])
        .assert()
        .code(2);
}

#[test]
fn test_ignored_env_override_is_logged() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .env("EC2_SSH_STACK_INSTANCE_TYPE", "not-a-type")
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "validate", "--allow-missing-context"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring EC2_SSH_STACK_INSTANCE_TYPE"));
}

#[test]
fn test_malformed_context_flag() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp", "synth"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[cfg(not(feature = "aws"))]
#[test]
fn test_lookup_requires_aws_feature() {
    let project = project_with_script(SCRIPT.as_bytes());
    stack_cmd()
        .arg("-C")
        .arg(project.path())
        .args(["-c", "myIp=203.0.113.5/32", "synth", "--lookup"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("aws"));
}
