//! Property-based tests using proptest.
//!
//! Covers input validation, the source address pass-through and logical id
//! derivation.

mod common;

use common::{context_with_ip, project_with_script, test_config, SCRIPT};
use ec2_ssh_stack::constructs::Ipv4Cidr;
use ec2_ssh_stack::context::DeclarationContext;
use ec2_ssh_stack::graph::LogicalId;
use ec2_ssh_stack::stack::{validate_input, validate_source_address, Ec2WithSshStack};
use ec2_ssh_stack::Error;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Any non-empty string, whitespace included
fn non_empty_string() -> impl Strategy<Value = String> {
    prop_oneof!["\\PC{1,40}", "[ \\t]{1,10}"]
}

fn ipv4_cidr() -> impl Strategy<Value = (u8, u8, u8, u8, u8)> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>(), 0u8..=32)
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_empty_input_is_missing() {
    let context = context_with_ip("");
    assert!(matches!(
        validate_input(&context, "myIp"),
        Err(Error::MissingParameter { .. })
    ));
}

proptest! {
    #[test]
    fn prop_non_empty_input_passes(value in non_empty_string()) {
        let context = context_with_ip(&value);
        prop_assert_eq!(validate_input(&context, "myIp").unwrap(), value);
    }

    #[test]
    fn prop_whitespace_input_passes_through(value in "[ \\t\\n]{1,10}") {
        let context = context_with_ip(&value);
        prop_assert_eq!(validate_input(&context, "myIp").unwrap(), value);
    }

    #[test]
    fn prop_valid_cidr_round_trips((a, b, c, d, prefix) in ipv4_cidr()) {
        let text = format!("{}.{}.{}.{}/{}", a, b, c, d, prefix);
        let cidr: Ipv4Cidr = validate_source_address(&text).unwrap();
        prop_assert_eq!(cidr.to_string(), text);
    }

    #[test]
    fn prop_logical_ids_are_alphanumeric(
        path in prop::collection::vec("[A-Za-z0-9/_ -]{1,12}", 1..4)
    ) {
        let parts: Vec<&str> = path.iter().map(String::as_str).collect();
        let id = LogicalId::from_path(&parts);
        prop_assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        prop_assert_eq!(id, LogicalId::from_path(&parts));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_source_is_forwarded_verbatim(value in "[0-9a-f.:/]{1,30}") {
        let project = project_with_script(SCRIPT.as_bytes());
        let stack = Ec2WithSshStack::new(&test_config(), &context_with_ip(&value), project.path())
            .unwrap();
        let group = stack.graph().get(&stack.security_policy.security_group).unwrap();
        prop_assert_eq!(
            group.properties["SecurityGroupIngress"][0]["CidrIp"].as_str(),
            Some(value.as_str())
        );
    }

    #[test]
    fn prop_missing_input_declares_nothing(key in "[a-zA-Z]{1,10}") {
        let project = project_with_script(SCRIPT.as_bytes());
        let mut context = DeclarationContext::new();
        context.set(format!("not{}", key), "203.0.113.5/32");
        let result = Ec2WithSshStack::new(&test_config(), &context, project.path());
        prop_assert!(result.is_err());
    }
}
