//! CloudFormation intrinsic function helpers.
//!
//! Constructs never hold live identifiers; they wire each other together
//! with these placeholders and the provisioning engine substitutes the real
//! values at deploy time.

use serde_json::{json, Value};

/// `{"Ref": id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Base64": value}`
pub fn base64(value: impl Into<Value>) -> Value {
    json!({ "Fn::Base64": value.into() })
}

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// `{"Fn::Select": [index, list]}`
pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

/// `{"Fn::GetAZs": ""}`, the availability zones of the deploy region.
pub fn get_azs() -> Value {
    json!({ "Fn::GetAZs": "" })
}

/// The partition of the deploy region (`aws`, `aws-cn`, `aws-us-gov`).
pub fn partition() -> Value {
    reference("AWS::Partition")
}

/// ARN of an AWS managed IAM policy, valid in any partition.
pub fn managed_policy_arn(policy_name: &str) -> Value {
    join(
        "",
        vec![
            Value::from("arn:"),
            partition(),
            Value::from(format!(":iam::aws:policy/{}", policy_name)),
        ],
    )
}

/// Collects the logical ids referenced by `Ref` and `Fn::GetAtt` anywhere in
/// `value`. Pseudo parameters (`AWS::*`) are skipped.
pub fn referenced_ids(value: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    collect_references(value, &mut ids);
    ids
}

fn collect_references(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    if !id.starts_with("AWS::") && !ids.contains(id) {
                        ids.push(id.clone());
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(id)) = args.first() {
                        if !ids.contains(id) {
                            ids.push(id.clone());
                        }
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, ids);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, ids);
            }
        }
        _ => {}
    }
}
