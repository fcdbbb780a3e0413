//! List command
//!
//! Prints the declared resources in declaration order, with their explicit
//! dependencies, followed by the stack outputs.

use super::CommandContext;
use crate::cli::ContextArgs;
use anyhow::Result;
use clap::Parser;
use serde::Serialize;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ResourceEntry {
    logical_id: String,
    resource_type: String,
    kind: String,
    path: String,
    depends_on: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OutputEntry {
    name: String,
    description: Option<String>,
    sources: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Listing {
    stack: String,
    resources: Vec<ResourceEntry>,
    outputs: Vec<OutputEntry>,
    missing_context: Vec<String>,
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let stack = ctx.declare()?;
        let graph = stack.graph();

        let listing = Listing {
            stack: stack.name().to_string(),
            resources: graph
                .resources()
                .map(|node| ResourceEntry {
                    logical_id: node.logical_id.to_string(),
                    resource_type: node.resource_type.clone(),
                    kind: node.kind.to_string(),
                    path: node.path.clone(),
                    depends_on: graph
                        .explicit_dependencies(&node.logical_id)
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                })
                .collect(),
            outputs: graph
                .outputs()
                .map(|output| OutputEntry {
                    name: output.name.clone(),
                    description: output.description.clone(),
                    sources: output.sources.iter().map(ToString::to_string).collect(),
                })
                .collect(),
            missing_context: stack
                .missing_context()
                .iter()
                .map(|m| m.key.clone())
                .collect(),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(0);
        }

        ctx.report_missing_context(&stack);

        ctx.output.section(&format!("Resources in {}", listing.stack));
        let rows: Vec<Vec<String>> = listing
            .resources
            .iter()
            .map(|r| {
                vec![
                    r.logical_id.clone(),
                    r.resource_type.clone(),
                    r.kind.clone(),
                    r.depends_on.join(", "),
                ]
            })
            .collect();
        ctx.output
            .table(&["Logical ID", "Type", "Component", "DependsOn"], &rows);

        ctx.output.section("Outputs");
        let rows: Vec<Vec<String>> = listing
            .outputs
            .iter()
            .map(|o| {
                vec![
                    o.name.clone(),
                    o.sources.join(", "),
                    o.description.clone().unwrap_or_default(),
                ]
            })
            .collect();
        ctx.output.table(&["Name", "Source", "Description"], &rows);

        Ok(0)
    }
}
