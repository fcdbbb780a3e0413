//! Validate command
//!
//! Runs the declaration pass and synthesis without rendering, and fails when
//! a lookup is still unresolved.

use super::CommandContext;
use crate::cli::ContextArgs;
use anyhow::Result;
use clap::Parser;

/// Exit code when the pass succeeded only with placeholder lookups
pub const EXIT_UNRESOLVED_CONTEXT: i32 = 5;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    /// Treat unresolved lookups as success
    #[arg(long)]
    pub allow_missing_context: bool,
}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let stack = ctx.declare()?;
        let template = stack.template()?;

        ctx.output.info(&format!("SSH source: {}", stack.source_ip()));
        ctx.output.info(&format!("Key pair: {}", stack.credential.key_name()));

        if stack.has_missing_context() && !self.allow_missing_context {
            ctx.report_missing_context(&stack);
            return Ok(EXIT_UNRESOLVED_CONTEXT);
        }

        ctx.output.success(&format!(
            "{} is valid: {} resources, {} outputs",
            stack.name(),
            template.resources.len(),
            template.outputs.len()
        ));
        Ok(0)
    }
}
