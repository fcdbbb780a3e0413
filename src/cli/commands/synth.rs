//! Synth command
//!
//! Runs the declaration pass and renders the CloudFormation template.

use super::CommandContext;
use crate::cli::ContextArgs;
use anyhow::Result;
use clap::Parser;
use ec2_ssh_stack::stack::Ec2WithSshStack;
use ec2_ssh_stack::template::TemplateFormat;
use std::path::PathBuf;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    /// Template format (json or yaml)
    #[arg(long, short = 'f', default_value = "json")]
    pub format: TemplateFormat,

    /// Write the template to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Resolve missing image lookups against the EC2 API and cache them
    #[arg(long)]
    pub lookup: bool,
}

impl SynthArgs {
    /// Execute the synth command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let stack = if self.lookup {
            self.declare_with_lookups(ctx).await?
        } else {
            ctx.declare()?
        };

        ctx.report_missing_context(&stack);

        let template = stack.template()?;
        match &self.output {
            Some(path) => {
                template.write_to(path, self.format)?;
                ctx.output.success(&format!(
                    "Synthesized {} ({} resources) to {}",
                    stack.name(),
                    template.resources.len(),
                    path.display()
                ));
            }
            None => {
                println!("{}", template.render(self.format)?.trim_end());
                ctx.output.info(&format!(
                    "Synthesized {} ({} resources)",
                    stack.name(),
                    template.resources.len()
                ));
            }
        }

        Ok(0)
    }

    #[cfg(feature = "aws")]
    async fn declare_with_lookups(&self, ctx: &mut CommandContext) -> Result<Ec2WithSshStack> {
        use ec2_ssh_stack::context::DeclarationContext;
        use ec2_ssh_stack::lookup::{declare_with_lookups, Ec2ImageProvider};

        let provider = Ec2ImageProvider::new();
        let (stack, resolved) =
            declare_with_lookups(&ctx.config, &ctx.context, &ctx.project_dir, &provider).await?;

        if !resolved.is_empty() {
            DeclarationContext::save_cache(&ctx.project_dir, &resolved)?;
            for (key, value) in resolved.iter() {
                ctx.output.info(&format!("Cached {} = {}", key, value));
            }
            ctx.context.merge(resolved);
        }

        Ok(stack)
    }

    #[cfg(not(feature = "aws"))]
    async fn declare_with_lookups(&self, _ctx: &mut CommandContext) -> Result<Ec2WithSshStack> {
        anyhow::bail!("--lookup requires ec2-ssh-stack to be built with the `aws` feature")
    }
}
