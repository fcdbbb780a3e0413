//! Subcommands module for the ec2-ssh-stack CLI
//!
//! This module contains all the subcommand implementations.

pub mod list;
pub mod synth;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use ec2_ssh_stack::config::Config;
use ec2_ssh_stack::constructs::compute::PLACEHOLDER_IMAGE_ID;
use ec2_ssh_stack::context::DeclarationContext;
use ec2_ssh_stack::stack::Ec2WithSshStack;
use std::path::PathBuf;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Project directory
    pub project_dir: PathBuf,
    /// Declaration context: config table, then cache, then `-c` flags
    pub context: DeclarationContext,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Result<Self> {
        let output = OutputFormatter::new(!cli.no_color, cli.verbosity());

        let mut context = config.context.clone();
        let cached = DeclarationContext::load_cache(&cli.project_dir).with_context(|| {
            format!(
                "Failed to read context cache in {}",
                cli.project_dir.display()
            )
        })?;
        context.merge(cached);
        context.merge(DeclarationContext::from_assignments(cli.context_assignments())?);

        Ok(Self {
            config,
            output,
            project_dir: cli.project_dir.clone(),
            context,
        })
    }

    /// Run the declaration pass with the merged context
    pub fn declare(&self) -> ec2_ssh_stack::Result<Ec2WithSshStack> {
        Ec2WithSshStack::new(&self.config, &self.context, &self.project_dir)
    }

    /// Warn about lookups that fell back to placeholders
    pub fn report_missing_context(&self, stack: &Ec2WithSshStack) {
        for missing in stack.missing_context() {
            self.output.warning(&format!(
                "Context lookup unresolved, using placeholder {}: {}",
                PLACEHOLDER_IMAGE_ID, missing.key
            ));
        }
        if stack.has_missing_context() {
            self.output.hint(
                "Run `ec2-ssh-stack synth --lookup` (aws feature) or set compute.image.id",
            );
        }
    }
}
