//! CLI module for ec2-ssh-stack
//!
//! Argument parsing and subcommand dispatch.

pub mod commands;
pub mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Declare an SSH-reachable EC2 instance and synthesize it to CloudFormation
#[derive(Parser, Debug, Clone)]
#[command(name = "ec2-ssh-stack")]
#[command(author = "ec2-ssh-stack Contributors")]
#[command(version)]
#[command(about = "Synthesize an SSH-reachable EC2 instance stack", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project directory holding the bootstrap script and context cache
    #[arg(short = 'C', long = "project-dir", global = true, default_value = ".")]
    pub project_dir: PathBuf,

    #[command(flatten)]
    pub context: ContextArgs,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// `-c` flags, accepted before and after the subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Context values (KEY=VALUE), e.g. -c myIp=203.0.113.5/32
    #[arg(short = 'c', long = "context", action = clap::ArgAction::Append)]
    pub context: Vec<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize the CloudFormation template
    Synth(commands::synth::SynthArgs),

    /// List the declared resources
    List(commands::list::ListArgs),

    /// Run the declaration pass and report problems without rendering
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// `-c` assignments in command-line order: those before the subcommand
    /// first, so later flags win on merge
    pub fn context_assignments(&self) -> Vec<&str> {
        let subcommand = match &self.command {
            Commands::Synth(args) => &args.context,
            Commands::List(args) => &args.context,
            Commands::Validate(args) => &args.context,
        };
        self.context
            .context
            .iter()
            .chain(subcommand.context.iter())
            .map(String::as_str)
            .collect()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
