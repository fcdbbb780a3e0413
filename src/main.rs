//! ec2-ssh-stack
//!
//! Declares a VPC, security group, IAM role, key pair and an EC2 instance
//! reachable over SSH from one address, and synthesizes them into a
//! CloudFormation template.
//!
//! This is the main entry point for the ec2-ssh-stack CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::output::OutputFormatter;
use cli::{Cli, Commands};
use ec2_ssh_stack::config::Config;
use ec2_ssh_stack::logging::{LogLevel, LoggingBuilder};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(err) => report(&cli, &err),
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    // Load configuration
    let config = Config::load(cli.config.as_ref())?;

    // Initialize logging based on verbosity and config
    init_logging(cli, &config);
    tracing::debug!("ec2-ssh-stack v{}", VERSION);
    for warning in config.env_warnings() {
        tracing::warn!("{}", warning);
    }

    config.validate()?;

    // Create command context
    let mut ctx = CommandContext::new(cli, config)?;

    // Execute the appropriate command
    match &cli.command {
        Commands::Synth(args) => args.execute(&mut ctx).await,
        Commands::List(args) => args.execute(&mut ctx).await,
        Commands::Validate(args) => args.execute(&mut ctx).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(cli: &Cli, config: &Config) {
    let level = LogLevel::from_verbosity(cli.verbosity(), config.logging.level);
    let result = LoggingBuilder::from_config(config.logging.clone())
        .with_level(level)
        .with_ansi(config.logging.ansi_colors && !cli.no_color)
        .with_target(cli.verbosity() >= 3)
        .init();

    if let Err(e) = result {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
}

/// Print an error and pick the exit code for it
fn report(cli: &Cli, err: &anyhow::Error) -> i32 {
    let output = OutputFormatter::new(!cli.no_color, cli.verbosity());

    // Library errors already carry their source in the message
    match err.downcast_ref::<ec2_ssh_stack::Error>() {
        Some(e) => {
            output.error(&e.to_string());
            e.exit_code()
        }
        None => {
            output.error(&format!("{:#}", err));
            1
        }
    }
}
