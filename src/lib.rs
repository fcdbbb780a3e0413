//! # ec2-ssh-stack
//!
//! Declares a small piece of AWS infrastructure and synthesizes it into a
//! CloudFormation template: a VPC with one public subnet, a security group
//! admitting SSH from a single address, an IAM role for Session Manager, an
//! SSH key pair, and one EC2 instance with a first-boot script.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CLI Interface                         │
//! │              (clap-based, synth / list / validate)            │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//! ┌─────────────────┐  ┌──────────────────┐  ┌─────────────────┐
//! │     Config      │  │   Declaration    │  │     Lookups     │
//! │ (files + env)   │  │     Context      │  │  (aws feature)  │
//! └─────────────────┘  └──────────────────┘  └─────────────────┘
//!          └────────────────────┼────────────────────┘
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Stack Definition                        │
//! │   Network → Security Policy → Identity → Credential → Compute │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │           Resource Graph  →  CloudFormation Template          │
//! │                (petgraph)        (JSON / YAML)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use ec2_ssh_stack::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> ec2_ssh_stack::Result<()> {
//! let mut context = DeclarationContext::new();
//! context.set("myIp", "203.0.113.5/32");
//!
//! let stack = Ec2WithSshStack::new(&Config::default(), &context, Path::new("."))?;
//! println!("{}", stack.template()?.to_json()?);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::config::Config;
    pub use crate::constructs::{CredentialMode, CredentialRef, InstanceType, ScriptPayload};
    pub use crate::context::{DeclarationContext, MissingContext};
    pub use crate::error::{Error, Result};
    pub use crate::graph::{LogicalId, ResourceGraph, ResourceKind};
    pub use crate::lookup::ContextProvider;
    pub use crate::stack::{load_bootstrap_script, validate_input, Ec2WithSshStack};
    pub use crate::template::{Template, TemplateFormat};
}

// ============================================================================
// Core
// ============================================================================

/// Error types and the crate `Result` alias.
pub mod error;

/// The resource graph declarations are written into.
pub mod graph;

/// CloudFormation template synthesis and intrinsic functions.
pub mod template;

// ============================================================================
// Stack Definition
// ============================================================================

/// Resource constructs, one per stack component.
pub mod constructs;

/// The declaration context and its on-disk cache.
pub mod context;

/// The EC2-with-SSH stack definition.
pub mod stack;

/// Resolution of missing context lookups.
pub mod lookup;

// ============================================================================
// Configuration and Logging
// ============================================================================

/// Configuration loading and merging.
pub mod config;

/// Structured logging setup.
pub mod logging;

pub use error::{Error, Result};

/// Returns the current version of ec2-ssh-stack.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
