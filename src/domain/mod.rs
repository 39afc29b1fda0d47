//! Capability catalog served by the demo server
//!
//! Declares every tool, resource and prompt and registers them in one startup pass.

pub mod prompts;
pub mod resources;
pub mod tools;
pub mod utils;

use crate::errors::RegistrationError;
use crate::registry::{CapabilityRegistry, DuplicatePolicy};

pub fn build_registry(policy: DuplicatePolicy) -> Result<CapabilityRegistry, RegistrationError> {
    let mut builder = CapabilityRegistry::builder(policy);
    tools::register_tools(&mut builder)?;
    resources::register_resources(&mut builder)?;
    prompts::register_prompts(&mut builder)?;
    Ok(builder.build())
}
