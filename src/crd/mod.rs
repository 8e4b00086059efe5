//! # Custom Resource Definitions
//!
//! CRD types for the Secret Sync Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - The `SecretSource` CRD specification
//! - `secret_type.rs` - Declared secret types and their per-type parameters

mod secret_type;
mod spec;

pub use secret_type::{DockerCfgConfig, KeyValueConfig, SecretType};
pub use spec::{SecretSource, SecretSourceSpec};
