//! # Secret Sync Controller
//!
//! Materializes secrets held in a Vault-style HTTP backend as native Kubernetes
//! `Secret` objects and keeps them synchronized as the upstream values change.
//!
//! Operators declare a `SecretSource` naming a backend path and a type. The
//! controller fetches the payload, shapes it for Kubernetes (opaque key/value, TLS
//! keypair or docker registry config), and writes the Secret only when its
//! fingerprint changed.
//!
//! ## Modules
//!
//! - `backend`: backend client trait and the Vault HTTP implementation
//! - `shaping`: payload to Secret data, per secret type
//! - `controller`: fingerprinting, secret store, reconciler, refresh scheduler, probe server
//! - `crd`: the `SecretSource` custom resource
//! - `runtime`: startup, watch loop and error policy

pub mod backend;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;
pub mod shaping;
