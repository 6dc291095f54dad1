//! Job registry and progress plumbing.
//!
//! This crate provides:
//! - The `JobRegistry` trait and its in-memory implementation
//! - A typed progress channel whose consumer writes updates to the registry

pub mod error;
pub mod progress;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use progress::{ProgressChannel, ProgressSender};
pub use registry::{InMemoryJobRegistry, JobRegistry};
