//! Service implementations
//!
//! This module contains the concrete implementations of the core traits:
//! - `http`: JSON-over-HTTP generation service client
//! - `memory`: In-memory artifact sink

pub mod http;
pub mod memory;
mod common;

pub use common::UserAgent;
pub use http::{HttpGenerationClient, HttpGenerationClientBuilder};
pub use memory::MemoryArtifactSink;
