//! Unit tests for GenGuard
//!
//! This module contains tests for the orchestrator, the content handling
//! components, the pipelines and the HTTP client.

pub mod support;

pub mod chunker_tests;
pub mod evaluator_tests;
pub mod orchestrator_tests;
