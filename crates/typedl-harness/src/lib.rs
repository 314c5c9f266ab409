//! Tooling around typedl manifests.
//!
//! This crate provides:
//! - Validation: build a descriptor from a manifest and summarize it
//! - Probing: open the library, resolve every declaration, report with digest
//! - Calling: invoke one declaration with arguments given as text
//! - Structured JSONL logs for validate, probe and call (`--log`), plus a
//!   log validator

#![deny(unsafe_code)]

pub mod error;
pub mod invoke;
pub mod probe;
pub mod structured_log;

pub use error::HarnessError;
pub use probe::{DescriptorSummary, ProbeReport, SymbolProbe, probe, summarize, validate};
