//! Shared error helpers and the finding model used across all
//! regcheck crates.

pub mod error;
pub mod findings;

pub use {
    error::FromMessage,
    findings::{Finding, Findings, Location, Section, Severity},
};
