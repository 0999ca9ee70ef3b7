//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`issue::ConfigIssue`]: structured configuration findings

pub mod error;
pub mod issue;
