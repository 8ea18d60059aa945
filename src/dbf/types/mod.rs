//! Foundational data structures, error types, encodings and options.

pub mod codepages;
pub mod encoding;
pub mod error;
pub mod models;
pub mod options;
pub mod record;
pub mod versions;
