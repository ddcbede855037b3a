//! Shared helpers for the builder.

pub mod fs;
