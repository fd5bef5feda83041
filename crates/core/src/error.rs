//! Error types for tagstore
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations. The store's public read/write surface never surfaces
//! these errors: conversion failures degrade to the descriptor's default.
//! They are public because custom tag converters return them.

use thiserror::Error;

/// Result type alias for tagstore operations
pub type Result<T> = std::result::Result<T, TagError>;

/// Error types for tag value conversion
#[derive(Debug, Error, PartialEq)]
pub enum TagError {
    /// A stored tree form cannot be converted to the requested shape
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Shape the converter expected
        expected: &'static str,
        /// Shape actually stored
        found: &'static str,
    },

    /// Serde-backed structure tag failed to convert
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TagError {
    /// Convenience constructor for shape mismatches against a tree value
    pub fn mismatch(expected: &'static str, found: &'static str) -> TagError {
        TagError::TypeMismatch { expected, found }
    }
}
