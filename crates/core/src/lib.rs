//! Core types for tagstore
//!
//! This crate defines the foundational types used throughout the system:
//! - TreeValue: the structured tree value format used for export/import
//! - Compound / CompoundBuilder: immutable and mutable string-keyed maps
//! - TagError: conversion error hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{Result, TagError};
pub use value::{Compound, CompoundBuilder, TreeValue};
