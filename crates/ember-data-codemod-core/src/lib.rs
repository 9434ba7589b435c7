//! Core infrastructure for ember-data-codemod.
//!
//! This crate provides the language-agnostic pieces of the codemod:
//! - Span edits applied atomically to one file
//! - Text utilities (positions, line terminators, removal spans)
//! - The mapping table from legacy dotted paths to module exports
//! - The per-file module registry
//! - Diagnostics, error types and JSON output types
//! - Run configuration

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod mapping;
pub mod output;
pub mod patch;
pub mod registry;
pub mod text;
