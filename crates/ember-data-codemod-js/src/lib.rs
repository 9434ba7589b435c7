// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! JavaScript engine for ember-data-codemod.
//!
//! Rewrites uses of the legacy `DS` namespace into module imports, one file
//! at a time:
//!
//! - [`parse`]: swc parsing with byte-offset spans
//! - [`scope`]: lexical scopes for shadowing checks
//! - [`imports`]: existing import declarations and legacy literals
//! - [`alias`]: destructuring and member aliases of the namespace
//! - [`usage`]: direct `DS.x.y` member accesses, longest match first
//! - [`synth`]: one import declaration per module
//! - [`transform`]: the pipeline tying them together

pub mod alias;
pub mod imports;
pub mod parse;
pub mod scope;
pub mod synth;
pub mod transform;
pub mod usage;

pub use transform::{transform_file, transform_source, TransformError, TransformOutput};
