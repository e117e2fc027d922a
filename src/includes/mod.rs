//! Composition of a primary OpenAPI document with reusable fragments.
//!
//! A document opts into a fragment with a root-level `x-include-<name>: true`
//! marker. [`IncludeMerger::merge`] copies the document's directory into a
//! scratch directory, drops the fragment files in next to it, merges the
//! fragment's root into the primary root and removes the markers:
//!
//! ```yaml
//! openapi: 3.1.0
//! x-include-server: true   # adds GET /health and HealthResponse
//! ```
//!
//! Fragments come from a [`FragmentRegistry`] handed to the merger. The
//! built-in registry ships the `server` fragment; more can be registered from
//! directories with [`Fragment::from_dir`].

mod fragment;
mod merger;

pub use fragment::{Fragment, FragmentRegistry};
pub use merger::{IncludeMerger, MergedSpec};
