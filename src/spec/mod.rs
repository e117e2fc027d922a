//! OpenAPI loading and the intermediate representation (IR).
//!
//! [`load_spec`] bundles a possibly multi-file document, checks it with `oas3`
//! and hands it to [`build_model`], which produces the [`ApiModel`] every
//! generator reads. All validation happens here, before any file is written.

mod build;
mod error;
mod load;
mod types;
mod xcodegen;

#[cfg(test)]
mod tests;

pub use build::*;
pub use error::*;
pub use load::*;
pub use types::*;
pub use xcodegen::*;
