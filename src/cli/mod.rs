//! # CLI Module
//!
//! Command-line surface of the `specgen` binary.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! ```bash
//! specgen generate --spec api/openapi.yaml --output backend
//! specgen generate --spec api/openapi.yaml --only models,sql --dry-run
//! ```
//!
//! Options not given on the command line come from `specgen.toml` next to
//! the spec (or `--config`).
//!
//! ### `bundle`
//!
//! Merge `x-include-*` fragments and inline every file reference:
//!
//! ```bash
//! specgen bundle --spec api/openapi.yaml --output openapi.bundled.yaml
//! ```
//!
//! ### `inspect`
//!
//! Print the schemas and operations the generators would see:
//!
//! ```bash
//! specgen inspect --spec api/openapi.yaml --context billing
//! ```

mod commands;


pub use commands::{
    describe_model, run_cli, Cli, Commands, GenerateArgs, LogFormatArg, DEFAULT_OUTPUT,
};
