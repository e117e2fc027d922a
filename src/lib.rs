//! # specgen
//!
//! **specgen** compiles an [OpenAPI 3.1](https://spec.openapis.org/oas/v3.1.0)
//! document annotated with `x-codegen` extensions into a Go backend skeleton:
//! models, repositories, handler interfaces, routes, SQL schema and queries,
//! and the bootstrap code that wires hand-written handlers to their
//! dependencies.
//!
//! ## Architecture
//!
//! - **[`naming`]** - Identifier casing, Go keyword sanitizing, pluralization
//! - **[`spec`]** - Document loading and bundling, and the IR ([`spec::ApiModel`])
//! - **[`includes`]** - `x-include-<name>` fragment merging
//! - **[`orchestrator`]** - Priority tiers of generators, run concurrently per tier
//! - **[`handlers`]** - Constructor dependency resolution for custom handlers
//! - **[`generator`]** - The concrete generators and the end-to-end pipeline
//! - **[`storage`]** - Disk and in-memory output sinks, dry-run reports
//! - **[`config`]** / **[`logging`]** / **[`cli`]** - The `specgen` binary's surface
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as CLI<br/>(specgen)
//!     participant Merger as includes::IncludeMerger
//!     participant Spec as spec::load_spec
//!     participant Orch as orchestrator::Orchestrator
//!     participant Gen as generator::*
//!     participant Store as storage::Storage
//!
//!     User->>CLI: specgen generate --spec openapi.yaml
//!     CLI->>Merger: merge(spec)
//!     Merger->>Merger: Copy fragment files (first writer wins)
//!     Merger->>Merger: Merge paths, components, tags, security
//!     Merger-->>CLI: MergedSpec (scratch copy or original)
//!     CLI->>Spec: load_spec(merged, context)
//!     Spec->>Spec: Bundle file refs, oas3 parse
//!     Spec->>Spec: build_model (allOf, x-codegen, security)
//!     Spec-->>CLI: ApiModel
//!     CLI->>Merger: cleanup()
//!     CLI->>Orch: run(model, storage)
//!     loop First, Normal, Last, Final
//!         Orch->>Gen: generate(ctx) on one thread each
//!         Gen->>Store: write_file(path, bytes)
//!     end
//!     Orch-->>CLI: RunSummary or OrchestratorError
//!     CLI-->>User: Summary or dry-run report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specgen::generator::{generate_project, GenerateOptions};
//!
//! let mut options = GenerateOptions::new("api/openapi.yaml", "backend");
//! options.dry_run = true;
//! let outcome = generate_project(&options, None)?;
//! if let Some(report) = outcome.report {
//!     print!("{report}");
//! }
//! ```
//!
//! ## Ownership and Composition
//!
//! Schemas and operations may carry `x-internal: <tag>`. When generating with
//! a context, anything tagged with another value belongs to a different
//! package: it is not generated here, and a spec that owns no operations at
//! all gets a thin container and router over those packages instead.

pub mod cli;
pub mod config;
pub mod generator;
pub mod handlers;
pub mod includes;
pub mod logging;
pub mod naming;
pub mod orchestrator;
pub mod spec;
pub mod storage;

pub use generator::{generate_project, GenerateOptions, GenerationOutcome};
pub use orchestrator::{Generator, Orchestrator, Priority};
pub use spec::{build_model, load_spec, ApiModel, SpecError};
