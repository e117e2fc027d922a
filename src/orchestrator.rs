//! Priority-tiered generator scheduling.
//!
//! Generators are bucketed by [`Priority`]. Tiers run in ascending order, and
//! every generator inside a tier runs on its own scoped thread. A tier always
//! runs to completion: a failing generator never cancels its siblings. A failed
//! tier stops the run before the next tier starts. Files already written stay
//! on disk; generation overwrites, so a re-run after a fix is safe.
//!
//! ```text
//! Idle -> Filtering -> [tier First] -> [tier Normal] -> [tier Last] -> [tier Final] -> Done
//!                            \______________\______________\_______________\-> Error
//! ```

use crate::generator::GenerationSettings;
use crate::spec::ApiModel;
use crate::storage::Storage;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Execution tier. Lower tiers complete before higher tiers start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Priority {
    First = 0,
    Normal = 100,
    Last = 200,
    Final = 300,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::First => "first",
            Priority::Normal => "normal",
            Priority::Last => "last",
            Priority::Final => "final",
        };
        write!(f, "{name}")
    }
}

/// Everything a generator may read or write.
///
/// The model is shared read-only across the threads of a tier.
pub struct GeneratorContext<'a> {
    pub model: &'a ApiModel,
    pub storage: &'a dyn Storage,
    pub settings: &'a GenerationSettings,
}

/// One unit of generation work.
///
/// Two generators in the same tier must never write the same path.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> Priority;

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()>;
}

type GenerateFn = dyn Fn(&GeneratorContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// A [`Generator`] backed by a closure.
pub struct FnGenerator {
    name: String,
    priority: Priority,
    run: Box<GenerateFn>,
}

impl FnGenerator {
    pub fn new<F>(name: impl Into<String>, priority: Priority, run: F) -> Self
    where
        F: Fn(&GeneratorContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        FnGenerator {
            name: name.into(),
            priority,
            run: Box::new(run),
        }
    }
}

impl Generator for FnGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn generate(&self, ctx: &GeneratorContext<'_>) -> anyhow::Result<()> {
        (self.run)(ctx)
    }
}

/// Progress notifications. `index` is 1-based over the filtered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Start {
        total: usize,
    },
    GeneratorStart {
        name: String,
        index: usize,
        total: usize,
    },
    GeneratorDone {
        name: String,
        index: usize,
        total: usize,
    },
    Done {
        total: usize,
    },
    Error {
        generator: String,
        message: String,
    },
}

/// Observer for [`ProgressEvent`]s. May be called from worker threads.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// A generator failure, attributed by name.
#[derive(Debug)]
pub enum OrchestratorError {
    Generator {
        name: String,
        source: anyhow::Error,
    },
}

impl OrchestratorError {
    /// Name of the generator that failed.
    pub fn generator(&self) -> &str {
        match self {
            OrchestratorError::Generator { name, .. } => name,
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::Generator { name, source } => write!(f, "{name}: {source:#}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrchestratorError::Generator { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Names of the generators that ran, tier by tier in registration order
    pub executed: Vec<String>,
    pub tiers: usize,
    pub elapsed: Duration,
}

/// Runs registered generators tier by tier.
#[derive(Default)]
pub struct Orchestrator {
    generators: Vec<Box<dyn Generator>>,
    only: Vec<String>,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, generator: Box<dyn Generator>) -> &mut Self {
        self.generators.push(generator);
        self
    }

    pub fn register_all(
        &mut self,
        generators: impl IntoIterator<Item = Box<dyn Generator>>,
    ) -> &mut Self {
        self.generators.extend(generators);
        self
    }

    /// Restrict the run to a comma-separated list of generator names.
    ///
    /// Blank entries are ignored; an empty list runs everything.
    pub fn with_only(mut self, only: &str) -> Self {
        self.only = only
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Registered generator names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(&event);
        }
    }

    /// Generators surviving the allow-list, grouped by ascending tier.
    fn tiers(&self) -> BTreeMap<Priority, Vec<&dyn Generator>> {
        if !self.only.is_empty() {
            let known: HashSet<&str> = self.generators.iter().map(|g| g.name()).collect();
            for name in &self.only {
                if !known.contains(name.as_str()) {
                    warn!(generator = %name, known = ?self.names(), "unknown generator in filter");
                }
            }
        }

        let mut tiers: BTreeMap<Priority, Vec<&dyn Generator>> = BTreeMap::new();
        for generator in &self.generators {
            if !self.only.is_empty() && !self.only.iter().any(|n| n == generator.name()) {
                continue;
            }
            tiers
                .entry(generator.priority())
                .or_default()
                .push(generator.as_ref());
        }
        tiers
    }

    /// Run every selected generator against `model` and `storage`.
    ///
    /// # Errors
    ///
    /// Returns the first failure (in registration order) of the first tier that
    /// had one. Later tiers are not started.
    pub fn run(
        &self,
        model: &ApiModel,
        storage: &dyn Storage,
        settings: &GenerationSettings,
    ) -> Result<RunSummary, OrchestratorError> {
        let started = Instant::now();
        let tiers = self.tiers();
        let total: usize = tiers.values().map(Vec::len).sum();
        if total == 0 {
            info!("no generators selected");
            return Ok(RunSummary {
                executed: Vec::new(),
                tiers: 0,
                elapsed: started.elapsed(),
            });
        }

        let ctx = GeneratorContext {
            model,
            storage,
            settings,
        };
        self.emit(ProgressEvent::Start { total });
        info!(total, tiers = tiers.len(), "starting generation");

        let mut index = 0;
        let mut executed = Vec::with_capacity(total);
        for (priority, generators) in &tiers {
            debug!(tier = %priority, count = generators.len(), "running tier");
            let failures = self.run_tier(generators, &ctx, &mut index, total);
            if let Some((name, source)) = failures.into_iter().next() {
                error!(generator = %name, error = %format!("{source:#}"), "generator failed");
                self.emit(ProgressEvent::Error {
                    generator: name.clone(),
                    message: format!("{source:#}"),
                });
                return Err(OrchestratorError::Generator { name, source });
            }
            executed.extend(generators.iter().map(|g| g.name().to_string()));
        }

        self.emit(ProgressEvent::Done { total });
        let elapsed = started.elapsed();
        info!(total, elapsed_ms = elapsed.as_millis() as u64, "generation complete");
        Ok(RunSummary {
            executed,
            tiers: tiers.len(),
            elapsed,
        })
    }

    /// Fan out one tier and join every thread. Returns failures in registration order.
    fn run_tier(
        &self,
        generators: &[&dyn Generator],
        ctx: &GeneratorContext<'_>,
        index: &mut usize,
        total: usize,
    ) -> Vec<(String, anyhow::Error)> {
        thread::scope(|scope| {
            let handles: Vec<_> = generators
                .iter()
                .map(|generator| {
                    *index += 1;
                    let position = *index;
                    let name = generator.name().to_string();
                    self.emit(ProgressEvent::GeneratorStart {
                        name: name.clone(),
                        index: position,
                        total,
                    });
                    let handle = scope.spawn(move || {
                        let result = generator.generate(ctx);
                        if result.is_ok() {
                            debug!(generator = %generator.name(), "generator done");
                            self.emit(ProgressEvent::GeneratorDone {
                                name: generator.name().to_string(),
                                index: position,
                                total,
                            });
                        }
                        result
                    });
                    (name, handle)
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|(name, handle)| match handle.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some((name, err)),
                    Err(_) => Some((name, anyhow::anyhow!("generator panicked"))),
                })
                .collect()
        })
    }
}
