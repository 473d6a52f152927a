//! The analysis context: configuration, provider sets and the worker pool.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use hypo_model::ClassRecord;

use crate::error::{CoreError, Result};
use crate::provider::{ClassProvider, Decorator, ProviderSet};

pub type DecoratorFactory = Arc<dyn Fn(&ClassProvider) -> Decorator + Send + Sync>;

#[derive(Clone)]
pub struct ContextConfig {
    /// Worker-pool size; `<= 0` means the host CPU count.
    pub parallelism: i32,
    /// When true, unresolved lookups fail with
    /// [`CoreError::ClassNotFound`]; when false they fold to absent.
    pub require_full_classpath: bool,
    /// Custom per-provider decorator wiring; `None` uses the default, which
    /// only back-links records to their provider.
    pub decorator_factory: Option<DecoratorFactory>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            parallelism: -1,
            require_full_classpath: true,
            decorator_factory: None,
        }
    }
}

impl fmt::Debug for ContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConfig")
            .field("parallelism", &self.parallelism)
            .field("require_full_classpath", &self.require_full_classpath)
            .field("decorator_factory", &self.decorator_factory.is_some())
            .finish()
    }
}

fn default_decorator(provider: &ClassProvider) -> Decorator {
    let provider_id = provider.id();
    let is_context = provider.is_context_provider();
    Box::new(move |record: &ClassRecord| {
        record.bind_provider(provider_id, is_context);
    })
}

/// Bundles the core and context provider sets, the configuration and a lazily
/// created work-stealing pool.
///
/// The combined lookup set resolves references during analysis (core first);
/// only the core set is iterated as hydration/completion subjects. Closing
/// the context while pool tasks are still running is a usage bug.
pub struct HypoContext {
    config: ContextConfig,
    core: ProviderSet,
    context: ProviderSet,
    lookup: ProviderSet,
    pool: OnceCell<rayon::ThreadPool>,
}

impl HypoContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Providers whose classes are analysis subjects.
    pub fn core_providers(&self) -> &ProviderSet {
        &self.core
    }

    /// Classpath-only providers.
    pub fn context_providers(&self) -> &ProviderSet {
        &self.context
    }

    /// The combined lookup domain (core first, then context).
    pub fn lookup(&self) -> &ProviderSet {
        &self.lookup
    }

    /// Resolve a class reference, honoring `require_full_classpath`.
    pub fn find_class(&self, name: &str) -> Result<Option<Arc<ClassRecord>>> {
        match self.lookup.find_class(name)? {
            Some(record) => Ok(Some(record)),
            None if self.config.require_full_classpath => {
                Err(CoreError::ClassNotFound(name.to_string()))
            }
            None => {
                debug!(class = name, "unresolved class reference folded to absent");
                Ok(None)
            }
        }
    }

    /// The worker pool, built on first demand.
    pub fn pool(&self) -> Result<&rayon::ThreadPool> {
        self.pool.get_or_try_init(|| {
            let threads = if self.config.parallelism <= 0 {
                std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1)
            } else {
                self.config.parallelism as usize
            };
            debug!(threads, "building worker pool");
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|index| format!("hypo-worker-{index}"))
                .build()?;
            Ok(pool)
        })
    }

    /// Shut the pool down and close every provider, aggregating failures.
    pub fn close(self) -> Result<()> {
        drop(self.pool);
        let mut failures = Vec::new();
        if let Err(err) = self.core.close() {
            failures.push(err);
        }
        if let Err(err) = self.context.close() {
            failures.push(err);
        }
        CoreError::aggregate_close(failures)
    }
}

impl fmt::Debug for HypoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HypoContext")
            .field("config", &self.config)
            .field("core", &self.core.providers().len())
            .field("context", &self.context.providers().len())
            .finish()
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    config: ContextConfig,
    core: Vec<Arc<ClassProvider>>,
    context: Vec<Arc<ClassProvider>>,
}

impl ContextBuilder {
    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a provider whose classes are analysis subjects.
    pub fn with_provider(mut self, provider: ClassProvider) -> Self {
        self.core.push(Arc::new(provider));
        self
    }

    /// Add a classpath-only provider.
    pub fn with_context_provider(mut self, provider: ClassProvider) -> Self {
        provider.mark_context();
        self.context.push(Arc::new(provider));
        self
    }

    pub fn build(self) -> Result<HypoContext> {
        let ContextBuilder {
            config,
            core,
            context,
        } = self;
        for provider in core.iter().chain(context.iter()) {
            let decorator = match &config.decorator_factory {
                Some(factory) => factory(provider),
                None => default_decorator(provider),
            };
            if !provider.install_decorator(decorator) {
                return Err(CoreError::precondition(
                    "provider already has a decorator installed",
                ));
            }
        }
        let lookup = ProviderSet::new(core.iter().chain(context.iter()).cloned().collect());
        Ok(HypoContext {
            config,
            core: ProviderSet::new(core),
            context: ProviderSet::new(context),
            lookup,
            pool: OnceCell::new(),
        })
    }
}
