//! Phase 2: provider hydration.
//!
//! The manager holds three ordered hydrator lists, one per record kind. Each
//! core class gets one worker-pool task that runs class-level, then
//! method-level, then field-level hydrators in declaration order. Classes
//! hydrate in no particular order relative to each other.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use hypo_core::HypoContext;
use hypo_model::{ClassRecord, FieldRecord, MethodRecord};

use crate::base;
use crate::bridges::SyntheticBridgeHydrator;
use crate::closures::{LambdaClosureHydrator, LocalClassClosureHydrator};
use crate::error::{HydrationError, Result};
use crate::supercall::SuperConstructorHydrator;

/// A hydrator targeting whole classes.
///
/// `hydrate` may read or write attributes on any record reachable through
/// the context. Writes must be idempotent under re-run, and concurrent
/// writes to the same record must go through the attribute map's
/// `compute_if_absent`.
pub trait ClassHydrator: Send + Sync {
    fn name(&self) -> &'static str;
    fn hydrate(&self, class: &ClassRecord, ctx: &HypoContext) -> Result<()>;
}

pub trait MethodHydrator: Send + Sync {
    fn name(&self) -> &'static str;
    fn hydrate(&self, class: &ClassRecord, method: &MethodRecord, ctx: &HypoContext)
        -> Result<()>;
}

pub trait FieldHydrator: Send + Sync {
    fn name(&self) -> &'static str;
    fn hydrate(&self, class: &ClassRecord, field: &FieldRecord, ctx: &HypoContext) -> Result<()>;
}

#[derive(Default)]
pub struct HydrationManager {
    class_hydrators: Vec<Arc<dyn ClassHydrator>>,
    method_hydrators: Vec<Arc<dyn MethodHydrator>>,
    field_hydrators: Vec<Arc<dyn FieldHydrator>>,
}

impl HydrationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in hydrator set: lambda/local-class closures, synthetic
    /// bridges and super-constructor links.
    pub fn with_default_hydrators() -> Self {
        let mut manager = Self::new();
        manager.register_class_hydrator(Arc::new(LambdaClosureHydrator));
        manager.register_class_hydrator(Arc::new(LocalClassClosureHydrator));
        manager.register_method_hydrator(Arc::new(SyntheticBridgeHydrator));
        manager.register_method_hydrator(Arc::new(SuperConstructorHydrator));
        manager
    }

    pub fn register_class_hydrator(&mut self, hydrator: Arc<dyn ClassHydrator>) {
        self.class_hydrators.push(hydrator);
    }

    pub fn register_method_hydrator(&mut self, hydrator: Arc<dyn MethodHydrator>) {
        self.method_hydrators.push(hydrator);
    }

    pub fn register_field_hydrator(&mut self, hydrator: Arc<dyn FieldHydrator>) {
        self.field_hydrators.push(hydrator);
    }

    /// Run both hydration phases: base hierarchy, then the registered
    /// hydrators.
    pub fn hydrate(&self, ctx: &HypoContext) -> Result<()> {
        base::hydrate_hierarchy(ctx)?;
        self.run_hydrators(ctx)
    }

    fn run_hydrators(&self, ctx: &HypoContext) -> Result<()> {
        if self.class_hydrators.is_empty()
            && self.method_hydrators.is_empty()
            && self.field_hydrators.is_empty()
        {
            return Ok(());
        }
        let references = ctx.core_providers().all_classes()?;
        let pool = ctx.pool()?;
        pool.install(|| {
            references.par_iter().try_for_each(|reference| {
                self.hydrate_class(ctx, &reference.class_name)
                    .map_err(|err| HydrationError::for_class(&reference.class_name, err))
            })
        })
    }

    fn hydrate_class(&self, ctx: &HypoContext, class_name: &str) -> Result<()> {
        let Some(class) = ctx.core_providers().find_class(class_name)? else {
            return Ok(());
        };
        debug!(class = class.name(), "running hydration providers");
        for hydrator in &self.class_hydrators {
            hydrator
                .hydrate(&class, ctx)
                .map_err(|err| HydrationError::for_provider(hydrator.name(), class.name(), err))?;
        }
        for method in class.methods() {
            for hydrator in &self.method_hydrators {
                hydrator.hydrate(&class, method, ctx).map_err(|err| {
                    HydrationError::for_provider(hydrator.name(), method.to_string(), err)
                })?;
            }
        }
        for field in class.fields() {
            for hydrator in &self.field_hydrators {
                hydrator.hydrate(&class, field, ctx).map_err(|err| {
                    HydrationError::for_provider(hydrator.name(), field.to_string(), err)
                })?;
            }
        }
        Ok(())
    }
}

/// Hydrate with the built-in hydrator set.
pub fn hydrate(ctx: &HypoContext) -> Result<()> {
    HydrationManager::with_default_hydrators().hydrate(ctx)
}
