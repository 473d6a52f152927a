//! Mappings completion: contributors plan changes over the hydrated class
//! graph plus an existing mapping set.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use hypo_core::HypoContext;
use hypo_hydrate::SYNTHETIC_SOURCES;
use hypo_model::ClassRecord;

use crate::changes::{CopyMethodMappingChange, MemberReference, RemoveClassMappingChange};
use crate::error::{MappingsError, Result};
use crate::model::{ClassMapping, MappingSet};
use crate::registry::ChangeRegistry;

/// Plans changes for one class at a time.
///
/// `record` is the hydrated class record (absent when the mapping names a
/// class that is not on the lookup path); `mapping` is the existing class
/// mapping (absent when iterating core classes the mapping set does not
/// cover yet). Contributors only submit changes; they never mutate the
/// mapping set directly.
pub trait ChangeContributor: Send + Sync {
    fn name(&self) -> &'static str;

    fn contribute(
        &self,
        class_name: &str,
        record: Option<&ClassRecord>,
        mapping: Option<&ClassMapping>,
        ctx: &HypoContext,
        registry: &ChangeRegistry,
    ) -> Result<()>;
}

/// Drives all contributors over a mapping set and returns the registry,
/// still unapplied.
pub struct MappingsCompletionManager<'ctx> {
    ctx: &'ctx HypoContext,
}

impl<'ctx> MappingsCompletionManager<'ctx> {
    pub fn new(ctx: &'ctx HypoContext) -> Self {
        Self { ctx }
    }

    /// One worker-pool task per class: first every mapped class (depth-first
    /// into inner mappings), then every core class the mapping set does not
    /// cover, so contributors can add mappings.
    pub fn complete(
        &self,
        mappings: &MappingSet,
        contributors: &[Arc<dyn ChangeContributor>],
    ) -> Result<ChangeRegistry> {
        let registry = ChangeRegistry::new();
        let mapped_names = mappings.class_names();
        let pool = self.ctx.pool().map_err(MappingsError::from)?;

        pool.install(|| {
            mapped_names.par_iter().try_for_each(|class_name| {
                let record = self.ctx.lookup().find_class(class_name)?;
                let mapping = mappings.get_class(class_name);
                self.run_contributors(
                    contributors,
                    class_name,
                    record.as_deref(),
                    mapping,
                    &registry,
                )
            })
        })?;

        let visited: HashSet<&str> = mapped_names.iter().map(String::as_str).collect();
        let unmapped: Vec<String> = self
            .ctx
            .core_providers()
            .all_classes()
            .map_err(MappingsError::from)?
            .into_iter()
            .map(|reference| reference.class_name)
            .filter(|name| !visited.contains(name.as_str()))
            .collect();

        pool.install(|| {
            unmapped.par_iter().try_for_each(|class_name| {
                let Some(record) = self.ctx.core_providers().find_class(class_name)? else {
                    return Ok(());
                };
                self.run_contributors(contributors, class_name, Some(&record), None, &registry)
            })
        })?;

        debug!(changes = registry.len(), "mappings completion collected");
        Ok(registry)
    }

    fn run_contributors(
        &self,
        contributors: &[Arc<dyn ChangeContributor>],
        class_name: &str,
        record: Option<&ClassRecord>,
        mapping: Option<&ClassMapping>,
        registry: &ChangeRegistry,
    ) -> Result<()> {
        for contributor in contributors {
            contributor
                .contribute(class_name, record, mapping, self.ctx, registry)
                .map_err(|err| {
                    MappingsError::for_contributor(contributor.name(), class_name, err)
                })?;
        }
        Ok(())
    }
}

/// Runs contributor groups sequentially, applying each group's registry to
/// the mapping set before the next group runs. This is how
/// incompatible-in-parallel contributors are sequenced.
#[derive(Default)]
pub struct ChangeChain {
    steps: Vec<Vec<Arc<dyn ChangeContributor>>>,
}

impl ChangeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(mut self, contributors: Vec<Arc<dyn ChangeContributor>>) -> Self {
        self.steps.push(contributors);
        self
    }

    pub fn run(&self, ctx: &HypoContext, mappings: &mut MappingSet) -> Result<()> {
        let manager = MappingsCompletionManager::new(ctx);
        for step in &self.steps {
            let registry = manager.complete(mappings, step)?;
            registry.apply(mappings)?;
        }
        Ok(())
    }
}

/// Copies method mappings down the override graph: a mapped method's name
/// and parameters propagate to every core method that overrides it.
pub struct CopyMappingsDownContributor;

impl ChangeContributor for CopyMappingsDownContributor {
    fn name(&self) -> &'static str {
        "copy-mappings-down"
    }

    fn contribute(
        &self,
        class_name: &str,
        record: Option<&ClassRecord>,
        mapping: Option<&ClassMapping>,
        _ctx: &HypoContext,
        registry: &ChangeRegistry,
    ) -> Result<()> {
        let (Some(record), Some(mapping)) = (record, mapping) else {
            return Ok(());
        };
        for method_mapping in mapping.method_mappings() {
            let Some(method) = record.method(
                method_mapping.obfuscated_name(),
                method_mapping.descriptor(),
            ) else {
                continue;
            };
            let from = MemberReference::method(
                class_name,
                method_mapping.obfuscated_name(),
                method_mapping.descriptor(),
            );
            for child in method.child_methods() {
                registry.submit(Box::new(CopyMethodMappingChange::new(
                    from.clone(),
                    MemberReference::method(child.class_name, child.name, child.descriptor),
                )));
            }
        }
        Ok(())
    }
}

/// Copies a real method's mapping onto its synthetic bridges, so the
/// forwarders rename together with the method they adapt to.
pub struct CopyMappingsToBridgesContributor;

impl ChangeContributor for CopyMappingsToBridgesContributor {
    fn name(&self) -> &'static str {
        "copy-mappings-to-bridges"
    }

    fn contribute(
        &self,
        class_name: &str,
        record: Option<&ClassRecord>,
        mapping: Option<&ClassMapping>,
        _ctx: &HypoContext,
        registry: &ChangeRegistry,
    ) -> Result<()> {
        let (Some(record), Some(mapping)) = (record, mapping) else {
            return Ok(());
        };
        for method_mapping in mapping.method_mappings() {
            let Some(method) = record.method(
                method_mapping.obfuscated_name(),
                method_mapping.descriptor(),
            ) else {
                continue;
            };
            let Some(sources) = method.attributes().get(&SYNTHETIC_SOURCES) else {
                continue;
            };
            let from = MemberReference::method(
                class_name,
                method_mapping.obfuscated_name(),
                method_mapping.descriptor(),
            );
            for bridge in sources.lock().iter() {
                registry.submit(Box::new(CopyMethodMappingChange::new(
                    from.clone(),
                    MemberReference::method(
                        bridge.class_name.clone(),
                        bridge.name.clone(),
                        bridge.descriptor.clone(),
                    ),
                )));
            }
        }
        Ok(())
    }
}

/// Removes mappings for classes that no longer resolve on the lookup path.
pub struct RemoveStaleMappingsContributor;

impl ChangeContributor for RemoveStaleMappingsContributor {
    fn name(&self) -> &'static str {
        "remove-stale-mappings"
    }

    fn contribute(
        &self,
        class_name: &str,
        record: Option<&ClassRecord>,
        mapping: Option<&ClassMapping>,
        _ctx: &HypoContext,
        registry: &ChangeRegistry,
    ) -> Result<()> {
        if record.is_none() && mapping.is_some() {
            registry.submit(Box::new(RemoveClassMappingChange::new(class_name)));
        }
        Ok(())
    }
}
