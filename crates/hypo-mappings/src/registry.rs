//! Accumulation and application of planned changes.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::changes::{ChangeTarget, MappingChange, MergeResult};
use crate::error::{MappingsError, Result};
use crate::model::MappingSet;

/// A recorded inability to combine two changes for one target.
#[derive(Debug, Clone)]
pub struct MergeFailure {
    pub target: ChangeTarget,
    pub first: String,
    pub second: String,
    pub reason: String,
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}`: {} vs {} ({})",
            self.target, self.first, self.second, self.reason
        )
    }
}

/// Collects changes, one per target.
///
/// On collision, two changes of the same concrete type are asked to merge;
/// a merge failure is recorded against the target and surfaced at apply
/// time. Two changes of different types for one target are a configuration
/// error: contributors that cannot share a pass must be sequenced with a
/// [`crate::ChangeChain`].
#[derive(Default)]
pub struct ChangeRegistry {
    changes: Mutex<BTreeMap<ChangeTarget, Box<dyn MappingChange>>>,
    failures: Mutex<Vec<MergeFailure>>,
}

impl ChangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, change: Box<dyn MappingChange>) {
        let target = change.target();
        let mut changes = self.changes.lock();
        match changes.entry(target.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(change);
            }
            Entry::Occupied(mut entry) => match entry.get().merge_with(change.as_ref()) {
                MergeResult::Merged(merged) => {
                    debug!(target = %target, "merged colliding changes");
                    entry.insert(merged);
                }
                MergeResult::Failed(reason) => {
                    self.failures.lock().push(MergeFailure {
                        target,
                        first: entry.get().describe(),
                        second: change.describe(),
                        reason,
                    });
                }
                MergeResult::Incompatible => {
                    self.failures.lock().push(MergeFailure {
                        target,
                        first: entry.get().describe(),
                        second: change.describe(),
                        reason: "different change types in one pass; sequence the \
                                 contributors into separate chain steps"
                            .to_string(),
                    });
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }

    pub fn failures(&self) -> Vec<MergeFailure> {
        self.failures.lock().clone()
    }

    /// Apply every collected change in target order. Deterministic for a
    /// fixed registry and input set. Fails up front when any merge failure
    /// was recorded.
    pub fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        let failures = self.failures.lock().clone();
        if !failures.is_empty() {
            return Err(MappingsError::Merge { failures });
        }
        let changes = self.changes.lock();
        for change in changes.values() {
            change.apply(mappings)?;
        }
        Ok(())
    }

    /// Non-failing variant of [`Self::apply`]: changes whose targets carry a
    /// recorded failure are skipped, everything else applies, and the
    /// diagnostics come back to the caller.
    pub fn apply_with_diagnostics(&self, mappings: &mut MappingSet) -> Vec<MergeFailure> {
        let failures = self.failures.lock().clone();
        let failed: std::collections::BTreeSet<&ChangeTarget> =
            failures.iter().map(|failure| &failure.target).collect();
        let changes = self.changes.lock();
        for (target, change) in changes.iter() {
            if failed.contains(target) {
                continue;
            }
            if change.apply(mappings).is_err() {
                debug!(target = %target, "change failed to apply");
            }
        }
        failures
    }
}

/// Apply a registry to a mapping set, returning per-failure diagnostics.
pub fn apply_changes(registry: &ChangeRegistry, mappings: &mut MappingSet) -> Vec<MergeFailure> {
    registry.apply_with_diagnostics(mappings)
}

impl fmt::Debug for ChangeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRegistry")
            .field("changes", &self.changes.lock().len())
            .field("failures", &self.failures.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{
        MemberReference, RemoveMemberMappingChange, RemoveParameterMappingChange,
        RenameMemberChange,
    };

    fn method() -> MemberReference {
        MemberReference::method("a/Subject", "mth", "(II)V")
    }

    #[test]
    fn parameter_removals_merge_by_union() {
        let registry = ChangeRegistry::new();
        registry.submit(Box::new(RemoveParameterMappingChange::new(method(), 0)));
        registry.submit(Box::new(RemoveParameterMappingChange::new(method(), 2)));
        assert_eq!(registry.len(), 1);
        assert!(registry.failures().is_empty());

        let mut mappings = MappingSet::new();
        let m = mappings
            .get_or_create_class("a/Subject")
            .get_or_create_method("mth", "(II)V");
        m.set_parameter(0, "a");
        m.set_parameter(1, "b");
        m.set_parameter(2, "c");
        registry.apply(&mut mappings).unwrap();

        let m = mappings.get_class("a/Subject").unwrap().method("mth", "(II)V").unwrap();
        assert!(m.parameter(0).is_none());
        assert!(m.parameter(1).is_some());
        assert!(m.parameter(2).is_none());
    }

    #[test]
    fn merge_on_equal_inputs_is_idempotent() {
        let registry = ChangeRegistry::new();
        registry.submit(Box::new(RenameMemberChange::new(method(), "renamed")));
        registry.submit(Box::new(RenameMemberChange::new(method(), "renamed")));
        assert_eq!(registry.len(), 1);
        assert!(registry.failures().is_empty());
    }

    #[test]
    fn conflicting_renames_fail_at_apply() {
        let registry = ChangeRegistry::new();
        registry.submit(Box::new(RenameMemberChange::new(method(), "first")));
        registry.submit(Box::new(RenameMemberChange::new(method(), "second")));

        let mut mappings = MappingSet::new();
        match registry.apply(&mut mappings) {
            Err(MappingsError::Merge { failures }) => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].first.contains("first"));
                assert!(failures[0].second.contains("second"));
            }
            other => panic!("expected merge failure, got {other:?}"),
        }
    }

    #[test]
    fn different_change_types_for_one_target_are_a_configuration_error() {
        let registry = ChangeRegistry::new();
        registry.submit(Box::new(RenameMemberChange::new(method(), "renamed")));
        registry.submit(Box::new(RemoveMemberMappingChange::new(method())));
        let failures = registry.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].reason.contains("chain"));
    }

    #[test]
    fn diagnostics_apply_skips_failed_targets() {
        let registry = ChangeRegistry::new();
        registry.submit(Box::new(RenameMemberChange::new(method(), "first")));
        registry.submit(Box::new(RenameMemberChange::new(method(), "second")));
        registry.submit(Box::new(RenameMemberChange::new(
            MemberReference::field("a/Subject", "fld"),
            "count",
        )));

        let mut mappings = MappingSet::new();
        let failures = apply_changes(&registry, &mut mappings);
        assert_eq!(failures.len(), 1);
        let class = mappings.get_class("a/Subject").unwrap();
        assert_eq!(class.field("fld").unwrap().deobfuscated_name(), Some("count"));
        assert!(class.method("mth", "(II)V").is_none());
    }

    #[test]
    fn apply_is_deterministic() {
        let build_registry = || {
            let registry = ChangeRegistry::new();
            registry.submit(Box::new(RenameMemberChange::new(
                MemberReference::method("b/Other", "m", "()V"),
                "beta",
            )));
            registry.submit(Box::new(RenameMemberChange::new(
                MemberReference::field("a/Subject", "fld"),
                "alpha",
            )));
            registry
        };
        let base = {
            let mut set = MappingSet::new();
            set.get_or_create_class("a/Subject");
            set
        };

        let mut first = base.clone();
        build_registry().apply(&mut first).unwrap();
        let mut second = base.clone();
        build_registry().apply(&mut second).unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
