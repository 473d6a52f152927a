//! Planned mutations of a [`MappingSet`], submitted by contributors.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::model::MappingSet;

/// A class member target; `descriptor` is optional for fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberReference {
    pub class_name: String,
    pub name: String,
    pub descriptor: Option<String>,
}

impl MemberReference {
    pub fn field(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            descriptor: None,
        }
    }

    pub fn method(
        class_name: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            descriptor: Some(descriptor.into()),
        }
    }

    fn is_method(&self) -> bool {
        self.descriptor.as_deref().is_some_and(|d| d.starts_with('('))
    }
}

impl fmt::Display for MemberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.descriptor {
            Some(descriptor) => {
                write!(f, "{}#{}{}", self.class_name, self.name, descriptor)
            }
            None => write!(f, "{}#{}", self.class_name, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeTarget {
    Class(String),
    Member(MemberReference),
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTarget::Class(name) => f.write_str(name),
            ChangeTarget::Member(member) => member.fmt(f),
        }
    }
}

/// Outcome of asking one change to absorb another for the same target.
pub enum MergeResult {
    Merged(Box<dyn MappingChange>),
    /// The two requests are semantically incompatible; the submitters must
    /// be sequenced into separate chain steps.
    Failed(String),
    /// Different change types for one target: a configuration error.
    Incompatible,
}

/// A single planned change.
///
/// `merge_with` implements the `Mergeable` contract: where it returns
/// `Merged`, it must be commutative and associative, and merging a change
/// with an equal one must succeed with an equal result.
pub trait MappingChange: Send + Sync + fmt::Debug {
    fn target(&self) -> ChangeTarget;

    /// Identifying text for collision diagnostics.
    fn describe(&self) -> String;

    fn apply(&self, mappings: &mut MappingSet) -> Result<()>;

    fn merge_with(&self, _other: &dyn MappingChange) -> MergeResult {
        MergeResult::Incompatible
    }

    fn as_any(&self) -> &dyn Any;
}

/// Remove a class mapping (with its whole subtree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveClassMappingChange {
    pub class_name: String,
}

impl RemoveClassMappingChange {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }
}

impl MappingChange for RemoveClassMappingChange {
    fn target(&self) -> ChangeTarget {
        ChangeTarget::Class(self.class_name.clone())
    }

    fn describe(&self) -> String {
        format!("remove class mapping `{}`", self.class_name)
    }

    fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        mappings.remove_class(&self.class_name);
        Ok(())
    }

    fn merge_with(&self, other: &dyn MappingChange) -> MergeResult {
        match other.as_any().downcast_ref::<Self>() {
            Some(_) => MergeResult::Merged(Box::new(self.clone())),
            None => MergeResult::Incompatible,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a field or method mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveMemberMappingChange {
    pub member: MemberReference,
}

impl RemoveMemberMappingChange {
    pub fn new(member: MemberReference) -> Self {
        Self { member }
    }
}

impl MappingChange for RemoveMemberMappingChange {
    fn target(&self) -> ChangeTarget {
        ChangeTarget::Member(self.member.clone())
    }

    fn describe(&self) -> String {
        format!("remove mapping for `{}`", self.member)
    }

    fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        let Some(class) = mappings.get_class_mut(&self.member.class_name) else {
            return Ok(());
        };
        if self.member.is_method() {
            if let Some(descriptor) = self.member.descriptor.as_deref() {
                class.remove_method(&self.member.name, descriptor);
            }
        } else {
            class.remove_field(&self.member.name);
        }
        Ok(())
    }

    fn merge_with(&self, other: &dyn MappingChange) -> MergeResult {
        match other.as_any().downcast_ref::<Self>() {
            Some(_) => MergeResult::Merged(Box::new(self.clone())),
            None => MergeResult::Incompatible,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove one or more parameter mappings of a method. Merges with other
/// removals on the same method by index-set union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveParameterMappingChange {
    pub method: MemberReference,
    pub indices: BTreeSet<usize>,
}

impl RemoveParameterMappingChange {
    pub fn new(method: MemberReference, index: usize) -> Self {
        Self {
            method,
            indices: BTreeSet::from([index]),
        }
    }
}

impl MappingChange for RemoveParameterMappingChange {
    fn target(&self) -> ChangeTarget {
        ChangeTarget::Member(self.method.clone())
    }

    fn describe(&self) -> String {
        format!(
            "remove parameter mapping(s) {:?} of `{}`",
            self.indices, self.method
        )
    }

    fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        let Some(descriptor) = self.method.descriptor.as_deref() else {
            return Ok(());
        };
        let Some(class) = mappings.get_class_mut(&self.method.class_name) else {
            return Ok(());
        };
        let Some(method) = class.method_mut(&self.method.name, descriptor) else {
            return Ok(());
        };
        for index in &self.indices {
            method.remove_parameter(*index);
        }
        Ok(())
    }

    fn merge_with(&self, other: &dyn MappingChange) -> MergeResult {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) => {
                let mut merged = self.clone();
                merged.indices.extend(other.indices.iter().copied());
                MergeResult::Merged(Box::new(merged))
            }
            None => MergeResult::Incompatible,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Copy a method mapping (deobfuscated name and parameters) onto another
/// method, creating the target mapping as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyMethodMappingChange {
    pub from: MemberReference,
    pub to: MemberReference,
}

impl CopyMethodMappingChange {
    pub fn new(from: MemberReference, to: MemberReference) -> Self {
        Self { from, to }
    }
}

impl MappingChange for CopyMethodMappingChange {
    fn target(&self) -> ChangeTarget {
        ChangeTarget::Member(self.to.clone())
    }

    fn describe(&self) -> String {
        format!("copy method mapping `{}` to `{}`", self.from, self.to)
    }

    fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        let (Some(from_desc), Some(to_desc)) = (
            self.from.descriptor.as_deref(),
            self.to.descriptor.as_deref(),
        ) else {
            return Ok(());
        };
        let Some(source) = mappings
            .get_class(&self.from.class_name)
            .and_then(|class| class.method(&self.from.name, from_desc))
            .cloned()
        else {
            return Ok(());
        };
        mappings
            .get_or_create_class(&self.to.class_name)
            .get_or_create_method(&self.to.name, to_desc)
            .copy_from(&source);
        Ok(())
    }

    fn merge_with(&self, other: &dyn MappingChange) -> MergeResult {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) if other.from == self.from => {
                MergeResult::Merged(Box::new(self.clone()))
            }
            Some(other) => MergeResult::Failed(format!(
                "conflicting copy sources `{}` and `{}`",
                self.from, other.from
            )),
            None => MergeResult::Incompatible,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Set the deobfuscated name of a field or method mapping. Merges only with
/// an identical rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameMemberChange {
    pub member: MemberReference,
    pub new_name: String,
}

impl RenameMemberChange {
    pub fn new(member: MemberReference, new_name: impl Into<String>) -> Self {
        Self {
            member,
            new_name: new_name.into(),
        }
    }
}

impl MappingChange for RenameMemberChange {
    fn target(&self) -> ChangeTarget {
        ChangeTarget::Member(self.member.clone())
    }

    fn describe(&self) -> String {
        format!("rename `{}` to `{}`", self.member, self.new_name)
    }

    fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        let class = mappings.get_or_create_class(&self.member.class_name);
        if self.member.is_method() {
            if let Some(descriptor) = self.member.descriptor.as_deref() {
                class
                    .get_or_create_method(&self.member.name, descriptor)
                    .set_deobfuscated_name(Some(self.new_name.clone()));
            }
        } else {
            class
                .get_or_create_field(&self.member.name, self.member.descriptor.as_deref())
                .set_deobfuscated_name(Some(self.new_name.clone()));
        }
        Ok(())
    }

    fn merge_with(&self, other: &dyn MappingChange) -> MergeResult {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) if other.new_name == self.new_name => {
                MergeResult::Merged(Box::new(self.clone()))
            }
            Some(other) => MergeResult::Failed(format!(
                "conflicting target names `{}` and `{}`",
                self.new_name, other.new_name
            )),
            None => MergeResult::Incompatible,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Set the deobfuscated name of a class mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameClassChange {
    pub class_name: String,
    pub new_name: String,
}

impl RenameClassChange {
    pub fn new(class_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            new_name: new_name.into(),
        }
    }
}

impl MappingChange for RenameClassChange {
    fn target(&self) -> ChangeTarget {
        ChangeTarget::Class(self.class_name.clone())
    }

    fn describe(&self) -> String {
        format!("rename class `{}` to `{}`", self.class_name, self.new_name)
    }

    fn apply(&self, mappings: &mut MappingSet) -> Result<()> {
        mappings
            .get_or_create_class(&self.class_name)
            .set_deobfuscated_name(Some(self.new_name.clone()));
        Ok(())
    }

    fn merge_with(&self, other: &dyn MappingChange) -> MergeResult {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) if other.new_name == self.new_name => {
                MergeResult::Merged(Box::new(self.clone()))
            }
            Some(other) => MergeResult::Failed(format!(
                "conflicting target names `{}` and `{}`",
                self.new_name, other.new_name
            )),
            None => MergeResult::Incompatible,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
