//! Record facades over decoded class data.
//!
//! Records are what the rest of the engine works with: they cache parsed
//! descriptors, carry the per-record attribute map, and hold the derived
//! hierarchy links the base hydrator fills in. Class records compare by
//! (provider, name); member records by (parent class, name, descriptor).

use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;

use hypo_types::{
    parse_class_signature, parse_method_descriptor, parse_method_signature,
    parse_type_descriptor, parse_type_signature, ClassSignature, MethodDescriptor,
    MethodSignature, Result as TypeResult, TypeDescriptor, TypeSignature,
};

use crate::attr::{AttributeKey, AttributeMap};
use crate::data::{
    flags, ClassData, ClassKind, Insn, LocalVariable, MemberRef, Visibility,
};

static PARSED_METHOD_DESCRIPTOR: Lazy<AttributeKey<MethodDescriptor>> =
    Lazy::new(|| AttributeKey::new("PARSED_METHOD_DESCRIPTOR"));
static PARSED_FIELD_DESCRIPTOR: Lazy<AttributeKey<TypeDescriptor>> =
    Lazy::new(|| AttributeKey::new("PARSED_FIELD_DESCRIPTOR"));
static PARSED_METHOD_SIGNATURE: Lazy<AttributeKey<MethodSignature>> =
    Lazy::new(|| AttributeKey::new("PARSED_METHOD_SIGNATURE"));
static PARSED_FIELD_SIGNATURE: Lazy<AttributeKey<TypeSignature>> =
    Lazy::new(|| AttributeKey::new("PARSED_FIELD_SIGNATURE"));
static PARSED_CLASS_SIGNATURE: Lazy<AttributeKey<ClassSignature>> =
    Lazy::new(|| AttributeKey::new("PARSED_CLASS_SIGNATURE"));

/// The provider a record belongs to, installed by the provider's decorator
/// right after decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderBinding {
    pub provider_id: u64,
    pub is_context: bool,
}

#[derive(Debug)]
pub struct ClassRecord {
    name: String,
    access_flags: u16,
    kind: ClassKind,
    signature: Option<String>,
    super_class: Option<String>,
    interfaces: Vec<String>,
    outer_class: Option<String>,
    inner_classes: Vec<String>,
    enclosing_method: Option<MemberRef>,
    fields: Vec<FieldRecord>,
    methods: Vec<MethodRecord>,
    children: Mutex<Vec<String>>,
    attributes: AttributeMap,
    binding: OnceCell<ProviderBinding>,
}

impl ClassRecord {
    pub fn new(data: ClassData) -> Self {
        let ClassData {
            name,
            access_flags,
            is_record,
            signature,
            super_class,
            interfaces,
            outer_class,
            inner_classes,
            enclosing_method,
            fields,
            methods,
        } = data;
        let kind = ClassKind::from_flags(access_flags, is_record);
        let fields = fields
            .into_iter()
            .map(|field| FieldRecord::new(name.clone(), field))
            .collect();
        let methods = methods
            .into_iter()
            .map(|method| MethodRecord::new(name.clone(), method))
            .collect();
        Self {
            name,
            access_flags,
            kind,
            signature,
            super_class,
            interfaces,
            outer_class,
            inner_classes,
            enclosing_method,
            fields,
            methods,
            children: Mutex::new(Vec::new()),
            attributes: AttributeMap::new(),
            binding: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.access_flags)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & flags::ACC_FINAL != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags & flags::ACC_SYNTHETIC != 0
    }

    /// `static` nested class (per the decoder's inner-class access flags).
    pub fn is_static_inner(&self) -> bool {
        self.access_flags & flags::ACC_STATIC != 0
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.super_class.as_deref()
    }

    pub fn interface_names(&self) -> &[String] {
        &self.interfaces
    }

    pub fn outer_class_name(&self) -> Option<&str> {
        self.outer_class.as_deref()
    }

    pub fn inner_class_names(&self) -> &[String] {
        &self.inner_classes
    }

    pub fn enclosing_method(&self) -> Option<&MemberRef> {
        self.enclosing_method.as_ref()
    }

    pub fn signature_text(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// The parsed generic class signature, computed once.
    pub fn signature(&self) -> Option<TypeResult<ClassSignature>> {
        let text = self.signature.as_deref()?;
        Some(
            self.attributes
                .try_compute_if_absent(&PARSED_CLASS_SIGNATURE, || parse_class_signature(text))
                .map(|sig| (*sig).clone()),
        )
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodRecord] {
        &self.methods
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodRecord> {
        self.methods.iter().filter(|m| m.is_constructor())
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodRecord> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.descriptor_text() == descriptor)
    }

    pub fn field(&self, name: &str, descriptor: &str) -> Option<&FieldRecord> {
        self.fields
            .iter()
            .find(|f| f.name() == name && f.descriptor_text() == descriptor)
    }

    pub fn constructor(&self, descriptor: &str) -> Option<&MethodRecord> {
        self.method("<init>", descriptor)
    }

    /// Install the provider binding. Returns false when already bound.
    pub fn bind_provider(&self, provider_id: u64, is_context: bool) -> bool {
        self.binding
            .set(ProviderBinding {
                provider_id,
                is_context,
            })
            .is_ok()
    }

    pub fn binding(&self) -> Option<ProviderBinding> {
        self.binding.get().copied()
    }

    pub fn provider_id(&self) -> Option<u64> {
        self.binding.get().map(|b| b.provider_id)
    }

    pub fn is_context_class(&self) -> bool {
        self.binding.get().is_some_and(|b| b.is_context)
    }

    /// Register a direct subclass/implementor, deduplicating by name.
    pub fn add_child(&self, name: impl Into<String>) {
        let name = name.into();
        let mut children = self.children.lock();
        if !children.contains(&name) {
            children.push(name);
        }
    }

    pub fn children(&self) -> Vec<String> {
        self.children.lock().clone()
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

impl PartialEq for ClassRecord {
    fn eq(&self, other: &Self) -> bool {
        self.provider_id() == other.provider_id() && self.name == other.name
    }
}

impl Eq for ClassRecord {}

impl Hash for ClassRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider_id().hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for ClassRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug)]
pub struct MethodRecord {
    parent_class: String,
    name: String,
    descriptor: String,
    signature: Option<String>,
    access_flags: u16,
    locals: Vec<LocalVariable>,
    code: Vec<Insn>,
    super_method: OnceCell<MemberRef>,
    child_methods: Mutex<Vec<MemberRef>>,
    attributes: AttributeMap,
}

impl MethodRecord {
    fn new(parent_class: String, data: crate::data::MethodData) -> Self {
        Self {
            parent_class,
            name: data.name,
            descriptor: data.descriptor,
            signature: data.signature,
            access_flags: data.access_flags,
            locals: data.locals,
            code: data.code,
            super_method: OnceCell::new(),
            child_methods: Mutex::new(Vec::new()),
            attributes: AttributeMap::new(),
        }
    }

    pub fn parent_class(&self) -> &str {
        &self.parent_class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor_text(&self) -> &str {
        &self.descriptor
    }

    /// The parsed method descriptor, computed once.
    pub fn descriptor(&self) -> TypeResult<MethodDescriptor> {
        self.attributes
            .try_compute_if_absent(&PARSED_METHOD_DESCRIPTOR, || {
                parse_method_descriptor(&self.descriptor)
            })
            .map(|desc| (*desc).clone())
    }

    pub fn signature_text(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn signature(&self) -> Option<TypeResult<MethodSignature>> {
        let text = self.signature.as_deref()?;
        Some(
            self.attributes
                .try_compute_if_absent(&PARSED_METHOD_SIGNATURE, || parse_method_signature(text))
                .map(|sig| (*sig).clone()),
        )
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.access_flags)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & flags::ACC_STATIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & flags::ACC_ABSTRACT != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & flags::ACC_FINAL != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags & flags::ACC_SYNTHETIC != 0
    }

    pub fn is_bridge(&self) -> bool {
        self.access_flags & flags::ACC_BRIDGE != 0
    }

    pub fn is_native(&self) -> bool {
        self.access_flags & flags::ACC_NATIVE != 0
    }

    pub fn locals(&self) -> &[LocalVariable] {
        &self.locals
    }

    pub fn local_at_slot(&self, slot: u16) -> Option<&LocalVariable> {
        self.locals.iter().find(|l| l.slot == slot)
    }

    pub fn code(&self) -> &[Insn] {
        &self.code
    }

    pub fn reference(&self) -> MemberRef {
        MemberRef::new(&self.parent_class, &self.name, &self.descriptor)
    }

    /// Install the override target. Returns false when already set.
    pub fn set_super_method(&self, target: MemberRef) -> bool {
        self.super_method.set(target).is_ok()
    }

    pub fn super_method(&self) -> Option<&MemberRef> {
        self.super_method.get()
    }

    pub fn add_child_method(&self, child: MemberRef) {
        let mut children = self.child_methods.lock();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    pub fn child_methods(&self) -> Vec<MemberRef> {
        self.child_methods.lock().clone()
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

impl PartialEq for MethodRecord {
    fn eq(&self, other: &Self) -> bool {
        self.parent_class == other.parent_class
            && self.name == other.name
            && self.descriptor == other.descriptor
    }
}

impl Eq for MethodRecord {}

impl Hash for MethodRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parent_class.hash(state);
        self.name.hash(state);
        self.descriptor.hash(state);
    }
}

impl fmt::Display for MethodRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}{}", self.parent_class, self.name, self.descriptor)
    }
}

#[derive(Debug)]
pub struct FieldRecord {
    parent_class: String,
    name: String,
    descriptor: String,
    signature: Option<String>,
    access_flags: u16,
    attributes: AttributeMap,
}

impl FieldRecord {
    fn new(parent_class: String, data: crate::data::FieldData) -> Self {
        Self {
            parent_class,
            name: data.name,
            descriptor: data.descriptor,
            signature: data.signature,
            access_flags: data.access_flags,
            attributes: AttributeMap::new(),
        }
    }

    pub fn parent_class(&self) -> &str {
        &self.parent_class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor_text(&self) -> &str {
        &self.descriptor
    }

    /// The parsed field type, computed once.
    pub fn descriptor(&self) -> TypeResult<TypeDescriptor> {
        self.attributes
            .try_compute_if_absent(&PARSED_FIELD_DESCRIPTOR, || {
                parse_type_descriptor(&self.descriptor)
            })
            .map(|desc| (*desc).clone())
    }

    pub fn signature_text(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn signature(&self) -> Option<TypeResult<TypeSignature>> {
        let text = self.signature.as_deref()?;
        Some(
            self.attributes
                .try_compute_if_absent(&PARSED_FIELD_SIGNATURE, || parse_type_signature(text))
                .map(|sig| (*sig).clone()),
        )
    }

    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.access_flags)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & flags::ACC_STATIC != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & flags::ACC_FINAL != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags & flags::ACC_SYNTHETIC != 0
    }

    pub fn reference(&self) -> MemberRef {
        MemberRef::new(&self.parent_class, &self.name, &self.descriptor)
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

impl PartialEq for FieldRecord {
    fn eq(&self, other: &Self) -> bool {
        self.parent_class == other.parent_class
            && self.name == other.name
            && self.descriptor == other.descriptor
    }
}

impl Eq for FieldRecord {}

impl Hash for FieldRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parent_class.hash(state);
        self.name.hash(state);
        self.descriptor.hash(state);
    }
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}:{}", self.parent_class, self.name, self.descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FieldData, MethodData};
    use hypo_types::TypeRepresentable;

    fn sample() -> ClassRecord {
        ClassRecord::new(
            ClassData::builder("a/Child")
                .super_class("a/Parent")
                .field(FieldData::new("count", "I"))
                .method(MethodData::new("test", "()V"))
                .method(MethodData::new("test", "(I)V"))
                .method(MethodData::constructor("(I)V"))
                .build(),
        )
    }

    #[test]
    fn member_lookups_discriminate_by_descriptor() {
        let class = sample();
        assert!(class.method("test", "()V").is_some());
        assert!(class.method("test", "(I)V").is_some());
        assert!(class.method("test", "(J)V").is_none());
        assert!(class.constructor("(I)V").is_some());
        assert!(class.constructor("()V").is_none());
        assert_eq!(class.constructors().count(), 1);
        assert!(class.field("count", "I").is_some());
    }

    #[test]
    fn parsed_descriptor_is_cached_and_interned() {
        let class = sample();
        let method = class.method("test", "(I)V").unwrap();
        let first = method.descriptor().unwrap();
        let second = method.descriptor().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_internal(), "(I)V");
    }

    #[test]
    fn provider_binding_is_write_once() {
        let class = sample();
        assert!(class.binding().is_none());
        assert!(class.bind_provider(1, false));
        assert!(!class.bind_provider(2, true));
        assert_eq!(class.provider_id(), Some(1));
        assert!(!class.is_context_class());
    }

    #[test]
    fn hierarchy_links_deduplicate() {
        let class = sample();
        class.add_child("a/GrandChild");
        class.add_child("a/GrandChild");
        assert_eq!(class.children(), vec!["a/GrandChild".to_string()]);

        let method = class.method("test", "()V").unwrap();
        let target = MemberRef::new("a/Parent", "test", "()V");
        assert!(method.set_super_method(target.clone()));
        assert!(!method.set_super_method(target.clone()));
        assert_eq!(method.super_method(), Some(&target));
    }
}
