//! Structural class data as produced by a class decoder.
//!
//! The byte-level decoder lives outside the engine; this module is its output
//! contract. Method bodies are carried as a compact instruction summary
//! ([`Insn`]) — just enough shape for the hydrators to pattern-match on.

use std::fmt;

pub mod flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_BRIDGE: u16 = 0x0040;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_ANNOTATION: u16 = 0x2000;
    pub const ACC_ENUM: u16 = 0x4000;
    pub const ACC_MODULE: u16 = 0x8000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    Module,
}

impl ClassKind {
    pub fn from_flags(access_flags: u16, is_record: bool) -> Self {
        if access_flags & flags::ACC_MODULE != 0 {
            ClassKind::Module
        } else if access_flags & flags::ACC_ANNOTATION != 0 {
            ClassKind::Annotation
        } else if access_flags & flags::ACC_INTERFACE != 0 {
            ClassKind::Interface
        } else if access_flags & flags::ACC_ENUM != 0 {
            ClassKind::Enum
        } else if is_record {
            ClassKind::Record
        } else {
            ClassKind::Class
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Package,
    Private,
}

impl Visibility {
    pub fn from_flags(access_flags: u16) -> Self {
        if access_flags & flags::ACC_PUBLIC != 0 {
            Visibility::Public
        } else if access_flags & flags::ACC_PROTECTED != 0 {
            Visibility::Protected
        } else if access_flags & flags::ACC_PRIVATE != 0 {
            Visibility::Private
        } else {
            Visibility::Package
        }
    }
}

/// A (class, name, descriptor) reference to a method or field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberRef {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(
        class_name: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}{}", self.class_name, self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// An `invokedynamic` callsite, pre-digested by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeDynamicInfo {
    /// Whether the bootstrap is the standard lambda metafactory.
    pub is_lambda_metafactory: bool,
    /// Callsite descriptor: captured argument types to functional interface.
    pub callsite_descriptor: String,
    /// The implementation method handle target (the lambda body).
    pub implementation: Option<MemberRef>,
    /// The functional-interface method, when the decoder resolved it.
    pub interface_method: Option<MemberRef>,
}

/// One entry of a method's instruction summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    /// Load a local-variable slot onto the stack.
    Load { slot: u16 },
    /// Store the stack top into a local-variable slot.
    Store { slot: u16 },
    /// Push a constant.
    Const,
    /// Allocate an instance.
    New { class_name: String },
    /// A reference or primitive conversion applied to the stack top.
    Cast { descriptor: String },
    Invoke {
        kind: InvokeKind,
        target: MemberRef,
    },
    InvokeDynamic(InvokeDynamicInfo),
    FieldAccess {
        target: MemberRef,
        is_store: bool,
    },
    Return,
    /// Anything the summary does not model.
    Other,
}

/// A local-variable-table entry: slot, optional source name, type and live
/// range (bytecode offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub slot: u16,
    pub name: Option<String>,
    pub descriptor: String,
    pub start: u32,
    pub length: u32,
}

#[derive(Debug, Clone)]
pub struct FieldData {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub access_flags: u16,
}

#[derive(Debug, Clone)]
pub struct MethodData {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub access_flags: u16,
    pub locals: Vec<LocalVariable>,
    pub code: Vec<Insn>,
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: String,
    pub access_flags: u16,
    pub is_record: bool,
    pub signature: Option<String>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub outer_class: Option<String>,
    pub inner_classes: Vec<String>,
    pub enclosing_method: Option<MemberRef>,
    pub fields: Vec<FieldData>,
    pub methods: Vec<MethodData>,
}

impl ClassData {
    pub fn builder(name: impl Into<String>) -> ClassDataBuilder {
        ClassDataBuilder::new(name)
    }
}

/// Fluent construction of [`ClassData`], used by decoders and tests.
#[derive(Debug, Clone)]
pub struct ClassDataBuilder {
    data: ClassData,
}

impl ClassDataBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            data: ClassData {
                name: name.into(),
                access_flags: flags::ACC_PUBLIC,
                is_record: false,
                signature: None,
                super_class: Some("java/lang/Object".to_string()),
                interfaces: Vec::new(),
                outer_class: None,
                inner_classes: Vec::new(),
                enclosing_method: None,
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn access_flags(mut self, access_flags: u16) -> Self {
        self.data.access_flags = access_flags;
        self
    }

    pub fn record_class(mut self) -> Self {
        self.data.is_record = true;
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.data.signature = Some(signature.into());
        self
    }

    pub fn super_class(mut self, name: impl Into<String>) -> Self {
        self.data.super_class = Some(name.into());
        self
    }

    pub fn no_super_class(mut self) -> Self {
        self.data.super_class = None;
        self
    }

    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.data.interfaces.push(name.into());
        self
    }

    pub fn outer_class(mut self, name: impl Into<String>) -> Self {
        self.data.outer_class = Some(name.into());
        self
    }

    pub fn inner_class(mut self, name: impl Into<String>) -> Self {
        self.data.inner_classes.push(name.into());
        self
    }

    pub fn enclosing_method(mut self, method: MemberRef) -> Self {
        self.data.enclosing_method = Some(method);
        self
    }

    pub fn field(mut self, field: FieldData) -> Self {
        self.data.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodData) -> Self {
        self.data.methods.push(method);
        self
    }

    pub fn build(self) -> ClassData {
        self.data
    }
}

impl FieldData {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            access_flags: flags::ACC_PRIVATE,
        }
    }

    pub fn access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

impl MethodData {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            access_flags: flags::ACC_PUBLIC,
            locals: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn constructor(descriptor: impl Into<String>) -> Self {
        Self::new("<init>", descriptor)
    }

    pub fn access_flags(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn local(mut self, local: LocalVariable) -> Self {
        self.locals.push(local);
        self
    }

    pub fn code(mut self, code: Vec<Insn>) -> Self {
        self.code = code;
        self
    }
}

impl LocalVariable {
    pub fn new(slot: u16, name: Option<&str>, descriptor: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.map(str::to_string),
            descriptor: descriptor.into(),
            start: 0,
            length: u32::MAX,
        }
    }

    pub fn live_range(mut self, start: u32, length: u32) -> Self {
        self.start = start;
        self.length = length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_flags() {
        assert_eq!(
            ClassKind::from_flags(flags::ACC_PUBLIC | flags::ACC_INTERFACE, false),
            ClassKind::Interface
        );
        assert_eq!(
            ClassKind::from_flags(
                flags::ACC_PUBLIC | flags::ACC_INTERFACE | flags::ACC_ANNOTATION,
                false
            ),
            ClassKind::Annotation
        );
        assert_eq!(ClassKind::from_flags(flags::ACC_ENUM, false), ClassKind::Enum);
        assert_eq!(ClassKind::from_flags(flags::ACC_PUBLIC, true), ClassKind::Record);
        assert_eq!(ClassKind::from_flags(flags::ACC_PUBLIC, false), ClassKind::Class);
    }

    #[test]
    fn visibility_from_flags() {
        assert_eq!(Visibility::from_flags(flags::ACC_PUBLIC), Visibility::Public);
        assert_eq!(Visibility::from_flags(flags::ACC_PROTECTED), Visibility::Protected);
        assert_eq!(Visibility::from_flags(flags::ACC_PRIVATE), Visibility::Private);
        assert_eq!(Visibility::from_flags(0), Visibility::Package);
    }
}
