use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::descriptor::PrimitiveType;
use crate::intern::Interner;
use crate::repr::TypeRepresentable;

/// A generic-level type argument (`*`, `TU;`, `+TU;`, `-TU;`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    Wildcard,
    Exact(TypeSignature),
    Extends(TypeSignature),
    Super(TypeSignature),
}

impl TypeArgument {
    fn write_internal(&self, out: &mut String) {
        match self {
            TypeArgument::Wildcard => out.push('*'),
            TypeArgument::Exact(sig) => out.push_str(sig.as_internal()),
            TypeArgument::Extends(sig) => {
                out.push('+');
                out.push_str(sig.as_internal());
            }
            TypeArgument::Super(sig) => {
                out.push('-');
                out.push_str(sig.as_internal());
            }
        }
    }

    pub fn as_readable(&self) -> String {
        match self {
            TypeArgument::Wildcard => "?".to_string(),
            TypeArgument::Exact(sig) => sig.as_readable(),
            TypeArgument::Extends(sig) => format!("? extends {}", sig.as_readable()),
            TypeArgument::Super(sig) => format!("? super {}", sig.as_readable()),
        }
    }

    pub fn signature(&self) -> Option<&TypeSignature> {
        match self {
            TypeArgument::Wildcard => None,
            TypeArgument::Exact(sig) | TypeArgument::Extends(sig) | TypeArgument::Super(sig) => {
                Some(sig)
            }
        }
    }
}

/// A formal type parameter (`T:Ljava/lang/Number;:Ljava/lang/Comparable;`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<TypeSignature>,
    pub interface_bounds: Vec<TypeSignature>,
}

impl TypeParameter {
    pub(crate) fn write_internal(&self, out: &mut String) {
        out.push_str(&self.name);
        out.push(':');
        if let Some(bound) = &self.class_bound {
            out.push_str(bound.as_internal());
        }
        for bound in &self.interface_bounds {
            out.push(':');
            out.push_str(bound.as_internal());
        }
    }

    pub fn as_readable(&self) -> String {
        let mut bounds: Vec<String> = Vec::new();
        if let Some(bound) = &self.class_bound {
            bounds.push(bound.as_readable());
        }
        for bound in &self.interface_bounds {
            bounds.push(bound.as_readable());
        }
        if bounds.is_empty() {
            self.name.clone()
        } else {
            format!("{} extends {}", self.name, bounds.join(" & "))
        }
    }
}

/// The class part of a [`TypeSignature`], with owner nesting.
///
/// `Lpkg/Outer<TA;>.Inner<TB;>;` parses to an `Inner` node whose `owner` is
/// the `pkg/Outer` node; `name` is then the simple name.
#[derive(Debug)]
pub struct ClassTypeSignature {
    pub owner: Option<TypeSignature>,
    pub name: String,
    pub type_arguments: Vec<TypeArgument>,
}

impl ClassTypeSignature {
    /// The `$`-joined internal name of the full owner chain.
    pub fn full_name(&self) -> String {
        match self.owner.as_ref().and_then(TypeSignature::as_class) {
            Some(owner) => format!("{}${}", owner.full_name(), self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug)]
pub enum SignatureKind {
    Primitive(PrimitiveType),
    Variable { name: String },
    Class(ClassTypeSignature),
    Array { dims: u8, component: TypeSignature },
}

struct SigNode {
    kind: SignatureKind,
    internal: String,
}

static SIGNATURES: Lazy<Interner<SigNode>> = Lazy::new(Interner::new);

/// An interned generic-level type.
#[derive(Clone)]
pub struct TypeSignature(Arc<SigNode>);

impl TypeSignature {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        let mut key = String::with_capacity(1);
        key.push(primitive.code());
        Self(SIGNATURES.intern(&key, |internal| SigNode {
            kind: SignatureKind::Primitive(primitive),
            internal,
        }))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = format!("T{name};");
        Self(SIGNATURES.intern(&key, |internal| SigNode {
            kind: SignatureKind::Variable { name },
            internal,
        }))
    }

    /// A class signature node. `owner` must itself be a class signature when
    /// present; `name` is the full internal name for top-level classes and the
    /// simple name for nested segments.
    pub fn class(
        owner: Option<TypeSignature>,
        name: impl Into<String>,
        type_arguments: Vec<TypeArgument>,
    ) -> Self {
        let name = name.into();
        debug_assert!(owner
            .as_ref()
            .map_or(true, |o| o.as_class().is_some()));
        let mut key = String::new();
        match &owner {
            Some(outer) => {
                let outer_internal = outer.as_internal();
                key.push_str(&outer_internal[..outer_internal.len() - 1]);
                key.push('.');
            }
            None => key.push('L'),
        }
        key.push_str(&name);
        if !type_arguments.is_empty() {
            key.push('<');
            for arg in &type_arguments {
                arg.write_internal(&mut key);
            }
            key.push('>');
        }
        key.push(';');
        Self(SIGNATURES.intern(&key, |internal| SigNode {
            kind: SignatureKind::Class(ClassTypeSignature {
                owner,
                name,
                type_arguments,
            }),
            internal,
        }))
    }

    /// An array signature. Nested array components collapse as for
    /// descriptors; zero dimensions yield the component itself.
    pub fn array(dims: u8, component: TypeSignature) -> Self {
        if dims == 0 {
            return component;
        }
        let (dims, component) = match component.kind() {
            SignatureKind::Array {
                dims: inner_dims,
                component: inner,
            } => (dims.saturating_add(*inner_dims), inner.clone()),
            _ => (dims, component.clone()),
        };
        let mut key = String::with_capacity(dims as usize + component.as_internal().len());
        for _ in 0..dims {
            key.push('[');
        }
        key.push_str(component.as_internal());
        Self(SIGNATURES.intern(&key, |internal| SigNode {
            kind: SignatureKind::Array { dims, component },
            internal,
        }))
    }

    pub fn kind(&self) -> &SignatureKind {
        &self.0.kind
    }

    pub fn intern_key(&self) -> &str {
        &self.0.internal
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self.kind(),
            SignatureKind::Primitive(PrimitiveType::Void)
        )
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self.kind() {
            SignatureKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassTypeSignature> {
        match self.kind() {
            SignatureKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn variable_name(&self) -> Option<&str> {
        match self.kind() {
            SignatureKind::Variable { name } => Some(name),
            _ => None,
        }
    }
}

impl TypeRepresentable for TypeSignature {
    fn as_internal(&self) -> &str {
        &self.0.internal
    }

    fn as_readable(&self) -> String {
        match self.kind() {
            SignatureKind::Primitive(p) => p.keyword().to_string(),
            SignatureKind::Variable { name } => name.clone(),
            SignatureKind::Class(class) => {
                let mut out = match &class.owner {
                    Some(owner) => format!("{}.{}", owner.as_readable(), class.name),
                    None => class.name.replace('/', "."),
                };
                if !class.type_arguments.is_empty() {
                    let args = class
                        .type_arguments
                        .iter()
                        .map(TypeArgument::as_readable)
                        .collect::<Vec<_>>()
                        .join(", ");
                    out.push('<');
                    out.push_str(&args);
                    out.push('>');
                }
                out
            }
            SignatureKind::Array { dims, component } => {
                let mut out = component.as_readable();
                for _ in 0..*dims {
                    out.push_str("[]");
                }
                out
            }
        }
    }
}

impl PartialEq for TypeSignature {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeSignature {}

impl Hash for TypeSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Arc::as_ptr(&self.0) as usize);
    }
}

impl PartialOrd for TypeSignature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeSignature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.internal.cmp(&other.0.internal)
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.internal)
    }
}

impl fmt::Debug for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSignature({})", self.0.internal)
    }
}

struct MethodSigNode {
    type_parameters: Vec<TypeParameter>,
    parameters: Vec<TypeSignature>,
    return_type: TypeSignature,
    throws: Vec<TypeSignature>,
    internal: String,
}

static METHOD_SIGNATURES: Lazy<Interner<MethodSigNode>> = Lazy::new(Interner::new);

/// An interned generic method signature (`<U:Ljava/lang/Object;>(TU;)TU;`).
#[derive(Clone)]
pub struct MethodSignature(Arc<MethodSigNode>);

impl MethodSignature {
    pub fn new(
        type_parameters: Vec<TypeParameter>,
        parameters: Vec<TypeSignature>,
        return_type: TypeSignature,
        throws: Vec<TypeSignature>,
    ) -> Self {
        let mut key = String::new();
        write_type_parameters(&mut key, &type_parameters);
        key.push('(');
        for param in &parameters {
            key.push_str(param.as_internal());
        }
        key.push(')');
        key.push_str(return_type.as_internal());
        for thrown in &throws {
            key.push('^');
            key.push_str(thrown.as_internal());
        }
        Self(METHOD_SIGNATURES.intern(&key, |internal| MethodSigNode {
            type_parameters,
            parameters,
            return_type,
            throws,
            internal,
        }))
    }

    pub fn type_parameters(&self) -> &[TypeParameter] {
        &self.0.type_parameters
    }

    pub fn parameters(&self) -> &[TypeSignature] {
        &self.0.parameters
    }

    pub fn return_type(&self) -> &TypeSignature {
        &self.0.return_type
    }

    pub fn throws(&self) -> &[TypeSignature] {
        &self.0.throws
    }

    pub fn intern_key(&self) -> &str {
        &self.0.internal
    }
}

impl TypeRepresentable for MethodSignature {
    fn as_internal(&self) -> &str {
        &self.0.internal
    }

    fn as_readable(&self) -> String {
        let mut out = String::new();
        if !self.0.type_parameters.is_empty() {
            let params = self
                .0
                .type_parameters
                .iter()
                .map(TypeParameter::as_readable)
                .collect::<Vec<_>>()
                .join(", ");
            out.push('<');
            out.push_str(&params);
            out.push_str("> ");
        }
        let params = self
            .0
            .parameters
            .iter()
            .map(TypeRepresentable::as_readable)
            .collect::<Vec<_>>()
            .join(", ");
        out.push('(');
        out.push_str(&params);
        out.push(')');
        out.push_str(&self.0.return_type.as_readable());
        out
    }
}

impl PartialEq for MethodSignature {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MethodSignature {}

impl Hash for MethodSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Arc::as_ptr(&self.0) as usize);
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.internal)
    }
}

impl fmt::Debug for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodSignature({})", self.0.internal)
    }
}

struct ClassSigNode {
    type_parameters: Vec<TypeParameter>,
    super_class: TypeSignature,
    interfaces: Vec<TypeSignature>,
    internal: String,
}

static CLASS_SIGNATURES: Lazy<Interner<ClassSigNode>> = Lazy::new(Interner::new);

/// An interned generic class signature
/// (`<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Iterable<TT;>;`).
#[derive(Clone)]
pub struct ClassSignature(Arc<ClassSigNode>);

impl ClassSignature {
    pub fn new(
        type_parameters: Vec<TypeParameter>,
        super_class: TypeSignature,
        interfaces: Vec<TypeSignature>,
    ) -> Self {
        let mut key = String::new();
        write_type_parameters(&mut key, &type_parameters);
        key.push_str(super_class.as_internal());
        for interface in &interfaces {
            key.push_str(interface.as_internal());
        }
        Self(CLASS_SIGNATURES.intern(&key, |internal| ClassSigNode {
            type_parameters,
            super_class,
            interfaces,
            internal,
        }))
    }

    pub fn type_parameters(&self) -> &[TypeParameter] {
        &self.0.type_parameters
    }

    pub fn super_class(&self) -> &TypeSignature {
        &self.0.super_class
    }

    pub fn interfaces(&self) -> &[TypeSignature] {
        &self.0.interfaces
    }

    pub fn intern_key(&self) -> &str {
        &self.0.internal
    }
}

impl TypeRepresentable for ClassSignature {
    fn as_internal(&self) -> &str {
        &self.0.internal
    }

    fn as_readable(&self) -> String {
        let mut out = String::new();
        if !self.0.type_parameters.is_empty() {
            let params = self
                .0
                .type_parameters
                .iter()
                .map(TypeParameter::as_readable)
                .collect::<Vec<_>>()
                .join(", ");
            out.push('<');
            out.push_str(&params);
            out.push_str("> ");
        }
        out.push_str("extends ");
        out.push_str(&self.0.super_class.as_readable());
        if !self.0.interfaces.is_empty() {
            out.push_str(" implements ");
            let interfaces = self
                .0
                .interfaces
                .iter()
                .map(TypeRepresentable::as_readable)
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&interfaces);
        }
        out
    }
}

impl PartialEq for ClassSignature {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassSignature {}

impl Hash for ClassSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Arc::as_ptr(&self.0) as usize);
    }
}

impl fmt::Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.internal)
    }
}

impl fmt::Debug for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassSignature({})", self.0.internal)
    }
}

fn write_type_parameters(out: &mut String, type_parameters: &[TypeParameter]) {
    if type_parameters.is_empty() {
        return;
    }
    out.push('<');
    for param in type_parameters {
        param.write_internal(out);
    }
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_class_signature_internal_form() {
        let outer = TypeSignature::class(
            None,
            "pkg/Outer",
            vec![TypeArgument::Exact(TypeSignature::variable("A"))],
        );
        let inner = TypeSignature::class(
            Some(outer.clone()),
            "Inner",
            vec![TypeArgument::Wildcard],
        );
        assert_eq!(inner.as_internal(), "Lpkg/Outer<TA;>.Inner<*>;");
        assert_eq!(inner.as_readable(), "pkg.Outer<A>.Inner<?>");
        assert_eq!(inner.as_class().unwrap().full_name(), "pkg/Outer$Inner");
    }

    #[test]
    fn method_signature_intern_identity() {
        let make = || {
            MethodSignature::new(
                vec![TypeParameter {
                    name: "U".into(),
                    class_bound: Some(TypeSignature::class(None, "java/lang/Object", vec![])),
                    interface_bounds: vec![],
                }],
                vec![TypeSignature::variable("U")],
                TypeSignature::variable("U"),
                vec![],
            )
        };
        assert_eq!(make(), make());
        assert_eq!(make().as_internal(), "<U:Ljava/lang/Object;>(TU;)TU;");
    }
}
