use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::intern::Interner;
use crate::repr::TypeRepresentable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Void,
}

impl PrimitiveType {
    pub fn code(self) -> char {
        match self {
            PrimitiveType::Byte => 'B',
            PrimitiveType::Char => 'C',
            PrimitiveType::Short => 'S',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Void => 'V',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'B' => PrimitiveType::Byte,
            'C' => PrimitiveType::Char,
            'S' => PrimitiveType::Short,
            'I' => PrimitiveType::Int,
            'J' => PrimitiveType::Long,
            'F' => PrimitiveType::Float,
            'D' => PrimitiveType::Double,
            'Z' => PrimitiveType::Boolean,
            'V' => PrimitiveType::Void,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Void => "void",
        }
    }

    /// Integral value types (`boolean` and `void` are not).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Char
                | PrimitiveType::Short
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Types that occupy two local-variable slots.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveType::Long | PrimitiveType::Double)
    }
}

#[derive(Debug)]
pub struct ClassTypeDescriptor {
    pub name: String,
}

#[derive(Debug)]
pub struct ArrayTypeDescriptor {
    pub dims: u8,
    pub component: TypeDescriptor,
}

#[derive(Debug)]
pub enum DescriptorKind {
    Primitive(PrimitiveType),
    Class(ClassTypeDescriptor),
    Array(ArrayTypeDescriptor),
}

struct DescNode {
    kind: DescriptorKind,
    internal: String,
}

static DESCRIPTORS: Lazy<Interner<DescNode>> = Lazy::new(Interner::new);

/// An interned erasure-level type.
///
/// Equality and hashing are pointer-identity on the interned node, so values
/// compare in O(1) no matter how deep the type is.
#[derive(Clone)]
pub struct TypeDescriptor(Arc<DescNode>);

impl TypeDescriptor {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        let mut key = String::with_capacity(1);
        key.push(primitive.code());
        Self(DESCRIPTORS.intern(&key, |internal| DescNode {
            kind: DescriptorKind::Primitive(primitive),
            internal,
        }))
    }

    /// A class type by internal name (`java/lang/String`).
    pub fn class(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = format!("L{name};");
        Self(DESCRIPTORS.intern(&key, |internal| DescNode {
            kind: DescriptorKind::Class(ClassTypeDescriptor { name }),
            internal,
        }))
    }

    /// An array type. Nested array components are collapsed, so
    /// `array(1, array(2, int))` and `array(3, int)` are the same value.
    /// Zero dimensions yield the component itself.
    pub fn array(dims: u8, component: TypeDescriptor) -> Self {
        if dims == 0 {
            return component;
        }
        let (dims, component) = match component.kind() {
            DescriptorKind::Array(inner) => {
                (dims.saturating_add(inner.dims), inner.component.clone())
            }
            _ => (dims, component.clone()),
        };
        let mut key = String::with_capacity(dims as usize + component.as_internal().len());
        for _ in 0..dims {
            key.push('[');
        }
        key.push_str(component.as_internal());
        Self(DESCRIPTORS.intern(&key, |internal| DescNode {
            kind: DescriptorKind::Array(ArrayTypeDescriptor { dims, component }),
            internal,
        }))
    }

    pub fn kind(&self) -> &DescriptorKind {
        &self.0.kind
    }

    /// The stable intern key; equal to [`TypeRepresentable::as_internal`].
    pub fn intern_key(&self) -> &str {
        &self.0.internal
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self.kind(),
            DescriptorKind::Primitive(PrimitiveType::Void)
        )
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self.kind() {
            DescriptorKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self.kind() {
            DescriptorKind::Class(c) => Some(&c.name),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayTypeDescriptor> {
        match self.kind() {
            DescriptorKind::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl TypeRepresentable for TypeDescriptor {
    fn as_internal(&self) -> &str {
        &self.0.internal
    }

    fn as_readable(&self) -> String {
        match self.kind() {
            DescriptorKind::Primitive(p) => p.keyword().to_string(),
            DescriptorKind::Class(c) => c.name.replace('/', "."),
            DescriptorKind::Array(a) => {
                let mut out = a.component.as_readable();
                for _ in 0..a.dims {
                    out.push_str("[]");
                }
                out
            }
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Arc::as_ptr(&self.0) as usize);
    }
}

impl PartialOrd for TypeDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeDescriptor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.internal.cmp(&other.0.internal)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.internal)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.0.internal)
    }
}

struct MethodDescNode {
    params: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
    internal: String,
}

static METHOD_DESCRIPTORS: Lazy<Interner<MethodDescNode>> = Lazy::new(Interner::new);

/// An interned method descriptor (`(ILjava/lang/String;)V`).
#[derive(Clone)]
pub struct MethodDescriptor(Arc<MethodDescNode>);

impl MethodDescriptor {
    pub fn new(params: Vec<TypeDescriptor>, return_type: TypeDescriptor) -> Self {
        let mut key = String::from("(");
        for param in &params {
            key.push_str(param.as_internal());
        }
        key.push(')');
        key.push_str(return_type.as_internal());
        Self(METHOD_DESCRIPTORS.intern(&key, |internal| MethodDescNode {
            params,
            return_type,
            internal,
        }))
    }

    pub fn params(&self) -> &[TypeDescriptor] {
        &self.0.params
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.0.return_type
    }

    pub fn intern_key(&self) -> &str {
        &self.0.internal
    }

    /// Translate a local-variable slot to a parameter index.
    ///
    /// Slot 0 is the receiver for instance methods; `long`/`double` parameters
    /// occupy two slots.
    pub fn param_index_for_slot(&self, slot: u16, is_static: bool) -> Option<usize> {
        let mut cursor: u16 = if is_static { 0 } else { 1 };
        for (index, param) in self.0.params.iter().enumerate() {
            if cursor == slot {
                return Some(index);
            }
            let wide = param.as_primitive().is_some_and(PrimitiveType::is_wide);
            cursor += if wide { 2 } else { 1 };
        }
        None
    }

    /// Inverse of [`Self::param_index_for_slot`].
    pub fn slot_for_param(&self, index: usize, is_static: bool) -> Option<u16> {
        if index >= self.0.params.len() {
            return None;
        }
        let mut cursor: u16 = if is_static { 0 } else { 1 };
        for param in &self.0.params[..index] {
            let wide = param.as_primitive().is_some_and(PrimitiveType::is_wide);
            cursor += if wide { 2 } else { 1 };
        }
        Some(cursor)
    }
}

impl TypeRepresentable for MethodDescriptor {
    fn as_internal(&self) -> &str {
        &self.0.internal
    }

    fn as_readable(&self) -> String {
        let params = self
            .0
            .params
            .iter()
            .map(TypeRepresentable::as_readable)
            .collect::<Vec<_>>()
            .join(", ");
        format!("({params}){}", self.0.return_type.as_readable())
    }
}

impl PartialEq for MethodDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MethodDescriptor {}

impl Hash for MethodDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(Arc::as_ptr(&self.0) as usize);
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.internal)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodDescriptor({})", self.0.internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_values_are_identity_equal() {
        let a = TypeDescriptor::class("java/lang/String");
        let b = TypeDescriptor::class("java/lang/String");
        assert_eq!(a, b);
        assert_ne!(a, TypeDescriptor::class("java/lang/Object"));
    }

    #[test]
    fn nested_arrays_collapse() {
        let int = TypeDescriptor::primitive(PrimitiveType::Int);
        let a = TypeDescriptor::array(1, TypeDescriptor::array(2, int.clone()));
        let b = TypeDescriptor::array(3, int);
        assert_eq!(a, b);
        assert_eq!(a.as_internal(), "[[[I");
    }

    #[test]
    fn slot_translation_accounts_for_wide_params() {
        let desc = MethodDescriptor::new(
            vec![
                TypeDescriptor::primitive(PrimitiveType::Long),
                TypeDescriptor::primitive(PrimitiveType::Int),
            ],
            TypeDescriptor::primitive(PrimitiveType::Void),
        );
        assert_eq!(desc.param_index_for_slot(1, false), Some(0));
        assert_eq!(desc.param_index_for_slot(3, false), Some(1));
        assert_eq!(desc.param_index_for_slot(2, false), None);
        assert_eq!(desc.slot_for_param(1, false), Some(3));
        assert_eq!(desc.slot_for_param(1, true), Some(2));
    }

    #[test]
    fn readable_forms() {
        let desc = MethodDescriptor::new(
            vec![
                TypeDescriptor::primitive(PrimitiveType::Int),
                TypeDescriptor::array(1, TypeDescriptor::class("java/lang/String")),
            ],
            TypeDescriptor::primitive(PrimitiveType::Void),
        );
        assert_eq!(desc.as_readable(), "(int, java.lang.String[])void");
    }
}
