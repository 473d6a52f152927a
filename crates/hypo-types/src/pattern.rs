//! Composable structural predicates over type values.
//!
//! Patterns are total: evaluating any pattern against any type yields a plain
//! match/no-match answer and never panics. Captures bind the matched type to
//! a named slot in the [`PatternContext`] for later backreference.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{MethodDescriptor, PrimitiveType, TypeDescriptor};
use crate::signature::{MethodSignature, SignatureKind, TypeParameter, TypeSignature};

/// Any type value a pattern can be evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyType {
    Descriptor(TypeDescriptor),
    MethodDescriptor(MethodDescriptor),
    Signature(TypeSignature),
    MethodSignature(MethodSignature),
    Parameter(TypeParameter),
}

impl AnyType {
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            AnyType::Descriptor(d) => d.as_primitive(),
            AnyType::Signature(s) => s.as_primitive(),
            _ => None,
        }
    }

    /// The full internal name of a class type (`pkg/Outer$Inner`), if this is
    /// one. Nested signature segments are joined with `$` to line up with the
    /// erased naming used by descriptors.
    pub fn class_name(&self) -> Option<String> {
        match self {
            AnyType::Descriptor(d) => d.class_name().map(str::to_string),
            AnyType::Signature(s) => s.as_class().map(|c| c.full_name()),
            _ => None,
        }
    }

    /// The declared name of a type variable or type parameter.
    pub fn name(&self) -> Option<&str> {
        match self {
            AnyType::Signature(s) => s.variable_name(),
            AnyType::Parameter(p) => Some(&p.name),
            _ => None,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(
            self,
            AnyType::MethodDescriptor(_) | AnyType::MethodSignature(_)
        )
    }

    fn is_value(&self) -> bool {
        matches!(self, AnyType::Descriptor(_) | AnyType::Signature(_))
    }

    fn is_void(&self) -> bool {
        self.as_primitive() == Some(PrimitiveType::Void)
    }

    fn return_is_void(&self) -> bool {
        match self {
            AnyType::MethodDescriptor(d) => d.return_type().is_void(),
            AnyType::MethodSignature(s) => s.return_type().is_void(),
            _ => false,
        }
    }
}

impl From<TypeDescriptor> for AnyType {
    fn from(value: TypeDescriptor) -> Self {
        AnyType::Descriptor(value)
    }
}

impl From<MethodDescriptor> for AnyType {
    fn from(value: MethodDescriptor) -> Self {
        AnyType::MethodDescriptor(value)
    }
}

impl From<TypeSignature> for AnyType {
    fn from(value: TypeSignature) -> Self {
        AnyType::Signature(value)
    }
}

impl From<MethodSignature> for AnyType {
    fn from(value: MethodSignature) -> Self {
        AnyType::MethodSignature(value)
    }
}

impl From<TypeParameter> for AnyType {
    fn from(value: TypeParameter) -> Self {
        AnyType::Parameter(value)
    }
}

/// Named capture slots populated while a pattern evaluates.
#[derive(Debug, Clone, Default)]
pub struct PatternContext {
    slots: HashMap<String, AnyType>,
}

impl PatternContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<&AnyType> {
        self.slots.get(slot)
    }

    pub fn bind(&mut self, slot: impl Into<String>, ty: AnyType) {
        self.slots.insert(slot.into(), ty);
    }
}

type PatternFn = dyn Fn(&AnyType, &mut PatternContext) -> bool + Send + Sync;

/// A composable predicate over an [`AnyType`].
#[derive(Clone)]
pub struct Pattern {
    eval: Arc<PatternFn>,
}

impl Pattern {
    pub fn new(eval: impl Fn(&AnyType, &mut PatternContext) -> bool + Send + Sync + 'static) -> Self {
        Self {
            eval: Arc::new(eval),
        }
    }

    pub fn matches(&self, ty: &AnyType, ctx: &mut PatternContext) -> bool {
        (self.eval)(ty, ctx)
    }

    /// Evaluate against a fresh context.
    pub fn test(&self, ty: &AnyType) -> bool {
        self.matches(ty, &mut PatternContext::new())
    }

    pub fn and(self, other: Pattern) -> Pattern {
        Pattern::new(move |ty, ctx| self.matches(ty, ctx) && other.matches(ty, ctx))
    }

    pub fn or(self, other: Pattern) -> Pattern {
        Pattern::new(move |ty, ctx| self.matches(ty, ctx) || other.matches(ty, ctx))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Pattern {
        Pattern::new(move |ty, ctx| !self.matches(ty, ctx))
    }

    /// On match, bind the matched type to `slot`.
    pub fn capture(self, slot: &str) -> Pattern {
        let slot = slot.to_string();
        Pattern::new(move |ty, ctx| {
            if self.matches(ty, ctx) {
                ctx.bind(slot.clone(), ty.clone());
                true
            } else {
                false
            }
        })
    }
}

/// Matches every type.
pub fn any() -> Pattern {
    Pattern::new(|_, _| true)
}

pub fn primitive() -> Pattern {
    Pattern::new(|ty, _| ty.as_primitive().is_some())
}

pub fn integer() -> Pattern {
    Pattern::new(|ty, _| ty.as_primitive().is_some_and(PrimitiveType::is_integer))
}

pub fn floating() -> Pattern {
    Pattern::new(|ty, _| ty.as_primitive().is_some_and(PrimitiveType::is_floating))
}

pub fn wide() -> Pattern {
    Pattern::new(|ty, _| ty.as_primitive().is_some_and(PrimitiveType::is_wide))
}

/// A non-`void` value type, or a method whose return type is non-`void`.
pub fn returnable() -> Pattern {
    Pattern::new(|ty, _| {
        if ty.is_method() {
            !ty.return_is_void()
        } else {
            ty.is_value() && !ty.is_void()
        }
    })
}

/// A non-`void`, non-method value type.
pub fn assignable() -> Pattern {
    Pattern::new(|ty, _| ty.is_value() && !ty.is_void())
}

pub fn class() -> Pattern {
    Pattern::new(|ty, _| ty.class_name().is_some())
}

pub fn class_named(name: &str) -> Pattern {
    let name = name.to_string();
    Pattern::new(move |ty, _| ty.class_name().as_deref() == Some(name.as_str()))
}

pub fn class_where(pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> Pattern {
    Pattern::new(move |ty, _| ty.class_name().as_deref().is_some_and(&pred))
}

pub fn array() -> Pattern {
    array_matching(None, None)
}

/// An array type, optionally constrained by dimension count and a component
/// pattern.
pub fn array_matching(dims: Option<u8>, component: Option<Pattern>) -> Pattern {
    Pattern::new(move |ty, ctx| {
        let (found_dims, found_component) = match ty {
            AnyType::Descriptor(d) => match d.as_array() {
                Some(a) => (a.dims, AnyType::Descriptor(a.component.clone())),
                None => return false,
            },
            AnyType::Signature(s) => match s.kind() {
                SignatureKind::Array { dims, component } => {
                    (*dims, AnyType::Signature(component.clone()))
                }
                _ => return false,
            },
            _ => return false,
        };
        if dims.is_some_and(|want| want != found_dims) {
            return false;
        }
        component
            .as_ref()
            .map_or(true, |p| p.matches(&found_component, ctx))
    })
}

/// A class signature carrying any type arguments.
pub fn has_type_arguments() -> Pattern {
    Pattern::new(|ty, _| match ty {
        AnyType::Signature(s) => s
            .as_class()
            .is_some_and(|c| !c.type_arguments.is_empty()),
        _ => false,
    })
}

/// A class signature carrying exactly `n` type arguments.
pub fn has_type_arguments_exactly(n: usize) -> Pattern {
    Pattern::new(move |ty, _| match ty {
        AnyType::Signature(s) => s.as_class().is_some_and(|c| c.type_arguments.len() == n),
        _ => false,
    })
}

/// A nested class signature whose owner matches `pattern`.
pub fn owner_is(pattern: Pattern) -> Pattern {
    Pattern::new(move |ty, ctx| match ty {
        AnyType::Signature(s) => s.as_class().and_then(|c| c.owner.clone()).is_some_and(|o| {
            pattern.matches(&AnyType::Signature(o), ctx)
        }),
        _ => false,
    })
}

/// A type variable or type parameter whose name satisfies `pred`.
pub fn has_name(pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> Pattern {
    Pattern::new(move |ty, _| ty.name().is_some_and(&pred))
}

/// A type parameter whose class bound matches `pattern`.
pub fn has_class_bound(pattern: Pattern) -> Pattern {
    Pattern::new(move |ty, ctx| match ty {
        AnyType::Parameter(p) => p
            .class_bound
            .as_ref()
            .is_some_and(|b| pattern.matches(&AnyType::Signature(b.clone()), ctx)),
        _ => false,
    })
}

/// A type parameter whose interface bounds match `patterns` pairwise.
pub fn has_interface_bounds(patterns: Vec<Pattern>) -> Pattern {
    Pattern::new(move |ty, ctx| match ty {
        AnyType::Parameter(p) => {
            p.interface_bounds.len() == patterns.len()
                && p.interface_bounds
                    .iter()
                    .zip(&patterns)
                    .all(|(bound, pattern)| {
                        pattern.matches(&AnyType::Signature(bound.clone()), ctx)
                    })
        }
        _ => false,
    })
}

/// Matches a type equal to one previously bound to `slot`.
pub fn captured(slot: &str) -> Pattern {
    let slot = slot.to_string();
    Pattern::new(move |ty, ctx| ctx.get(&slot) == Some(ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{
        parse_class_signature, parse_method_descriptor, parse_type_descriptor,
        parse_type_signature,
    };

    fn sample_types() -> Vec<AnyType> {
        let class_sig = parse_class_signature(
            "<T:Ljava/lang/Number;:Ljava/lang/Comparable;>Ljava/lang/Object;",
        )
        .unwrap();
        vec![
            parse_type_descriptor("I").unwrap().into(),
            parse_type_descriptor("J").unwrap().into(),
            parse_type_descriptor("V").unwrap().into(),
            parse_type_descriptor("[[D").unwrap().into(),
            parse_type_descriptor("Ljava/lang/String;").unwrap().into(),
            parse_method_descriptor("(I)V").unwrap().into(),
            parse_method_descriptor("()Ljava/lang/Object;").unwrap().into(),
            parse_type_signature("TT;").unwrap().into(),
            parse_type_signature("Ljava/util/List<+TT;>;").unwrap().into(),
            parse_type_signature("Lpkg/Outer<TA;>.Inner;").unwrap().into(),
            class_sig.type_parameters()[0].clone().into(),
        ]
    }

    fn all_patterns() -> Vec<Pattern> {
        vec![
            any(),
            primitive(),
            integer(),
            floating(),
            wide(),
            returnable(),
            assignable(),
            class(),
            class_named("java/lang/String"),
            class_where(|name| name.starts_with("java/")),
            array(),
            array_matching(Some(2), Some(floating())),
            has_type_arguments(),
            has_type_arguments_exactly(1),
            owner_is(class_named("pkg/Outer")),
            has_name(|name| name == "T"),
            has_class_bound(class_named("java/lang/Number")),
            has_interface_bounds(vec![class_named("java/lang/Comparable")]),
            integer().and(wide()),
            class().or(primitive()),
            array().not(),
            any().capture("x"),
            captured("x"),
        ]
    }

    #[test]
    fn patterns_are_total() {
        for pattern in all_patterns() {
            for ty in sample_types() {
                let mut ctx = PatternContext::new();
                // Just must not panic.
                let _ = pattern.matches(&ty, &mut ctx);
            }
        }
    }

    #[test]
    fn primitive_classification() {
        let int: AnyType = parse_type_descriptor("I").unwrap().into();
        let long: AnyType = parse_type_descriptor("J").unwrap().into();
        let double: AnyType = parse_type_descriptor("D").unwrap().into();
        let void: AnyType = parse_type_descriptor("V").unwrap().into();
        assert!(integer().test(&int));
        assert!(integer().test(&long));
        assert!(!integer().test(&double));
        assert!(wide().test(&long) && wide().test(&double));
        assert!(floating().test(&double));
        assert!(!assignable().test(&void));
        assert!(!returnable().test(&void));
    }

    #[test]
    fn returnable_looks_through_methods() {
        let void_method: AnyType = parse_method_descriptor("(I)V").unwrap().into();
        let obj_method: AnyType = parse_method_descriptor("()Ljava/lang/Object;").unwrap().into();
        assert!(!returnable().test(&void_method));
        assert!(returnable().test(&obj_method));
        assert!(!assignable().test(&obj_method));
    }

    #[test]
    fn array_matching_constraints() {
        let arr: AnyType = parse_type_descriptor("[[D").unwrap().into();
        assert!(array().test(&arr));
        assert!(array_matching(Some(2), Some(floating())).test(&arr));
        assert!(!array_matching(Some(1), None).test(&arr));
        assert!(!array_matching(Some(2), Some(integer())).test(&arr));
    }

    #[test]
    fn nested_owner_and_type_arguments() {
        let list: AnyType = parse_type_signature("Ljava/util/List<+TT;>;").unwrap().into();
        let inner: AnyType = parse_type_signature("Lpkg/Outer<TA;>.Inner;").unwrap().into();
        assert!(has_type_arguments().test(&list));
        assert!(has_type_arguments_exactly(1).test(&list));
        assert!(owner_is(class_named("pkg/Outer")).test(&inner));
        assert!(class_named("pkg/Outer$Inner").test(&inner));
    }

    #[test]
    fn captures_backreference() {
        let string: AnyType = parse_type_descriptor("Ljava/lang/String;").unwrap().into();
        let object: AnyType = parse_type_descriptor("Ljava/lang/Object;").unwrap().into();
        let mut ctx = PatternContext::new();
        assert!(class().capture("elem").matches(&string, &mut ctx));
        assert!(captured("elem").matches(&string, &mut ctx));
        assert!(!captured("elem").matches(&object, &mut ctx));
        assert_eq!(ctx.get("elem"), Some(&string));
    }

    #[test]
    fn type_parameter_bounds() {
        let class_sig = parse_class_signature(
            "<T:Ljava/lang/Number;:Ljava/lang/Comparable;>Ljava/lang/Object;",
        )
        .unwrap();
        let param: AnyType = class_sig.type_parameters()[0].clone().into();
        assert!(has_name(|n| n == "T").test(&param));
        assert!(has_class_bound(class_named("java/lang/Number")).test(&param));
        assert!(has_interface_bounds(vec![class_named("java/lang/Comparable")]).test(&param));
        assert!(!has_interface_bounds(vec![]).test(&param));
    }
}
