#![forbid(unsafe_code)]

//! Type representation for the Hypo class model: erasure-level descriptors,
//! generic-level signatures, a process-wide intern table and a structural
//! pattern matcher.

mod descriptor;
mod error;
mod intern;
mod parse;
pub mod pattern;
mod repr;
mod signature;

pub use crate::descriptor::{
    ArrayTypeDescriptor, ClassTypeDescriptor, DescriptorKind, MethodDescriptor, PrimitiveType,
    TypeDescriptor,
};
pub use crate::error::{Result, TypeError};
pub use crate::parse::{
    parse_class_signature, parse_method_descriptor, parse_method_signature, parse_type_descriptor,
    parse_type_signature,
};
pub use crate::pattern::{AnyType, Pattern, PatternContext};
pub use crate::repr::TypeRepresentable;
pub use crate::signature::{
    ClassSignature, ClassTypeSignature, MethodSignature, SignatureKind, TypeArgument,
    TypeParameter, TypeSignature,
};
