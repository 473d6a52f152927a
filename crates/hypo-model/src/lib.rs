#![forbid(unsafe_code)]

//! The Hypo class model: decoded class data, record facades and the typed
//! attribute store hydrators hang derived data on.

mod attr;
mod data;
mod records;

pub use crate::attr::{AttributeKey, AttributeMap};
pub use crate::data::{
    flags, ClassData, ClassDataBuilder, ClassKind, FieldData, Insn, InvokeDynamicInfo,
    InvokeKind, LocalVariable, MemberRef, MethodData, Visibility,
};
pub use crate::records::{ClassRecord, FieldRecord, MethodRecord, ProviderBinding};
