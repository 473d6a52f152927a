#![forbid(unsafe_code)]

//! Graph completion over the Hypo class model.
//!
//! Hydration runs in two phases: base hierarchy hydration (super/override
//! links) and provider hydration (pluggable hydrators attaching derived data
//! through attribute keys).

mod base;
mod bridges;
mod closures;
mod error;
mod framework;
mod keys;
mod supercall;

pub use crate::bridges::SyntheticBridgeHydrator;
pub use crate::closures::{LambdaClosureHydrator, LocalClassClosureHydrator};
pub use crate::error::{HydrationError, Result};
pub use crate::framework::{
    hydrate, ClassHydrator, FieldHydrator, HydrationManager, MethodHydrator,
};
pub use crate::keys::{
    super_call_target, super_caller_sources, LambdaClosure, LocalClassClosure, SuperCall,
    SuperCallParameter, LAMBDA_CLOSURE, LAMBDA_CLOSURES, LOCAL_CLASS_CLOSURE,
    LOCAL_CLASS_CLOSURES, SUPER_CALLER_SOURCES, SUPER_CALL_TARGET, SYNTHETIC_SOURCES,
    SYNTHETIC_TARGET,
};
