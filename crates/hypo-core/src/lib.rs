#![forbid(unsafe_code)]

//! Class provisioning and the analysis context for Hypo: roots, the decoder
//! boundary, providers with an at-most-once decode cache, provider sets and
//! the worker pool.

mod context;
mod error;
mod provider;
mod root;

pub use crate::context::{ContextBuilder, ContextConfig, DecoratorFactory, HypoContext};
pub use crate::error::{CoreError, Result};
pub use crate::provider::{
    normalize_class_name, ClassDecoder, ClassProvider, Decorator, ProviderSet,
};
pub use crate::root::{
    ArchiveKind, ArchiveRoot, ClassReference, ClassRoot, DirectoryRoot, JdkImageRoot, RootSpec,
};
