//! Attribute keys and value types produced by the built-in hydrators.
//!
//! Downstream consumers (mappings contributors, remappers) pull these off
//! records by key; nothing here is serialized.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use hypo_model::{AttributeKey, MemberRef, MethodRecord};

/// One directly passed-through constructor argument: parameter `this_index`
/// of the calling constructor arrives untouched as parameter `super_index`
/// of the called constructor. Indices are descriptor-relative, not slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperCallParameter {
    pub this_index: usize,
    pub super_index: usize,
}

/// The `super(...)`/`this(...)` invocation beginning a constructor body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperCall {
    pub from: MemberRef,
    pub to: MemberRef,
    pub params: Vec<SuperCallParameter>,
}

impl SuperCall {
    /// Compose two adjacent links (`C -> B` chained with `B -> A` gives
    /// `C -> A`), intersecting the pass-through parameter pairs. `None` when
    /// the links do not meet. Associative where defined.
    pub fn chain(&self, next: &SuperCall) -> Option<SuperCall> {
        if self.to != next.from {
            return None;
        }
        let params = self
            .params
            .iter()
            .filter_map(|first| {
                next.params
                    .iter()
                    .find(|second| second.this_index == first.super_index)
                    .map(|second| SuperCallParameter {
                        this_index: first.this_index,
                        super_index: second.super_index,
                    })
            })
            .collect();
        Some(SuperCall {
            from: self.from.clone(),
            to: next.to.clone(),
            params,
        })
    }
}

/// A lambda body tied to the method whose bytecode creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaClosure {
    pub containing: MemberRef,
    /// The functional-interface method, when it could be resolved.
    pub interface_method: Option<MemberRef>,
    pub lambda: MemberRef,
    /// Local-variable slots of the containing method captured at the
    /// callsite, in capture order.
    pub captured_slots: Vec<u16>,
}

/// A local or anonymous class tied to its enclosing method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClassClosure {
    pub containing: MemberRef,
    pub local_class: String,
    /// Slots of the enclosing method whose values the class captures through
    /// constructor-synthetic parameters.
    pub captured_slots: Vec<u16>,
}

/// On a constructor: its chained super/this call. At most one per
/// constructor.
pub static SUPER_CALL_TARGET: Lazy<AttributeKey<SuperCall>> =
    Lazy::new(|| AttributeKey::new("SUPER_CALL_TARGET"));

/// On a constructor: every [`SuperCall`] that targets it.
pub static SUPER_CALLER_SOURCES: Lazy<AttributeKey<Mutex<Vec<SuperCall>>>> =
    Lazy::new(|| AttributeKey::new("SUPER_CALLER_SOURCES"));

/// On a synthetic forwarder: the non-synthetic method it adapts to.
pub static SYNTHETIC_TARGET: Lazy<AttributeKey<MemberRef>> =
    Lazy::new(|| AttributeKey::new("SYNTHETIC_TARGET"));

/// On a real method: the synthetic forwarders that adapt to it.
pub static SYNTHETIC_SOURCES: Lazy<AttributeKey<Mutex<Vec<MemberRef>>>> =
    Lazy::new(|| AttributeKey::new("SYNTHETIC_SOURCES"));

/// On a method: the lambda closures its body creates.
pub static LAMBDA_CLOSURES: Lazy<AttributeKey<Mutex<Vec<LambdaClosure>>>> =
    Lazy::new(|| AttributeKey::new("LAMBDA_CLOSURES"));

/// On a lambda body method: the single closure referencing it.
pub static LAMBDA_CLOSURE: Lazy<AttributeKey<LambdaClosure>> =
    Lazy::new(|| AttributeKey::new("LAMBDA_CLOSURE"));

/// On a method: the local-class closures it encloses.
pub static LOCAL_CLASS_CLOSURES: Lazy<AttributeKey<Mutex<Vec<LocalClassClosure>>>> =
    Lazy::new(|| AttributeKey::new("LOCAL_CLASS_CLOSURES"));

/// On a local class: the single closure referencing it.
pub static LOCAL_CLASS_CLOSURE: Lazy<AttributeKey<LocalClassClosure>> =
    Lazy::new(|| AttributeKey::new("LOCAL_CLASS_CLOSURE"));

/// Convenience: the chained super call recorded on `constructor`, if any.
pub fn super_call_target(constructor: &MethodRecord) -> Option<SuperCall> {
    constructor
        .attributes()
        .get(&SUPER_CALL_TARGET)
        .map(|call| (*call).clone())
}

/// Convenience: the calls into `constructor`, in registration order.
pub fn super_caller_sources(constructor: &MethodRecord) -> Vec<SuperCall> {
    constructor
        .attributes()
        .get(&SUPER_CALLER_SOURCES)
        .map(|calls| calls.lock().clone())
        .unwrap_or_default()
}

pub(crate) fn append_super_caller(target: &MethodRecord, call: SuperCall) {
    let sources = target
        .attributes()
        .compute_if_absent(&SUPER_CALLER_SOURCES, || Mutex::new(Vec::new()));
    let mut sources = sources.lock();
    if !sources.contains(&call) {
        sources.push(call);
    }
}

pub(crate) fn append_synthetic_source(target: &MethodRecord, source: MemberRef) {
    let sources = target
        .attributes()
        .compute_if_absent(&SYNTHETIC_SOURCES, || Mutex::new(Vec::new()));
    let mut sources = sources.lock();
    if !sources.contains(&source) {
        sources.push(source);
    }
}

pub(crate) fn append_lambda_closure(containing: &MethodRecord, closure: LambdaClosure) {
    let closures = containing
        .attributes()
        .compute_if_absent(&LAMBDA_CLOSURES, || Mutex::new(Vec::new()));
    let mut closures = closures.lock();
    if !closures.contains(&closure) {
        closures.push(closure);
    }
}

pub(crate) fn append_local_class_closure(containing: &MethodRecord, closure: LocalClassClosure) {
    let closures = containing
        .attributes()
        .compute_if_absent(&LOCAL_CLASS_CLOSURES, || Mutex::new(Vec::new()));
    let mut closures = closures.lock();
    if !closures.contains(&closure) {
        closures.push(closure);
    }
}
