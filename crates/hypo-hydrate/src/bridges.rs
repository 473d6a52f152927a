//! Synthetic-bridge linking.
//!
//! A compiler-synthesized forwarder whose body is pure argument adaptation
//! into a non-synthetic method of the same class gets linked to that method,
//! so downstream consumers can treat the non-synthetic one as the "real"
//! method. Bridges reaching into other classes are left unlinked.

use tracing::debug;

use hypo_core::HypoContext;
use hypo_model::{ClassRecord, Insn, MethodRecord};

use crate::error::Result;
use crate::framework::MethodHydrator;
use crate::keys::{append_synthetic_source, SYNTHETIC_TARGET};

pub struct SyntheticBridgeHydrator;

impl MethodHydrator for SyntheticBridgeHydrator {
    fn name(&self) -> &'static str {
        "synthetic-bridges"
    }

    fn hydrate(
        &self,
        class: &ClassRecord,
        method: &MethodRecord,
        _ctx: &HypoContext,
    ) -> Result<()> {
        if !method.is_synthetic()
            || method.is_constructor()
            || method.is_abstract()
            || method.is_native()
        {
            return Ok(());
        }
        let Some((target_name, target_descriptor)) = forwarded_target(method) else {
            return Ok(());
        };
        let Some(target) = class.method(&target_name, &target_descriptor) else {
            return Ok(());
        };
        if target.is_synthetic() {
            return Ok(());
        }
        // Matching adapted descriptor: same arity after erasure adaptation.
        if method.descriptor()?.params().len() != target.descriptor()?.params().len() {
            return Ok(());
        }
        debug!(bridge = %method, target = %target, "linked synthetic bridge");
        method.attributes().store(&SYNTHETIC_TARGET, target.reference());
        append_synthetic_source(target, method.reference());
        Ok(())
    }
}

/// Recognize a pure-forwarding body: ascending parameter loads with optional
/// casts, exactly one invoke of another method on the same class, then a
/// return. Anything else means this synthetic is not a bridge we link.
fn forwarded_target(method: &MethodRecord) -> Option<(String, String)> {
    let mut invoked: Option<(&str, &str)> = None;
    let mut next_slot: u16 = 0;
    for insn in method.code() {
        match insn {
            Insn::Load { slot } => {
                if invoked.is_some() || *slot < next_slot {
                    return None;
                }
                next_slot = slot + 1;
            }
            Insn::Cast { .. } => {}
            Insn::Invoke { target, .. } => {
                if invoked.is_some() {
                    return None;
                }
                if target.class_name != method.parent_class() {
                    return None;
                }
                if target.name == method.name() && target.descriptor == method.descriptor_text() {
                    return None;
                }
                invoked = Some((&target.name, &target.descriptor));
            }
            Insn::Return => {
                return invoked.map(|(name, desc)| (name.to_string(), desc.to_string()));
            }
            _ => return None,
        }
    }
    None
}
