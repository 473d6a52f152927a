//! Super-constructor linking.
//!
//! Every constructor body begins (modulo argument set-up) with a chained
//! `super(...)` or `this(...)` invocation. This hydrator records that edge
//! together with the direct pass-through argument mapping: which caller
//! parameters arrive in the callee untouched. Mappings-propagation
//! contributors chain these links across the hierarchy.

use tracing::debug;

use hypo_core::HypoContext;
use hypo_model::{ClassRecord, Insn, InvokeKind, MemberRef, MethodRecord};
use hypo_types::parse_method_descriptor;

use crate::error::Result;
use crate::framework::MethodHydrator;
use crate::keys::{append_super_caller, SuperCall, SuperCallParameter, SUPER_CALL_TARGET};

pub struct SuperConstructorHydrator;

impl MethodHydrator for SuperConstructorHydrator {
    fn name(&self) -> &'static str {
        "super-constructor-calls"
    }

    fn hydrate(
        &self,
        class: &ClassRecord,
        method: &MethodRecord,
        ctx: &HypoContext,
    ) -> Result<()> {
        if !method.is_constructor() {
            return Ok(());
        }
        let Some((target, params)) = scan_chained_call(class, method)? else {
            return Ok(());
        };
        let call = SuperCall {
            from: method.reference(),
            to: target.clone(),
            params,
        };
        debug!(from = %call.from, to = %call.to, "linked constructor chain");
        method.attributes().store(&SUPER_CALL_TARGET, call.clone());

        // The reciprocal in-edge; the target may live in a context class.
        if let Some(target_class) = ctx.lookup().find_class(&target.class_name)? {
            if let Some(target_ctor) = target_class.constructor(&target.descriptor) {
                append_super_caller(target_ctor, call);
            }
        }
        Ok(())
    }
}

/// Scan the body prefix up to the first `super(...)`/`this(...)` invocation.
///
/// The pass-through mapping tracks, per pushed argument, which caller
/// parameter it is an untouched load of. Any unmodeled instruction before
/// the chained call poisons the frame: the edge is still recorded, but with
/// no pass-through pairs.
fn scan_chained_call(
    class: &ClassRecord,
    method: &MethodRecord,
) -> Result<Option<(MemberRef, Vec<SuperCallParameter>)>> {
    let own_name = class.name();
    let super_name = class.super_class_name();
    let descriptor = method.descriptor()?;

    let mut pushes: Vec<Option<usize>> = Vec::new();
    let mut clean = true;
    for insn in method.code() {
        match insn {
            Insn::Load { slot } => {
                pushes.push(descriptor.param_index_for_slot(*slot, false));
            }
            Insn::Const | Insn::New { .. } => pushes.push(None),
            Insn::Cast { .. } => {
                // A conversion is a transformation, not a direct pass-through.
                if let Some(last) = pushes.last_mut() {
                    *last = None;
                }
            }
            Insn::Invoke {
                kind: InvokeKind::Special,
                target,
            } if target.name == "<init>"
                && (target.class_name == own_name
                    || Some(target.class_name.as_str()) == super_name) =>
            {
                let arity = parse_method_descriptor(&target.descriptor)?.params().len();
                let params = if clean && pushes.len() == arity + 1 {
                    pushes[1..]
                        .iter()
                        .enumerate()
                        .filter_map(|(super_index, source)| {
                            source.map(|this_index| SuperCallParameter {
                                this_index,
                                super_index,
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                return Ok(Some((target.clone(), params)));
            }
            Insn::Return => return Ok(None),
            _ => {
                clean = false;
                pushes.clear();
            }
        }
    }
    Ok(None)
}
