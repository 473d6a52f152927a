//! Lambda and local-class closure building.

use tracing::debug;

use hypo_core::HypoContext;
use hypo_model::{ClassRecord, Insn, MemberRef, MethodRecord};
use hypo_types::parse_method_descriptor;

use crate::error::Result;
use crate::framework::ClassHydrator;
use crate::keys::{
    append_lambda_closure, append_local_class_closure, LambdaClosure, LocalClassClosure,
    LAMBDA_CLOSURE, LOCAL_CLASS_CLOSURE,
};

/// Ties each lambda-metafactory callsite to its synthetic body method and
/// the containing method's captured local slots.
pub struct LambdaClosureHydrator;

impl ClassHydrator for LambdaClosureHydrator {
    fn name(&self) -> &'static str {
        "lambda-closures"
    }

    fn hydrate(&self, class: &ClassRecord, ctx: &HypoContext) -> Result<()> {
        for method in class.methods() {
            let code = method.code();
            for (index, insn) in code.iter().enumerate() {
                let Insn::InvokeDynamic(info) = insn else {
                    continue;
                };
                if !info.is_lambda_metafactory {
                    continue;
                }
                let Some(implementation) = &info.implementation else {
                    continue;
                };
                // Lambda bodies always live in the class that declares the
                // callsite.
                if implementation.class_name != class.name() {
                    continue;
                }
                let Some(lambda_method) =
                    class.method(&implementation.name, &implementation.descriptor)
                else {
                    continue;
                };
                if !lambda_method.is_synthetic() {
                    continue;
                }

                let captured_slots = captured_slots(code, index, &info.callsite_descriptor)?;
                let interface_method = match &info.interface_method {
                    Some(interface_method) => Some(interface_method.clone()),
                    None => resolve_interface_method(ctx, &info.callsite_descriptor)?,
                };
                let closure = LambdaClosure {
                    containing: method.reference(),
                    interface_method,
                    lambda: lambda_method.reference(),
                    captured_slots,
                };
                debug!(containing = %method, lambda = %lambda_method, "linked lambda closure");
                append_lambda_closure(method, closure.clone());
                lambda_method.attributes().store(&LAMBDA_CLOSURE, closure);
            }
        }
        Ok(())
    }
}

/// The capture arguments are exactly the values pushed for the callsite; the
/// ones that are plain loads of the containing method's locals are captured
/// slots. Dynamic (post-instantiation) arguments flow through the functional
/// method instead and never appear here.
fn captured_slots(code: &[Insn], callsite_index: usize, callsite_descriptor: &str) -> Result<Vec<u16>> {
    let captured_count = parse_method_descriptor(callsite_descriptor)?.params().len();
    let mut slots = Vec::new();
    if captured_count > 0 && callsite_index >= captured_count {
        for insn in &code[callsite_index - captured_count..callsite_index] {
            if let Insn::Load { slot } = insn {
                slots.push(*slot);
            }
        }
    }
    Ok(slots)
}

/// Best-effort SAM resolution from the callsite's functional-interface
/// return type. Absent when the interface is off the lookup path or is not
/// a single-abstract-method shape.
fn resolve_interface_method(
    ctx: &HypoContext,
    callsite_descriptor: &str,
) -> Result<Option<MemberRef>> {
    let descriptor = parse_method_descriptor(callsite_descriptor)?;
    let Some(interface_name) = descriptor.return_type().class_name() else {
        return Ok(None);
    };
    let Some(interface) = ctx.lookup().find_class(interface_name)? else {
        return Ok(None);
    };
    let mut abstracts = interface
        .methods()
        .iter()
        .filter(|m| m.is_abstract() && !m.is_static());
    let sam = abstracts.next();
    if abstracts.next().is_some() {
        return Ok(None);
    }
    Ok(sam.map(MethodRecord::reference))
}

/// Ties each local/anonymous class to its enclosing method and the locals it
/// captures through constructor-synthetic parameters.
pub struct LocalClassClosureHydrator;

impl ClassHydrator for LocalClassClosureHydrator {
    fn name(&self) -> &'static str {
        "local-class-closures"
    }

    fn hydrate(&self, class: &ClassRecord, ctx: &HypoContext) -> Result<()> {
        let Some(enclosing) = class.enclosing_method() else {
            return Ok(());
        };
        let Some(enclosing_class) = ctx.lookup().find_class(&enclosing.class_name)? else {
            return Ok(());
        };
        let Some(enclosing_method) =
            enclosing_class.method(&enclosing.name, &enclosing.descriptor)
        else {
            return Ok(());
        };
        let captured_slots = captured_local_slots(class, &enclosing_class, enclosing_method)?;
        let closure = LocalClassClosure {
            containing: enclosing_method.reference(),
            local_class: class.name().to_string(),
            captured_slots,
        };
        debug!(local_class = class.name(), containing = %enclosing_method, "linked local-class closure");
        append_local_class_closure(enclosing_method, closure.clone());
        class.attributes().store(&LOCAL_CLASS_CLOSURE, closure);
        Ok(())
    }
}

/// Map the constructor's capture parameters (after the implicit outer-this,
/// when present) back to the enclosing method's local slots. javac names the
/// synthetic parameters `val$<original>`; the original name keys the lookup
/// into the enclosing local-variable table.
fn captured_local_slots(
    local: &ClassRecord,
    enclosing_class: &ClassRecord,
    enclosing_method: &MethodRecord,
) -> Result<Vec<u16>> {
    let Some(ctor) = local.constructors().next() else {
        return Ok(Vec::new());
    };
    let descriptor = ctor.descriptor()?;
    let start = match descriptor.params().first() {
        Some(first) if first.class_name() == Some(enclosing_class.name()) => 1,
        _ => 0,
    };

    let mut slots = Vec::new();
    for index in start..descriptor.params().len() {
        let Some(slot) = descriptor.slot_for_param(index, false) else {
            continue;
        };
        let Some(param_local) = ctor.local_at_slot(slot) else {
            continue;
        };
        let Some(param_name) = param_local.name.as_deref() else {
            continue;
        };
        let original = param_name.strip_prefix("val$").unwrap_or(param_name);
        if let Some(captured) = enclosing_method
            .locals()
            .iter()
            .find(|l| l.name.as_deref() == Some(original))
        {
            slots.push(captured.slot);
        }
    }
    Ok(slots)
}
