//! Phase 1: base hierarchy hydration.
//!
//! Resolves every core class's direct super/interface references, registers
//! child-class links, and computes `super_method`/`child_methods` pairs. Must
//! complete before any provider hydration runs.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::warn;

use hypo_core::HypoContext;
use hypo_model::{ClassRecord, MethodRecord, Visibility};

use crate::error::{HydrationError, Result};

pub fn hydrate_hierarchy(ctx: &HypoContext) -> Result<()> {
    let references = ctx.core_providers().all_classes()?;
    let pool = ctx.pool()?;
    pool.install(|| {
        references.par_iter().try_for_each(|reference| {
            hydrate_class(ctx, &reference.class_name)
                .map_err(|err| HydrationError::for_class(&reference.class_name, err))
        })
    })
}

fn hydrate_class(ctx: &HypoContext, class_name: &str) -> Result<()> {
    let Some(class) = ctx.core_providers().find_class(class_name)? else {
        return Ok(());
    };

    // Direct super references; the super-edge may land in a context class.
    let ancestors: Vec<&str> = class
        .super_class_name()
        .into_iter()
        .chain(class.interface_names().iter().map(String::as_str))
        .collect();
    for ancestor_name in ancestors {
        match ctx.find_class(ancestor_name)? {
            Some(ancestor) => ancestor.add_child(class.name()),
            None => warn!(
                class = class.name(),
                ancestor = ancestor_name,
                "unresolved ancestor reference"
            ),
        }
    }

    for method in class.methods() {
        if method.is_static()
            || method.is_constructor()
            || method.name() == "<clinit>"
            || method.visibility() == Visibility::Private
        {
            continue;
        }
        link_override(ctx, &class, method)?;
    }
    Ok(())
}

/// Walk the ancestry for the method this one overrides: the super-class chain
/// first (nearest ancestor wins), then interfaces — the child's declared
/// interfaces in order, then the ones inherited along the super-class chain.
fn link_override(ctx: &HypoContext, class: &ClassRecord, method: &MethodRecord) -> Result<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut inherited_interfaces: Vec<String> = Vec::new();

    let mut current = class.super_class_name().map(str::to_string);
    while let Some(ancestor_name) = current {
        if !visited.insert(ancestor_name.clone()) {
            break;
        }
        let Some(ancestor) = ctx.find_class(&ancestor_name)? else {
            break;
        };
        if try_link(&ancestor, method) {
            return Ok(());
        }
        inherited_interfaces.extend(ancestor.interface_names().iter().cloned());
        current = ancestor.super_class_name().map(str::to_string);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: Vec<String> = class.interface_names().to_vec();
    queue.extend(inherited_interfaces);
    for interface in queue {
        if search_interface(ctx, &interface, method, &mut seen)? {
            return Ok(());
        }
    }
    Ok(())
}

fn search_interface(
    ctx: &HypoContext,
    interface_name: &str,
    method: &MethodRecord,
    seen: &mut HashSet<String>,
) -> Result<bool> {
    if !seen.insert(interface_name.to_string()) {
        return Ok(false);
    }
    let Some(interface) = ctx.find_class(interface_name)? else {
        return Ok(false);
    };
    if try_link(&interface, method) {
        return Ok(true);
    }
    for parent in interface.interface_names() {
        if search_interface(ctx, parent, method, seen)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Link `method` to an eligible declaration in `ancestor`, if there is one.
/// Static, private and constructor declarations are not override targets.
fn try_link(ancestor: &ClassRecord, method: &MethodRecord) -> bool {
    let Some(target) = ancestor.method(method.name(), method.descriptor_text()) else {
        return false;
    };
    if target.is_static() || target.is_constructor() || target.visibility() == Visibility::Private
    {
        return false;
    }
    method.set_super_method(target.reference());
    target.add_child_method(method.reference());
    true
}
