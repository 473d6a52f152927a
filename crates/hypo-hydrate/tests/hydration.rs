use hypo_hydrate::{
    hydrate, super_call_target, super_caller_sources, LAMBDA_CLOSURE, LAMBDA_CLOSURES,
    LOCAL_CLASS_CLOSURE, LOCAL_CLASS_CLOSURES, SYNTHETIC_SOURCES, SYNTHETIC_TARGET,
};
use hypo_model::{
    flags, ClassData, Insn, InvokeDynamicInfo, InvokeKind, LocalVariable, MemberRef, MethodData,
};
use hypo_test_utils::context_for;

fn invoke(kind: InvokeKind, class: &str, name: &str, descriptor: &str) -> Insn {
    Insn::Invoke {
        kind,
        target: MemberRef::new(class, name, descriptor),
    }
}

#[test]
fn override_detection() {
    let parent = ClassData::builder("a/Parent")
        .method(MethodData::new("test", "()V"))
        .build();
    let child = ClassData::builder("a/Child")
        .super_class("a/Parent")
        .method(MethodData::new("test", "()V"))
        .build();
    let ctx = context_for([parent, child], []);
    hydrate(&ctx).unwrap();

    let parent = ctx.find_class("a/Parent").unwrap().unwrap();
    let child = ctx.find_class("a/Child").unwrap().unwrap();
    assert_eq!(
        child.method("test", "()V").unwrap().super_method(),
        Some(&MemberRef::new("a/Parent", "test", "()V"))
    );
    assert_eq!(
        parent.method("test", "()V").unwrap().child_methods(),
        vec![MemberRef::new("a/Child", "test", "()V")]
    );
    assert_eq!(parent.children(), vec!["a/Child".to_string()]);
}

#[test]
fn overload_discrimination() {
    let mut parent = ClassData::builder("a/Parent");
    let mut child = ClassData::builder("a/Child").super_class("a/Parent");
    for desc in ["()V", "(I)V", "(II)V", "(J)V"] {
        parent = parent.method(MethodData::new("test", desc));
    }
    for desc in ["()V", "(I)V", "(II)V"] {
        child = child.method(MethodData::new("test", desc));
    }
    let ctx = context_for([parent.build(), child.build()], []);
    hydrate(&ctx).unwrap();

    let parent = ctx.find_class("a/Parent").unwrap().unwrap();
    let child = ctx.find_class("a/Child").unwrap().unwrap();
    for desc in ["()V", "(I)V", "(II)V"] {
        assert_eq!(
            child.method("test", desc).unwrap().super_method(),
            Some(&MemberRef::new("a/Parent", "test", desc)),
            "descriptor {desc}"
        );
        assert_eq!(
            parent.method("test", desc).unwrap().child_methods(),
            vec![MemberRef::new("a/Child", "test", desc)]
        );
    }
    assert!(child.method("test", "(J)V").is_none());
    assert!(parent.method("test", "(J)V").unwrap().child_methods().is_empty());
}

#[test]
fn static_and_private_declarations_are_not_override_targets() {
    let parent = ClassData::builder("a/Parent")
        .method(MethodData::new("stat", "()V").access_flags(flags::ACC_PUBLIC | flags::ACC_STATIC))
        .method(MethodData::new("hidden", "()V").access_flags(flags::ACC_PRIVATE))
        .build();
    let child = ClassData::builder("a/Child")
        .super_class("a/Parent")
        .method(MethodData::new("stat", "()V"))
        .method(MethodData::new("hidden", "()V"))
        .build();
    let ctx = context_for([parent, child], []);
    hydrate(&ctx).unwrap();

    let child = ctx.find_class("a/Child").unwrap().unwrap();
    assert!(child.method("stat", "()V").unwrap().super_method().is_none());
    assert!(child.method("hidden", "()V").unwrap().super_method().is_none());
}

#[test]
fn interface_ties_resolve_in_declaration_order() {
    let first = ClassData::builder("a/First")
        .access_flags(flags::ACC_PUBLIC | flags::ACC_INTERFACE)
        .method(MethodData::new("run", "()V").access_flags(flags::ACC_PUBLIC | flags::ACC_ABSTRACT))
        .build();
    let second = ClassData::builder("a/Second")
        .access_flags(flags::ACC_PUBLIC | flags::ACC_INTERFACE)
        .method(MethodData::new("run", "()V").access_flags(flags::ACC_PUBLIC | flags::ACC_ABSTRACT))
        .build();
    let impl_class = ClassData::builder("a/Impl")
        .interface("a/First")
        .interface("a/Second")
        .method(MethodData::new("run", "()V"))
        .build();
    let ctx = context_for([first, second, impl_class], []);
    hydrate(&ctx).unwrap();

    let impl_class = ctx.find_class("a/Impl").unwrap().unwrap();
    assert_eq!(
        impl_class.method("run", "()V").unwrap().super_method(),
        Some(&MemberRef::new("a/First", "run", "()V"))
    );
}

#[test]
fn super_edges_may_resolve_into_context_classes() {
    let parent = ClassData::builder("ctx/Parent")
        .method(MethodData::new("test", "()V"))
        .build();
    let child = ClassData::builder("a/Child")
        .super_class("ctx/Parent")
        .method(MethodData::new("test", "()V"))
        .build();
    let ctx = context_for([child], [parent]);
    hydrate(&ctx).unwrap();

    let child = ctx.find_class("a/Child").unwrap().unwrap();
    assert_eq!(
        child.method("test", "()V").unwrap().super_method(),
        Some(&MemberRef::new("ctx/Parent", "test", "()V"))
    );
}

#[test]
fn synthetic_bridge_links_to_the_real_method() {
    let class = ClassData::builder("a/Impl")
        .method(MethodData::new("get", "()Ljava/lang/String;"))
        .method(
            MethodData::new("get", "()Ljava/lang/Object;")
                .access_flags(flags::ACC_PUBLIC | flags::ACC_SYNTHETIC | flags::ACC_BRIDGE)
                .code(vec![
                    Insn::Load { slot: 0 },
                    invoke(InvokeKind::Virtual, "a/Impl", "get", "()Ljava/lang/String;"),
                    Insn::Return,
                ]),
        )
        .build();
    let ctx = context_for([class], []);
    hydrate(&ctx).unwrap();

    let class = ctx.find_class("a/Impl").unwrap().unwrap();
    let bridge = class.method("get", "()Ljava/lang/Object;").unwrap();
    let real = class.method("get", "()Ljava/lang/String;").unwrap();
    assert_eq!(
        bridge.attributes().get(&SYNTHETIC_TARGET).as_deref(),
        Some(&real.reference())
    );
    assert_eq!(
        real.attributes()
            .get(&SYNTHETIC_SOURCES)
            .map(|sources| sources.lock().clone()),
        Some(vec![bridge.reference()])
    );
}

#[test]
fn unrecognized_synthetic_gets_no_link() {
    let class = ClassData::builder("a/Impl")
        .method(MethodData::new("get", "()Ljava/lang/String;"))
        .method(
            MethodData::new("get", "()Ljava/lang/Object;")
                .access_flags(flags::ACC_PUBLIC | flags::ACC_SYNTHETIC)
                .code(vec![
                    Insn::Load { slot: 0 },
                    Insn::FieldAccess {
                        target: MemberRef::new("a/Impl", "delegate", "La/Impl;"),
                        is_store: false,
                    },
                    invoke(InvokeKind::Virtual, "a/Impl", "get", "()Ljava/lang/String;"),
                    Insn::Return,
                ]),
        )
        .build();
    let ctx = context_for([class], []);
    hydrate(&ctx).unwrap();

    let class = ctx.find_class("a/Impl").unwrap().unwrap();
    let synthetic = class.method("get", "()Ljava/lang/Object;").unwrap();
    assert!(synthetic.attributes().get(&SYNTHETIC_TARGET).is_none());
}

fn constructor_chain_fixture() -> Vec<ClassData> {
    let a = ClassData::builder("a/A")
        .method(MethodData::constructor("(I)V").code(vec![
            Insn::Load { slot: 0 },
            invoke(InvokeKind::Special, "java/lang/Object", "<init>", "()V"),
            Insn::Return,
        ]))
        .build();
    let b = ClassData::builder("a/B")
        .super_class("a/A")
        .method(MethodData::constructor("(II)V").code(vec![
            Insn::Load { slot: 0 },
            Insn::Load { slot: 1 },
            invoke(InvokeKind::Special, "a/A", "<init>", "(I)V"),
            Insn::Return,
        ]))
        .build();
    let c = ClassData::builder("a/C")
        .super_class("a/B")
        .method(MethodData::constructor("(III)V").code(vec![
            Insn::Load { slot: 0 },
            Insn::Load { slot: 1 },
            Insn::Load { slot: 2 },
            invoke(InvokeKind::Special, "a/B", "<init>", "(II)V"),
            Insn::Return,
        ]))
        .build();
    vec![a, b, c]
}

#[test]
fn super_constructor_chain() {
    let ctx = context_for(constructor_chain_fixture(), []);
    hydrate(&ctx).unwrap();

    let b = ctx.find_class("a/B").unwrap().unwrap();
    let c = ctx.find_class("a/C").unwrap().unwrap();

    let c_call = super_call_target(c.constructor("(III)V").unwrap()).unwrap();
    assert_eq!(c_call.to, MemberRef::new("a/B", "<init>", "(II)V"));
    assert_eq!(
        c_call
            .params
            .iter()
            .map(|p| (p.this_index, p.super_index))
            .collect::<Vec<_>>(),
        vec![(0, 0), (1, 1)]
    );

    let b_call = super_call_target(b.constructor("(II)V").unwrap()).unwrap();
    let chained = c_call.chain(&b_call).unwrap();
    assert_eq!(chained.to, MemberRef::new("a/A", "<init>", "(I)V"));
    assert_eq!(
        chained
            .params
            .iter()
            .map(|p| (p.this_index, p.super_index))
            .collect::<Vec<_>>(),
        vec![(0, 0)]
    );

    let b_sources = super_caller_sources(b.constructor("(II)V").unwrap());
    assert_eq!(b_sources.len(), 1);
    assert_eq!(b_sources[0].from, MemberRef::new("a/C", "<init>", "(III)V"));
}

#[test]
fn transformed_arguments_are_not_pass_through() {
    let parent = ClassData::builder("a/Parent")
        .method(MethodData::constructor("(J)V").code(vec![
            Insn::Load { slot: 0 },
            invoke(InvokeKind::Special, "java/lang/Object", "<init>", "()V"),
            Insn::Return,
        ]))
        .build();
    // super((long) i): the widening cast breaks the direct pass-through.
    let child = ClassData::builder("a/Child")
        .super_class("a/Parent")
        .method(MethodData::constructor("(I)V").code(vec![
            Insn::Load { slot: 0 },
            Insn::Load { slot: 1 },
            Insn::Cast {
                descriptor: "J".to_string(),
            },
            invoke(InvokeKind::Special, "a/Parent", "<init>", "(J)V"),
            Insn::Return,
        ]))
        .build();
    let ctx = context_for([parent, child], []);
    hydrate(&ctx).unwrap();

    let child = ctx.find_class("a/Child").unwrap().unwrap();
    let call = super_call_target(child.constructor("(I)V").unwrap()).unwrap();
    assert_eq!(call.to, MemberRef::new("a/Parent", "<init>", "(J)V"));
    assert!(call.params.is_empty());
}

#[test]
fn lambda_closure_captures_local_slots() {
    let functional = ClassData::builder("java/util/function/IntBinaryOperator")
        .access_flags(flags::ACC_PUBLIC | flags::ACC_INTERFACE)
        .method(
            MethodData::new("applyAsInt", "(II)I")
                .access_flags(flags::ACC_PUBLIC | flags::ACC_ABSTRACT),
        )
        .build();
    let class = ClassData::builder("a/Subject")
        .method(
            MethodData::new("test", "()V")
                .local(LocalVariable::new(1, Some("x"), "I"))
                .local(LocalVariable::new(2, Some("y"), "I"))
                .code(vec![
                    Insn::Load { slot: 1 },
                    Insn::Load { slot: 2 },
                    Insn::InvokeDynamic(InvokeDynamicInfo {
                        is_lambda_metafactory: true,
                        callsite_descriptor:
                            "(II)Ljava/util/function/IntBinaryOperator;".to_string(),
                        implementation: Some(MemberRef::new(
                            "a/Subject",
                            "lambda$test$0",
                            "(IIII)I",
                        )),
                        interface_method: None,
                    }),
                    Insn::Return,
                ]),
        )
        .method(
            MethodData::new("lambda$test$0", "(IIII)I")
                .access_flags(flags::ACC_PRIVATE | flags::ACC_STATIC | flags::ACC_SYNTHETIC),
        )
        .build();
    let ctx = context_for([class], [functional]);
    hydrate(&ctx).unwrap();

    let class = ctx.find_class("a/Subject").unwrap().unwrap();
    let containing = class.method("test", "()V").unwrap();
    let closures = containing
        .attributes()
        .get(&LAMBDA_CLOSURES)
        .map(|c| c.lock().clone())
        .unwrap_or_default();
    assert_eq!(closures.len(), 1);
    let closure = &closures[0];
    assert_eq!(closure.containing, containing.reference());
    assert_eq!(closure.lambda, MemberRef::new("a/Subject", "lambda$test$0", "(IIII)I"));
    assert_eq!(closure.captured_slots, vec![1, 2]);
    assert_eq!(
        closure.interface_method,
        Some(MemberRef::new(
            "java/util/function/IntBinaryOperator",
            "applyAsInt",
            "(II)I"
        ))
    );

    let lambda = class.method("lambda$test$0", "(IIII)I").unwrap();
    assert_eq!(
        lambda.attributes().get(&LAMBDA_CLOSURE).as_deref(),
        Some(closure)
    );
}

#[test]
fn local_class_closure_captures_enclosing_slots() {
    let outer = ClassData::builder("a/Outer")
        .inner_class("a/Outer$1Local")
        .method(
            MethodData::new("run", "(I)V")
                .local(LocalVariable::new(1, Some("count"), "I")),
        )
        .build();
    let local = ClassData::builder("a/Outer$1Local")
        .outer_class("a/Outer")
        .enclosing_method(MemberRef::new("a/Outer", "run", "(I)V"))
        .method(
            MethodData::constructor("(La/Outer;I)V")
                .local(LocalVariable::new(0, Some("this"), "La/Outer$1Local;"))
                .local(LocalVariable::new(1, Some("this$0"), "La/Outer;"))
                .local(LocalVariable::new(2, Some("val$count"), "I")),
        )
        .build();
    let ctx = context_for([outer, local], []);
    hydrate(&ctx).unwrap();

    let outer = ctx.find_class("a/Outer").unwrap().unwrap();
    let run = outer.method("run", "(I)V").unwrap();
    let closures = run
        .attributes()
        .get(&LOCAL_CLASS_CLOSURES)
        .map(|c| c.lock().clone())
        .unwrap_or_default();
    assert_eq!(closures.len(), 1);
    assert_eq!(closures[0].local_class, "a/Outer$1Local");
    assert_eq!(closures[0].captured_slots, vec![1]);

    let local = ctx.find_class("a/Outer$1Local").unwrap().unwrap();
    assert_eq!(
        local.attributes().get(&LOCAL_CLASS_CLOSURE).as_deref(),
        Some(&closures[0])
    );
}

#[test]
fn hydration_is_idempotent_under_rerun() {
    let ctx = context_for(constructor_chain_fixture(), []);
    hydrate(&ctx).unwrap();
    hydrate(&ctx).unwrap();

    let b = ctx.find_class("a/B").unwrap().unwrap();
    assert_eq!(super_caller_sources(b.constructor("(II)V").unwrap()).len(), 1);
    let a = ctx.find_class("a/A").unwrap().unwrap();
    assert_eq!(a.children(), vec!["a/B".to_string()]);
}
