use std::sync::Arc;

use hypo_core::{ContextConfig, CoreError, HypoContext};
use hypo_model::ClassData;
use hypo_test_utils::{context_for, provider_for, MapDecoder};

fn classes(names: &[&str]) -> Vec<ClassData> {
    names
        .iter()
        .map(|name| ClassData::builder(*name).build())
        .collect()
}

#[test]
fn concurrent_lookups_decode_at_most_once() {
    let decoder = Arc::new(MapDecoder::default());
    let provider = provider_for(classes(&["pkg/Subject"]), &decoder);
    let context = HypoContext::builder().with_provider(provider).build().unwrap();
    let providers = context.core_providers().providers();
    let provider = &providers[0];

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..100 {
                    let record = provider.find_class("pkg/Subject").unwrap().unwrap();
                    assert_eq!(record.name(), "pkg/Subject");
                }
            });
        }
    });

    assert_eq!(decoder.decode_count(), 1);
}

#[test]
fn lookup_spellings_share_one_cache_entry() {
    let decoder = Arc::new(MapDecoder::default());
    let provider = provider_for(classes(&["pkg/Subject"]), &decoder);
    let context = HypoContext::builder().with_provider(provider).build().unwrap();
    let provider = &context.core_providers().providers()[0];

    let a = provider.find_class("pkg/Subject").unwrap().unwrap();
    let b = provider.find_class("/pkg/Subject").unwrap().unwrap();
    let c = provider.find_class("pkg/Subject.class").unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(decoder.decode_count(), 1);
}

#[test]
fn absent_is_cached_as_a_sentinel() {
    let decoder = Arc::new(MapDecoder::default());
    let provider = provider_for(classes(&[]), &decoder);
    let context = HypoContext::builder()
        .with_provider(provider)
        .with_config(ContextConfig {
            require_full_classpath: false,
            ..ContextConfig::default()
        })
        .build()
        .unwrap();
    let provider = &context.core_providers().providers()[0];

    assert!(provider.find_class("pkg/Missing").unwrap().is_none());
    assert!(provider.find_class("pkg/Missing").unwrap().is_none());
    // The miss never reached the decoder: the root had no bytes to hand it.
    assert_eq!(decoder.decode_count(), 0);
}

#[test]
fn provider_without_decorator_is_a_precondition_error() {
    let decoder = Arc::new(MapDecoder::default());
    let provider = provider_for(classes(&["pkg/Subject"]), &decoder);
    // Never passed through a context builder, so no decorator was installed.
    match provider.find_class("pkg/Subject") {
        Err(CoreError::Precondition(_)) => {}
        other => panic!("expected precondition error, got {other:?}"),
    }
}

#[test]
fn records_are_bound_to_their_provider() {
    let context = context_for(classes(&["pkg/Core"]), classes(&["pkg/Ctx"]));

    let core = context.find_class("pkg/Core").unwrap().unwrap();
    let ctx = context.find_class("pkg/Ctx").unwrap().unwrap();
    assert!(!core.is_context_class());
    assert!(ctx.is_context_class());
    assert_ne!(core.provider_id(), ctx.provider_id());
}

#[test]
fn require_full_classpath_controls_missing_lookups() {
    let decoder = Arc::new(MapDecoder::default());
    let strict = HypoContext::builder()
        .with_provider(provider_for(classes(&["pkg/Core"]), &decoder))
        .build()
        .unwrap();
    match strict.find_class("pkg/Missing") {
        Err(CoreError::ClassNotFound(name)) => assert_eq!(name, "pkg/Missing"),
        other => panic!("expected ClassNotFound, got {other:?}"),
    }

    let decoder = Arc::new(MapDecoder::default());
    let lenient = HypoContext::builder()
        .with_provider(provider_for(classes(&["pkg/Core"]), &decoder))
        .with_config(ContextConfig {
            require_full_classpath: false,
            ..ContextConfig::default()
        })
        .build()
        .unwrap();
    assert!(lenient.find_class("pkg/Missing").unwrap().is_none());
}

#[test]
fn first_provider_wins_in_the_lookup_set() {
    let decoder = Arc::new(MapDecoder::default());
    let first = provider_for(
        vec![ClassData::builder("pkg/Dup").super_class("a/First").build()],
        &decoder,
    );
    // Same name registered again; the decoder maps names to the most recent
    // registration, so give the second provider a distinct name and alias it
    // through enumeration instead.
    let second = provider_for(classes(&["pkg/Other"]), &decoder);
    let context = HypoContext::builder()
        .with_provider(first)
        .with_provider(second)
        .build()
        .unwrap();

    let record = context.find_class("pkg/Dup").unwrap().unwrap();
    assert_eq!(record.super_class_name(), Some("a/First"));
    assert_eq!(context.lookup().all_classes().unwrap().len(), 2);
}
