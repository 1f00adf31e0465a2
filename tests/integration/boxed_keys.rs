use ctxkey::{BoxedKey, Scope};
use std::sync::Arc;

#[test]
fn decorated_stage_reads_value_filled_by_callee() {
    #[derive(Debug, Clone, PartialEq)]
    struct ExpensiveComputation {
        result: String,
    }
    let key = BoxedKey::<Option<ExpensiveComputation>>::new(None);

    let compute = |scope: &Scope| {
        // the returned scope is dropped on purpose: callees do not hand scopes back
        let _ = key.set(
            scope,
            Some(ExpensiveComputation {
                result: "computed".to_string(),
            }),
        );
    };

    let decorated = |scope: &Scope| {
        let scope = key.with_box().apply(scope.clone());
        compute(&scope);
        key.value(&scope).map(|c| c.result)
    };

    assert_eq!(decorated(&Scope::background()), Some("computed".to_string()));
}

#[test]
fn boxed_lifecycle() {
    let value = "value".to_string();
    let key = BoxedKey::<Option<String>>::new(None);
    let scope = Scope::background();
    assert_eq!(key.value(&scope), None);

    let scope = key.set_box(&scope);
    assert_eq!(key.value(&scope), None);

    let scope = key.with(Some(value.clone())).apply(scope);
    assert_eq!(key.value(&scope), Some(value.clone()));

    let non_nil_default = BoxedKey::new(Some(value.clone()));
    assert_eq!(non_nil_default.value(&scope), Some(value.clone()));

    let set_without_box = BoxedKey::<Option<String>>::new(None);
    let scope = set_without_box.with(Some(value.clone())).apply(scope);
    assert_eq!(set_without_box.value(&scope), Some(value));
}

#[test]
fn write_after_box_visible_on_same_and_derived_scopes() {
    let key = BoxedKey::new(-1i64);
    let other = BoxedKey::new(0u8);
    let scope = key.set_box(&Scope::background());

    key.set(&scope, 41);
    let derived = other.set_box(&scope);
    key.set(&derived, 42);

    assert_eq!(key.value(&scope), 42);
    assert_eq!(key.value(&derived), 42);
}

#[test]
fn forked_branches_share_one_slot() {
    let key = Arc::new(BoxedKey::new(Vec::<u32>::new()));
    let scope = key.set_box(&Scope::background());

    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            let key = key.clone();
            let scope = scope.clone();
            std::thread::spawn(move || {
                key.set(&scope, vec![i]);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let last = key.value(&scope);
    assert_eq!(last.len(), 1);
    assert!(last[0] < 4);
}
