use ctxkey::{compose, BoxedKey, DefaultingKey, Key, Scope, ScopeOp, ScopeSet, ScopeWith};

#[test]
fn nested_composition_attaches_every_value() {
    let key1 = Key::<String>::new();
    let key2 = DefaultingKey::new(String::new());
    let key3 = BoxedKey::new(String::new());
    let key4 = DefaultingKey::new("testDefault".to_string());

    let scope = compose([
        key1.with("value1".to_string()),
        compose([
            key2.with("value2".to_string()),
            key3.with("value3".to_string()),
        ]),
    ])
    .apply(Scope::background());

    assert_eq!(key1.must_value(&scope), "value1");
    assert_eq!(key2.must_non_empty_value(&scope), "value2");
    assert_eq!(key3.value(&scope), "value3");
    assert_eq!(key4.must_non_empty_value(&scope), "testDefault");
}

#[test]
fn compose_with_box_then_fill() {
    let key = BoxedKey::new(0usize);
    let scope = compose([key.with_box(), key.with(3)]).apply(Scope::background());
    // the fill reused the installed slot
    assert_eq!(scope.depth(), 1);
    assert_eq!(key.value(&scope), 3);
}

fn attach_all<K, V>(key: &K, scope: &Scope, values: Vec<V>) -> Scope
where
    K: ScopeSet<V>,
{
    values
        .into_iter()
        .fold(scope.clone(), |scope, v| key.set(&scope, v))
}

fn deferred<K, V>(key: &K, values: Vec<V>) -> ScopeOp
where
    K: ScopeWith<V>,
{
    compose(values.into_iter().map(|v| key.with(v)))
}

#[test]
fn generic_code_attaches_through_any_key() {
    let plain = Key::<u8>::new();
    let defaulting = DefaultingKey::new(0u8);
    let boxed = BoxedKey::new(0u8);
    let base = Scope::background();

    let scope = attach_all(&plain, &base, vec![1, 2]);
    let scope = attach_all(&defaulting, &scope, vec![3, 4]);
    let scope = deferred(&boxed, vec![5, 6]).apply(scope);

    assert_eq!(plain.value(&scope), Some(2));
    assert_eq!(defaulting.value(&scope), 4);
    assert_eq!(boxed.value(&scope), 6);
}
