//! Tests for #[derive(Selection)] macro

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Instant;

use tidux::{Identity, Selection};

#[derive(Selection, Clone)]
struct TodoView {
    items: Arc<Vec<String>>,
    filter: String,
    done: usize,
}

#[test]
fn test_fields_compared_by_identity() {
    let items = Arc::new(vec!["write tests".to_string()]);
    let a = TodoView {
        items: items.clone(),
        filter: "all".to_string(),
        done: 0,
    };
    let b = TodoView {
        items,
        filter: "all".to_string(),
        done: 0,
    };
    assert!(a.same_as(&b));

    // Equal contents in a new allocation count as a change.
    let c = TodoView {
        items: Arc::new(vec!["write tests".to_string()]),
        ..a.clone()
    };
    assert!(a.changed(&c));

    let d = TodoView {
        done: 1,
        ..a.clone()
    };
    assert!(a.changed(&d));
}

#[test]
fn test_skipped_field_is_ignored() {
    #[derive(Selection, Clone)]
    struct Stamped {
        value: i32,
        #[selection(skip)]
        computed_at: Instant,
    }

    let a = Stamped {
        value: 1,
        computed_at: Instant::now(),
    };
    let b = Stamped {
        value: 1,
        computed_at: Instant::now(),
    };
    assert!(a.same_as(&b));
}

#[test]
fn test_tuple_and_unit_structs() {
    #[derive(Selection)]
    struct Pair(u8, Arc<str>);

    #[derive(Selection)]
    struct Empty;

    let name: Arc<str> = Arc::from("x");
    assert!(Pair(1, name.clone()).same_as(&Pair(1, name.clone())));
    assert!(Pair(1, name.clone()).changed(&Pair(2, name)));
    assert!(Empty.same_as(&Empty));
}

#[test]
fn test_generic_struct() {
    #[derive(Selection)]
    struct Slot<T> {
        value: Option<T>,
    }

    let shared = Arc::new(5);
    let a = Slot {
        value: Some(shared.clone()),
    };
    let b = Slot {
        value: Some(shared),
    };
    assert!(a.same_as(&b));
    assert!(Slot::<Arc<i32>> { value: None }.same_as(&Slot { value: None }));
    assert!(None::<i32>.is_identical(&None));
}
