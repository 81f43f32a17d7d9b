use garnet_value::Value;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn new_scope_has_no_locals() {
    let scope = Scope::new();
    assert!(!scope.has_local_values());
    assert_eq!(scope.get(LAST_LINE_SLOT), Value::Nil);
}

#[test]
fn special_slots_come_first() {
    let scope = Scope::with_locals(&["a", "b"]);
    assert_eq!(scope.local_names(), ["_", "~", "a", "b"]);
    assert_eq!(scope.index_of("a"), Some(2));
}

#[test]
fn set_local_names_reserves_the_special_slots() {
    let mut scope = Scope::new();
    scope.set_local_names(vec!["x".to_string()]);
    assert_eq!(scope.local_names(), ["_", "~", "x"]);
    scope.ensure_special_slots();
    assert_eq!(scope.local_names(), ["_", "~", "x"]);
}

#[test]
fn set_local_names_keeps_existing_values() {
    let mut scope = Scope::with_locals(&["a"]);
    assert!(scope.assign("a", Value::int(7)));
    let mut names = scope.local_names().to_vec();
    names.push("b".to_string());
    scope.set_local_names(names);
    assert_eq!(scope.lookup("a"), Some(Value::int(7)));
    assert_eq!(scope.lookup("b"), Some(Value::Nil));
}

#[test]
fn assign_unknown_name_fails_declare_adds() {
    let mut scope = Scope::new();
    assert!(!scope.assign("x", Value::int(1)));
    scope.declare("x", Value::int(1));
    scope.declare("x", Value::int(2));
    assert_eq!(scope.local_names(), ["_", "~", "x"]);
    assert_eq!(scope.lookup("x"), Some(Value::int(2)));
}

#[test]
fn first_declared_local_does_not_take_a_special_slot() {
    let mut scope = Scope::new();
    scope.declare("x", Value::int(1));
    assert_eq!(scope.index_of("x"), Some(2));
    assert!(scope.set(LAST_LINE_SLOT, Value::string("line")));
    assert_eq!(scope.lookup("x"), Some(Value::int(1)));
}

#[test]
fn set_out_of_range_is_rejected() {
    let mut scope = Scope::with_locals(&[]);
    assert!(!scope.set(5, Value::int(1)));
    assert!(scope.set(BACK_REF_SLOT, Value::int(1)));
    assert_eq!(scope.get(BACK_REF_SLOT), Value::int(1));
}
