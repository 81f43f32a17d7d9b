use super::*;

#[test]
fn class_records_superclass() {
    let object = RModule::new_class("Object", None);
    let foo = RModule::new_class("Foo", Some(object.clone()));
    assert!(foo.is_class());
    assert!(foo.superclass().is_some_and(|s| Heap::ptr_eq(s, &object)));
    assert!(object.superclass().is_none());
}

#[test]
fn modules_have_no_superclass() {
    let kernel = RModule::new_module("Kernel");
    assert_eq!(kernel.kind(), ModuleKind::Module);
    assert!(!kernel.is_class());
    assert!(kernel.superclass().is_none());
}

#[test]
fn inherits_from_walks_the_chain() {
    let object = RModule::new_class("Object", None);
    let base = RModule::new_class("Base", Some(object.clone()));
    let leaf = RModule::new_class("Leaf", Some(base.clone()));
    let other = RModule::new_class("Other", Some(object.clone()));

    assert!(leaf.inherits_from(&leaf));
    assert!(leaf.inherits_from(&base));
    assert!(leaf.inherits_from(&object));
    assert!(!leaf.inherits_from(&other));
    assert!(!object.inherits_from(&leaf));
}

#[test]
fn constants_resolve_through_superclasses() {
    let object = RModule::new_class("Object", None);
    let foo = RModule::new_class("Foo", Some(object.clone()));
    object.define_constant("VERSION", Value::string("1.6.7"));
    foo.define_constant("LIMIT", Value::int(3));

    assert_eq!(foo.constant("VERSION"), None);
    assert_eq!(foo.lookup_constant("VERSION"), Some(Value::string("1.6.7")));
    assert_eq!(foo.lookup_constant("LIMIT"), Some(Value::int(3)));
    assert_eq!(object.lookup_constant("LIMIT"), None);
    assert_eq!(foo.constant_names(), vec!["LIMIT".to_string()]);
}

#[test]
fn rename_is_visible_through_every_handle() {
    let anon = RModule::new_module("");
    let handle = anon.clone();
    anon.set_name("Named");
    assert_eq!(handle.name(), "Named");
}

#[test]
fn modules_compare_by_identity() {
    let a = RModule::new_module("M");
    let b = RModule::new_module("M");
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
}
