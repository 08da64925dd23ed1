use super::*;
use pretty_assertions::assert_eq;

fn name(s: &str) -> ModuleName {
    ModuleName::parse(s).unwrap()
}

#[test]
fn interning_returns_the_first_descriptor() {
    let types = RemoteTypes::new();
    let first = types.intern(RemoteKind::Function, &name("sample_module"), "simple_function");
    let second = types.intern(RemoteKind::Function, &name("sample_module"), "simple_function");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(types.len(), 1);
    assert_eq!(types.names(), vec!["sample_module.simple_function"]);
    assert!(Arc::ptr_eq(
        &types.get("sample_module.simple_function").unwrap(),
        &first
    ));
}

#[test]
fn instance_check_matches_qualified_and_bare_names() {
    let types = RemoteTypes::new();
    let class = types.intern(RemoteKind::Class, &name("test_package.submodule"), "SubmoduleClass");

    assert!(types.is_instance("test_package.submodule", "SubmoduleClass", &class));
    // Peer-side module prefixes before the registered name.
    assert!(types.is_instance("remote.test_package.submodule", "SubmoduleClass", &class));
    // Same class name through another module.
    assert!(types.is_instance("elsewhere", "SubmoduleClass", &class));
    assert!(types.is_instance("", "Outer.SubmoduleClass", &class));

    assert!(!types.is_instance("test_package.submodule", "OtherClass", &class));
    assert!(!types.is_instance("x", "NotSubmoduleClass", &class));
}

#[test]
fn instance_check_requires_a_registered_class() {
    let types = RemoteTypes::new();
    let func = types.intern(RemoteKind::Function, &name("m"), "helper");
    assert!(!types.is_instance("m", "helper", &func));

    let stranger = RemoteItem::new(RemoteKind::Class, name("m"), "Widget");
    assert!(!types.is_instance("m", "Widget", &stranger));
}
