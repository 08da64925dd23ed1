use pretty_assertions::assert_eq;
use std::sync::Arc;

use tether_channel::ChannelError;
use tether_ir::{HandleValue, ModuleHandle};
use tether_resolve::{
    BridgeConfig, ErrorKind, ImportBridge, ImportError, Module, Origin, RemoteChannel,
    RemoteKind, TransportKind, Value,
};

use crate::common::{host, name, peer};

#[test]
fn from_remote_submodule_import_value() {
    let channel =
        peer([ModuleHandle::new(name("pkg.sub")).with("value", HandleValue::Int(42))]);
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(channel.clone(), BridgeConfig::local_first())
        .install(&system);

    let value = system.import_from(&name("pkg.sub"), "value").unwrap();
    assert_eq!(value, Value::Int(42));
    let calls = channel.calls();

    let again = system.import_from(&name("pkg.sub"), "value").unwrap();
    assert_eq!(again, Value::Int(42));
    assert_eq!(channel.calls(), calls, "second import must not go remote");
}

#[test]
fn missing_everywhere_is_the_standard_not_found() {
    let channel = peer(Vec::new());
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(channel.clone(), BridgeConfig::local_first())
        .install(&system);

    let err = system.import_str("missing_pkg").unwrap_err();
    assert_eq!(err, ImportError::not_found(&name("missing_pkg")));
    assert!(err.to_string().contains("missing_pkg"));
    assert_eq!(channel.calls(), 1);
    assert!(!system.is_loaded(&name("missing_pkg")));
}

#[test]
fn forced_missing_module_names_the_remote() {
    let system = host(&[]);
    let _bridge = ImportBridge::new(peer(Vec::new()), ["missing_pkg"])
        .unwrap()
        .install(&system);

    let err = system.import_str("missing_pkg").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteNotFound);
    assert_eq!(err.module(), Some(&name("missing_pkg")));
}

#[test]
fn local_module_wins_when_not_forced() {
    let channel = peer([ModuleHandle::new(name("json")).with("remote", HandleValue::Bool(true))]);
    let system = host(&["json"]);
    let _bridge = ImportBridge::with_config(channel.clone(), BridgeConfig::local_first())
        .install(&system);

    let json = system.import_str("json").unwrap();
    assert_eq!(json.origin(), Origin::Local);
    assert_eq!(json.get("local"), Some(Value::Bool(true)));
    assert_eq!(channel.calls(), 0);
}

#[test]
fn forced_prefix_shadows_local_module() {
    let channel = peer([ModuleHandle::new(name("json")).with("remote", HandleValue::Bool(true))]);
    let system = host(&["json"]);
    let _bridge = ImportBridge::new(channel.clone(), ["json"])
        .unwrap()
        .install(&system);

    let json = system.import_str("json").unwrap();
    assert_eq!(json.origin(), Origin::Remote);
    assert_eq!(json.descriptor(), "<proxy for json>");
    assert_eq!(json.get("local"), None);
    assert_eq!(channel.calls(), 1);
}

struct Down;

impl RemoteChannel for Down {
    fn import_module(&self, _: &tether_resolve::ModuleName) -> Result<ModuleHandle, ChannelError> {
        Err(ChannelError::transport(TransportKind::Timeout, "no answer in 5s"))
    }
}

#[test]
fn forced_transport_failure_raises() {
    let system = host(&[]);
    let _bridge = ImportBridge::new(Arc::new(Down), ["remote_only"])
        .unwrap()
        .install(&system);

    let err = system.import_str("remote_only.tools").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(err.module(), Some(&name("remote_only.tools")));
    assert!(err.to_string().contains("timeout"));
}

#[test]
fn repeated_imports_return_the_same_module() {
    let channel = peer([ModuleHandle::new(name("sample_module"))
        .with("greeting", HandleValue::Str("hi".into()))]);
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(channel, BridgeConfig::local_first()).install(&system);

    let first = system.import_str("sample_module").unwrap();
    let second = system.import_str("sample_module").unwrap();
    let third = system.import_from(&name("sample_module"), "greeting").unwrap();

    assert!(Module::same(&first, &second));
    assert_eq!(third, Value::str("hi"));
}

#[test]
fn dotted_import_is_reachable_from_every_ancestor() {
    let channel = peer([ModuleHandle::new(name("a")).with_submodule(
        ModuleHandle::new(name("a.b")).with_submodule(
            ModuleHandle::new(name("a.b.c")).with("depth", HandleValue::Int(3)),
        ),
    )]);
    let system = host(&[]);
    let _bridge = ImportBridge::new(channel.clone(), ["a"])
        .unwrap()
        .install(&system);

    let c = system.import_str("a.b.c").unwrap();
    let a = system.import_str("a").unwrap();
    let b = system.import_str("a.b").unwrap();

    assert!(Module::same(a.lookup_path("b.c").unwrap().as_module().unwrap(), &c));
    assert!(Module::same(b.get("c").unwrap().as_module().unwrap(), &c));
    assert_eq!(c.get("depth"), Some(Value::Int(3)));
    assert!(a.is_package() && b.is_package() && !c.is_package());
}

#[test]
fn partially_local_package_gets_remote_submodule() {
    let channel = peer([ModuleHandle::new(name("app.plugins")).with("count", HandleValue::Int(2))]);
    let system = host(&["app"]);
    let _bridge = ImportBridge::with_config(channel, BridgeConfig::local_first()).install(&system);

    let plugins = system.import_str("app.plugins").unwrap();
    let app = system.get(&name("app")).unwrap();

    assert_eq!(app.origin(), Origin::Local);
    assert_eq!(plugins.origin(), Origin::Remote);
    assert!(Module::same(app.get("plugins").unwrap().as_module().unwrap(), &plugins));
}

#[test]
fn unrepresentable_member_fails_materialization() {
    let channel = peer([ModuleHandle::new(name("advanced_classes")).with(
        "lock",
        HandleValue::Opaque {
            type_name: "thread.lock".into(),
        },
    )]);
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(channel, BridgeConfig::local_first()).install(&system);

    let err = system.import_str("advanced_classes").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaterializationFailure);
    assert!(err.to_string().contains("advanced_classes"));
    assert!(!system.is_loaded(&name("advanced_classes")));
}

#[test]
fn uninstalled_bridge_stops_resolving() {
    let channel = peer([
        ModuleHandle::new(name("first")),
        ModuleHandle::new(name("second")),
    ]);
    let system = host(&[]);
    let bridge = ImportBridge::with_config(channel, BridgeConfig::local_first()).install(&system);

    assert!(system.import_str("first").is_ok());
    drop(bridge);

    // Already loaded modules survive; new names are no longer bridged.
    assert!(system.import_str("first").is_ok());
    assert_eq!(
        system.import_str("second").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

fn sample_module() -> ModuleHandle {
    ModuleHandle::new(name("sample_module"))
        .with("x", HandleValue::Int(1))
        .with(
            "simple_function",
            HandleValue::Function {
                qualname: "simple_function".into(),
            },
        )
        .with(
            "SimpleClass",
            HandleValue::Class {
                qualname: "SimpleClass".into(),
            },
        )
}

#[test]
fn plain_data_imports_alongside_remote_functions() {
    let system = host(&[]);
    let _bridge =
        ImportBridge::with_config(peer([sample_module()]), BridgeConfig::local_first())
            .install(&system);

    let x = system.import_from(&name("sample_module"), "x").unwrap();
    assert_eq!(x, Value::Int(1));
}

#[test]
fn from_import_of_a_function_is_stable() {
    let channel = peer([sample_module()]);
    let system = host(&[]);
    let _bridge =
        ImportBridge::with_config(channel.clone(), BridgeConfig::local_first()).install(&system);

    let f1 = system
        .import_from(&name("sample_module"), "simple_function")
        .unwrap();
    let f2 = system
        .import_from(&name("sample_module"), "simple_function")
        .unwrap();

    let (f1, f2) = (f1.as_remote().unwrap(), f2.as_remote().unwrap());
    assert!(Arc::ptr_eq(f1, f2));
    assert_eq!(f1.kind(), RemoteKind::Function);
    assert_eq!(f1.fqn(), "sample_module.simple_function");
    assert_eq!(channel.calls(), 1);
}

#[test]
fn remote_class_answers_instance_checks() {
    let system = host(&[]);
    let bridge = ImportBridge::with_config(peer([sample_module()]), BridgeConfig::local_first())
        .install(&system);

    let class = system
        .import_from(&name("sample_module"), "SimpleClass")
        .unwrap();
    assert!(class.is_remote_class());
    let class = class.as_remote().unwrap();

    let types = bridge.remote_types();
    assert!(types.is_instance("sample_module", "SimpleClass", class));
    assert!(types.is_instance("__main__", "SimpleClass", class));
    assert!(!types.is_instance("sample_module", "simple_function", class));

    let function = system
        .import_from(&name("sample_module"), "simple_function")
        .unwrap();
    assert!(!function.is_remote_class());
    assert!(!types.is_instance("sample_module", "simple_function", function.as_remote().unwrap()));
}
