use pretty_assertions::assert_eq;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tether_channel::{serve_connection, ModuleTable, StreamChannel};
use tether_ir::{HandleValue, ModuleHandle};
use tether_resolve::{ErrorKind, ImportBridge, Origin, Value};

use crate::common::{host, name};

#[test]
fn imports_over_a_socket() {
    let table = ModuleTable::new();
    table.insert(
        ModuleHandle::new(name("remote_pkg"))
            .with("version", HandleValue::Str("1.2".into()))
            .with_submodule(
                ModuleHandle::new(name("remote_pkg.util")).with(
                    "limits",
                    HandleValue::List(vec![HandleValue::Int(1), HandleValue::Int(10)]),
                ),
            ),
    );
    table.insert_failure(name("broken"), "ZeroDivisionError: division by zero");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve_connection(stream, &table)
    });

    let channel = StreamChannel::connect(addr, Duration::from_secs(5)).unwrap();
    let system = host(&[]);
    let bridge = ImportBridge::new(Arc::new(channel), ["remote_pkg", "broken"])
        .unwrap()
        .install(&system);
    assert!(bridge.verify_connection());

    let util = system.import_str("remote_pkg.util").unwrap();
    assert_eq!(util.origin(), Origin::Remote);
    assert_eq!(
        util.get("limits"),
        Some(Value::List(Arc::from(vec![Value::Int(1), Value::Int(10)])))
    );
    let pkg = system.get(&name("remote_pkg")).unwrap();
    assert_eq!(pkg.get("version"), Some(Value::str("1.2")));

    let err = system.import_str("broken").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(err.to_string().contains("ZeroDivisionError"));

    // Dropping the guard releases the last handle on the socket.
    drop(bridge);
    server.join().unwrap().unwrap();
}
