//! Wiring engine tests
//!
//! Scheduling, activation contracts, registry lookups, configuration and
//! events, driven through the public bootstrap API.

mod common;

use common::{module, recording_module, Recorder};
use modwire::registry::Entry;
use modwire::{
    App, Bootstrap, ContractViolationKind, ExportTree, QualifiedName, ServiceDefinition,
    WiringError,
};
use serde_json::{json, Value};

fn qn(name: &str) -> QualifiedName {
    name.parse().unwrap()
}

#[test]
fn test_provider_activates_before_consumer_in_any_order() {
    for reversed in [false, true] {
        let recorder = Recorder::new();
        let mut modules = vec![
            recording_module(&recorder, "a", &["x.s"], &[], &[]),
            recording_module(&recorder, "b", &[], &["x.s"], &[]),
        ];
        if reversed {
            modules.reverse();
        }
        Bootstrap::run(modules, json!({})).unwrap();
        assert_eq!(recorder.entries(), vec!["a", "b"]);
    }
}

#[test]
fn test_duplicate_provider_activates_nothing() {
    let recorder = Recorder::new();
    let err = Bootstrap::run(
        vec![
            recording_module(&recorder, "a", &["x.s"], &[], &[]),
            recording_module(&recorder, "b", &["x.s"], &[], &[]),
        ],
        json!({}),
    )
    .unwrap_err();

    match err {
        WiringError::Conflict { name, first, second } => {
            assert_eq!(name, qn("x.s"));
            assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(recorder.entries().is_empty());
}

#[test]
fn test_unresolved_requirement_names_the_missing_service() {
    let recorder = Recorder::new();
    for (consumes, extends) in [(&["y.t"][..], &[][..]), (&[][..], &["y.t"][..])] {
        let err = Bootstrap::run(
            vec![recording_module(&recorder, "needy", &[], consumes, extends)],
            json!({}),
        )
        .unwrap_err();
        match err {
            WiringError::Dependency { module, name } => {
                assert_eq!(module, "needy");
                assert_eq!(name, qn("y.t"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
    assert!(recorder.entries().is_empty());
}

#[test]
fn test_missing_export_is_contract_violation() {
    let err = Bootstrap::run(
        vec![module("lazy", &["c.s"], &[], &[], |_| Ok(ExportTree::new()))],
        json!({}),
    )
    .unwrap_err();
    assert_eq!(err.contract_kind(), Some(ContractViolationKind::MissingExport));
    assert!(err.to_string().contains("c.s"));
}

#[test]
fn test_undeclared_export_is_contract_violation() {
    let err = Bootstrap::run(
        vec![module("sneaky", &["c.a"], &[], &[], |_| {
            Ok(ExportTree::new()
                .service("c", "a", ServiceDefinition::new())
                .service("c", "s", ServiceDefinition::new()))
        })],
        json!({}),
    )
    .unwrap_err();
    assert_eq!(err.contract_kind(), Some(ContractViolationKind::UndeclaredExport));
}

#[test]
fn test_export_without_any_declaration() {
    let err = Bootstrap::run(
        vec![module("rogue", &[], &[], &[], |_| {
            Ok(ExportTree::new().service("c", "s", ServiceDefinition::new()))
        })],
        json!({}),
    )
    .unwrap_err();
    assert!(err
        .to_string()
        .contains("unable to export services without declaring them"));
}

#[test]
fn test_extend_keeps_old_handlers_first_and_merges_operations() {
    let recorder = Recorder::new();

    let base_recorder = recorder.clone();
    let base = module("base", &["core.app"], &[], &[], move |_| {
        let recorder = base_recorder.clone();
        Ok(ExportTree::new().service(
            "core",
            "app",
            ServiceDefinition::new()
                .on("start", move |_, _| recorder.record("base"))
                .operation("listen", |_, _| Ok(json!("base listen")))
                .operation("instance", |_, _| Ok(json!("instance"))),
        ))
    });

    let plugin_recorder = recorder.clone();
    let plugin = module("plugin", &[], &[], &["core.app"], move |_| {
        let recorder = plugin_recorder.clone();
        Ok(ExportTree::new().service(
            "core",
            "app",
            ServiceDefinition::new()
                .on("start", move |_, _| recorder.record("plugin"))
                .operation("listen", |_, _| Ok(json!("plugin listen"))),
        ))
    });

    let app = Bootstrap::run(vec![plugin, base], json!({})).unwrap();
    app.trigger("start", &Value::Null);
    assert_eq!(recorder.entries(), vec!["base", "plugin"]);

    let service = app.service(&qn("core.app")).unwrap();
    assert_eq!(service.call("listen", &Value::Null).unwrap(), json!("plugin listen"));
    assert_eq!(service.call("instance", &Value::Null).unwrap(), json!("instance"));
}

#[test]
fn test_extend_without_target_is_contract_violation() {
    let mut app = App::new();
    let plugin = module("plugin", &[], &[], &["core.app"], |_| {
        Ok(ExportTree::new().service("core", "app", ServiceDefinition::new()))
    });
    let err = modwire::module::ModuleActivator::new(&mut app)
        .activate(&plugin)
        .unwrap_err();
    assert_eq!(err.contract_kind(), Some(ContractViolationKind::ExtendTargetMissing));
}

#[test]
fn test_protected_names_cannot_be_operations() {
    let mut app = App::new();
    app.register(&qn("core.app"), ServiceDefinition::new()).unwrap();
    for name in ["trigger", "configure", "events", "name", "extends"] {
        let err = app
            .register(
                &qn("core.app"),
                ServiceDefinition::new().operation(name, |_, _| Ok(Value::Null)),
            )
            .unwrap_err();
        assert_eq!(err.contract_kind(), Some(ContractViolationKind::ProtectedName));
    }
}

#[test]
fn test_configure_accumulates() {
    let mut app = App::new();
    app.configure(json!({"a": {"x": 1}}));
    app.configure(json!({"a": {"y": 2}}));
    assert_eq!(app.config(), &json!({"a": {"x": 1, "y": 2}}));
    app.configure(json!({"a": {"x": 3}}));
    assert_eq!(app.config(), &json!({"a": {"x": 3, "y": 2}}));
}

#[test]
fn test_configure_flows_to_existing_services() {
    let mut app = App::new();
    app.register(
        &qn("core.app"),
        ServiceDefinition::new().with_config(json!({"port": 80, "tls": {"enabled": false}})),
    )
    .unwrap();

    app.configure(json!({"core": {"app": {"tls": {"cert": "a.pem"}}}}));
    app.configure(json!({"core": {"app": {"port": 3000}}}));

    let service = app.service(&qn("core.app")).unwrap();
    assert_eq!(
        service.config(),
        json!({"port": 3000, "tls": {"enabled": false, "cert": "a.pem"}})
    );
}

#[test]
fn test_trigger_order_and_unregistered_events() {
    let recorder = Recorder::new();
    let mut app = App::new();

    for service in ["first", "second"] {
        let recorder = recorder.clone();
        let tag = service.to_string();
        app.register(
            &QualifiedName::new("web", service),
            ServiceDefinition::new().on("ready", move |_, payload| {
                recorder.record(format!("{tag}:{payload}"))
            }),
        )
        .unwrap();
    }
    let other = recorder.clone();
    app.register(
        &qn("db.pool"),
        ServiceDefinition::new().on("ready", move |_, _| other.record("db")),
    )
    .unwrap();

    app.trigger("ready", &json!(1));
    assert_eq!(recorder.entries(), vec!["first:1", "second:1", "db"]);

    app.trigger_in("db", "ready", &Value::Null).unwrap();
    assert_eq!(recorder.entries().last().map(String::as_str), Some("db"));

    // No handlers: a no-op
    app.trigger("shutdown", &Value::Null);
    assert_eq!(recorder.entries().len(), 4);

    assert!(matches!(
        app.trigger_in("nope", "ready", &Value::Null).unwrap_err(),
        WiringError::NotFound { .. }
    ));
}

#[test]
fn test_cycle_invokes_no_factory() {
    let recorder = Recorder::new();
    let err = Bootstrap::run(
        vec![
            recording_module(&recorder, "a", &["a.s"], &["b.s"], &[]),
            recording_module(&recorder, "b", &["b.s"], &["a.s"], &[]),
        ],
        json!({}),
    )
    .unwrap_err();
    match err {
        WiringError::Cycle { cycle } => assert_eq!(cycle, vec!["a", "b", "a"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(recorder.entries().is_empty());
}

#[test]
fn test_get_dispatches_on_dots() {
    let mut app = App::new();
    app.register(&qn("core.router"), ServiceDefinition::new()).unwrap();

    match app.get("core.router").unwrap() {
        Entry::Service(service) => assert_eq!(service.name(), "router"),
        Entry::Container(_) => panic!("expected a service"),
    }
    match app.get("core").unwrap() {
        Entry::Container(container) => assert_eq!(container.services(), ["router".to_string()]),
        Entry::Service(_) => panic!("expected a container"),
    }

    for name in ["web", "web.app", "core.app"] {
        assert!(matches!(app.get(name).unwrap_err(), WiringError::NotFound { .. }));
    }
    assert!(app.contains("core", "router"));
    assert!(!app.contains("core", "app"));
}

#[test]
fn test_standalone_modules_are_activated() {
    let recorder = Recorder::new();
    Bootstrap::run(
        vec![
            recording_module(&recorder, "idle", &[], &[], &[]),
            recording_module(&recorder, "core", &["core.app"], &[], &[]),
        ],
        json!({}),
    )
    .unwrap();
    assert_eq!(recorder.entries(), vec!["idle", "core"]);
}

#[test]
fn test_hello_end_to_end() {
    let recorder = Recorder::new();

    let core = module("core", &["core.router"], &[], &[], |_| {
        Ok(ExportTree::new().service(
            "core",
            "router",
            ServiceDefinition::new().with_config(json!({"routes": []})),
        ))
    });

    let hello_recorder = recorder.clone();
    let hello = module("hello", &["plugin.hello"], &["core.router"], &[], move |imports| {
        let router = imports.require("core.router")?;
        let recorder = hello_recorder.clone();
        Ok(ExportTree::new().service(
            "plugin",
            "hello",
            ServiceDefinition::new().on("ready", move |_, _| {
                recorder.record(router.qualified_name().to_string());
            }),
        ))
    });

    let order = Bootstrap::plan(&[hello.declaration.clone(), core.declaration.clone()]).unwrap();
    assert_eq!(order, vec!["core", "hello"]);

    let app = Bootstrap::run(vec![core, hello], json!({})).unwrap();
    let router = app.get("core.router").unwrap().into_service().unwrap();
    assert_eq!(router.config(), json!({"routes": []}));

    app.trigger("ready", &Value::Null);
    assert_eq!(recorder.entries(), vec!["core.router"]);
}

#[test]
fn test_consumer_cannot_augment_its_import() {
    let core = module("core", &["core.router"], &[], &[], |_| {
        Ok(ExportTree::new().service(
            "core",
            "router",
            ServiceDefinition::new()
                .with_config(json!({"prefix": "/"}))
                .operation("get", |_, _| Ok(json!("core get"))),
        ))
    });
    let reader = module("reader", &[], &["core.router"], &[], |imports| {
        let router = imports.require("core.router")?;
        // Reading, calling and triggering are all a consumer can do
        router.trigger("ready", &Value::Null);
        assert_eq!(router.call("get", &Value::Null)?, json!("core get"));
        assert_eq!(router.config()["prefix"], json!("/"));
        Ok(ExportTree::new())
    });

    let app = Bootstrap::run(vec![reader, core], json!({})).unwrap();
    let router = app.service(&qn("core.router")).unwrap();
    assert_eq!(router.operation_names(), vec!["get"]);
    assert_eq!(router.handler_count("ready"), 0);
    assert_eq!(router.config(), json!({"prefix": "/"}));
}

#[test]
fn test_later_service_values_survive_unrelated_configure() {
    let core = module("core", &["core.app"], &[], &[], |_| {
        Ok(ExportTree::new().service("core", "app", ServiceDefinition::new()))
    });
    let mut app = Bootstrap::run(vec![core], json!({"core": {"app": {"port": 1}}})).unwrap();
    let service = app.service(&qn("core.app")).unwrap();
    assert_eq!(service.config()["port"], json!(1));

    service.configure(json!({"port": 2}));
    app.configure(json!({"web": {"x": true}}));
    assert_eq!(service.config()["port"], json!(2));

    app.configure(json!({"core": {"app": {"port": 3}}}));
    assert_eq!(service.config()["port"], json!(3));
}
