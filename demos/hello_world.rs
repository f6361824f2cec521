//! Hello world wiring
//!
//! `core` provides a router and an app service, `hello` consumes the router
//! and registers a route once the app is ready, and `world` extends the
//! `plugin.hello` service with a second route.
//!
//! Usage:
//!   cargo run --example hello-world

use anyhow::Context;
use serde_json::{json, Value};
use tracing::info;

use modwire::utils::init_logging;
use modwire::{Bootstrap, ExportTree, Imports, ModuleDeclaration, ModuleDescriptor, ServiceDefinition};

fn core_module() -> anyhow::Result<ModuleDescriptor> {
    let declaration = ModuleDeclaration::parse("core", &["core.router", "core.app"], &[], &[])?;
    Ok(ModuleDescriptor::new(declaration, |_| {
        let router = ServiceDefinition::new()
            .with_config(json!({"routes": {}}))
            .operation("get", |router, args| {
                let path = args["path"].as_str().context("route needs a path")?;
                router.configure(json!({"routes": {path: args["body"].clone()}}));
                Ok(Value::Null)
            })
            .operation("dispatch", |router, args| {
                let path = args["path"].as_str().context("dispatch needs a path")?;
                Ok(router.config()["routes"][path].clone())
            });
        let app = ServiceDefinition::new().with_config(json!({"port": 8080}));

        Ok(ExportTree::new()
            .service("core", "router", router)
            .service("core", "app", app))
    }))
}

fn hello_module() -> anyhow::Result<ModuleDescriptor> {
    let declaration = ModuleDeclaration::parse("hello", &["plugin.hello"], &["core.router"], &[])?;
    Ok(ModuleDescriptor::new(declaration, |imports: &Imports| {
        let router = imports.require("core.router")?;
        let hello = ServiceDefinition::new().on("ready", move |_, _| {
            if let Err(e) = router.call("get", &json!({"path": "/", "body": "Hello World - from hello"})) {
                tracing::warn!("hello: {e}");
            }
        });
        Ok(ExportTree::new().service("plugin", "hello", hello))
    }))
}

fn world_module() -> anyhow::Result<ModuleDescriptor> {
    let declaration =
        ModuleDeclaration::parse("world", &[], &["core.router"], &["plugin.hello"])?;
    Ok(ModuleDescriptor::new(declaration, |imports: &Imports| {
        let router = imports.require("core.router")?;
        let world = ServiceDefinition::new().on("ready", move |_, _| {
            if let Err(e) = router.call("get", &json!({"path": "/world", "body": "Hello World - from world"})) {
                tracing::warn!("world: {e}");
            }
        });
        Ok(ExportTree::new().service("plugin", "hello", world))
    }))
}

fn main() -> anyhow::Result<()> {
    init_logging(None);

    // Declaration order does not matter; the scheduler sorts it out
    let modules = vec![world_module()?, hello_module()?, core_module()?];
    let app = Bootstrap::run(modules, json!({"core": {"app": {"port": 3000}}}))?;

    app.trigger("ready", &Value::Null);

    let router = app.get("core.router")?.into_service().context("core.router is a service")?;
    for path in ["/", "/world"] {
        let body = router.call("dispatch", &json!({"path": path}))?;
        info!("GET {} -> {}", path, body);
    }

    let port = app.get("core.app")?
        .into_service()
        .context("core.app is a service")?
        .config()["port"]
        .clone();
    println!("Server is started on {}", port);
    Ok(())
}
