use super::{box_params, entries, probe_factory, widgets, Log};
use crate::capability::{Host, ModuleRegistry};
use crate::error::EfusError;
use crate::namespace::Namespace;
use crate::runtime::RuntimeValue;
use crate::value::Number;
use crate::{run, run_file, Source};
use std::rc::Rc;

#[test]
fn test_box_with_aliased_label() {
    let ns = Namespace::new();
    widgets(&ns);
    let root = run(
        Source::Text("box width=10 height=20\n  label&l text=\"hi\""),
        Some(ns.clone()),
    )
    .unwrap()
    .unwrap();

    assert_eq!(root.name(), "box");
    assert_eq!(root.arg("width"), RuntimeValue::from(10));
    assert_eq!(root.arg("height"), RuntimeValue::from(20));

    let children = root.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].arg("text"), RuntimeValue::from("hi"));

    let alias = ns.get("l").unwrap();
    let aliased = alias.as_component().unwrap();
    assert!(Rc::ptr_eq(aliased, &children[0]));
}

#[test]
fn test_last_top_level_component_is_the_result() {
    let ns = Namespace::new();
    widgets(&ns);
    let last = run(Source::Text("box\nlabel text=\"second\"\n"), Some(ns))
        .unwrap()
        .unwrap();
    assert_eq!(last.name(), "label");
}

#[test]
fn test_return_slot_selects_result() {
    let ns = Namespace::new();
    widgets(&ns);
    let picked = run(
        Source::Text("box\n  label&return text=\"inner\"\nbox\n"),
        Some(ns),
    )
    .unwrap()
    .unwrap();
    assert_eq!(picked.name(), "label");
    assert_eq!(picked.arg("text"), RuntimeValue::from("inner"));
}

#[test]
fn test_return_slot_must_hold_component() {
    let registry = Rc::new(ModuleRegistry::new());
    registry.register("broken", [("return", RuntimeValue::from(3))]);
    let ns = Namespace::with_host(Rc::new(Host::default().with_modules(registry)));
    widgets(&ns);

    let err = run(Source::Text("box\nusing broken: *\n"), Some(ns)).unwrap_err();
    assert!(matches!(err, EfusError::Cast { target, .. } if target == "Component"));
}

#[test]
fn test_unknown_tag() {
    let ns = Namespace::new();
    assert!(matches!(
        run(Source::Text("panel\n"), Some(ns.clone())),
        Err(EfusError::ComponentNotFound { name }) if name == "panel"
    ));

    ns.set("panel", 4);
    let err = run(Source::Text("panel\n"), Some(ns)).unwrap_err();
    assert!(matches!(
        &err,
        EfusError::NotAComponent { name, kind: "Number" } if name == "panel"
    ));
    assert_eq!(err.to_string(), "`panel` is Number, not a component factory");
}

#[test]
fn test_using_imports_registered_module() {
    let log = Log::default();
    let registry = Rc::new(ModuleRegistry::new());
    registry.register(
        "ui.basic",
        [
            ("box", probe_factory(box_params(), &log)),
            ("gap", RuntimeValue::from(6)),
        ],
    );
    let ns = Namespace::with_host(Rc::new(Host::default().with_modules(registry)));

    let root = run(Source::Text("using ui.basic: *\nbox width=gap\n"), Some(ns.clone()))
        .unwrap()
        .unwrap();
    assert_eq!(root.arg("width"), RuntimeValue::from(6));
    assert_eq!(entries(&log), ["box:init"]);

    let err = run(Source::Text("using ui.fancy: *\n"), Some(ns)).unwrap_err();
    assert!(matches!(err, EfusError::Import { module, .. } if module == "ui.fancy"));
}

#[test]
fn test_using_specific_names() {
    let log = Log::default();
    let registry = Rc::new(ModuleRegistry::new());
    registry.register("ui.basic", [("box", probe_factory(box_params(), &log))]);
    let ns = Namespace::with_host(Rc::new(Host::default().with_modules(registry)));

    assert!(run(Source::Text("using ui.basic: box\nbox\n"), Some(ns.clone())).is_ok());
    assert!(matches!(
        run(Source::Text("using ui.basic: label\n"), Some(ns)),
        Err(EfusError::Import { .. })
    ));
}

#[test]
fn test_attribute_value_forms() {
    let ns = Namespace::new();
    widgets(&ns);
    ns.set("user", "ada");
    ns.set("base", 4);
    ns.set("em", 16);

    let root = run(
        Source::Text(concat!(
            "box width=(base * 3 + 1) height=1.5em style=---\n",
            "  color: red\n",
            "  weight: 2\n",
            "...\n",
            "  label text=\"hi %(user)s, %(base)03d\" pad=2px\n",
        )),
        Some(ns),
    )
    .unwrap()
    .unwrap();

    assert_eq!(root.arg("width"), RuntimeValue::from(13));
    assert_eq!(root.arg("height"), RuntimeValue::Number(Number::Decimal(24.0)));
    assert_eq!(root.arg("style:color"), RuntimeValue::from("red"));
    assert_eq!(root.arg("style:weight"), RuntimeValue::from(2));

    let label = &root.children()[0];
    assert_eq!(label.arg("text"), RuntimeValue::from("hi ada, 004"));
    assert_eq!(label.arg("pad"), RuntimeValue::from(2));
}

#[test]
fn test_size_attribute_casts_to_text() {
    let ns = Namespace::new();
    widgets(&ns);
    let label = run(Source::Text("label text=3x4 width=\"12\""), Some(ns))
        .unwrap()
        .unwrap();
    assert_eq!(
        label.arg("text"),
        RuntimeValue::Size(Number::Int(3), Number::Int(4))
    );
    assert_eq!(label.arg("width"), RuntimeValue::from(12));
}

#[test]
fn test_cast_failure_surfaces() {
    let ns = Namespace::new();
    widgets(&ns);
    let err = run(Source::Text("box width=\"wide\""), Some(ns)).unwrap_err();
    assert_eq!(err.to_string(), "cannot cast \"wide\" to Number");
}

#[test]
fn test_run_without_namespace() {
    let result = run(Source::Text("using theme\n"), None);
    assert!(matches!(result, Err(EfusError::Import { .. })));
    assert!(run(Source::Text(""), None).unwrap().is_none());
}

#[test]
fn test_run_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.efus");
    std::fs::write(&path, "box\n  label text=\"from file\"\n").unwrap();

    let ns = Namespace::new();
    widgets(&ns);
    let root = run_file(&path, Some(ns)).unwrap().unwrap();
    assert_eq!(root.children()[0].arg("text"), RuntimeValue::from("from file"));

    let missing = dir.path().join("missing.efus");
    assert!(matches!(run_file(&missing, None), Err(EfusError::Io { .. })));
}
