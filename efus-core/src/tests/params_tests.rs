use super::box_params;
use crate::error::{EfusError, Result};
use crate::instr::Attributes;
use crate::namespace::{Namespace, NamespaceRef};
use crate::params::CompParams;
use crate::runtime::RuntimeValue;
use crate::subscribe::Subscribable;
use crate::types::{CastHook, TypeSpec};
use crate::value::{Number, Value};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

fn attrs(entries: &[(&str, Value)]) -> Attributes {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn int(i: i64) -> Value {
    Value::Number(Number::Int(i))
}

fn card_params() -> Rc<CompParams> {
    CompParams::builder("card")
        .param("title", TypeSpec::Str, "untitled")
        .group("border", |b| {
            b.param("width", TypeSpec::Number, 1)
                .param("color", TypeSpec::Str, "black")
        })
        .build()
}

#[test]
fn test_defaults_and_supplied_values() {
    let ns = Namespace::new();
    let params = box_params();

    let args = params.bind(&Attributes::new(), &ns, &BTreeMap::new()).unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("width"), Some(RuntimeValue::from(10)));
    assert_eq!(args.get("style"), Some(RuntimeValue::Nil));

    let args = params
        .bind(&attrs(&[("width", int(25))]), &ns, &BTreeMap::new())
        .unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("width"), Some(RuntimeValue::from(25)));
    assert_eq!(args.get("height"), Some(RuntimeValue::from(10)));
}

#[test]
fn test_values_are_cast_to_param_types() {
    let ns = Namespace::new();
    let args = box_params()
        .bind(&attrs(&[("width", Value::Str("12".into()))]), &ns, &BTreeMap::new())
        .unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("width"), Some(RuntimeValue::from(12)));
    assert_eq!(args.raw("width"), Some(&RuntimeValue::from("12")));
}

#[test]
fn test_unknown_attribute() {
    let ns = Namespace::new();
    let err = box_params()
        .bind(&attrs(&[("depth", int(3))]), &ns, &BTreeMap::new())
        .unwrap_err();
    assert!(matches!(
        &err,
        EfusError::Binding { component, name } if component == "box" && name == "depth"
    ));
    assert_eq!(err.to_string(), "component `box` has no parameter `depth`");
}

#[test]
fn test_composite_names_build_nested_map() {
    let ns = Namespace::new();
    let args = card_params()
        .bind(&attrs(&[("border:width", int(3))]), &ns, &BTreeMap::new())
        .unwrap();
    args.eval().unwrap();

    assert_eq!(args.lookup("border:width"), Some(RuntimeValue::from(3)));
    assert_eq!(args.lookup("border:color"), Some(RuntimeValue::from("black")));
    insta::assert_snapshot!(args.to_value().to_string(), @r#"{border: {color: "black", width: 3}, title: "untitled"}"#);
}

#[test]
fn test_include_fills_group_from_map() {
    let ns = Namespace::new();
    let args = card_params()
        .bind(
            &attrs(&[("border:", Value::Yaml("width: 5".into()))]),
            &ns,
            &BTreeMap::new(),
        )
        .unwrap();
    args.eval().unwrap();

    assert_eq!(args.lookup("border:width"), Some(RuntimeValue::from(5)));
    // Missing entries fall back to the default
    assert_eq!(args.lookup("border:color"), Some(RuntimeValue::from("black")));
}

#[test]
fn test_explicit_attribute_beats_include() {
    let ns = Namespace::new();
    ns.set(
        "thick",
        RuntimeValue::from(BTreeMap::from([("width".to_string(), RuntimeValue::from(9))])),
    );
    let args = card_params()
        .bind(
            &attrs(&[("border:", Value::Var("thick".into())), ("border:width", int(2))]),
            &ns,
            &BTreeMap::new(),
        )
        .unwrap();
    args.eval().unwrap();
    assert_eq!(args.lookup("border:width"), Some(RuntimeValue::from(2)));
}

#[test]
fn test_computed_values() {
    let ns = Namespace::new();
    let computed = BTreeMap::from([("width".to_string(), RuntimeValue::from(40))]);
    let args = box_params().bind(&Attributes::new(), &ns, &computed).unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("width"), Some(RuntimeValue::from(40)));

    let unknown = BTreeMap::from([("colour".to_string(), RuntimeValue::from("red"))]);
    assert!(box_params().bind(&Attributes::new(), &ns, &unknown).is_err());
}

struct Counting {
    calls: Rc<Cell<usize>>,
}

impl CastHook for Counting {
    fn name(&self) -> &str {
        "Counting"
    }

    fn matches(&self, _value: &RuntimeValue) -> bool {
        false
    }

    fn cast_from(&self, value: RuntimeValue, _namespace: &NamespaceRef) -> Result<RuntimeValue> {
        self.calls.set(self.calls.get() + 1);
        Err(EfusError::cast(value, "Counting"))
    }
}

#[test]
fn test_union_short_circuits_on_match() {
    let ns = Namespace::new();
    let calls = Rc::new(Cell::new(0));
    let counting = TypeSpec::Custom(Rc::new(Counting {
        calls: calls.clone(),
    }));
    let params = CompParams::builder("gauge")
        .param("level", TypeSpec::union([counting, TypeSpec::Number]), 0)
        .build();

    let args = params
        .bind(&attrs(&[("level", int(3))]), &ns, &BTreeMap::new())
        .unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("level"), Some(RuntimeValue::from(3)));
    assert_eq!(calls.get(), 0);

    let args = params
        .bind(&attrs(&[("level", Value::Str("7".into()))]), &ns, &BTreeMap::new())
        .unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("level"), Some(RuntimeValue::from(7)));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_binding_argument_notifies_on_change() {
    let ns = Namespace::new();
    ns.set("status", "idle");
    let params = CompParams::builder("label")
        .param("text", TypeSpec::union([TypeSpec::Binding, TypeSpec::Str]), "")
        .param("width", TypeSpec::Number, 0)
        .param("note", TypeSpec::Any, "")
        .build();
    let args = params
        .bind(
            &attrs(&[
                ("text", Value::NameBinding("status".into())),
                ("width", Value::NameBinding("status".into())),
                ("note", Value::NameBinding("status".into())),
            ]),
            &ns,
            &BTreeMap::new(),
        )
        .unwrap();
    // Only parameters whose type names Binding subscribe
    assert_eq!(args.binding_count(), 1);

    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    args.subscribe(move || {
        counter.set(counter.get() + 1);
        Ok(())
    });

    ns.set("status", "busy");
    ns.update().unwrap();
    assert_eq!(hits.get(), 1);

    let text = args.raw("text").and_then(RuntimeValue::as_binding).unwrap();
    assert_eq!(text.get(), RuntimeValue::from("busy"));

    ns.set("status", "busy");
    ns.update().unwrap();
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_failed_eval_keeps_previous_arguments() {
    let ns = Namespace::new();
    ns.set("base", 8);
    let params = CompParams::builder("spacer")
        .param(
            "width",
            TypeSpec::Number,
            RuntimeValue::Object(Value::Var("base".into())),
        )
        .build();
    let args = params.bind(&Attributes::new(), &ns, &BTreeMap::new()).unwrap();
    args.eval().unwrap();
    assert_eq!(args.get("width"), Some(RuntimeValue::from(8)));

    ns.set("base", "wide");
    assert!(matches!(args.eval(), Err(EfusError::Cast { .. })));
    assert_eq!(args.get("width"), Some(RuntimeValue::from(8)));

    ns.set("base", 12);
    args.eval().unwrap();
    assert_eq!(args.get("width"), Some(RuntimeValue::from(12)));
}
