//! Stand-in widgets for `efus run`.
//!
//! They hold no host objects; their handles are descriptive strings so a
//! program can be evaluated and rendered end to end from the terminal.

use efus_core::{
    Behavior, CompParams, Component, NamespaceRef, Result, RuntimeValue, TypeSpec, WidgetFactory,
};
use std::rc::Rc;
use tracing::debug;

struct DemoWidget;

impl Behavior for DemoWidget {
    fn init(&mut self, component: &Component) -> Result<()> {
        debug!(widget = component.name(), "created");
        Ok(())
    }

    fn prerender(&mut self, component: &Component) -> Result<Option<RuntimeValue>> {
        Ok(Some(RuntimeValue::from(format!("<{}>", component.name()))))
    }

    fn update(&mut self, component: &Component) -> Result<()> {
        debug!(widget = component.name(), "arguments changed");
        Ok(())
    }
}

fn widget(params: Rc<CompParams>) -> RuntimeValue {
    WidgetFactory::new(params, || -> Box<dyn Behavior> { Box::new(DemoWidget) }).into_value()
}

/// Bind the `box`, `label` and `button` demo factories into `namespace`
pub fn install(namespace: &NamespaceRef) {
    let size = TypeSpec::union([TypeSpec::Size, TypeSpec::Number]);
    namespace.set(
        "box",
        widget(
            CompParams::builder("box")
                .param("width", size.clone(), RuntimeValue::Nil)
                .param("height", size, RuntimeValue::Nil)
                .group("border", |b| {
                    b.param("width", TypeSpec::Number, 0)
                        .param("color", TypeSpec::Str, RuntimeValue::Nil)
                })
                .build(),
        ),
    );
    namespace.set(
        "label",
        widget(
            CompParams::builder("label")
                .param("text", TypeSpec::union([TypeSpec::Binding, TypeSpec::Str]), "")
                .param("size", TypeSpec::Number, RuntimeValue::Nil)
                .build(),
        ),
    );
    namespace.set(
        "button",
        widget(
            CompParams::builder("button")
                .param("text", TypeSpec::Str, "")
                .param("enabled", TypeSpec::Bool, true)
                .build(),
        ),
    );
}
