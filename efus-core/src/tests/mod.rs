mod integration;
mod params_tests;

use crate::component::{Behavior, Component};
use crate::error::Result;
use crate::factory::WidgetFactory;
use crate::namespace::NamespaceRef;
use crate::params::CompParams;
use crate::runtime::RuntimeValue;
use crate::types::TypeSpec;
use std::cell::RefCell;
use std::rc::Rc;

/// Hook calls recorded as `name:hook`
pub(crate) type Log = Rc<RefCell<Vec<String>>>;

/// Behaviour that records every hook call
pub(crate) struct Probe {
    log: Log,
}

impl Probe {
    fn record(&self, component: &Component, hook: &str) {
        self.log
            .borrow_mut()
            .push(format!("{}:{hook}", component.name()));
    }
}

impl Behavior for Probe {
    fn init(&mut self, component: &Component) -> Result<()> {
        self.record(component, "init");
        Ok(())
    }

    fn prerender(&mut self, component: &Component) -> Result<Option<RuntimeValue>> {
        self.record(component, "prerender");
        Ok(Some(RuntimeValue::from(format!("<{}>", component.name()))))
    }

    fn postrender(&mut self, component: &Component) -> Result<Option<RuntimeValue>> {
        self.record(component, "postrender");
        Ok(None)
    }

    fn update(&mut self, component: &Component) -> Result<()> {
        self.record(component, "update");
        Ok(())
    }
}

pub(crate) fn box_params() -> Rc<CompParams> {
    CompParams::builder("box")
        .param("width", TypeSpec::Number, 10)
        .param("height", TypeSpec::Number, 10)
        .param("style", TypeSpec::Any, RuntimeValue::Nil)
        .build()
}

pub(crate) fn label_params() -> Rc<CompParams> {
    CompParams::builder("label")
        .param("text", TypeSpec::union([TypeSpec::Binding, TypeSpec::Any]), "")
        .param("width", TypeSpec::Number, RuntimeValue::Nil)
        .param("pad", TypeSpec::Number, RuntimeValue::Nil)
        .build()
}

pub(crate) fn probe_factory(params: Rc<CompParams>, log: &Log) -> RuntimeValue {
    let log = log.clone();
    WidgetFactory::new(params, move || -> Box<dyn Behavior> {
        Box::new(Probe { log: log.clone() })
    })
    .into_value()
}

/// Register probing `box` and `label` factories in `namespace`
pub(crate) fn widgets(namespace: &NamespaceRef) -> Log {
    let log = Log::default();
    namespace.set("box", probe_factory(box_params(), &log));
    namespace.set("label", probe_factory(label_params(), &log));
    log
}

pub(crate) fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}
