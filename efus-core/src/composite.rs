//! Components whose body is another efus program
//!
//! The body runs in a child namespace of the tag's namespace. It sees the
//! evaluated arguments as `args`, and may name the component outer children
//! attach to by binding it as `inlet`, and an exported component as
//! `outlet`.

use crate::component::{Behavior, Component, ComponentRef};
use crate::error::Result;
use crate::instr::{Attributes, Efus};
use crate::namespace::NamespaceRef;
use crate::params::CompParams;
use crate::runtime::RuntimeValue;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

pub const ARGS_SLOT: &str = "args";
pub const INLET_SLOT: &str = "inlet";
pub const OUTLET_SLOT: &str = "outlet";

pub struct CompositeFactory {
    params: Rc<CompParams>,
    program: Rc<Efus>,
}

impl CompositeFactory {
    pub fn new(params: Rc<CompParams>, program: Efus) -> Self {
        Self {
            params,
            program: Rc::new(program),
        }
    }

    pub fn program(&self) -> &Efus {
        &self.program
    }

    pub fn into_value(self) -> RuntimeValue {
        RuntimeValue::Factory(Rc::new(self))
    }
}

impl crate::factory::ComponentFactory for CompositeFactory {
    fn name(&self) -> &str {
        self.params.component_name()
    }

    fn create(
        &self,
        namespace: &NamespaceRef,
        attributes: &Attributes,
        parent: Option<&ComponentRef>,
    ) -> Result<Option<ComponentRef>> {
        let scope = namespace.child();
        let args = self.params.bind(attributes, namespace, &BTreeMap::new())?;
        let body = Rc::new(RefCell::new(None));
        let behavior = CompositeBehavior { body: body.clone() };
        let component = Component::new(
            self.params.component_name(),
            scope.clone(),
            args,
            parent,
            Box::new(behavior),
        )?;

        scope.set(ARGS_SLOT, component.args().to_value());
        debug!(component = %self.params.component_name(), "evaluating composite body");
        let root = self.program.translate(&scope, Some(&component))?;

        let inlet = match scope.local(INLET_SLOT) {
            Some(RuntimeValue::Component(inlet)) => Some(inlet),
            _ => root.clone(),
        };
        if let Some(inlet) = inlet {
            component.set_inlet(&inlet);
        }
        *body.borrow_mut() = root;
        Ok(Some(component))
    }
}

struct CompositeBehavior {
    body: Rc<RefCell<Option<ComponentRef>>>,
}

impl Behavior for CompositeBehavior {
    fn prerender(&mut self, _component: &Component) -> Result<Option<RuntimeValue>> {
        let body = self.body.borrow().clone();
        match body {
            Some(body) => body.render().map(Some),
            None => Ok(None),
        }
    }

    fn update(&mut self, component: &Component) -> Result<()> {
        let scope = component.namespace();
        scope.set(ARGS_SLOT, component.args().to_value());
        scope.update()?;
        Ok(())
    }
}

/// Body component a composite exported as `outlet`
pub fn outlet(component: &Component) -> Option<ComponentRef> {
    component
        .namespace()
        .local(OUTLET_SLOT)
        .and_then(|value| value.as_component().cloned())
}
