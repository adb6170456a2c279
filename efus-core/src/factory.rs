//! Component factories resolved by tag name

use crate::component::{Behavior, Component, ComponentRef};
use crate::error::Result;
use crate::instr::Attributes;
use crate::namespace::{Namespace, NamespaceRef};
use crate::params::CompParams;
use crate::runtime::RuntimeValue;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Builds components for a tag name.
///
/// `attributes` are the raw values written in the tag; the factory decides
/// where to evaluate them.
pub trait ComponentFactory {
    fn name(&self) -> &str;

    fn create(
        &self,
        namespace: &NamespaceRef,
        attributes: &Attributes,
        parent: Option<&ComponentRef>,
    ) -> Result<Option<ComponentRef>>;
}

impl fmt::Debug for dyn ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentFactory({})", self.name())
    }
}

type BehaviorFn = dyn Fn() -> Box<dyn Behavior>;

/// Factory pairing a parameter schema with a behaviour constructor
pub struct WidgetFactory {
    params: Rc<CompParams>,
    build: Box<BehaviorFn>,
}

impl WidgetFactory {
    pub fn new(params: Rc<CompParams>, build: impl Fn() -> Box<dyn Behavior> + 'static) -> Self {
        Self {
            params,
            build: Box::new(build),
        }
    }

    pub fn params(&self) -> &Rc<CompParams> {
        &self.params
    }

    /// Construct a component from host-side values, outside any markup
    pub fn make(&self, computed: &BTreeMap<String, RuntimeValue>) -> Result<ComponentRef> {
        let namespace = Namespace::new();
        let args = self.params.bind(&Attributes::new(), &namespace, computed)?;
        Component::new(
            self.params.component_name(),
            namespace,
            args,
            None,
            (self.build)(),
        )
    }

    pub fn into_value(self) -> RuntimeValue {
        RuntimeValue::Factory(Rc::new(self))
    }
}

impl ComponentFactory for WidgetFactory {
    fn name(&self) -> &str {
        self.params.component_name()
    }

    fn create(
        &self,
        namespace: &NamespaceRef,
        attributes: &Attributes,
        parent: Option<&ComponentRef>,
    ) -> Result<Option<ComponentRef>> {
        let args = self.params.bind(attributes, namespace, &BTreeMap::new())?;
        let component = Component::new(
            self.params.component_name(),
            namespace.clone(),
            args,
            parent,
            (self.build)(),
        )?;
        Ok(Some(component))
    }
}
