//! Component parameter schemas and argument binding
//!
//! [`CompParams`] declares what a component accepts: an ordered list of
//! parameter names, each with a [`TypeSpec`] and a default. Names may be
//! composite (`border:width`); they are reassembled into nested maps when the
//! arguments are evaluated.
//!
//! [`CompParams::bind`] reconciles the schema with the attributes written in
//! a tag and produces a [`CompArgs`], which keeps the raw values around so it
//! can recast them when a bound name changes.

use crate::error::{EfusError, Result};
use crate::instr::Attributes;
use crate::namespace::NamespaceRef;
use crate::runtime::RuntimeValue;
use crate::subscribe::{Subscribable, Subscriber, Subscribers};
use crate::types::{casts, TypeSpec};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Separator of composite parameter names
pub const PATH_SEPARATOR: char = ':';

/// Type and default of one parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub ty: TypeSpec,
    pub default: RuntimeValue,
}

/// Immutable parameter schema of a component type
#[derive(Debug, Clone)]
pub struct CompParams {
    component_name: String,
    params: Vec<(String, ParamSpec)>,
}

impl CompParams {
    pub fn new(component_name: impl Into<String>, params: Vec<(String, ParamSpec)>) -> Self {
        Self {
            component_name: component_name.into(),
            params,
        }
    }

    pub fn builder(component_name: impl Into<String>) -> CompParamsBuilder {
        CompParamsBuilder {
            component_name: component_name.into(),
            prefix: String::new(),
            params: Vec::new(),
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, spec)| spec)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Whether `name` may appear as an attribute of this component
    fn accepts(&self, name: &str) -> bool {
        self.get(name).is_some() || (is_include(name) && self.names().any(|p| p.starts_with(name)))
    }

    /// Bind attributes and host-computed values against this schema.
    ///
    /// Attribute values are evaluated in `namespace` right away. Casting is
    /// left to [`CompArgs::eval`].
    pub fn bind(
        self: &Rc<Self>,
        attributes: &Attributes,
        namespace: &NamespaceRef,
        computed: &BTreeMap<String, RuntimeValue>,
    ) -> Result<Rc<CompArgs>> {
        if let Some(name) = attributes
            .keys()
            .chain(computed.keys())
            .find(|name| !self.accepts(name))
        {
            return Err(EfusError::Binding {
                component: self.component_name.clone(),
                name: name.clone(),
            });
        }

        let mut included = Vec::new();
        for (prefix, value) in attributes.iter().filter(|(name, _)| is_include(name)) {
            included.push((prefix.clone(), value.eval(namespace)?));
        }
        included.extend(
            computed
                .iter()
                .filter(|(name, _)| is_include(name))
                .map(|(prefix, value)| (prefix.clone(), value.clone())),
        );

        let mut values = Vec::with_capacity(self.params.len());
        let mut includes = Vec::new();
        for (name, spec) in &self.params {
            let value = if let Some(attr) = attributes.get(name) {
                attr.eval(namespace)?
            } else if let Some(value) = computed.get(name) {
                value.clone()
            } else if let Some((prefix, base)) = included
                .iter()
                .find(|(prefix, _)| name.starts_with(prefix.as_str()))
            {
                match base.lookup(&name[prefix.len()..]) {
                    Some(value) => {
                        includes.push((name.clone(), spec.ty.clone(), value.clone()));
                        continue;
                    }
                    None => spec.default.clone(),
                }
            } else {
                spec.default.clone()
            };
            values.push((name.clone(), spec.ty.clone(), value));
        }

        let args = Rc::new_cyclic(|weak: &Weak<CompArgs>| {
            let subscriber = Subscriber::new();
            for (name, ty, value) in &values {
                if let (true, RuntimeValue::Binding(binding)) = (ty.contains_binding(), value) {
                    let weak = weak.clone();
                    let name = name.clone();
                    subscriber.subscribe_to(binding, move || match weak.upgrade() {
                        Some(args) => args.arg_changed(&name),
                        None => Ok(()),
                    });
                }
            }
            CompArgs {
                params: self.clone(),
                namespace: namespace.clone(),
                values,
                includes,
                evaluated: RefCell::new(BTreeMap::new()),
                subscribers: Subscribers::new(),
                subscriber,
            }
        });
        Ok(args)
    }
}

fn is_include(name: &str) -> bool {
    name.ends_with(PATH_SEPARATOR)
}

/// Builder for [`CompParams`]; groups produce composite names
pub struct CompParamsBuilder {
    component_name: String,
    prefix: String,
    params: Vec<(String, ParamSpec)>,
}

impl CompParamsBuilder {
    pub fn param(mut self, name: &str, ty: TypeSpec, default: impl Into<RuntimeValue>) -> Self {
        self.params.push((
            format!("{}{name}", self.prefix),
            ParamSpec {
                ty,
                default: default.into(),
            },
        ));
        self
    }

    /// Parameter without a default
    pub fn required(self, name: &str, ty: TypeSpec) -> Self {
        self.param(name, ty, RuntimeValue::Nil)
    }

    /// Nested parameters named `name:<sub>`
    pub fn group(mut self, name: &str, build: impl FnOnce(Self) -> Self) -> Self {
        let outer = std::mem::take(&mut self.prefix);
        self.prefix = format!("{outer}{name}{PATH_SEPARATOR}");
        let mut built = build(self);
        built.prefix = outer;
        built
    }

    pub fn build(self) -> Rc<CompParams> {
        Rc::new(CompParams::new(self.component_name, self.params))
    }
}

/// Arguments of one component instance
pub struct CompArgs {
    params: Rc<CompParams>,
    namespace: NamespaceRef,
    values: Vec<(String, TypeSpec, RuntimeValue)>,
    includes: Vec<(String, TypeSpec, RuntimeValue)>,
    evaluated: RefCell<BTreeMap<String, RuntimeValue>>,
    subscribers: Subscribers,
    subscriber: Subscriber,
}

impl CompArgs {
    pub fn params(&self) -> &Rc<CompParams> {
        &self.params
    }

    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }

    /// Uncast value bound to the parameter `name`
    pub fn raw(&self, name: &str) -> Option<&RuntimeValue> {
        self.values
            .iter()
            .chain(&self.includes)
            .find(|(param, _, _)| param == name)
            .map(|(_, _, value)| value)
    }

    /// Number of live binding subscriptions
    pub fn binding_count(&self) -> usize {
        self.subscriber.len()
    }

    /// Cast every value and rebuild the nested argument map.
    ///
    /// On error the previous map is kept.
    pub fn eval(&self) -> Result<()> {
        let mut map = BTreeMap::new();
        for (name, ty, value) in self.values.iter().chain(&self.includes) {
            let cast = casts(value.clone(), ty, &self.namespace)?;
            insert_path(&mut map, name, cast);
        }
        *self.evaluated.borrow_mut() = map;
        Ok(())
    }

    /// Recast the parameters under `prefix` and notify subscribers
    pub fn arg_changed(&self, prefix: &str) -> Result<()> {
        let nested = format!("{prefix}{PATH_SEPARATOR}");
        let mut updates = Vec::new();
        for (name, ty, value) in self.values.iter().chain(&self.includes) {
            if name == prefix || name.starts_with(&nested) {
                updates.push((name, casts(value.clone(), ty, &self.namespace)?));
            }
        }
        trace!(
            component = %self.params.component_name,
            prefix,
            count = updates.len(),
            "argument changed"
        );
        {
            let mut evaluated = self.evaluated.borrow_mut();
            for (name, value) in updates {
                insert_path(&mut evaluated, name, value);
            }
        }
        self.warn_subscribers()
    }

    /// Top-level entry of the evaluated arguments
    pub fn get(&self, name: &str) -> Option<RuntimeValue> {
        self.evaluated.borrow().get(name).cloned()
    }

    /// Entry at a composite path such as `border:width`
    pub fn lookup(&self, path: &str) -> Option<RuntimeValue> {
        let (head, rest) = match path.split_once(PATH_SEPARATOR) {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let top = self.get(head)?;
        match rest {
            Some(rest) => top.lookup(rest).cloned(),
            None => Some(top),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, RuntimeValue> {
        self.evaluated.borrow().clone()
    }

    pub fn to_value(&self) -> RuntimeValue {
        RuntimeValue::Map(self.snapshot())
    }
}

fn insert_path(map: &mut BTreeMap<String, RuntimeValue>, path: &str, value: RuntimeValue) {
    match path.split_once(PATH_SEPARATOR) {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| RuntimeValue::Map(BTreeMap::new()));
            if !matches!(entry, RuntimeValue::Map(_)) {
                *entry = RuntimeValue::Map(BTreeMap::new());
            }
            if let RuntimeValue::Map(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

impl Subscribable for CompArgs {
    fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }
}

impl fmt::Debug for CompArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompArgs")
            .field("component", &self.params.component_name)
            .field("evaluated", &*self.evaluated.borrow())
            .finish()
    }
}
