//! Live component tree
//!
//! A [`Component`] owns its children and points weakly at its parent.
//! Host-specific behaviour (creating widgets, reacting to argument changes)
//! lives behind the [`Behavior`] trait.

use crate::error::{EfusError, Result};
use crate::namespace::NamespaceRef;
use crate::params::CompArgs;
use crate::runtime::RuntimeValue;
use crate::subscribe::Subscriber;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

pub type ComponentRef = Rc<Component>;

/// Host hooks of a component
pub trait Behavior {
    /// Called once the component is constructed and its arguments evaluated
    fn init(&mut self, _component: &Component) -> Result<()> {
        Ok(())
    }

    /// Build the host object; must produce a handle
    fn prerender(&mut self, component: &Component) -> Result<Option<RuntimeValue>>;

    /// Called after the children rendered; a non-Nil result replaces the
    /// prerender handle
    fn postrender(&mut self, _component: &Component) -> Result<Option<RuntimeValue>> {
        Ok(None)
    }

    /// Arguments changed
    fn update(&mut self, _component: &Component) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Constructed,
    Rendered,
}

pub struct Component {
    name: String,
    namespace: NamespaceRef,
    args: Rc<CompArgs>,
    parent: RefCell<Weak<Component>>,
    children: RefCell<Vec<ComponentRef>>,
    inlet: RefCell<Weak<Component>>,
    behavior: RefCell<Box<dyn Behavior>>,
    subscriber: Subscriber,
    state: Cell<Lifecycle>,
}

impl Component {
    /// Evaluate `args`, hook argument changes up to [`Behavior::update`] and
    /// run [`Behavior::init`]
    pub fn new(
        name: impl Into<String>,
        namespace: NamespaceRef,
        args: Rc<CompArgs>,
        parent: Option<&ComponentRef>,
        behavior: Box<dyn Behavior>,
    ) -> Result<ComponentRef> {
        args.eval()?;
        let component = Rc::new_cyclic(|weak: &Weak<Component>| {
            let subscriber = Subscriber::new();
            let weak = weak.clone();
            subscriber.subscribe_to(&args, move || match weak.upgrade() {
                Some(component) => component.update(),
                None => Ok(()),
            });
            Component {
                name: name.into(),
                namespace,
                args,
                parent: RefCell::new(parent.map(Rc::downgrade).unwrap_or_default()),
                children: RefCell::new(Vec::new()),
                inlet: RefCell::new(Weak::new()),
                behavior: RefCell::new(behavior),
                subscriber,
                state: Cell::new(Lifecycle::Constructed),
            }
        });
        component.with_behavior(|behavior, this| behavior.init(this))?;
        Ok(component)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }

    pub fn args(&self) -> &Rc<CompArgs> {
        &self.args
    }

    /// Evaluated argument at `path`, Nil when absent
    pub fn arg(&self, path: &str) -> RuntimeValue {
        self.args.lookup(path).unwrap_or(RuntimeValue::Nil)
    }

    pub fn parent(&self) -> Option<ComponentRef> {
        self.parent.borrow().upgrade()
    }

    pub fn set_parent(&self, parent: &ComponentRef) {
        *self.parent.borrow_mut() = Rc::downgrade(parent);
    }

    pub fn children(&self) -> Vec<ComponentRef> {
        self.children.borrow().clone()
    }

    pub fn state(&self) -> Lifecycle {
        self.state.get()
    }

    /// Component that receives children added to this one
    pub fn set_inlet(&self, inlet: &ComponentRef) {
        *self.inlet.borrow_mut() = Rc::downgrade(inlet);
    }

    pub fn inlet(&self) -> Option<ComponentRef> {
        self.inlet.borrow().upgrade()
    }

    /// Attach `child`, to the inlet if one is set
    pub fn add_child(self: &Rc<Self>, child: ComponentRef) {
        match self.inlet() {
            Some(inlet) if !Rc::ptr_eq(&inlet, self) => inlet.add_child(child),
            _ => {
                child.set_parent(self);
                self.children.borrow_mut().push(child);
            }
        }
    }

    /// Run a hook with exclusive access to the behaviour
    pub fn with_behavior<T>(
        &self,
        hook: impl FnOnce(&mut dyn Behavior, &Component) -> Result<T>,
    ) -> Result<T> {
        let mut behavior = self.behavior.try_borrow_mut().map_err(|_| EfusError::Reentrant {
            component: self.name.clone(),
        })?;
        hook(behavior.as_mut(), self)
    }

    /// Render this component, then its children
    pub fn render(&self) -> Result<RuntimeValue> {
        let handle = match self.with_behavior(|behavior, this| behavior.prerender(this))? {
            Some(handle) if !handle.is_nil() => handle,
            _ => {
                return Err(EfusError::RenderInvariant {
                    component: self.name.clone(),
                })
            }
        };
        for child in self.children() {
            child.render()?;
        }
        self.state.set(Lifecycle::Rendered);
        trace!(component = %self.name, "rendered");
        match self.with_behavior(|behavior, this| behavior.postrender(this))? {
            Some(post) if !post.is_nil() => Ok(post),
            _ => Ok(handle),
        }
    }

    fn update(&self) -> Result<()> {
        trace!(component = %self.name, "arguments changed");
        self.with_behavior(|behavior, this| behavior.update(this))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriber.len()
    }

    /// Indented outline of this subtree with evaluated arguments
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.name);
        for (name, value) in self.args.snapshot() {
            if !value.is_nil() {
                out.push_str(&format!(" {name}={value}"));
            }
        }
        out.push('\n');
        for child in self.children() {
            child.write_outline(out, depth + 1);
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("children", &self.children.borrow().len())
            .field("state", &self.state.get())
            .finish()
    }
}
