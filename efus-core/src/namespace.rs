//! Hierarchical observable scopes
//!
//! A [`Namespace`] maps names to runtime values and falls back to its parent
//! namespaces on a miss. Writes only mark the namespace dirty; subscribers
//! are told about them when somebody polls [`Namespace::update`].

use crate::capability::Host;
use crate::config::EfusConfig;
use crate::defaults::default_entries;
use crate::error::{EfusError, Result};
use crate::instr::ImportNames;
use crate::runtime::RuntimeValue;
use crate::subscribe::{Subscribable, Subscribers, Subscription};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

pub type NamespaceRef = Rc<Namespace>;

pub struct Namespace {
    entries: RefCell<BTreeMap<String, RuntimeValue>>,
    parents: RefCell<Vec<NamespaceRef>>,
    dirty: Cell<bool>,
    subscribers: Subscribers,
    host: Rc<Host>,
    depth: Cell<usize>,
}

impl Namespace {
    /// Root namespace with the default host and the default entries
    pub fn new() -> NamespaceRef {
        Self::with_host(Rc::new(Host::default()))
    }

    /// Root namespace seeded from `config`
    pub fn with_config(config: &EfusConfig) -> NamespaceRef {
        let ns = Self::with_host(Rc::new(Host::from_config(config)));
        ns.entries.borrow_mut().extend(config.entries());
        ns
    }

    pub fn with_host(host: Rc<Host>) -> NamespaceRef {
        Rc::new(Self {
            entries: RefCell::new(default_entries().collect()),
            parents: RefCell::new(Vec::new()),
            dirty: Cell::new(false),
            subscribers: Subscribers::new(),
            host,
            depth: Cell::new(0),
        })
    }

    /// Namespace falling back to `parents`, in order.
    ///
    /// Shares the first parent's host; defaults are not copied, they
    /// resolve through the parents.
    pub fn with_parents(parents: Vec<NamespaceRef>) -> NamespaceRef {
        let host = parents
            .first()
            .map(|parent| parent.host.clone())
            .unwrap_or_default();
        let entries = if parents.is_empty() {
            default_entries().collect()
        } else {
            BTreeMap::new()
        };
        Rc::new(Self {
            entries: RefCell::new(entries),
            parents: RefCell::new(parents),
            dirty: Cell::new(false),
            subscribers: Subscribers::new(),
            host,
            depth: Cell::new(0),
        })
    }

    /// Namespace whose sole parent is `self`
    pub fn child(self: &Rc<Self>) -> NamespaceRef {
        Self::with_parents(vec![self.clone()])
    }

    pub fn set_parents(&self, parents: Vec<NamespaceRef>) {
        *self.parents.borrow_mut() = parents;
    }

    pub fn parents(&self) -> Vec<NamespaceRef> {
        self.parents.borrow().clone()
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.host
    }

    /// Store `value` under `name` and mark the namespace dirty
    pub fn set(&self, name: &str, value: impl Into<RuntimeValue>) {
        self.entries.borrow_mut().insert(name.to_string(), value.into());
        self.dirty.set(true);
    }

    pub fn remove(&self, name: &str) -> Option<RuntimeValue> {
        let removed = self.entries.borrow_mut().remove(name);
        if removed.is_some() {
            self.dirty.set(true);
        }
        removed
    }

    /// Value stored in this namespace itself, ignoring parents
    pub fn local(&self, name: &str) -> Option<RuntimeValue> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Names stored locally, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Resolve `name` through this namespace and its parents.
    ///
    /// Returns [`RuntimeValue::Nil`] when no namespace defines it.
    pub fn get(&self, name: &str) -> Result<RuntimeValue> {
        Ok(self.lookup(name, &mut Vec::new())?.unwrap_or(RuntimeValue::Nil))
    }

    /// Like [`Namespace::get`] but a missing name is an error
    pub fn get_name(&self, name: &str) -> Result<RuntimeValue> {
        self.lookup(name, &mut Vec::new())?
            .ok_or_else(|| EfusError::NameNotFound {
                name: name.to_string(),
            })
    }

    /// Depth-first search; a parent holding Nil does not stop the search
    fn lookup(&self, name: &str, path: &mut Vec<*const Namespace>) -> Result<Option<RuntimeValue>> {
        if let Some(value) = self.local(name) {
            return Ok(Some(value));
        }

        path.push(self as *const Namespace);
        let mut found_nil = false;
        for parent in self.parents() {
            if path.contains(&Rc::as_ptr(&parent)) {
                return Err(EfusError::CircularNamespace {
                    name: name.to_string(),
                });
            }
            match parent.lookup(name, path)? {
                Some(RuntimeValue::Nil) => found_nil = true,
                Some(value) => {
                    path.pop();
                    return Ok(Some(value));
                }
                None => {}
            }
        }
        path.pop();
        Ok(found_nil.then_some(RuntimeValue::Nil))
    }

    /// Notify subscribers if anything was written since the last poll.
    ///
    /// Returns whether a notification was sent.
    pub fn update(&self) -> Result<bool> {
        if !self.dirty.get() {
            return Ok(false);
        }
        let depth = self.depth.get();
        if depth >= self.host.max_notify_depth {
            return Err(EfusError::NotificationLoop { depth });
        }

        self.dirty.set(false);
        self.depth.set(depth + 1);
        trace!(depth, subscribers = self.subscribers.len(), "namespace update");
        let result = self.subscribers.notify();
        self.depth.set(depth);
        result.map(|()| true)
    }

    /// Live reference to the entry `name`
    pub fn create_binding(self: &Rc<Self>, name: &str) -> Result<Rc<Binding>> {
        let initial = self.get(name)?;
        let binding = Rc::new_cyclic(|weak: &Weak<Binding>| {
            let weak = weak.clone();
            let subscription = Subscription::new(self, move || match weak.upgrade() {
                Some(binding) => binding.refresh(),
                None => Ok(()),
            });
            Binding {
                name: name.to_string(),
                namespace: Rc::downgrade(self),
                last: RefCell::new(initial),
                subscribers: Subscribers::new(),
                _subscription: subscription,
            }
        });
        Ok(binding)
    }

    /// Bind symbols from `module` into this namespace
    pub fn import_module(&self, module: &str, names: &ImportNames) -> Result<()> {
        let symbols = self.host.modules.load(module, names)?;
        debug!(module, count = symbols.len(), "imported module");
        for (name, value) in symbols {
            self.set(&name, value);
        }
        Ok(())
    }
}

impl Subscribable for Namespace {
    fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("names", &self.names())
            .field("parents", &self.parents.borrow().len())
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

/// Dynamic reference to a namespace entry.
///
/// Re-resolves its name whenever the namespace notifies and tells its own
/// subscribers only when the resolved value actually changed.
pub struct Binding {
    name: String,
    namespace: Weak<Namespace>,
    last: RefCell<RuntimeValue>,
    subscribers: Subscribers,
    _subscription: Subscription,
}

impl Binding {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last resolved value
    pub fn get(&self) -> RuntimeValue {
        self.last.borrow().clone()
    }

    pub fn namespace(&self) -> Option<NamespaceRef> {
        self.namespace.upgrade()
    }

    /// Re-resolve the name, notifying subscribers on change
    pub fn refresh(&self) -> Result<()> {
        let Some(namespace) = self.namespace.upgrade() else {
            return Ok(());
        };
        let current = namespace.get(&self.name)?;
        if *self.last.borrow() == current {
            return Ok(());
        }
        trace!(name = %self.name, value = %current, "binding changed");
        *self.last.borrow_mut() = current;
        self.warn_subscribers()
    }
}

impl Subscribable for Binding {
    fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("last", &*self.last.borrow())
            .finish()
    }
}
